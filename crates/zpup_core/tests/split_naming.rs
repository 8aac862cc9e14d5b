use std::path::{Path, PathBuf};

use zpup_core::{format_segment_time, part_index, segment_output_pattern};

#[test]
fn segment_time_is_hours_minutes_seconds() {
    assert_eq!(format_segment_time(60.0), "0:01:00");
    assert_eq!(format_segment_time(59.9), "0:00:59");
    assert_eq!(format_segment_time(3_725.4), "1:02:05");
    assert_eq!(format_segment_time(90_000.0), "25:00:00");
}

#[test]
fn segment_time_clamps_nonsense_to_zero() {
    assert_eq!(format_segment_time(-3.0), "0:00:00");
    assert_eq!(format_segment_time(f64::NAN), "0:00:00");
}

#[test]
fn output_pattern_is_a_sibling_with_numbered_suffix() {
    assert_eq!(
        segment_output_pattern(Path::new("/videos/holiday.mp4")),
        PathBuf::from("/videos/holiday.%02d.mp4")
    );
    assert_eq!(
        segment_output_pattern(Path::new("raw")),
        PathBuf::from("raw.%02d")
    );
}

#[test]
fn part_index_matches_only_two_digit_siblings() {
    let source = Path::new("/videos/holiday.mp4");
    assert_eq!(part_index(source, Path::new("/videos/holiday.00.mp4")), Some(0));
    assert_eq!(part_index(source, Path::new("/videos/holiday.07.mp4")), Some(7));
    assert_eq!(part_index(source, Path::new("/videos/holiday.mp4")), None);
    assert_eq!(part_index(source, Path::new("/videos/holiday.123.mp4")), None);
    assert_eq!(part_index(source, Path::new("/videos/holiday.0a.mp4")), None);
    assert_eq!(part_index(source, Path::new("/videos/holiday.01.mkv")), None);
    assert_eq!(part_index(source, Path::new("/videos/other.01.mp4")), None);
}

#[test]
fn percent_signs_in_the_source_are_escaped_for_the_segmenter() {
    assert_eq!(
        segment_output_pattern(Path::new("/media/50%_off.mp4")),
        PathBuf::from("/media/50%%_off.%02d.mp4")
    );
    assert_eq!(
        segment_output_pattern(Path::new("/100%/clip%03d.m%v")),
        PathBuf::from("/100%%/clip%%03d.%02d.m%%v")
    );
}

#[test]
fn part_index_matches_the_unescaped_names_on_disk() {
    let source = Path::new("/media/50%_off.mp4");
    assert_eq!(part_index(source, Path::new("/media/50%_off.01.mp4")), Some(1));
    assert_eq!(part_index(source, Path::new("/media/50%%_off.01.mp4")), None);
}
