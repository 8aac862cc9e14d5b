use std::path::PathBuf;

use clap::{ArgAction, Parser};
use log::LevelFilter;
use zpup_engine::UploadSettings;
use zpup_logging::LogDestination;

/// Upload files to zippyshare and print their share links.
#[derive(Debug, Parser)]
#[command(name = "zpup", version, about, long_about = None)]
pub struct Cli {
    /// Files to upload
    #[arg(short = 'f', long = "file", value_name = "FILE", num_args = 1..)]
    pub files: Vec<PathBuf>,

    /// Directories whose files are uploaded, searched recursively
    #[arg(short = 'd', long = "directory", value_name = "DIR", num_args = 1..)]
    pub directories: Vec<PathBuf>,

    /// Split videos that exceed the host's size limit
    #[arg(short, long)]
    pub split: bool,

    /// Write the batch report here (JSON for a .json path, RON otherwise)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// How many times to re-attempt a failed upload
    #[arg(
        short,
        long,
        default_value_t = 0,
        value_parser = clap::value_parser!(u32).range(0..=5)
    )]
    pub retries: u32,

    /// HTTPS proxy as <IP>:<PORT>
    #[arg(long, value_name = "HOST:PORT")]
    pub proxy: Option<String>,

    /// Also write the log to this file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn upload_settings(&self) -> UploadSettings {
        UploadSettings {
            split_videos: self.split,
            retries: self.retries,
            proxy: self.proxy.clone(),
            ..UploadSettings::default()
        }
    }

    pub fn log_destination(&self) -> LogDestination {
        match &self.log_file {
            Some(path) => LogDestination::Both(path.clone()),
            None => LogDestination::Terminal,
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_onto_upload_settings() {
        let cli = Cli::try_parse_from([
            "zpup", "-f", "a.mp4", "b.zip", "-s", "-r", "3", "--proxy", "10.0.0.1:3128",
        ])
        .unwrap();

        assert_eq!(cli.files, vec![PathBuf::from("a.mp4"), PathBuf::from("b.zip")]);
        let settings = cli.upload_settings();
        assert!(settings.split_videos);
        assert_eq!(settings.retries, 3);
        assert_eq!(settings.proxy.as_deref(), Some("10.0.0.1:3128"));
        assert_eq!(settings.concurrency, 4);
    }

    #[test]
    fn retries_above_five_are_refused() {
        assert!(Cli::try_parse_from(["zpup", "-f", "a", "-r", "6"]).is_err());
    }

    #[test]
    fn verbosity_and_log_file_pick_the_logger() {
        let cli = Cli::try_parse_from(["zpup", "-d", "media", "-vv", "--log-file", "run.log"])
            .unwrap();
        assert_eq!(cli.log_level(), LevelFilter::Trace);
        assert_eq!(
            cli.log_destination(),
            LogDestination::Both(PathBuf::from("run.log"))
        );

        let quiet = Cli::try_parse_from(["zpup", "-d", "media"]).unwrap();
        assert_eq!(quiet.log_level(), LevelFilter::Warn);
        assert_eq!(quiet.log_destination(), LogDestination::Terminal);
    }
}
