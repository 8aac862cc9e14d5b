use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zpup_core::ErrorKind;
use zpup_engine::{
    build_client, ByteProgress, MultipartTransport, UploadSettings, UploadTransport,
    BODY_CHUNK_SIZE, DEFAULT_REFERER,
};

const SHARE_URL: &str = "https://www12.zippyshare.com/v/Qw3rTy12/file.html";

fn share_page() -> String {
    format!(
        r#"<html><body><div id="urls">
        <input type="text" class="link" readonly onclick="this.select();" value="{SHARE_URL}">
        </div></body></html>"#
    )
}

fn transport_for(server: &MockServer) -> MultipartTransport {
    let settings = UploadSettings {
        landing_url: format!("{}/", server.uri()),
        upload_url_template: format!("{}/{{server}}/upload", server.uri()),
        ..UploadSettings::default()
    };
    let client = build_client(&settings).expect("client");
    MultipartTransport::new(client, &settings)
}

fn recorder() -> (ByteProgress, Arc<Mutex<Vec<u64>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let progress: ByteProgress = Arc::new(move |sent: u64| sink.lock().unwrap().push(sent));
    (progress, seen)
}

fn write_file(dir: &Path, name: &str, content: &[u8]) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

#[tokio::test]
async fn uploads_multipart_and_returns_share_link() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/www12/upload"))
        .and(header("referer", DEFAULT_REFERER))
        .and(header_exists("user-agent"))
        .and(body_string_contains(r#"name="name""#))
        .and(body_string_contains(r#"filename="notes.txt""#))
        .and(body_string_contains("Content-Type: text/plain"))
        .and(body_string_contains("hello uploader"))
        .respond_with(ResponseTemplate::new(200).set_body_string(share_page()))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let file = write_file(temp.path(), "notes.txt", b"hello uploader");
    let (progress, seen) = recorder();

    let url = transport_for(&server)
        .upload(&file, "www12", progress)
        .await
        .expect("upload ok");
    assert_eq!(url, SHARE_URL);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.last().copied(), Some(14));
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn unknown_extension_is_sent_as_octet_stream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/www3/upload"))
        .and(body_string_contains("Content-Type: application/octet-stream"))
        .respond_with(ResponseTemplate::new(200).set_body_string(share_page()))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let file = write_file(temp.path(), "blob.zzqq", b"payload");
    let (progress, _) = recorder();

    let url = transport_for(&server).upload(&file, "www3", progress).await;
    assert_eq!(url.as_deref(), Ok(SHARE_URL));
}

#[tokio::test]
async fn progress_counts_large_bodies_to_the_last_byte() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/www7/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_string(share_page()))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let content = vec![b'x'; 300_000];
    let file = write_file(temp.path(), "big.bin", &content);
    let (progress, seen) = recorder();

    transport_for(&server)
        .upload(&file, "www7", progress)
        .await
        .expect("upload ok");

    let seen = seen.lock().unwrap();
    let max_reports = 300_000_usize.div_ceil(BODY_CHUNK_SIZE);
    assert!(
        (2..=max_reports).contains(&seen.len()),
        "expected at most {max_reports} progress reports, got {seen:?}"
    );
    assert_eq!(seen.last().copied(), Some(300_000));
}

#[tokio::test]
async fn error_status_is_a_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let file = write_file(temp.path(), "a.txt", b"abc");
    let (progress, _) = recorder();

    let err = transport_for(&server)
        .upload(&file, "www1", progress)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::TransportError);
}

#[tokio::test]
async fn page_without_link_is_a_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>upload failed</html>"))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let file = write_file(temp.path(), "a.txt", b"abc");
    let (progress, _) = recorder();

    let err = transport_for(&server)
        .upload(&file, "www1", progress)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ParseError);
}

#[tokio::test]
async fn missing_file_is_reported_without_a_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let (progress, _) = recorder();

    let err = transport_for(&server)
        .upload(&temp.path().join("gone.txt"), "www1", progress)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::FileUnreadable);
}

#[tokio::test]
async fn unreachable_host_is_a_transport_error() {
    let server = MockServer::start().await;
    let transport = transport_for(&server);
    drop(server);

    let temp = TempDir::new().unwrap();
    let file = write_file(temp.path(), "a.txt", b"abc");
    let (progress, _) = recorder();

    let err = transport.upload(&file, "www1", progress).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::TransportError);
}
