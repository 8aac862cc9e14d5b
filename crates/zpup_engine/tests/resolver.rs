use std::time::Duration;

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zpup_core::ErrorKind;
use zpup_engine::{
    build_client, LandingPageResolver, ServerResolver, UploadSettings, DEFAULT_REFERER,
};

fn settings_for(server: &MockServer) -> UploadSettings {
    UploadSettings {
        landing_url: format!("{}/", server.uri()),
        upload_url_template: format!("{}/{{server}}/upload", server.uri()),
        ..UploadSettings::default()
    }
}

fn resolver_for(settings: &UploadSettings) -> LandingPageResolver {
    let client = build_client(settings).expect("client");
    LandingPageResolver::new(client, settings)
}

#[tokio::test]
async fn resolves_server_token_from_landing_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("referer", DEFAULT_REFERER))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><script>var server = 'www93';\nvar other = 1;</script></html>",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let resolver = resolver_for(&settings_for(&server));
    assert_eq!(resolver.resolve().await.unwrap(), "www93");
}

#[tokio::test]
async fn missing_token_is_a_resolution_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let resolver = resolver_for(&settings_for(&server));
    let err = resolver.resolve().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ResolutionFailed);
}

#[tokio::test]
async fn error_status_is_a_resolution_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503).set_body_string("var server = 'www1';"))
        .mount(&server)
        .await;

    let resolver = resolver_for(&settings_for(&server));
    let err = resolver.resolve().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ResolutionFailed);
    assert!(err.message.contains("503"));
}

#[tokio::test]
async fn slow_landing_page_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(300))
                .set_body_string("var server = 'www2';"),
        )
        .mount(&server)
        .await;

    let settings = UploadSettings {
        resolve_timeout: Some(Duration::from_millis(50)),
        ..settings_for(&server)
    };
    let err = resolver_for(&settings).resolve().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ResolutionFailed);
    assert!(err.message.contains("timed out"));
}
