use super::*;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_probe_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<html>hello</html>"),
        )
        .mount(&server)
        .await;

    let probe = HttpProbe::new(&PipelineConfig::default()).unwrap();
    let url = format!("{}/page", server.uri());
    let result = probe.process(&url).await.unwrap();

    assert_eq!(result.status, 200);
    assert_eq!(result.final_url, url);
    assert_eq!(result.content_length, 18);
    assert_eq!(result.content_type.as_deref(), Some("text/html"));
}

#[tokio::test]
async fn test_probe_sends_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("user-agent", "auditq-test"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let config = PipelineConfig {
        user_agent: "auditq-test".to_string(),
        ..Default::default()
    };
    let probe = HttpProbe::new(&config).unwrap();
    let result = probe.process(&server.uri()).await.unwrap();
    assert_eq!(result.status, 204);
    assert_eq!(result.content_length, 0);
}

#[tokio::test]
async fn test_probe_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let probe = HttpProbe::with_client(Client::new());
    let err = probe.process(&server.uri()).await.unwrap_err();
    assert!(matches!(err, PipelineError::Status { status: 503, .. }));
    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn test_probe_connection_error() {
    let probe = HttpProbe::with_client(Client::new());
    // Port 9 (discard) is closed on test hosts.
    let err = probe.process("http://127.0.0.1:9/").await.unwrap_err();
    assert!(matches!(err, PipelineError::Http(_)));
}

#[test]
fn test_probe_result_serialization() {
    let result = ProbeResult {
        status: 200,
        final_url: "https://x.test/".to_string(),
        content_length: 10,
        content_type: None,
        elapsed_ms: 42,
    };
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["status"], 200);
    assert!(json.get("content_type").is_none());

    let back: ProbeResult = serde_json::from_value(json).unwrap();
    assert_eq!(back, result);
}
