use crate::support::{mock_site, test_config, thread};
use chandere::poller::{build_http_client, fetch_target, FetchOutcome};
use chandere::state::ConditionalToken;
use chandere::Poller;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn uri(server: &MockServer, path: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), path)).unwrap()
}

async fn respond(server: &MockServer, route: &str, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(template)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_status_classification() {
    let server = MockServer::start().await;
    respond(&server, "/gone.json", ResponseTemplate::new(404)).await;
    respond(&server, "/banned.json", ResponseTemplate::new(403)).await;
    respond(&server, "/same.json", ResponseTemplate::new(304)).await;
    respond(&server, "/broken.json", ResponseTemplate::new(500)).await;
    respond(
        &server,
        "/bad-body.json",
        ResponseTemplate::new(200).set_body_string("<html>not json</html>"),
    )
    .await;

    let client = build_http_client(&test_config()).unwrap();

    assert_eq!(
        fetch_target(&client, &uri(&server, "/gone.json"), None).await,
        FetchOutcome::NotFound
    );
    assert_eq!(
        fetch_target(&client, &uri(&server, "/banned.json"), None).await,
        FetchOutcome::Blocked
    );
    assert_eq!(
        fetch_target(&client, &uri(&server, "/same.json"), None).await,
        FetchOutcome::NotModified
    );
    assert!(matches!(
        fetch_target(&client, &uri(&server, "/broken.json"), None).await,
        FetchOutcome::TransientError {
            code: Some(500),
            ..
        }
    ));
    assert!(matches!(
        fetch_target(&client, &uri(&server, "/bad-body.json"), None).await,
        FetchOutcome::TransientError {
            code: Some(200),
            ..
        }
    ));
}

#[tokio::test]
async fn test_success_captures_etag() {
    let server = MockServer::start().await;
    respond(
        &server,
        "/g/thread/1.json",
        ResponseTemplate::new(200)
            .insert_header("ETag", "\"abc123\"")
            .set_body_json(thread(Vec::new())),
    )
    .await;

    let client = build_http_client(&test_config()).unwrap();
    match fetch_target(&client, &uri(&server, "/g/thread/1.json"), None).await {
        FetchOutcome::Success { content, token } => {
            assert_eq!(token, Some(ConditionalToken::ETag("\"abc123\"".to_string())));
            assert!(content.get("posts").is_some());
        }
        other => panic!("expected success, got {:?}", other),
    }
}

#[tokio::test]
async fn test_etag_is_sent_back() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/g/thread/1.json"))
        .and(header("If-None-Match", "\"abc123\""))
        .respond_with(ResponseTemplate::new(304))
        .mount(&server)
        .await;

    let client = build_http_client(&test_config()).unwrap();
    let token = ConditionalToken::ETag("\"abc123\"".to_string());
    assert_eq!(
        fetch_target(&client, &uri(&server, "/g/thread/1.json"), Some(&token)).await,
        FetchOutcome::NotModified
    );
}

#[tokio::test]
async fn test_registry_reacts_to_each_outcome() {
    let server = MockServer::start().await;
    respond(&server, "/g/thread/1.json", ResponseTemplate::new(404)).await;
    respond(&server, "/g/thread/2.json", ResponseTemplate::new(403)).await;
    respond(&server, "/g/thread/3.json", ResponseTemplate::new(502)).await;
    respond(
        &server,
        "/g/thread/4.json",
        ResponseTemplate::new(200).set_body_json(thread(Vec::new())),
    )
    .await;

    let config = test_config();
    let client = build_http_client(&config).unwrap();
    let mut poller = Poller::new(&config, mock_site(&server), client, Vec::new(), true);
    let targets: Vec<String> = (1..=4).map(|no| format!("/g/{}", no)).collect();
    poller.register_targets(&targets).unwrap();

    let report = poller.run_cycle(&CancellationToken::new()).await;
    assert_eq!(report.fetched, 4);
    assert_eq!(report.dropped, 2);
    assert_eq!(report.transient, 1);
    assert_eq!(report.successes, 1);

    let remaining: Vec<_> = poller.registry().iter().map(|t| t.label()).collect();
    assert_eq!(remaining, vec!["/g/3", "/g/4"]);
    let failing = poller.registry().iter().find(|t| t.label() == "/g/3").unwrap();
    assert_eq!(failing.consecutive_failures, 1);
}

#[tokio::test]
async fn test_retry_cap_drops_failing_target() {
    let server = MockServer::start().await;
    respond(&server, "/g/thread/3.json", ResponseTemplate::new(500)).await;

    let mut config = test_config();
    config.poller.max_transient_failures = 2;
    let client = build_http_client(&config).unwrap();
    let mut poller = Poller::new(&config, mock_site(&server), client, Vec::new(), true);
    poller.register_targets(&["/g/3".to_string()]).unwrap();
    let cancel = CancellationToken::new();

    assert_eq!(poller.run_cycle(&cancel).await.transient, 1);
    assert_eq!(poller.run_cycle(&cancel).await.dropped, 1);
    assert!(poller.registry().is_empty());
    assert_eq!(poller.stats().dropped_targets, 1);
}

#[tokio::test]
async fn test_cycle_deadline_turns_slow_fetches_transient() {
    let server = MockServer::start().await;
    respond(
        &server,
        "/g/thread/1.json",
        ResponseTemplate::new(200)
            .set_delay(std::time::Duration::from_secs(5))
            .set_body_json(thread(Vec::new())),
    )
    .await;

    let mut config = test_config();
    config.poller.cycle_timeout = Some(1);
    let client = build_http_client(&config).unwrap();
    let mut poller = Poller::new(&config, mock_site(&server), client, Vec::new(), true);
    poller.register_targets(&["/g/1".to_string()]).unwrap();

    let report = poller.run_cycle(&CancellationToken::new()).await;
    assert_eq!(report.transient, 1);
    assert_eq!(poller.registry().len(), 1);
}
