#![allow(clippy::unwrap_used, clippy::float_cmp)]
// Integration tests for `ChartClient` using wiremock.

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use chartdeck_api::{ChartClient, Error, ErrorKind, TransferProgress};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ChartClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = ChartClient::with_client(reqwest::Client::new(), base_url, Duration::from_secs(5));
    (server, client)
}

fn archive(len: usize) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".zip").tempfile().unwrap();
    file.write_all(&vec![0x5a; len]).unwrap();
    file.flush().unwrap();
    file
}

// ── Envelope / taxonomy ─────────────────────────────────────────────

#[tokio::test]
async fn test_ready_parses_flag() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/settings/ready"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "OK", "ready": true})))
        .mount(&server)
        .await;

    assert!(client.ready().await.unwrap());
}

#[tokio::test]
async fn test_non_ok_status_is_application_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/settings/restart"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "ERROR", "info": "still initializing"})),
        )
        .mount(&server)
        .await;

    let err = client.restart().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Application);
    assert_eq!(err.to_string(), "still initializing");
}

#[tokio::test]
async fn test_http_failure_is_server_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/status/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = client.status().await;
    assert!(
        matches!(result, Err(Error::Server { status: 500, .. })),
        "expected Server error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_unreachable_host_is_transport_error() {
    let client = ChartClient::with_client(
        reqwest::Client::new(),
        Url::parse("http://127.0.0.1:1/").unwrap(),
        Duration::from_secs(2),
    );
    let err = client.ready().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn test_field_catalog_skips_envelope_check() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/settings.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "important": [
                {"name": "S52_DEPTH_UNIT_SHOW", "title": "Depth Unit", "type": "enum",
                 "values": "0,1,2", "choices": "feet,meters,fathoms", "default": "1", "group": "Depth"}
            ],
            "detail": [
                {"name": "S52_MAR_SAFETY_CONTOUR", "type": "depth", "min": 0, "max": 100, "default": 3}
            ]
        })))
        .mount(&server)
        .await;

    let catalog = client.field_catalog().await.unwrap();
    assert_eq!(catalog.important.len(), 1);
    assert_eq!(catalog.important[0].default, Some(1.0));
    assert_eq!(catalog.find("S52_MAR_SAFETY_CONTOUR").unwrap().max, Some(100.0));
}

// ── Settings ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_settings_reads_data_map() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/settings/get"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "data": {"scale.min": 5, "S52_DEPTH_UNIT_SHOW": 1, "ratio": 0.75}
        })))
        .mount(&server)
        .await;

    let values = client.settings().await.unwrap();
    assert_eq!(values.len(), 3);
    assert_eq!(values["ratio"], 0.75);
}

#[tokio::test]
async fn test_update_settings_posts_form_and_reads_string_flag() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/settings/set"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("scale.min=10"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"status": "OK", "hasChanged": "true"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let changes = BTreeMap::from([("scale.min".to_owned(), 10.0)]);
    assert!(client.update_settings(&changes).await.unwrap());
}

#[tokio::test]
async fn test_enable_chart_set_sends_query() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/settings/enable"))
        .and(query_param("chartSet", "osm 1"))
        .and(query_param("enable", "1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"status": "OK", "changed": "false"})),
        )
        .mount(&server)
        .await;

    assert!(!client.enable_chart_set("osm 1", true).await.unwrap());
}

#[tokio::test]
async fn test_fingerprint_two_step() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/settings/createfingerprint"))
        .and(query_param("forDongle", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "OK", "fileName": "fpr-dongle.xml"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/settings/loadfingerprint"))
        .and(query_param("fileName", "fpr-dongle.xml"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"status": "OK", "data": "aGVsbG8="})),
        )
        .mount(&server)
        .await;

    let name = client.create_fingerprint(true).await.unwrap();
    assert_eq!(name, "fpr-dongle.xml");
    assert_eq!(client.load_fingerprint(&name).await.unwrap(), "aGVsbG8=");
}

#[tokio::test]
async fn test_fingerprint_without_file_name_fails() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/settings/createfingerprint"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "OK"})))
        .mount(&server)
        .await;

    let err = client.create_fingerprint(false).await.unwrap_err();
    assert_eq!(err.to_string(), "no fileName returned");
}

// ── Charts ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_status_tree() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/status/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "data": {
                "chartManager": {
                    "state": "READY", "numRead": 10, "numCandidates": 12,
                    "openCharts": 3, "memoryKb": 2048,
                    "chartSets": [
                        {"info": {"name": "a", "title": "Set A", "version": "1"},
                         "status": "READY", "active": true, "canDelete": true, "disabledBy": ""}
                    ],
                    "cacheFiller": {"prefilling": false, "started": true, "paused": false}
                },
                "plugins": {"loadedPlugins": [{"name": "oesenc", "version": "1.2", "state": "OK"}]}
            }
        })))
        .mount(&server)
        .await;

    let status = client.status().await.unwrap();
    assert_eq!(status.chart_manager.num_read, 10);
    assert_eq!(status.chart_manager.chart_sets.len(), 1);
    assert_eq!(
        status.chart_manager.cache_filler.unwrap().display_state(),
        "READY"
    );
    assert_eq!(status.plugins.loaded_plugins[0].name, "oesenc");
}

#[tokio::test]
async fn test_delete_chart_set_posts_form() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/upload/deleteset"))
        .and(body_string("chartSet=set-a"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"status": "OK", "chartSet": "set-a"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(client.delete_chart_set("set-a").await.unwrap(), "set-a");
}

// ── Upload ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_upload_streams_raw_body_with_progress() {
    let (server, client) = setup().await;
    let file = archive(200_000);

    Mock::given(method("POST"))
        .and(path("/upload/uploadzip"))
        .and(header("content-type", "application/octet-stream"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"status": "OK", "chartSet": "new-set"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let seen: Arc<Mutex<Vec<TransferProgress>>> = Arc::default();
    let sink = Arc::clone(&seen);
    let receipt = client
        .upload_archive(
            file.path(),
            move |p| sink.lock().unwrap().push(p),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(receipt.chart_set.as_deref(), Some("new-set"));
    let seen = seen.lock().unwrap();
    assert!(seen.windows(2).all(|w| w[0].loaded <= w[1].loaded));
    let last = seen.last().unwrap();
    assert_eq!(last.loaded, 200_000);
    assert_eq!(last.total, Some(200_000));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].body.len(), 200_000);
}

#[tokio::test]
async fn test_upload_application_error() {
    let (server, client) = setup().await;
    let file = archive(16);

    Mock::given(method("POST"))
        .and(path("/upload/uploadzip"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "ERROR", "info": "did not find any known chart file"})),
        )
        .mount(&server)
        .await;

    let err = client
        .upload_archive(file.path(), |_| {}, CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Application);
}

#[tokio::test]
async fn test_upload_cancelled_before_response() {
    let (server, client) = setup().await;
    let file = archive(1024);

    Mock::given(method("POST"))
        .and(path("/upload/uploadzip"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "OK"}))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let err = client
        .upload_archive(file.path(), |_| {}, cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UserCancelled));
}
