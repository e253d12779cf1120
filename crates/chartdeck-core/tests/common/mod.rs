// Shared fixtures for the view integration tests.
#![allow(dead_code, clippy::unwrap_used)]

use std::time::Duration;

use chartdeck_core::{ChartClient, ConsoleConfig, DialogEntry, DialogSlot};
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub async fn setup() -> (MockServer, ChartClient, ConsoleConfig) {
    let server = MockServer::start().await;
    let config = ConsoleConfig::new(Url::parse(&server.uri()).unwrap());
    let client = config.build_client().unwrap();
    (server, client, config)
}

pub fn ok(body: Value) -> ResponseTemplate {
    let mut envelope = json!({"status": "OK"});
    if let (Some(target), Some(extra)) = (envelope.as_object_mut(), body.as_object()) {
        target.extend(extra.clone());
    }
    ResponseTemplate::new(200).set_body_json(envelope)
}

pub async fn mount_ready(server: &MockServer, ready: bool) {
    Mock::given(method("GET"))
        .and(path("/settings/ready"))
        .respond_with(ok(json!({"ready": ready})))
        .mount(server)
        .await;
}

pub fn status_body(sets: Value) -> Value {
    json!({
        "data": {
            "chartManager": {"state": "READY", "chartSets": sets},
            "plugins": {"loadedPlugins": []}
        }
    })
}

pub fn chart_set(name: &str, active: bool, status: &str, disabled_by: &str) -> Value {
    json!({
        "info": {"name": name, "title": format!("Set {name}"), "version": "2"},
        "status": status,
        "active": active,
        "canDelete": true,
        "disabledBy": disabled_by,
    })
}

/// Wait (bounded) until the slot shows a dialog matching `pred`.
pub async fn wait_for_dialog(
    slot: &DialogSlot,
    pred: impl Fn(&DialogEntry) -> bool,
) -> DialogEntry {
    let mut stream = slot.subscribe();
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Some(entry) = stream.latest() {
                if pred(&entry) {
                    return entry;
                }
            }
            stream.changed().await.unwrap();
        }
    })
    .await
    .unwrap()
}
