// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Helper functions for integration tests

use std::future::Future;
use std::time::Duration;

use mockito::{Mock, ServerGuard};
use optimizelyfx_snippet::SnippetConfig;
use serde_json::{json, Value};

pub const SDK_KEY: &str = "K";

/// Datafile document with one `plan` attribute and one `purchase` event.
pub fn datafile_json(revision: &str) -> Value {
    json!({
        "accountId": "10001",
        "projectId": "20002",
        "revision": revision,
        "attributes": [{"key": "plan", "id": "a1"}],
        "events": [{"key": "purchase", "id": "e1"}],
        "botFiltering": false,
        "experiments": []
    })
}

/// Serves `datafile_json(revision)` for [`SDK_KEY`].
pub async fn mock_datafile(server: &mut ServerGuard, revision: &str) -> Mock {
    server
        .mock("GET", format!("/datafiles/{SDK_KEY}.json").as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(datafile_json(revision).to_string())
        .create_async()
        .await
}

/// Configuration pointing both endpoints at `server`.
pub fn config_for(server: &ServerGuard) -> SnippetConfig {
    SnippetConfig {
        datafile_base_url: format!("{}/datafiles", server.url()),
        events_url: format!("{}/v1/events", server.url()),
        fetch_timeout: Some(Duration::from_secs(5)),
        ..SnippetConfig::default()
    }
}

pub fn init_command() -> Value {
    json!({"type": "init", "userId": "u1", "sdkKey": SDK_KEY})
}

/// Polls `condition` every 50ms until it holds or `timeout` elapses.
pub async fn wait_until<F, Fut>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    condition().await
}
