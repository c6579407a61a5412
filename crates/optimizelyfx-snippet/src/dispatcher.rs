// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Event dispatch.
//!
//! Dispatching is fire-and-forget: the queue hands a batch over and moves on to the next
//! command. Delivery failures are logged and the batch is dropped.

use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, error};

use crate::event::EventBatch;
use crate::http::{create_reqwest_client, HttpOptions};

pub const DEFAULT_EVENTS_URL: &str = "https://logx.optimizely.com/v1/events";

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{status}: Failed to send event batch: {body}")]
    Destination { status: StatusCode, body: String },
    #[error("Error sending event batch: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("No async runtime available to send event batch")]
    NoRuntime,
    #[error("failed to build the HTTP client: {0}")]
    ClientBuild(String),
}

/// Sink for finished event batches.
pub trait EventDispatcher: Send + Sync {
    /// Hands `batch` off for delivery without waiting for the outcome.
    fn dispatch(&self, batch: EventBatch);
}

/// Posts event batches as JSON to the events endpoint.
#[derive(Debug, Clone)]
pub struct HttpEventDispatcher {
    client: Client,
    endpoint: String,
}

impl HttpEventDispatcher {
    pub fn new(endpoint: impl Into<String>, options: &HttpOptions) -> Result<Self, DispatchError> {
        let client =
            create_reqwest_client(options).map_err(|e| DispatchError::ClientBuild(e.to_string()))?;
        Ok(Self::with_client(client, endpoint))
    }

    pub fn with_client(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Sends `batch` and waits for the response.
    pub async fn send(&self, batch: &EventBatch) -> Result<(), DispatchError> {
        let response = self.client.post(&self.endpoint).json(batch).send().await?;
        let status = response.status();
        if status.is_success() {
            debug!(%status, "Event batch accepted");
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(DispatchError::Destination { status, body })
    }
}

impl EventDispatcher for HttpEventDispatcher {
    fn dispatch(&self, batch: EventBatch) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            error!("{}", DispatchError::NoRuntime);
            return;
        };
        let dispatcher = self.clone();
        runtime.spawn(async move {
            if let Err(e) = dispatcher.send(&batch).await {
                error!("{e}");
            }
        });
    }
}
