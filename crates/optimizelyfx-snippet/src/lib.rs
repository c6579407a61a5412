// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! OptimizelyFX event snippet.
//!
//! Callers push JSON commands (`init`, `event`, `user`, `log`) at any time, including before the
//! datafile is known. A single worker applies them in push order: `init` loads the datafile
//! (and optionally keeps polling it), `user` switches the visitor and its attributes, and
//! `event` turns a known event key into a conversion batch posted to the events endpoint.
//!
//! ```no_run
//! use optimizelyfx_snippet::{logger, start, SnippetConfig};
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), optimizelyfx_snippet::SnippetError> {
//! let config = SnippetConfig::from_env()?;
//! let log_level = logger::init(config.log_level)?;
//! let (handle, _worker) = start(&config, log_level)?;
//!
//! handle.push(json!({"type": "event", "eventName": "purchase"}));
//! handle.push(json!({"type": "init", "userId": "u1", "sdkKey": "K"}));
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::debug;

pub mod command;
pub mod config;
pub mod datafile;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod fetcher;
pub mod http;
pub mod interpreter;
pub mod log_level;
pub mod logger;
pub mod poller;
pub mod queue;
pub mod session;

pub use command::{Command, CommandError, CommandKind};
pub use config::SnippetConfig;
pub use datafile::{Datafile, DatafileStore};
pub use dispatcher::{EventDispatcher, HttpEventDispatcher};
pub use error::SnippetError;
pub use event::{ClientInfo, EventBatch};
pub use fetcher::{DatafileClient, DatafileError, DatafileSource};
pub use interpreter::{Interpreter, Lifecycle};
pub use log_level::LogLevel;
pub use logger::LogLevelHandle;
pub use queue::{CommandQueue, SessionSnapshot, SnippetHandle};

/// Starts the command queue on the current runtime, posting events over HTTP.
pub fn start(
    config: &SnippetConfig,
    log_level: LogLevelHandle,
) -> Result<(SnippetHandle, JoinHandle<()>), SnippetError> {
    let dispatcher = HttpEventDispatcher::new(config.events_url.clone(), &config.http_options())
        .map_err(|e| SnippetError::InvalidConfig(e.to_string()))?;
    start_with_dispatcher(config, Arc::new(dispatcher), log_level)
}

/// Starts the command queue on the current runtime with a caller-provided event sink.
pub fn start_with_dispatcher(
    config: &SnippetConfig,
    dispatcher: Arc<dyn EventDispatcher>,
    log_level: LogLevelHandle,
) -> Result<(SnippetHandle, JoinHandle<()>), SnippetError> {
    config.validate()?;
    let fetcher = DatafileClient::new(config.datafile_base_url.clone(), &config.http_options())?;
    let interpreter = Interpreter::new(Arc::new(fetcher), dispatcher, log_level);
    let (queue, handle) = CommandQueue::new(interpreter);

    debug!(
        datafile_base_url = %config.datafile_base_url,
        events_url = %config.events_url,
        "Starting OptimizelyFX snippet"
    );
    let worker = tokio::spawn(queue.run());
    Ok((handle, worker))
}
