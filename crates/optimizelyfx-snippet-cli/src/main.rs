// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::process::ExitCode;

use tokio::io::{stdin, AsyncBufReadExt, BufReader};
use tracing::{debug, error, info};

use optimizelyfx_snippet::{logger, start, LogLevel, SnippetConfig};

/// Reads one JSON command per stdin line and feeds it to the snippet.
#[tokio::main]
pub async fn main() -> ExitCode {
    let config = match SnippetConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            if logger::init(LogLevel::Error).is_ok() {
                error!("Error creating config on snippet startup: {e}");
            }
            return ExitCode::FAILURE;
        }
    };

    let log_level = match logger::init(config.log_level) {
        Ok(handle) => handle,
        Err(_) => return ExitCode::FAILURE,
    };
    debug!("Logging subsystem enabled");

    let (handle, worker) = match start(&config, log_level) {
        Ok(started) => started,
        Err(e) => {
            error!("Error starting snippet: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut lines = BufReader::new(stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str(line) {
                    Ok(value) => handle.push(value),
                    Err(e) => error!("Skipping line that is not JSON: {e}"),
                }
            }
            Ok(None) => break,
            Err(e) => {
                error!("Failed to read stdin: {e}");
                break;
            }
        }
    }
    debug!("Input closed, waiting for queued commands");

    let polling = match handle.snapshot().await {
        Ok(snapshot) => snapshot.polling,
        Err(e) => {
            error!("{e}");
            false
        }
    };
    if polling {
        info!("Datafile polling active, press Ctrl-C to stop");
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {e}");
        }
    }

    if let Err(e) = handle.shutdown() {
        error!("{e}");
    }
    if let Err(e) = worker.await {
        error!("Snippet worker failed: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
