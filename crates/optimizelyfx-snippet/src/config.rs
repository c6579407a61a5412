// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::dispatcher::DEFAULT_EVENTS_URL;
use crate::error::SnippetError;
use crate::fetcher::DEFAULT_DATAFILE_BASE_URL;
use crate::http::HttpOptions;
use crate::log_level::LogLevel;

pub const LOG_LEVEL_ENV: &str = "OPTIMIZELYFX_LOG";
pub const DATAFILE_BASE_URL_ENV: &str = "OPTIMIZELYFX_DATAFILE_BASE_URL";
pub const EVENTS_URL_ENV: &str = "OPTIMIZELYFX_EVENTS_URL";
pub const FETCH_TIMEOUT_ENV: &str = "OPTIMIZELYFX_FETCH_TIMEOUT_MS";
pub const PROXY_HTTPS_ENV: &str = "OPTIMIZELYFX_PROXY_HTTPS";

/// Startup configuration of the snippet.
#[derive(Debug, Clone, PartialEq)]
pub struct SnippetConfig {
    /// Initial log threshold; `none` keeps the snippet silent.
    pub log_level: LogLevel,
    /// Prefix of `<base>/<sdkKey>.json` datafile URLs
    pub datafile_base_url: String,
    /// Endpoint event batches are posted to
    pub events_url: String,
    /// Optional bound on every HTTP request
    pub fetch_timeout: Option<Duration>,
    /// HTTPS proxy URL
    pub https_proxy: Option<String>,
}

impl Default for SnippetConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::None,
            datafile_base_url: DEFAULT_DATAFILE_BASE_URL.to_string(),
            events_url: DEFAULT_EVENTS_URL.to_string(),
            fetch_timeout: None,
            https_proxy: None,
        }
    }
}

impl SnippetConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, SnippetError> {
        Self::from_env_iter(env::vars())
    }

    /// Create configuration from `(name, value)` pairs shaped like the process environment.
    pub fn from_env_iter<I, K, V>(vars: I) -> Result<Self, SnippetError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let defaults = Self::default();

        let log_level = match vars.get(LOG_LEVEL_ENV) {
            Some(level) => LogLevel::from_str(level).map_err(SnippetError::InvalidConfig)?,
            None => defaults.log_level,
        };
        let datafile_base_url = vars
            .get(DATAFILE_BASE_URL_ENV)
            .cloned()
            .unwrap_or(defaults.datafile_base_url);
        let events_url = vars
            .get(EVENTS_URL_ENV)
            .cloned()
            .unwrap_or(defaults.events_url);
        let fetch_timeout = match vars.get(FETCH_TIMEOUT_ENV) {
            Some(ms) => Some(Duration::from_millis(ms.trim().parse::<u64>().map_err(|_| {
                SnippetError::InvalidConfig(format!(
                    "{FETCH_TIMEOUT_ENV} must be a whole number of milliseconds, got '{ms}'"
                ))
            })?)),
            None => None,
        };
        let https_proxy = vars
            .get(PROXY_HTTPS_ENV)
            .or_else(|| vars.get("HTTPS_PROXY"))
            .cloned();

        let config = Self {
            log_level,
            datafile_base_url,
            events_url,
            fetch_timeout,
            https_proxy,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), SnippetError> {
        validate_http_url(DATAFILE_BASE_URL_ENV, &self.datafile_base_url)?;
        validate_http_url(EVENTS_URL_ENV, &self.events_url)?;

        if self.fetch_timeout == Some(Duration::ZERO) {
            return Err(SnippetError::InvalidConfig(format!(
                "{FETCH_TIMEOUT_ENV} must be greater than 0"
            )));
        }

        if let Some(proxy) = &self.https_proxy {
            if proxy.trim().is_empty() {
                return Err(SnippetError::InvalidConfig(
                    "HTTPS proxy cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }

    pub fn http_options(&self) -> HttpOptions {
        HttpOptions {
            https_proxy: self.https_proxy.clone(),
            timeout: self.fetch_timeout,
        }
    }
}

fn validate_http_url(name: &str, url: &str) -> Result<(), SnippetError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(SnippetError::InvalidConfig(format!("{name} cannot be empty")));
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(SnippetError::InvalidConfig(format!(
            "{name} must be an http(s) URL, got '{url}'"
        )));
    }
    Ok(())
}
