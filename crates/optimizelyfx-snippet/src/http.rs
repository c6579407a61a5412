// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use reqwest::{Client, ClientBuilder, Proxy};

const USER_AGENT: &str = concat!("optimizelyfx-snippet/", env!("CARGO_PKG_VERSION"));

/// Options shared by the datafile fetcher and the event dispatcher.
#[derive(Debug, Clone, Default)]
pub struct HttpOptions {
    /// HTTPS proxy applied to every request.
    pub https_proxy: Option<String>,
    /// Request timeout. `None` leaves requests unbounded.
    pub timeout: Option<Duration>,
}

/// Creates a reqwest client builder using rustls with the configured proxy and timeout.
pub fn create_reqwest_client_builder(options: &HttpOptions) -> Result<ClientBuilder, reqwest::Error> {
    let mut builder = Client::builder().use_rustls_tls().user_agent(USER_AGENT);
    if let Some(proxy) = &options.https_proxy {
        builder = builder.proxy(Proxy::https(proxy)?);
    }
    if let Some(timeout) = options.timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder)
}

pub fn create_reqwest_client(options: &HttpOptions) -> Result<Client, reqwest::Error> {
    create_reqwest_client_builder(options)?.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_build() {
        assert!(create_reqwest_client(&HttpOptions::default()).is_ok());
    }

    #[test]
    fn test_proxy_and_timeout_build() {
        let options = HttpOptions {
            https_proxy: Some("http://127.0.0.1:3128".to_string()),
            timeout: Some(Duration::from_secs(2)),
        };
        assert!(create_reqwest_client(&options).is_ok());
    }
}
