// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Datafile fetcher.
//!
//! Issues a single `GET` per call and classifies the outcome. Retrying is the caller's
//! business: the interpreter gives up on a failed initialization and the poller waits for its
//! next tick.

use std::fmt;

use reqwest::Client;
use thiserror::Error;
use tracing::debug;

use crate::datafile::Datafile;
use crate::http::{create_reqwest_client, HttpOptions};

/// Default CDN prefix a datafile URL is derived from when only a key is given.
pub const DEFAULT_DATAFILE_BASE_URL: &str = "https://cdn.optimizely.com/datafiles";

#[derive(Debug, Error)]
pub enum DatafileError {
    /// Neither an SDK key nor a datafile URL was supplied.
    #[error("no datafile source: provide either an sdkKey or a datafileUrl")]
    MissingSource,
    /// Both an SDK key and a datafile URL were supplied.
    #[error("ambiguous datafile source: provide only one of sdkKey or datafileUrl")]
    AmbiguousSource,
    /// The CDN answered with a non-success status.
    #[error("failed to fetch the datafile. Status: {status}")]
    Status { status: u16 },
    /// DNS, TLS, socket or timeout failure.
    #[error("transport error while fetching the datafile: {0}")]
    Transport(#[from] reqwest::Error),
    /// The body was not a datafile document.
    #[error("failed to parse the datafile: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to build the HTTP client: {0}")]
    ClientBuild(String),
}

/// Where a datafile comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatafileSource {
    SdkKey(String),
    Url(String),
}

impl DatafileSource {
    /// Builds a source from the optional `sdkKey`/`datafileUrl` pair of an `init` command.
    ///
    /// Exactly one of them must be present; empty strings count as absent.
    pub fn from_parts(
        sdk_key: Option<String>,
        datafile_url: Option<String>,
    ) -> Result<Self, DatafileError> {
        let sdk_key = sdk_key.filter(|key| !key.trim().is_empty());
        let datafile_url = datafile_url.filter(|url| !url.trim().is_empty());
        match (sdk_key, datafile_url) {
            (Some(key), None) => Ok(Self::SdkKey(key)),
            (None, Some(url)) => Ok(Self::Url(url)),
            (None, None) => Err(DatafileError::MissingSource),
            (Some(_), Some(_)) => Err(DatafileError::AmbiguousSource),
        }
    }
}

impl fmt::Display for DatafileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SdkKey(key) => write!(f, "sdk key {key}"),
            Self::Url(url) => write!(f, "{url}"),
        }
    }
}

/// HTTP client retrieving datafiles from the CDN or an explicit URL.
#[derive(Debug, Clone)]
pub struct DatafileClient {
    client: Client,
    base_url: String,
}

impl DatafileClient {
    pub fn new(base_url: impl Into<String>, options: &HttpOptions) -> Result<Self, DatafileError> {
        let client =
            create_reqwest_client(options).map_err(|e| DatafileError::ClientBuild(e.to_string()))?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Address a source resolves to: `<base>/<key>.json` for keys, the URL itself otherwise.
    pub fn url_for(&self, source: &DatafileSource) -> String {
        match source {
            DatafileSource::SdkKey(key) => {
                format!("{}/{}.json", self.base_url.trim_end_matches('/'), key)
            }
            DatafileSource::Url(url) => url.clone(),
        }
    }

    pub async fn fetch(&self, source: &DatafileSource) -> Result<Datafile, DatafileError> {
        let url = self.url_for(source);
        debug!(url = %url, "Fetching datafile");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DatafileError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        let datafile: Datafile = serde_json::from_slice(&body)?;
        debug!(
            url = %url,
            revision = %datafile.revision,
            "Datafile fetched successfully"
        );
        Ok(datafile)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use mockito::Server;

    const DATAFILE_BODY: &str = r#"{
        "accountId": "10001",
        "projectId": "20002",
        "revision": "1",
        "attributes": [{"id": "a1", "key": "plan"}],
        "events": [{"id": "e1", "key": "purchase"}],
        "botFiltering": false
    }"#;

    fn client_for(server: &Server) -> DatafileClient {
        DatafileClient::new(format!("{}/datafiles", server.url()), &HttpOptions::default())
            .unwrap()
    }

    #[test]
    fn test_source_requires_exactly_one() {
        assert_eq!(
            DatafileSource::from_parts(Some("K".into()), None).unwrap(),
            DatafileSource::SdkKey("K".into())
        );
        assert_eq!(
            DatafileSource::from_parts(None, Some("https://x/d.json".into())).unwrap(),
            DatafileSource::Url("https://x/d.json".into())
        );
        assert!(matches!(
            DatafileSource::from_parts(None, None),
            Err(DatafileError::MissingSource)
        ));
        assert!(matches!(
            DatafileSource::from_parts(Some(" ".into()), Some(String::new())),
            Err(DatafileError::MissingSource)
        ));
        assert!(matches!(
            DatafileSource::from_parts(Some("K".into()), Some("https://x".into())),
            Err(DatafileError::AmbiguousSource)
        ));
    }

    #[test]
    fn test_url_for_key_is_deterministic() {
        let client = DatafileClient::new("https://cdn.example.com/datafiles/", &HttpOptions::default())
            .unwrap();
        let source = DatafileSource::SdkKey("P4LP7jhFhkrY3zJ3WzT3j".into());
        assert_eq!(
            client.url_for(&source),
            "https://cdn.example.com/datafiles/P4LP7jhFhkrY3zJ3WzT3j.json"
        );
        assert_eq!(client.url_for(&source), client.url_for(&source));
        assert_eq!(
            client.url_for(&DatafileSource::Url("https://other/d.json".into())),
            "https://other/d.json"
        );
    }

    #[tokio::test]
    async fn test_fetch_by_key() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/datafiles/K.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(DATAFILE_BODY)
            .create_async()
            .await;

        let datafile = client_for(&server)
            .fetch(&DatafileSource::SdkKey("K".into()))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(datafile.revision, "1");
        assert_eq!(datafile.account_id, "10001");
        assert_eq!(datafile.event("purchase").unwrap().id, "e1");
    }

    #[tokio::test]
    async fn test_fetch_by_url() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/custom/location.json")
            .with_status(200)
            .with_body(DATAFILE_BODY)
            .create_async()
            .await;

        let url = format!("{}/custom/location.json", server.url());
        let datafile = client_for(&server)
            .fetch(&DatafileSource::Url(url))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(datafile.project_id, "20002");
    }

    #[tokio::test]
    async fn test_fetch_non_success_status() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/datafiles/K.json")
            .with_status(403)
            .expect(1)
            .create_async()
            .await;

        let result = client_for(&server)
            .fetch(&DatafileSource::SdkKey("K".into()))
            .await;

        // One request, no internal retry.
        mock.assert_async().await;
        assert!(matches!(result, Err(DatafileError::Status { status: 403 })));
    }

    #[tokio::test]
    async fn test_fetch_malformed_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/datafiles/K.json")
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let result = client_for(&server)
            .fetch(&DatafileSource::SdkKey("K".into()))
            .await;

        assert!(matches!(result, Err(DatafileError::Parse(_))));
    }
}
