// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Datafile model and the shared snapshot slot it lives in.
//!
//! A [`Datafile`] is never mutated after it is parsed. The [`DatafileStore`] holds the current
//! snapshot behind an `Arc`, so readers keep whichever snapshot they loaded even if the poller
//! swaps in a new revision while they work.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Attribute known to the project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    pub id: String,
    pub key: String,
}

/// Conversion event known to the project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDefinition {
    pub id: String,
    pub key: String,
}

/// Subset of the project datafile the snippet needs. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Datafile {
    pub account_id: String,
    pub project_id: String,
    pub revision: String,
    #[serde(default)]
    pub attributes: Vec<AttributeDefinition>,
    #[serde(default)]
    pub events: Vec<EventDefinition>,
    #[serde(default)]
    pub bot_filtering: bool,
}

impl Datafile {
    pub fn event(&self, key: &str) -> Option<&EventDefinition> {
        self.events.iter().find(|event| event.key == key)
    }

    pub fn attribute(&self, key: &str) -> Option<&AttributeDefinition> {
        self.attributes.iter().find(|attribute| attribute.key == key)
    }
}

/// Result of offering a freshly fetched datafile to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOutcome {
    /// The candidate became the current snapshot.
    Replaced { previous: Option<String> },
    /// The candidate carried the revision already stored and was dropped.
    Unchanged,
}

/// Process-wide slot holding the current datafile snapshot.
#[derive(Debug, Clone, Default)]
pub struct DatafileStore {
    current: Arc<RwLock<Option<Arc<Datafile>>>>,
}

impl DatafileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot in effect right now, if any datafile was ever loaded.
    pub async fn current(&self) -> Option<Arc<Datafile>> {
        self.current.read().await.clone()
    }

    /// Unconditionally installs `datafile`.
    pub async fn store(&self, datafile: Arc<Datafile>) {
        *self.current.write().await = Some(datafile);
    }

    /// Installs `candidate` only when its revision differs from the stored one.
    ///
    /// The comparison and the swap happen under the same write guard.
    pub async fn replace_if_changed(&self, candidate: Datafile) -> StoreOutcome {
        let mut guard = self.current.write().await;
        match guard.as_ref() {
            Some(existing) if existing.revision == candidate.revision => StoreOutcome::Unchanged,
            existing => {
                let previous = existing.map(|datafile| datafile.revision.clone());
                *guard = Some(Arc::new(candidate));
                StoreOutcome::Replaced { previous }
            }
        }
    }
}
