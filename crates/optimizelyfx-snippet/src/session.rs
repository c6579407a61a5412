// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Identity and attributes of the visitor currently being tracked.
//!
//! Attributes are scoped to one identity: switching to a different identity drops them all,
//! while re-asserting the current identity keeps them. Only attributes the datafile knows about
//! are ever stored.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::datafile::Datafile;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    /// Datafile id of the attribute.
    pub id: String,
    /// Attribute key as pushed by the caller.
    pub name: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityChange {
    Unchanged,
    Changed { previous: Option<String> },
}

/// Outcome of filtering a batch of attributes against the datafile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeAssignment {
    pub applied: Vec<Attribute>,
    /// Keys absent from the datafile, in the order they were offered.
    pub rejected: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    identity: Option<String>,
    attributes: Vec<Attribute>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Switches to `identity`, clearing attributes only when it differs from the current one.
    pub fn set_identity(&mut self, identity: String) -> IdentityChange {
        if self.identity.as_deref() == Some(identity.as_str()) {
            return IdentityChange::Unchanged;
        }
        let previous = self.identity.replace(identity);
        self.attributes.clear();
        IdentityChange::Changed { previous }
    }

    /// Starts a fresh session for `identity`, dropping attributes unconditionally.
    pub fn reset(&mut self, identity: String) {
        self.identity = Some(identity);
        self.attributes.clear();
    }

    /// Stores every attribute the datafile defines and reports the others.
    ///
    /// An attribute already present under the same name keeps its position and gets the new
    /// value.
    pub fn assign_attributes(
        &mut self,
        datafile: &Datafile,
        attributes: &Map<String, Value>,
    ) -> AttributeAssignment {
        let mut assignment = AttributeAssignment::default();
        for (key, value) in attributes {
            let Some(definition) = datafile.attribute(key) else {
                assignment.rejected.push(key.clone());
                continue;
            };
            let attribute = Attribute {
                id: definition.id.clone(),
                name: key.clone(),
                value: value.clone(),
            };
            match self.attributes.iter_mut().find(|a| a.name == *key) {
                Some(existing) => *existing = attribute.clone(),
                None => self.attributes.push(attribute.clone()),
            }
            assignment.applied.push(attribute);
        }
        assignment
    }
}
