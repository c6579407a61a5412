// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Event batch posted to the events endpoint for one tracked conversion.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::datafile::{Datafile, EventDefinition};
use crate::session::Attribute;

pub const CLIENT_NAME: &str = "OptimizelyFX Event Snippet";
pub const CLIENT_VERSION: &str = "1.0.0";
/// Reserved attribute carrying the datafile bot-filtering flag.
pub const BOT_FILTERING_ATTRIBUTE: &str = "$opt_bot_filtering";

const CUSTOM_ATTRIBUTE_TYPE: &str = "custom";
const SESSION_ID: &str = "AUTO";
const EVENT_TYPE_OTHER: &str = "other";

/// Name and version reported as the sending client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self {
            name: CLIENT_NAME.to_string(),
            version: CLIENT_VERSION.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventBatch {
    pub account_id: String,
    pub anonymize_ip: bool,
    pub client_name: String,
    pub client_version: String,
    pub enrich_decisions: bool,
    pub project_id: String,
    pub revision: String,
    pub visitors: Vec<Visitor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visitor {
    pub visitor_id: String,
    pub session_id: String,
    pub attributes: Vec<VisitorAttribute>,
    pub snapshots: Vec<Snapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitorAttribute {
    /// Attribute id.
    pub e: String,
    /// Attribute key.
    pub k: String,
    /// Attribute type, always `custom`.
    pub t: String,
    pub v: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "activationTimestamp")]
    pub activation_timestamp: u64,
    pub decisions: Vec<Value>,
    pub events: Vec<SnapshotEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEvent {
    /// Event id.
    pub e: String,
    /// Event key.
    pub k: String,
    /// Unique id of this occurrence.
    pub u: String,
    /// Timestamp in milliseconds since the epoch.
    pub t: u64,
    /// Tags.
    pub a: Map<String, Value>,
    /// Properties.
    pub p: Map<String, Value>,
    /// Event type.
    pub y: String,
}

/// Everything about a conversion that comes from the session and the datafile.
#[derive(Debug, Clone, Copy)]
pub struct Conversion<'a> {
    pub datafile: &'a Datafile,
    pub event: &'a EventDefinition,
    pub visitor_id: &'a str,
    pub attributes: &'a [Attribute],
    pub tags: &'a Map<String, Value>,
    pub properties: &'a Map<String, Value>,
}

impl EventBatch {
    /// Builds the single-visitor, single-event batch for `conversion`.
    ///
    /// `timestamp_ms` stamps both the snapshot activation and the event; `uuid` identifies the
    /// event occurrence.
    pub fn from_conversion(
        conversion: Conversion<'_>,
        client: &ClientInfo,
        timestamp_ms: u64,
        uuid: String,
    ) -> Self {
        let mut attributes: Vec<VisitorAttribute> = conversion
            .attributes
            .iter()
            .map(|attribute| VisitorAttribute {
                e: attribute.id.clone(),
                k: attribute.name.clone(),
                t: CUSTOM_ATTRIBUTE_TYPE.to_string(),
                v: attribute.value.clone(),
            })
            .collect();
        attributes.push(VisitorAttribute {
            e: BOT_FILTERING_ATTRIBUTE.to_string(),
            k: BOT_FILTERING_ATTRIBUTE.to_string(),
            t: CUSTOM_ATTRIBUTE_TYPE.to_string(),
            v: Value::Bool(conversion.datafile.bot_filtering),
        });

        let event = SnapshotEvent {
            e: conversion.event.id.clone(),
            k: conversion.event.key.clone(),
            u: uuid,
            t: timestamp_ms,
            a: conversion.tags.clone(),
            p: conversion.properties.clone(),
            y: EVENT_TYPE_OTHER.to_string(),
        };

        EventBatch {
            account_id: conversion.datafile.account_id.clone(),
            anonymize_ip: true,
            client_name: client.name.clone(),
            client_version: client.version.clone(),
            enrich_decisions: true,
            project_id: conversion.datafile.project_id.clone(),
            revision: conversion.datafile.revision.clone(),
            visitors: vec![Visitor {
                visitor_id: conversion.visitor_id.to_string(),
                session_id: SESSION_ID.to_string(),
                attributes,
                snapshots: vec![Snapshot {
                    activation_timestamp: timestamp_ms,
                    decisions: Vec::new(),
                    events: vec![event],
                }],
            }],
        }
    }
}

/// Milliseconds since the Unix epoch, or 0 if the clock is before it.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}
