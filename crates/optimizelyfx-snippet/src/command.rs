// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Commands accepted by the snippet and their JSON push format.
//!
//! A push is one JSON object whose `type` field selects the command:
//!
//! ```json
//! {"type": "init",  "userId": "u1", "sdkKey": "K", "attributes": {"plan": "pro"}, "pollInterval": 60000}
//! {"type": "event", "eventName": "purchase", "tags": {"revenue": 4200}, "properties": {}}
//! {"type": "user",  "userId": "u2", "attributes": {"plan": "free"}}
//! {"type": "log",   "level": "debug"}
//! ```
//!
//! Parsing only checks the shape. Whether a command makes sense (an identity is present, the
//! event exists in the datafile, ...) is decided by the interpreter when the command reaches
//! the head of the queue.

use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CommandError {
    #[error("Push not of type Object: {0}")]
    NotAnObject(String),
    #[error("No Event Type Found: {0}")]
    MissingEventType(String),
    #[error("Invalid Push Argument: {0}")]
    UnsupportedType(String),
}

/// Tag of a [`Command`], as it appears in the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Initialize,
    TrackEvent,
    SetIdentity,
    SetLogLevel,
}

impl CommandKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CommandKind::Initialize => "init",
            CommandKind::TrackEvent => "event",
            CommandKind::SetIdentity => "user",
            CommandKind::SetLogLevel => "log",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Polling interval as pushed with `init`.
#[derive(Debug, Clone, PartialEq)]
pub enum PollInterval {
    /// Requested period in milliseconds, before clamping.
    Millis(f64),
    /// Anything that is not a number.
    Invalid(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Initialize {
    pub user_id: Option<String>,
    pub sdk_key: Option<String>,
    pub datafile_url: Option<String>,
    /// Empty when the pushed value was missing or not an object.
    pub attributes: Map<String, Value>,
    pub poll_interval: Option<PollInterval>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackEvent {
    pub event_name: Option<String>,
    pub tags: Map<String, Value>,
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetIdentity {
    pub user_id: Option<String>,
    pub attributes: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Initialize(Initialize),
    TrackEvent(TrackEvent),
    SetIdentity(SetIdentity),
    SetLogLevel { level: Option<String> },
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Initialize(_) => CommandKind::Initialize,
            Command::TrackEvent(_) => CommandKind::TrackEvent,
            Command::SetIdentity(_) => CommandKind::SetIdentity,
            Command::SetLogLevel { .. } => CommandKind::SetLogLevel,
        }
    }

    /// Builds a `user` command switching to `user_id` without attributes.
    pub fn set_identity(user_id: impl Into<String>) -> Self {
        Command::SetIdentity(SetIdentity {
            user_id: Some(user_id.into()),
            attributes: Map::new(),
        })
    }

    /// Builds an `event` command without tags or properties.
    pub fn track(event_name: impl Into<String>) -> Self {
        Command::TrackEvent(TrackEvent {
            event_name: Some(event_name.into()),
            tags: Map::new(),
            properties: Map::new(),
        })
    }
}

impl TryFrom<Value> for Command {
    type Error = CommandError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Object(fields) = value else {
            return Err(CommandError::NotAnObject(value.to_string()));
        };
        let Some(tag) = fields.get("type").and_then(Value::as_str) else {
            return Err(CommandError::MissingEventType(
                Value::Object(fields).to_string(),
            ));
        };

        match tag {
            "init" => Ok(Command::Initialize(Initialize {
                user_id: string_field(&fields, "userId"),
                sdk_key: string_field(&fields, "sdkKey"),
                datafile_url: string_field(&fields, "datafileUrl"),
                attributes: object_field(&fields, "attributes"),
                poll_interval: poll_interval_field(&fields, "pollInterval"),
            })),
            "event" => Ok(Command::TrackEvent(TrackEvent {
                event_name: string_field(&fields, "eventName"),
                tags: object_field(&fields, "tags"),
                properties: object_field(&fields, "properties"),
            })),
            "user" => Ok(Command::SetIdentity(SetIdentity {
                user_id: string_field(&fields, "userId"),
                attributes: object_field(&fields, "attributes"),
            })),
            "log" => Ok(Command::SetLogLevel {
                level: string_field(&fields, "level"),
            }),
            other => Err(CommandError::UnsupportedType(other.to_string())),
        }
    }
}

/// Non-empty string, or a number rendered as a string (numeric user ids are common).
fn string_field(fields: &Map<String, Value>, name: &str) -> Option<String> {
    match fields.get(name)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(number_to_string(n)),
        _ => None,
    }
}

/// Largest integer an `f64` holds exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Renders whole floats without a fraction, so `1000.0` and `1000` give the same id.
fn number_to_string(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) if !n.is_i64() && !n.is_u64() && f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER => {
            (f as i64).to_string()
        }
        _ => n.to_string(),
    }
}

fn object_field(fields: &Map<String, Value>, name: &str) -> Map<String, Value> {
    match fields.get(name) {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    }
}

fn poll_interval_field(fields: &Map<String, Value>, name: &str) -> Option<PollInterval> {
    match fields.get(name)? {
        Value::Null => None,
        Value::Number(n) => Some(match n.as_f64() {
            Some(ms) => PollInterval::Millis(ms),
            None => PollInterval::Invalid(Value::Number(n.clone())),
        }),
        other => Some(PollInterval::Invalid(other.clone())),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_init() {
        let command = Command::try_from(json!({
            "type": "init",
            "userId": "u1",
            "sdkKey": "K",
            "attributes": {"plan": "pro"},
            "pollInterval": 500
        }))
        .unwrap();

        let Command::Initialize(init) = command else {
            panic!("expected init, got {command:?}");
        };
        assert_eq!(init.user_id.as_deref(), Some("u1"));
        assert_eq!(init.sdk_key.as_deref(), Some("K"));
        assert_eq!(init.datafile_url, None);
        assert_eq!(init.attributes.get("plan"), Some(&json!("pro")));
        assert_eq!(init.poll_interval, Some(PollInterval::Millis(500.0)));
    }

    #[test]
    fn test_init_normalizes_non_object_attributes() {
        let command =
            Command::try_from(json!({"type": "init", "userId": "u1", "attributes": "oops"}))
                .unwrap();
        let Command::Initialize(init) = command else {
            panic!("expected init");
        };
        assert!(init.attributes.is_empty());
        assert_eq!(init.poll_interval, None);
    }

    #[test]
    fn test_init_keeps_non_numeric_poll_interval() {
        let command =
            Command::try_from(json!({"type": "init", "userId": "u1", "pollInterval": "fast"}))
                .unwrap();
        let Command::Initialize(init) = command else {
            panic!("expected init");
        };
        assert_eq!(
            init.poll_interval,
            Some(PollInterval::Invalid(json!("fast")))
        );
    }

    #[test]
    fn test_parse_event_with_non_object_tags() {
        let command = Command::try_from(json!({
            "type": "event",
            "eventName": "purchase",
            "tags": [1, 2],
            "properties": {"color": "red"}
        }))
        .unwrap();
        assert_eq!(command.kind(), CommandKind::TrackEvent);
        let Command::TrackEvent(event) = command else {
            panic!("expected event");
        };
        assert_eq!(event.event_name.as_deref(), Some("purchase"));
        assert!(event.tags.is_empty());
        assert_eq!(event.properties.get("color"), Some(&json!("red")));
    }

    #[test]
    fn test_parse_user_with_numeric_id() {
        let command = Command::try_from(json!({"type": "user", "userId": 42})).unwrap();
        assert_eq!(
            command,
            Command::SetIdentity(SetIdentity {
                user_id: Some("42".to_string()),
                attributes: Map::new(),
            })
        );
    }

    #[test]
    fn test_whole_float_id_renders_as_integer() {
        for (raw, expected) in [
            (json!(1000.0), "1000"),
            (json!(-7.0), "-7"),
            (json!(1000), "1000"),
            (json!(12.5), "12.5"),
        ] {
            let command = Command::try_from(json!({"type": "user", "userId": raw})).unwrap();
            let Command::SetIdentity(user) = command else {
                panic!("expected user");
            };
            assert_eq!(user.user_id.as_deref(), Some(expected));
        }
    }

    #[test]
    fn test_parse_log() {
        let command = Command::try_from(json!({"type": "log", "level": "debug"})).unwrap();
        assert_eq!(
            command,
            Command::SetLogLevel {
                level: Some("debug".to_string())
            }
        );
    }

    #[test]
    fn test_shape_errors() {
        assert!(matches!(
            Command::try_from(json!("purchase")),
            Err(CommandError::NotAnObject(_))
        ));
        assert!(matches!(
            Command::try_from(json!(null)),
            Err(CommandError::NotAnObject(_))
        ));
        assert!(matches!(
            Command::try_from(json!({"eventName": "purchase"})),
            Err(CommandError::MissingEventType(_))
        ));
        assert!(matches!(
            Command::try_from(json!({"type": 7})),
            Err(CommandError::MissingEventType(_))
        ));
        assert_eq!(
            Command::try_from(json!({"type": "page"})),
            Err(CommandError::UnsupportedType("page".to_string()))
        );
    }

    #[test]
    fn test_kind_tags() {
        assert_eq!(Command::track("x").kind().as_str(), "event");
        assert_eq!(Command::set_identity("u").kind().to_string(), "user");
    }
}
