// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Applies commands to the snippet state.
//!
//! The [`Interpreter`] owns every piece of mutable state: lifecycle, session and the poller
//! handle. It is driven by exactly one task, so a command always sees the effects of all the
//! commands queued before it.

use std::str::FromStr;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::command::{Command, Initialize, PollInterval, SetIdentity, TrackEvent};
use crate::datafile::{Datafile, DatafileStore};
use crate::dispatcher::EventDispatcher;
use crate::error::SnippetError;
use crate::event::{now_millis, ClientInfo, Conversion, EventBatch};
use crate::fetcher::{DatafileClient, DatafileSource};
use crate::log_level::LogLevel;
use crate::logger::LogLevelHandle;
use crate::poller::{clamp_interval, DatafilePoller};
use crate::session::{AttributeAssignment, IdentityChange, Session};

/// Where the snippet is in its startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Unconfigured,
    /// An `init` command is fetching the datafile.
    Initializing,
    Ready,
}

pub struct Interpreter {
    lifecycle: Lifecycle,
    session: Session,
    store: DatafileStore,
    fetcher: Arc<DatafileClient>,
    dispatcher: Arc<dyn EventDispatcher>,
    log_level: LogLevelHandle,
    client_info: ClientInfo,
    poller: Option<JoinHandle<()>>,
    cancel: CancellationToken,
}

impl Interpreter {
    pub fn new(
        fetcher: Arc<DatafileClient>,
        dispatcher: Arc<dyn EventDispatcher>,
        log_level: LogLevelHandle,
    ) -> Self {
        Self {
            lifecycle: Lifecycle::Unconfigured,
            session: Session::new(),
            store: DatafileStore::new(),
            fetcher,
            dispatcher,
            log_level,
            client_info: ClientInfo::default(),
            poller: None,
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_client_info(mut self, client_info: ClientInfo) -> Self {
        self.client_info = client_info;
        self
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Shared slot the poller writes new revisions into.
    pub fn store(&self) -> &DatafileStore {
        &self.store
    }

    pub fn is_polling(&self) -> bool {
        self.poller
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stops the poller, if one was started.
    pub fn shutdown(&mut self) {
        self.cancel.cancel();
        self.poller = None;
    }

    pub async fn process(&mut self, command: Command) -> Result<(), SnippetError> {
        match command {
            Command::Initialize(init) => self.initialize(init).await,
            Command::TrackEvent(event) => self.track_event(event).await,
            Command::SetIdentity(user) => self.set_identity(user).await,
            Command::SetLogLevel { level } => self.set_log_level(level),
        }
    }

    async fn initialize(&mut self, init: Initialize) -> Result<(), SnippetError> {
        if self.lifecycle == Lifecycle::Ready {
            return Err(SnippetError::AlreadyInitialized);
        }
        let Some(user_id) = init.user_id else {
            return Err(SnippetError::MissingIdentity(
                "init requires a userId".to_string(),
            ));
        };
        let source = DatafileSource::from_parts(init.sdk_key, init.datafile_url)?;

        info!(source = %source, "Initializing OptimizelyFX snippet");
        self.lifecycle = Lifecycle::Initializing;
        let datafile = match self.fetcher.fetch(&source).await {
            Ok(datafile) => Arc::new(datafile),
            Err(e) => {
                self.lifecycle = Lifecycle::Unconfigured;
                return Err(e.into());
            }
        };
        debug!(revision = %datafile.revision, "Datafile loaded");
        self.store.store(datafile.clone()).await;

        match init.poll_interval {
            None => {}
            Some(PollInterval::Millis(ms)) => match clamp_interval(ms) {
                Some((period, clamped)) => {
                    if clamped {
                        warn!(
                            requested_ms = ms,
                            "Poll interval below minimum, using {}ms",
                            period.as_millis()
                        );
                    }
                    self.start_poller(source, period);
                }
                None => error!("{}", SnippetError::InvalidPollInterval(ms.to_string())),
            },
            Some(PollInterval::Invalid(value)) => {
                error!("{}", SnippetError::InvalidPollInterval(value.to_string()));
            }
        }

        self.session.reset(user_id);
        let assignment = self.session.assign_attributes(&datafile, &init.attributes);
        log_assignment(&assignment);

        self.lifecycle = Lifecycle::Ready;
        info!(
            user_id = self.session.identity().unwrap_or_default(),
            revision = %datafile.revision,
            "OptimizelyFX snippet ready"
        );
        Ok(())
    }

    fn start_poller(&mut self, source: DatafileSource, period: std::time::Duration) {
        if self.poller.is_some() {
            debug!("Datafile poller already running");
            return;
        }
        let poller = DatafilePoller::new(self.fetcher.clone(), source, self.store.clone(), period);
        self.poller = Some(poller.spawn(self.cancel.child_token()));
    }

    async fn track_event(&mut self, event: TrackEvent) -> Result<(), SnippetError> {
        let Some(user_id) = self.session.identity() else {
            return Err(SnippetError::IdentityNotSet);
        };
        let Some(event_name) = event.event_name else {
            return Err(SnippetError::MissingEventName);
        };
        let datafile = self.current_datafile().await?;
        let Some(definition) = datafile.event(&event_name) else {
            return Err(SnippetError::UnknownEventName(event_name));
        };

        let batch = EventBatch::from_conversion(
            Conversion {
                datafile: &datafile,
                event: definition,
                visitor_id: user_id,
                attributes: self.session.attributes(),
                tags: &event.tags,
                properties: &event.properties,
            },
            &self.client_info,
            now_millis(),
            Uuid::new_v4().to_string(),
        );
        self.dispatcher.dispatch(batch);
        info!(event = %event_name, user_id = %user_id, "Event tracked");
        Ok(())
    }

    async fn set_identity(&mut self, user: SetIdentity) -> Result<(), SnippetError> {
        let Some(user_id) = user.user_id else {
            return Err(SnippetError::MissingIdentity(
                "user requires a userId".to_string(),
            ));
        };
        if let IdentityChange::Changed { previous } = self.session.set_identity(user_id) {
            info!(
                previous = previous.as_deref().unwrap_or("none"),
                user_id = self.session.identity().unwrap_or_default(),
                "User changed"
            );
        }

        if user.attributes.is_empty() {
            return Ok(());
        }
        let datafile = self.current_datafile().await?;
        let assignment = self.session.assign_attributes(&datafile, &user.attributes);
        log_assignment(&assignment);
        Ok(())
    }

    fn set_log_level(&mut self, level: Option<String>) -> Result<(), SnippetError> {
        let requested = level.unwrap_or_default();
        let level = LogLevel::from_str(&requested)
            .map_err(|_| SnippetError::InvalidLogLevel(requested))?;
        self.log_level.set_level(level)?;
        info!(level = %level, "Log level set");
        Ok(())
    }

    async fn current_datafile(&self) -> Result<Arc<Datafile>, SnippetError> {
        self.store
            .current()
            .await
            .ok_or(SnippetError::DatafileUnavailable)
    }
}

impl Drop for Interpreter {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn log_assignment(assignment: &AttributeAssignment) {
    for key in &assignment.rejected {
        warn!("{}", SnippetError::UnknownAttributeKey(key.clone()));
    }
    for attribute in &assignment.applied {
        info!(name = %attribute.name, value = %attribute.value, "Attribute set");
    }
}
