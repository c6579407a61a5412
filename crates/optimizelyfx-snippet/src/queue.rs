// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Command queue.
//!
//! Callers push through any number of cloned [`SnippetHandle`]s. A single [`CommandQueue`]
//! task drains the channel and applies each command to the [`Interpreter`] before it looks at
//! the next one, so commands take effect in exactly the order they were pushed, and pushing
//! never waits on the network.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info_span, warn, Instrument};

use crate::command::{Command, CommandError};
use crate::datafile::Datafile;
use crate::error::SnippetError;
use crate::interpreter::{Interpreter, Lifecycle};
use crate::session::Attribute;

#[derive(Debug)]
pub enum QueueMessage {
    Command(Command),
    /// A push that failed shape validation, reported when it reaches the head of the queue.
    Rejected(CommandError),
    Snapshot(oneshot::Sender<SessionSnapshot>),
    Shutdown,
}

/// State of the snippet as seen by the command queued right after the snapshot request.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub lifecycle: Lifecycle,
    pub identity: Option<String>,
    pub attributes: Vec<Attribute>,
    pub datafile: Option<Arc<Datafile>>,
    pub polling: bool,
}

#[derive(Clone, Debug)]
pub struct SnippetHandle {
    tx: mpsc::UnboundedSender<QueueMessage>,
    pending: Arc<AtomicUsize>,
}

impl SnippetHandle {
    /// Appends one JSON command.
    ///
    /// Nothing is reported back to the caller. Malformed pushes are logged by the worker in
    /// push order without counting towards [`pending`](Self::pending); a stopped queue is
    /// logged right away.
    pub fn push(&self, value: Value) {
        let result = match Command::try_from(value) {
            Ok(command) => self.enqueue(command),
            Err(e) => self
                .tx
                .send(QueueMessage::Rejected(e.clone()))
                .map_err(|_| SnippetError::from(e)),
        };
        if let Err(e) = result {
            report(&e);
        }
    }

    /// Appends commands collected before the snippet started, keeping their order.
    pub fn push_all<I>(&self, values: I)
    where
        I: IntoIterator<Item = Value>,
    {
        for value in values {
            self.push(value);
        }
    }

    /// Appends an already parsed command.
    pub fn enqueue(&self, command: Command) -> Result<(), SnippetError> {
        self.pending.fetch_add(1, Ordering::AcqRel);
        self.tx.send(QueueMessage::Command(command)).map_err(|e| {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            SnippetError::QueueClosed(format!("Failed to send command: {e}"))
        })
    }

    /// Commands pushed but not yet fully processed.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Waits until every earlier command is processed and returns the resulting state.
    pub async fn snapshot(&self) -> Result<SessionSnapshot, SnippetError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.tx
            .send(QueueMessage::Snapshot(response_tx))
            .map_err(|e| SnippetError::QueueClosed(format!("Failed to send snapshot request: {e}")))?;

        response_rx.await.map_err(|e| {
            SnippetError::QueueClosed(format!("Failed to receive snapshot response: {e}"))
        })
    }

    /// Stops the queue once earlier commands are processed; this also stops polling.
    pub fn shutdown(&self) -> Result<(), SnippetError> {
        self.tx
            .send(QueueMessage::Shutdown)
            .map_err(|e| SnippetError::QueueClosed(format!("Failed to send shutdown: {e}")))
    }
}

pub struct CommandQueue {
    interpreter: Interpreter,
    rx: mpsc::UnboundedReceiver<QueueMessage>,
    pending: Arc<AtomicUsize>,
}

impl CommandQueue {
    pub fn new(interpreter: Interpreter) -> (Self, SnippetHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let pending = Arc::new(AtomicUsize::new(0));

        let queue = Self {
            interpreter,
            rx,
            pending: pending.clone(),
        };
        let handle = SnippetHandle { tx, pending };

        (queue, handle)
    }

    pub async fn run(mut self) {
        debug!("Command queue started");

        while let Some(message) = self.rx.recv().await {
            match message {
                QueueMessage::Command(command) => {
                    let span = info_span!("command", kind = %command.kind());
                    let interpreter = &mut self.interpreter;
                    async move {
                        if let Err(e) = interpreter.process(command).await {
                            report(&e);
                        }
                    }
                    .instrument(span)
                    .await;
                    self.pending.fetch_sub(1, Ordering::AcqRel);
                }

                QueueMessage::Rejected(e) => report(&SnippetError::from(e)),

                QueueMessage::Snapshot(response_tx) => {
                    let snapshot = self.snapshot().await;
                    if response_tx.send(snapshot).is_err() {
                        error!("Failed to send snapshot response - receiver dropped");
                    }
                }

                QueueMessage::Shutdown => {
                    debug!("Command queue shutting down");
                    break;
                }
            }
        }

        self.interpreter.shutdown();
        debug!("Command queue stopped");
    }

    async fn snapshot(&self) -> SessionSnapshot {
        let session = self.interpreter.session();
        SessionSnapshot {
            lifecycle: self.interpreter.lifecycle(),
            identity: session.identity().map(str::to_string),
            attributes: session.attributes().to_vec(),
            datafile: self.interpreter.store().current().await,
            polling: self.interpreter.is_polling(),
        }
    }
}

fn report(error: &SnippetError) {
    if error.is_warning() {
        warn!("{error}");
    } else {
        error!("{error}");
    }
}
