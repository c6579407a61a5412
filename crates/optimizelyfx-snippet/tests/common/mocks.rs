// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Mutex;

use optimizelyfx_snippet::{EventBatch, EventDispatcher};

/// Dispatcher keeping every batch it is handed.
#[derive(Default)]
pub struct RecordingDispatcher {
    batches: Mutex<Vec<EventBatch>>,
}

impl RecordingDispatcher {
    pub fn batches(&self) -> Vec<EventBatch> {
        self.batches.lock().unwrap().clone()
    }

    /// Visitor id of every batch, in dispatch order.
    pub fn visitor_ids(&self) -> Vec<String> {
        self.batches()
            .iter()
            .map(|batch| batch.visitors[0].visitor_id.clone())
            .collect()
    }
}

impl EventDispatcher for RecordingDispatcher {
    fn dispatch(&self, batch: EventBatch) {
        self.batches.lock().unwrap().push(batch);
    }
}
