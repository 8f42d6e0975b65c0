//! Scripted extraction service for deterministic tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::backend::{ExtractionService, ResponseFormat};
use crate::error::VisionError;
use crate::{Result, Turn};

/// A request captured by [`ScriptedService`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub turns: Vec<Turn>,
    pub format: ResponseFormat,
}

/// Service that replays a fixed script of replies and records every call.
///
/// Once the script runs out every further call fails with an `Api` error,
/// so a test never hangs on an unexpected extra request.
pub struct ScriptedService {
    name: String,
    replies: Mutex<VecDeque<Result<String>>>,
    repeat_last: Option<String>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self {
            name: "scripted".to_string(),
            replies: Mutex::new(VecDeque::new()),
            repeat_last: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful text reply.
    pub fn with_reply(self, reply: impl Into<String>) -> Self {
        self.push(Ok(reply.into()));
        self
    }

    /// Queue a failure.
    pub fn with_error(self, error: VisionError) -> Self {
        self.push(Err(error));
        self
    }

    /// Answer with this text whenever the queue is empty.
    pub fn always(mut self, reply: impl Into<String>) -> Self {
        self.repeat_last = Some(reply.into());
        self
    }

    /// Number of calls made so far.
    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Snapshot of all recorded requests.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn push(&self, reply: Result<String>) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
    }
}

impl Default for ScriptedService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExtractionService for ScriptedService {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, turns: &[Turn], format: ResponseFormat) -> Result<String> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(RecordedRequest {
                turns: turns.to_vec(),
                format,
            });
        }

        let next = self.replies.lock().ok().and_then(|mut r| r.pop_front());
        match (next, &self.repeat_last) {
            (Some(reply), _) => reply,
            (None, Some(reply)) => Ok(reply.clone()),
            (None, None) => Err(VisionError::Api {
                status: 0,
                message: "script exhausted".to_string(),
            }),
        }
    }
}
