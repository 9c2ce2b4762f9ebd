//! Mock implementations of core traits for testing.
//!
//! Used by unit tests across the workspace and by the gateway's integration
//! tests to stand in for the hosted model.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::{
    traits::VisionModel,
    types::{ImagePayload, ModelResponse, UpstreamFailure},
};

type Scripted = std::result::Result<ModelResponse, UpstreamFailure>;

// =============================================================================
// Mock Vision Model
// =============================================================================

/// Scripted mock model that replays a queue of outcomes.
///
/// Once the queue is drained the last outcome repeats. Every call records
/// the model name it was issued against.
pub struct MockVisionModel {
    outcomes: Mutex<VecDeque<Scripted>>,
    last: Mutex<Option<Scripted>>,
    calls: Mutex<Vec<String>>,
}

impl MockVisionModel {
    /// Create a mock replaying `outcomes` in order.
    pub fn new(outcomes: Vec<Scripted>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            last: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock that always answers with `text`.
    pub fn text(text: &str) -> Self {
        Self::new(vec![Ok(ModelResponse::text_only(text))])
    }

    /// Create a mock that always fails with `failure`.
    pub fn failing(failure: UpstreamFailure) -> Self {
        Self::new(vec![Err(failure)])
    }

    /// Model names of every call made so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Get the number of calls made to this mock.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl VisionModel for MockVisionModel {
    async fn generate(
        &self,
        model: &str,
        _prompt: &str,
        _image: &ImagePayload,
    ) -> std::result::Result<ModelResponse, UpstreamFailure> {
        self.calls.lock().unwrap().push(model.to_string());

        let next = self.outcomes.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        match next {
            Some(outcome) => {
                *last = Some(outcome.clone());
                outcome
            }
            None => last
                .clone()
                .unwrap_or_else(|| Err(UpstreamFailure::transport("mock exhausted"))),
        }
    }
}
