//! Publisher seam between the request path and the retry log.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::error::{Result, RetryQueueError};
use crate::message::RetryMessage;

/// Hands retry messages to the durable log.
#[async_trait]
pub trait RetryPublisher: Send + Sync {
    /// Queues the message and returns immediately. Delivery failures are
    /// logged by the implementation, never reported to the caller.
    fn publish(&self, message: RetryMessage);

    /// Publishes and waits until the log has accepted the message.
    async fn publish_confirmed(&self, message: RetryMessage) -> Result<()>;
}

#[derive(Debug, Default)]
struct InMemoryQueueState {
    messages: Vec<RetryMessage>,
    fail_publish: bool,
}

/// In-memory retry log for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRetryQueue {
    state: Arc<RwLock<InMemoryQueueState>>,
}

impl InMemoryRetryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures confirmed publishes to fail. Fire-and-forget publishes are
    /// dropped silently while set.
    pub fn set_fail_publish(&self, fail: bool) {
        self.state.write().unwrap().fail_publish = fail;
    }

    /// Messages accepted so far, oldest first.
    pub fn messages(&self) -> Vec<RetryMessage> {
        self.state.read().unwrap().messages.clone()
    }

    pub fn len(&self) -> usize {
        self.state.read().unwrap().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RetryPublisher for InMemoryRetryQueue {
    fn publish(&self, message: RetryMessage) {
        let mut state = self.state.write().unwrap();
        if !state.fail_publish {
            state.messages.push(message);
        }
    }

    async fn publish_confirmed(&self, message: RetryMessage) -> Result<()> {
        let mut state = self.state.write().unwrap();
        if state.fail_publish {
            return Err(RetryQueueError::Publish("broker unreachable".to_string()));
        }
        state.messages.push(message);
        Ok(())
    }
}
