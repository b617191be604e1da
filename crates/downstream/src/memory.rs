//! Call recording and fault injection shared by the in-memory services.

use std::collections::HashMap;

use crate::error::{Result, ServiceError};
use crate::http::Credentials;

/// One call observed by an in-memory service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub operation: &'static str,
    pub credentials: Credentials,
}

#[derive(Debug, Default)]
pub(crate) struct CallLog {
    calls: Vec<RecordedCall>,
    failures: HashMap<&'static str, ServiceError>,
}

impl CallLog {
    /// Records the call and returns the injected failure for it, if any.
    pub(crate) fn record(&mut self, operation: &'static str, credentials: &Credentials) -> Result<()> {
        self.calls.push(RecordedCall {
            operation,
            credentials: credentials.clone(),
        });
        match self.failures.get(operation) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    pub(crate) fn fail(&mut self, operation: &'static str, err: ServiceError) {
        self.failures.insert(operation, err);
    }

    pub(crate) fn recover(&mut self, operation: &'static str) {
        self.failures.remove(operation);
    }

    pub(crate) fn calls(&self) -> Vec<RecordedCall> {
        self.calls.clone()
    }

    pub(crate) fn count(&self, operation: &str) -> usize {
        self.calls.iter().filter(|c| c.operation == operation).count()
    }
}
