//! Record persistence capability.
//!
//! The shell owns the actual backend client (Supabase/Postgrest in the
//! mobile shells); the core only describes the write it needs. Records
//! cross the boundary as JSON values that already satisfy validation.

use crux_core::capability::{CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

use crate::{AppError, ErrorKind};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreOperation {
    /// Insert a new row. Fails if the backend rejects the write.
    Insert {
        table: String,
        record: serde_json::Value,
    },
    /// Insert or update keyed on the record's primary key.
    Upsert {
        table: String,
        record: serde_json::Value,
    },
}

impl Operation for StoreOperation {
    type Output = StoreResult;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreOutput {
    Written,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum StoreError {
    /// The backend processed the request and said no. `message` is the
    /// backend's own description and is shown to the user as-is.
    #[error("backend rejected the write: {message}")]
    Backend {
        code: Option<String>,
        message: String,
    },
    #[error("network error: {message}")]
    Network { message: String },
    #[error("request timed out")]
    Timeout,
}

pub type StoreResult = Result<StoreOutput, StoreError>;

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Backend { code, message } => {
                let err = AppError::new(ErrorKind::Persistence, message);
                match code {
                    Some(code) => err.with_context("backend_code", code),
                    None => err,
                }
            }
            StoreError::Network { message } => {
                AppError::new(ErrorKind::Network, "Network unreachable").with_internal(message)
            }
            StoreError::Timeout => AppError::new(ErrorKind::Timeout, "The request timed out"),
        }
    }
}

pub struct DataStore<E> {
    context: CapabilityContext<StoreOperation, E>,
}

impl<E> crux_core::capability::Capability<E> for DataStore<E> {
    type Operation = StoreOperation;
    type MappedSelf<MappedEv> = DataStore<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> E + Send + Sync + 'static,
        E: 'static,
        NewEv: 'static + Send,
    {
        DataStore::new(self.context.map_event(f))
    }
}

impl<E> DataStore<E>
where
    E: 'static,
{
    pub fn new(context: CapabilityContext<StoreOperation, E>) -> Self {
        Self { context }
    }

    pub fn insert<F>(&self, table: impl Into<String>, record: serde_json::Value, make_event: F)
    where
        F: FnOnce(StoreResult) -> E + Send + 'static,
    {
        self.run(
            StoreOperation::Insert {
                table: table.into(),
                record,
            },
            make_event,
        );
    }

    pub fn upsert<F>(&self, table: impl Into<String>, record: serde_json::Value, make_event: F)
    where
        F: FnOnce(StoreResult) -> E + Send + 'static,
    {
        self.run(
            StoreOperation::Upsert {
                table: table.into(),
                record,
            },
            make_event,
        );
    }

    fn run<F>(&self, operation: StoreOperation, make_event: F)
    where
        F: FnOnce(StoreResult) -> E + Send + 'static,
    {
        let context = self.context.clone();
        self.context.spawn(async move {
            let response = context.request_from_shell(operation).await;
            context.update_app(make_event(response));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_message_is_surfaced_verbatim() {
        let err: AppError = StoreError::Backend {
            code: Some("23505".into()),
            message: "duplicate key value violates unique constraint".into(),
        }
        .into();

        assert_eq!(err.kind, ErrorKind::Persistence);
        assert_eq!(
            err.user_facing_message(),
            "duplicate key value violates unique constraint"
        );
        assert_eq!(err.context.get("backend_code").map(String::as_str), Some("23505"));
    }

    #[test]
    fn empty_backend_message_falls_back_to_generic_copy() {
        let err: AppError = StoreError::Backend {
            code: None,
            message: String::new(),
        }
        .into();

        assert_eq!(err.kind, ErrorKind::Persistence);
        assert!(!err.user_facing_message().is_empty());
        assert_ne!(err.user_facing_message(), "");
    }

    #[test]
    fn transport_failures_map_to_retryable_kinds() {
        let network: AppError = StoreError::Network {
            message: "connection reset".into(),
        }
        .into();
        let timeout: AppError = StoreError::Timeout.into();

        assert_eq!(network.kind, ErrorKind::Network);
        assert!(network.is_retryable());
        assert_eq!(timeout.kind, ErrorKind::Timeout);
        assert!(timeout.is_retryable());
    }

    #[test]
    fn operations_serialize_with_snake_case_tags() {
        let op = StoreOperation::Upsert {
            table: "profiles".into(),
            record: serde_json::json!({ "id": "u1" }),
        };
        let value = serde_json::to_value(&op).unwrap();
        assert!(value.get("upsert").is_some());
    }
}
