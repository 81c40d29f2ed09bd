//! Binary object storage capability.
//!
//! Uploads image bytes into a named bucket, resolves public URLs for
//! uploaded objects, and removes objects that are no longer referenced.
//! Object names are chosen by the core so that cleanup after a failed
//! submit can name exactly what it uploaded.

use crux_core::capability::{CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

use crate::{AppError, ErrorKind};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ObjectStoreOperation {
    Upload {
        bucket: String,
        name: String,
        #[serde(with = "serde_bytes")]
        data: Vec<u8>,
        content_type: String,
    },
    Remove {
        bucket: String,
        names: Vec<String>,
    },
    PublicUrl {
        bucket: String,
        name: String,
    },
}

impl Operation for ObjectStoreOperation {
    type Output = ObjectStoreResult;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ObjectStoreOutput {
    /// `path` is the bucket-relative object path, echoed back by the shell.
    Uploaded { path: String },
    Removed,
    PublicUrl { url: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum ObjectStoreError {
    #[error("storage backend error: {message}")]
    Backend { message: String },
    #[error("network error: {message}")]
    Network { message: String },
    #[error("request timed out")]
    Timeout,
}

pub type ObjectStoreResult = Result<ObjectStoreOutput, ObjectStoreError>;

impl From<ObjectStoreError> for AppError {
    fn from(e: ObjectStoreError) -> Self {
        match e {
            ObjectStoreError::Backend { message } => {
                AppError::new(ErrorKind::Upload, "We couldn't upload your photo")
                    .with_internal(message)
            }
            ObjectStoreError::Network { message } => {
                AppError::new(ErrorKind::Network, "Network unreachable").with_internal(message)
            }
            ObjectStoreError::Timeout => AppError::new(ErrorKind::Timeout, "The request timed out"),
        }
    }
}

pub struct ObjectStore<E> {
    context: CapabilityContext<ObjectStoreOperation, E>,
}

impl<E> crux_core::capability::Capability<E> for ObjectStore<E> {
    type Operation = ObjectStoreOperation;
    type MappedSelf<MappedEv> = ObjectStore<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> E + Send + Sync + 'static,
        E: 'static,
        NewEv: 'static + Send,
    {
        ObjectStore::new(self.context.map_event(f))
    }
}

impl<E> ObjectStore<E>
where
    E: 'static,
{
    pub fn new(context: CapabilityContext<ObjectStoreOperation, E>) -> Self {
        Self { context }
    }

    pub fn upload<F>(
        &self,
        bucket: impl Into<String>,
        name: impl Into<String>,
        data: Vec<u8>,
        content_type: impl Into<String>,
        make_event: F,
    ) where
        F: FnOnce(ObjectStoreResult) -> E + Send + 'static,
    {
        self.run(
            ObjectStoreOperation::Upload {
                bucket: bucket.into(),
                name: name.into(),
                data,
                content_type: content_type.into(),
            },
            make_event,
        );
    }

    pub fn public_url<F>(&self, bucket: impl Into<String>, name: impl Into<String>, make_event: F)
    where
        F: FnOnce(ObjectStoreResult) -> E + Send + 'static,
    {
        self.run(
            ObjectStoreOperation::PublicUrl {
                bucket: bucket.into(),
                name: name.into(),
            },
            make_event,
        );
    }

    pub fn remove<F>(&self, bucket: impl Into<String>, names: Vec<String>, make_event: F)
    where
        F: FnOnce(ObjectStoreResult) -> E + Send + 'static,
    {
        self.run(
            ObjectStoreOperation::Remove {
                bucket: bucket.into(),
                names,
            },
            make_event,
        );
    }

    fn run<F>(&self, operation: ObjectStoreOperation, make_event: F)
    where
        F: FnOnce(ObjectStoreResult) -> E + Send + 'static,
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
    fn upload_failures_keep_backend_detail_internal() {
        let err: AppError = ObjectStoreError::Backend {
            message: "bucket quota exceeded".into(),
        }
        .into();

        assert_eq!(err.kind, ErrorKind::Upload);
        assert_eq!(err.internal_message.as_deref(), Some("bucket quota exceeded"));
        assert!(!err.user_facing_message().contains("quota"));
    }

    #[test]
    fn upload_payload_round_trips_bytes() {
        let op = ObjectStoreOperation::Upload {
            bucket: "avatars".into(),
            name: "u1-1700000000000.jpg".into(),
            data: vec![0xFF, 0xD8, 0xFF, 0xE0],
            content_type: "image/jpeg".into(),
        };
        let bytes = serde_json::to_vec(&op).unwrap();
        let back: ObjectStoreOperation = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(op, back);
    }
}
