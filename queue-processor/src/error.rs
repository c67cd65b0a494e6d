//! Errors a single job can end in.
//!
//! Every variant is handled the same way by the supervisor (the key goes to
//! the failed set); the variants exist so the log line says which stage broke.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("failed to fetch {key}: {source:#}")]
    StoreRead {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("{key} has no {field:?} field")]
    MissingField { key: String, field: &'static str },

    #[error("failed to decode event {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("calendar API call for {key} failed: {source:#}")]
    RemoteApi {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to encode event {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write back {key}: {source:#}")]
    StoreWrite {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("{key} did not finish within {after:?}")]
    Timeout { key: String, after: Duration },
}

impl JobError {
    /// Short name of the stage that failed, for log lines.
    pub fn stage(&self) -> &'static str {
        match self {
            JobError::StoreRead { .. } => "fetch",
            JobError::MissingField { .. } | JobError::Decode { .. } => "decode",
            JobError::RemoteApi { .. } => "remote",
            JobError::Encode { .. } => "encode",
            JobError::StoreWrite { .. } => "write",
            JobError::Timeout { .. } => "timeout",
        }
    }

    pub fn key(&self) -> &str {
        match self {
            JobError::StoreRead { key, .. }
            | JobError::MissingField { key, .. }
            | JobError::Decode { key, .. }
            | JobError::RemoteApi { key, .. }
            | JobError::Encode { key, .. }
            | JobError::StoreWrite { key, .. }
            | JobError::Timeout { key, .. } => key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_and_key() {
        let err = JobError::RemoteApi {
            key: "ns:event:id:sis/1".to_string(),
            source: anyhow::anyhow!("503 backend error"),
        };
        assert_eq!(err.stage(), "remote");
        assert_eq!(err.key(), "ns:event:id:sis/1");
        assert_eq!(
            err.to_string(),
            "calendar API call for ns:event:id:sis/1 failed: 503 backend error"
        );

        let err = JobError::Timeout {
            key: "k".to_string(),
            after: Duration::from_secs(120),
        };
        assert_eq!(err.stage(), "timeout");
        assert_eq!(err.to_string(), "k did not finish within 120s");
    }

    #[test]
    fn test_missing_field_message() {
        let err = JobError::MissingField {
            key: "k".to_string(),
            field: "calendar",
        };
        assert_eq!(err.stage(), "decode");
        assert_eq!(err.to_string(), "k has no \"calendar\" field");
    }
}
