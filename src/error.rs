use thiserror::Error;

use crate::transport::codec::CodecError;

/// Every way an analysis request can end up in `Failed`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("no audio file selected")]
    NoFileSelected,

    #[error("could not read {file}: {reason}")]
    FileUnreadable { file: String, reason: String },

    #[error("payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("network failure: {0}")]
    NetworkFailure(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("backend reported an error: {0}")]
    BackendError(String),
}

impl AnalysisError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        AnalysisError::MalformedResponse(msg.into())
    }

    /// Short machine-friendly kind name, used in logs and the progress spinner.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::NoFileSelected => "no_file_selected",
            AnalysisError::FileUnreadable { .. } => "file_unreadable",
            AnalysisError::PayloadTooLarge { .. } => "payload_too_large",
            AnalysisError::NetworkFailure(_) => "network_failure",
            AnalysisError::MalformedResponse(_) => "malformed_response",
            AnalysisError::BackendError(_) => "backend_error",
        }
    }

    /// Whether sending the same file again could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AnalysisError::NetworkFailure(_) | AnalysisError::BackendError(_)
        )
    }
}

impl From<CodecError> for AnalysisError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::PayloadTooLarge { size, limit } => {
                AnalysisError::PayloadTooLarge { size, limit }
            }
            CodecError::InvalidEncoding(reason) => AnalysisError::MalformedResponse(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_and_backend_failures_are_retryable() {
        assert!(AnalysisError::NetworkFailure("timed out".into()).is_retryable());
        assert!(AnalysisError::BackendError("HTTP 503: busy".into()).is_retryable());
        assert!(!AnalysisError::NoFileSelected.is_retryable());
        assert!(!AnalysisError::malformed("bad shape").is_retryable());
        assert!(!AnalysisError::PayloadTooLarge { size: 2, limit: 1 }.is_retryable());
    }

    #[test]
    fn codec_errors_convert() {
        let err: AnalysisError = CodecError::PayloadTooLarge { size: 9, limit: 4 }.into();
        assert_eq!(err.kind(), "payload_too_large");
    }
}
