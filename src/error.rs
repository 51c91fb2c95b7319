use thiserror::Error;

/// Errors produced by the extraction/matching core and its store/decoder adapters.
///
/// Store errors surface as 5xx at the HTTP boundary; everything else is 4xx.
/// `DuplicateContent` is resolved transparently by `put_recording` and should
/// never reach a caller as an `Err`.
#[derive(Debug, Error)]
pub enum EchoidError {
    #[error("unsupported file format: {extension}")]
    UnsupportedFormat { extension: String },

    #[error("failed to decode audio: {0}")]
    DecodeFailed(String),

    #[error("audio is unfingerprintable: {0}")]
    Unfingerprintable(String),

    #[error("content already catalogued as recording {existing_id}")]
    DuplicateContent { existing_id: i64 },

    #[error("fingerprint store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("recording {0} not found")]
    NotFound(i64),

    #[error("extractor configuration mismatch: {0}")]
    InvalidParameters(String),
}

impl From<diesel::result::Error> for EchoidError {
    fn from(err: diesel::result::Error) -> Self {
        EchoidError::StoreUnavailable(err.to_string())
    }
}

impl From<diesel::r2d2::PoolError> for EchoidError {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        EchoidError::StoreUnavailable(err.to_string())
    }
}

impl From<std::io::Error> for EchoidError {
    fn from(err: std::io::Error) -> Self {
        EchoidError::DecodeFailed(err.to_string())
    }
}

impl From<symphonia::core::errors::Error> for EchoidError {
    fn from(err: symphonia::core::errors::Error) -> Self {
        EchoidError::DecodeFailed(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EchoidError>;
