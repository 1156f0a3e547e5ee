//! use cspcert::error::CspCertError;

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// A raw error code reported by a cryptographic provider.
///
/// The value is carried exactly as the provider reported it. It is never
/// reinterpreted; use [`crate::provider::CryptoProvider::error_message`] to
/// resolve a description.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NativeCode(pub u32);

impl fmt::Display for NativeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

/// Represents errors that can occur while creating a self-signed certificate.
///
/// Every variant that originates inside the provider keeps the provider's
/// native code next to the message the provider resolved for it.
#[derive(Debug, Error, Clone)]
pub enum CspCertError {
    /// The provider refused to open a context.
    #[error("Provider acquisition failed ({code}): {message}")]
    ProviderAcquisition { code: NativeCode, message: String },

    /// The provider refused to generate a key inside an open context.
    #[error("Key generation failed ({code}): {message}")]
    KeyGeneration { code: NativeCode, message: String },

    /// A distinguished name could not be encoded into a subject blob.
    #[error("Failed to encode subject blob ({code}): {detail}")]
    BlobEncoding { code: NativeCode, detail: String },

    /// A signature algorithm identifier was rejected before reaching the provider.
    #[error("Invalid algorithm: {0}")]
    InvalidAlgorithm(String),

    /// The provider failed to create, sign or hand out the certificate.
    #[error("Certificate creation failed ({code}): {message}")]
    CertificateCreation { code: NativeCode, message: String },

    /// The validity period is empty or inverted.
    #[error("Invalid validity period: {0}")]
    InvalidValidity(String),

    /// An instant or tick count has no calendar representation.
    #[error("Time conversion error: {0}")]
    TimeConversion(String),

    /// The provider failed to release a handle.
    #[error("Failed to release {resource} ({code}): {message}")]
    ResourceRelease {
        resource: &'static str,
        code: NativeCode,
        message: String,
    },

    /// The pipeline did not finish within the caller's deadline.
    #[error("Certificate creation did not finish within {0:?}")]
    TimedOut(Duration),

    /// The worker running a timed call could not start or vanished.
    #[error("Worker thread error: {0}")]
    Worker(String),

    /// Error during data decoding.
    #[error("Failed to decode data: {0}")]
    DecodingError(String),
}

impl CspCertError {
    /// Returns the provider's native code, if the error came from the provider.
    pub fn native_code(&self) -> Option<NativeCode> {
        match self {
            CspCertError::ProviderAcquisition { code, .. }
            | CspCertError::KeyGeneration { code, .. }
            | CspCertError::BlobEncoding { code, .. }
            | CspCertError::CertificateCreation { code, .. }
            | CspCertError::ResourceRelease { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<der::Error> for CspCertError {
    /// Converts a `der::Error` into a `CspCertError`.
    fn from(err: der::Error) -> Self {
        CspCertError::DecodingError(err.to_string())
    }
}

impl From<time::error::ComponentRange> for CspCertError {
    fn from(err: time::error::ComponentRange) -> Self {
        CspCertError::TimeConversion(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CspCertError>;
