pub mod params;

use der::Decode;
use sha1::{Digest, Sha1};

use crate::error::Result;
use crate::pem_utils::der_to_pem;

/// PEM label for certificates.
pub const PEM_LABEL: &str = "CERTIFICATE";

/// An encoded certificate owned by the caller.
///
/// The bytes are a copy taken out of provider-owned memory, so they stay
/// valid after every provider resource has been released. The encoding is
/// whatever the provider produced (DER for [`crate::provider::SoftwareProvider`]).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CertificateBytes {
    data: Vec<u8>,
}

impl CertificateBytes {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Encodes the certificate into PEM format.
    ///
    /// # Returns
    /// A string containing the PEM-encoded certificate.
    pub fn to_pem(&self) -> String {
        der_to_pem(&self.data, PEM_LABEL)
    }

    /// SHA-1 over the encoded certificate, the thumbprint certificate stores
    /// index by.
    pub fn thumbprint(&self) -> [u8; 20] {
        Sha1::digest(&self.data).into()
    }

    /// Upper-case hex rendering of [`CertificateBytes::thumbprint`].
    pub fn thumbprint_hex(&self) -> String {
        self.thumbprint()
            .iter()
            .map(|byte| format!("{byte:02X}"))
            .collect()
    }

    /// Parses the bytes as an X.509 certificate.
    ///
    /// # Returns
    /// The decoded certificate, or `DecodingError` when the bytes are not DER.
    pub fn decode(&self) -> Result<x509_cert::Certificate> {
        Ok(x509_cert::Certificate::from_der(&self.data)?)
    }
}

impl AsRef<[u8]> for CertificateBytes {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl From<CertificateBytes> for Vec<u8> {
    fn from(value: CertificateBytes) -> Self {
        value.data
    }
}
