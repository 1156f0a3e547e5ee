//! Distinguished names in the provider's binary form.
//!
//! The provider takes a subject as a DER-encoded X.501 `Name` wrapped in a
//! length-prefixed blob. Strings use RFC 4514 syntax, most specific RDN first:
//! `CN=host,O=Example,C=US`.

use core::str::FromStr;

use der::{Decode, Encode};
use x509_cert::name::{Name, RdnSequence};

use crate::error::{CspCertError, Result};
use crate::provider::codes::{CRYPT_E_ASN1_BADTAG, CRYPT_E_INVALID_X500_STRING};

/// A DER-encoded name used as both subject and issuer of a self-signed
/// certificate.
///
/// The buffer is owned by whoever holds the blob and is released when the
/// blob is dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubjectIssuerBlob {
    length: u32,
    data: Vec<u8>,
}

impl SubjectIssuerBlob {
    /// Wraps already-encoded bytes. The length must fit the provider's 32-bit field.
    pub fn from_der(data: Vec<u8>) -> Result<Self> {
        let length = u32::try_from(data.len()).map_err(|_| CspCertError::BlobEncoding {
            code: CRYPT_E_INVALID_X500_STRING,
            detail: format!("encoded name of {} bytes is too large", data.len()),
        })?;
        Ok(Self { length, data })
    }

    pub fn len(&self) -> u32 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

/// Encodes distinguished-name strings into [`SubjectIssuerBlob`]s and back.
pub struct SubjectBlobCodec;

impl SubjectBlobCodec {
    /// Encodes an RFC 4514 distinguished name.
    ///
    /// ```
    /// use cspcert::subject::SubjectBlobCodec;
    ///
    /// let blob = SubjectBlobCodec::encode("CN=test,O=Example").unwrap();
    /// assert_eq!(SubjectBlobCodec::decode(&blob).unwrap(), "CN=test,O=Example");
    /// assert!(SubjectBlobCodec::encode("not a name").is_err());
    /// ```
    pub fn encode(distinguished_name: &str) -> Result<SubjectIssuerBlob> {
        if distinguished_name.trim().is_empty() {
            return Err(CspCertError::BlobEncoding {
                code: CRYPT_E_INVALID_X500_STRING,
                detail: "distinguished name is empty".to_string(),
            });
        }
        let name = RdnSequence::from_str(distinguished_name).map_err(|e| {
            CspCertError::BlobEncoding {
                code: CRYPT_E_INVALID_X500_STRING,
                detail: format!("'{distinguished_name}': {e}"),
            }
        })?;
        let der = name.to_der().map_err(|e| CspCertError::BlobEncoding {
            code: CRYPT_E_INVALID_X500_STRING,
            detail: e.to_string(),
        })?;
        SubjectIssuerBlob::from_der(der)
    }

    /// Renders a blob back into an RFC 4514 string.
    pub fn decode(blob: &SubjectIssuerBlob) -> Result<String> {
        Self::decode_name(blob).map(|name| name.to_string())
    }

    /// Parses a blob into a structured name.
    pub fn decode_name(blob: &SubjectIssuerBlob) -> Result<Name> {
        Name::from_der(blob.data()).map_err(|e| CspCertError::BlobEncoding {
            code: CRYPT_E_ASN1_BADTAG,
            detail: e.to_string(),
        })
    }
}
