use bon::Builder;
use const_oid::ObjectIdentifier;
use time::{Duration, OffsetDateTime};

use crate::calendar::truncate_to_millisecond;
use crate::error::{CspCertError, Result};
use crate::provider::AT_SIGNATURE;

/// Well-known signature algorithms understood by the software provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// SHA-256 with RSA encryption.
    Sha256WithRSA,
    /// SHA-384 with RSA encryption.
    Sha384WithRSA,
    /// SHA-512 with RSA encryption.
    Sha512WithRSA,
    /// ECDSA over P-256 with SHA-256.
    Sha256WithECDSA,
    /// ECDSA over P-384 with SHA-384.
    Sha384WithECDSA,
    /// Pure Ed25519.
    Ed25519,
}

impl SignatureAlgorithm {
    /// The algorithm's object identifier.
    pub fn oid(self) -> ObjectIdentifier {
        match self {
            SignatureAlgorithm::Sha256WithRSA => const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION,
            SignatureAlgorithm::Sha384WithRSA => const_oid::db::rfc5912::SHA_384_WITH_RSA_ENCRYPTION,
            SignatureAlgorithm::Sha512WithRSA => const_oid::db::rfc5912::SHA_512_WITH_RSA_ENCRYPTION,
            SignatureAlgorithm::Sha256WithECDSA => const_oid::db::rfc5912::ECDSA_WITH_SHA_256,
            SignatureAlgorithm::Sha384WithECDSA => const_oid::db::rfc5912::ECDSA_WITH_SHA_384,
            SignatureAlgorithm::Ed25519 => const_oid::db::rfc8410::ID_ED_25519,
        }
    }

    /// Maps an object identifier back to a known algorithm.
    pub fn from_oid(oid: &ObjectIdentifier) -> Option<Self> {
        [
            SignatureAlgorithm::Sha256WithRSA,
            SignatureAlgorithm::Sha384WithRSA,
            SignatureAlgorithm::Sha512WithRSA,
            SignatureAlgorithm::Sha256WithECDSA,
            SignatureAlgorithm::Sha384WithECDSA,
            SignatureAlgorithm::Ed25519,
        ]
        .into_iter()
        .find(|alg| alg.oid() == *oid)
    }

    pub fn is_rsa(self) -> bool {
        matches!(
            self,
            SignatureAlgorithm::Sha256WithRSA
                | SignatureAlgorithm::Sha384WithRSA
                | SignatureAlgorithm::Sha512WithRSA
        )
    }
}

impl From<SignatureAlgorithm> for AlgorithmIdentifier {
    /// Converts a `SignatureAlgorithm` into an identifier without parameters.
    fn from(value: SignatureAlgorithm) -> Self {
        let oid = value.oid();
        AlgorithmIdentifier {
            object_id: oid.to_string(),
            oid,
            parameters: None,
        }
    }
}

/// A signature algorithm object identifier plus optional DER parameters.
///
/// Immutable once built. The parameters are opaque here; the provider decides
/// whether it can use them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlgorithmIdentifier {
    object_id: String,
    oid: ObjectIdentifier,
    parameters: Option<Vec<u8>>,
}

impl AlgorithmIdentifier {
    /// Builds an identifier from a dotted object identifier string.
    ///
    /// # Errors
    /// `InvalidAlgorithm` when `object_id` is empty or not a dotted OID.
    ///
    /// ```
    /// use cspcert::cert::params::AlgorithmIdentifier;
    ///
    /// let alg = AlgorithmIdentifier::build("1.2.840.10045.4.3.2", None).unwrap();
    /// assert!(alg.name().is_some());
    /// assert!(AlgorithmIdentifier::build("", None).is_err());
    /// ```
    pub fn build(object_id: &str, parameters: Option<Vec<u8>>) -> Result<Self> {
        let object_id = object_id.trim();
        if object_id.is_empty() {
            return Err(CspCertError::InvalidAlgorithm(
                "object identifier is empty".to_string(),
            ));
        }
        let oid = ObjectIdentifier::new(object_id).map_err(|e| {
            CspCertError::InvalidAlgorithm(format!("'{object_id}' is not an object identifier: {e}"))
        })?;
        Ok(Self {
            object_id: object_id.to_string(),
            oid,
            parameters,
        })
    }

    pub fn object_id(&self) -> &str {
        &self.object_id
    }

    pub fn oid(&self) -> ObjectIdentifier {
        self.oid
    }

    /// DER-encoded algorithm parameters, if any were supplied.
    pub fn parameters(&self) -> Option<&[u8]> {
        self.parameters.as_deref()
    }

    /// Registered name of the algorithm, when the OID database knows it.
    pub fn name(&self) -> Option<&'static str> {
        const_oid::db::DB.by_oid(&self.oid)
    }
}

/// Certificate validity period.
///
/// Always satisfies `not_before < not_after` at millisecond resolution, which
/// is the resolution the provider sees.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValidityPeriod {
    not_before: OffsetDateTime,
    not_after: OffsetDateTime,
}

impl ValidityPeriod {
    /// Creates a validity period, rejecting empty or inverted ranges.
    pub fn new(not_before: OffsetDateTime, not_after: OffsetDateTime) -> Result<Self> {
        if truncate_to_millisecond(not_before) >= truncate_to_millisecond(not_after) {
            return Err(CspCertError::InvalidValidity(format!(
                "not_before ({not_before}) must precede not_after ({not_after})"
            )));
        }
        Ok(Self {
            not_before,
            not_after,
        })
    }

    /// Creates a validity period starting now for the given number of days.
    pub fn for_days(days: i64) -> Result<Self> {
        let now = OffsetDateTime::now_utc();
        Self::new(now, now + Duration::days(days))
    }

    pub fn not_before(&self) -> OffsetDateTime {
        self.not_before
    }

    pub fn not_after(&self) -> OffsetDateTime {
        self.not_after
    }
}

/// Represents an X.509 extension handed to the provider untouched.
///
/// # Fields
/// * `oid` - The object identifier of the extension.
/// * `critical` - Indicates if the extension is critical.
/// * `value` - The DER-encoded value of the extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionParam {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    /// DER-encoded extension value
    pub value: Vec<u8>,
}

/// Where and how to open the provider context and generate the key.
///
/// # Fields
/// * `container_name` - Key container; `None` or empty for an ephemeral one.
/// * `provider_name` - Provider implementation; empty selects the default.
/// * `provider_type` - Algorithm family, e.g. [`crate::provider::PROV_RSA_AES`].
/// * `acquire_flags` - Context flags such as [`crate::provider::CRYPT_NEWKEYSET`].
/// * `key_algorithm` - Key algorithm, [`AT_SIGNATURE`] unless set.
/// * `key_spec_flags` - Key flags; the upper 16 bits hold the key length.
#[derive(Clone, Debug, Builder)]
pub struct ProviderParams {
    pub container_name: Option<String>,
    pub provider_name: String,
    pub provider_type: u32,
    #[builder(default)]
    pub acquire_flags: u32,
    #[builder(default = AT_SIGNATURE)]
    pub key_algorithm: u32,
    #[builder(default)]
    pub key_spec_flags: u32,
}

/// Everything one self-signed certificate needs.
///
/// # Fields
/// * `subject` - RFC 4514 distinguished name, used as subject and issuer.
/// * `not_before` / `not_after` - Validity bounds; any offset, stored as UTC.
/// * `signature_algorithm` - How the certificate is signed.
/// * `provider` - Context and key parameters.
/// * `extensions` - Extensions passed through to the provider.
#[derive(Clone, Debug, Builder)]
pub struct SelfSignedRequest {
    pub subject: String,
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
    pub signature_algorithm: AlgorithmIdentifier,
    pub provider: ProviderParams,
    #[builder(default)]
    pub extensions: Vec<ExtensionParam>,
}
