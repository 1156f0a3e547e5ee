use ed25519_dalek::SigningKey as Ed25519SigningKey;
use p256::ecdsa::{SigningKey as P256SigningKey, VerifyingKey as P256VerifyingKey};
use p384::ecdsa::{SigningKey as P384SigningKey, VerifyingKey as P384VerifyingKey};
use rsa::pkcs1v15::SigningKey as RsaSigningKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Sha256, Sha384, Sha512};
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

use crate::cert::params::SignatureAlgorithm;
use crate::error::NativeCode;
use crate::provider::codes::{NTE_BAD_ALGID, NTE_BAD_FLAGS, NTE_FAIL};
use crate::provider::{
    AT_KEYEXCHANGE, AT_SIGNATURE, CALG_ECDSA, CALG_ED25519, CALG_RSA_KEYX, CALG_RSA_SIGN,
    PROV_EC_ECDSA_SIG, PROV_RSA_AES, PROV_RSA_FULL, PROV_RSA_SIG,
};

const DEFAULT_RSA_BITS: u32 = 2048;
const MIN_RSA_BITS: u32 = 1024;
const MAX_RSA_BITS: u32 = 16384;

/// What a key generation request resolves to for a given provider type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum KeySpec {
    Rsa(u32),
    EcdsaP256,
    EcdsaP384,
    Ed25519,
}

impl KeySpec {
    /// Resolves an algorithm id and key length (0 = default) against the
    /// provider type the context was opened with.
    pub(crate) fn resolve(provider_type: u32, algorithm: u32, bits: u32) -> Result<Self, NativeCode> {
        let rsa_family = matches!(provider_type, PROV_RSA_FULL | PROV_RSA_SIG | PROV_RSA_AES);
        let ec_family = provider_type == PROV_EC_ECDSA_SIG;
        let exchange = matches!(algorithm, AT_KEYEXCHANGE | CALG_RSA_KEYX);

        match algorithm {
            // signature-only providers cannot hold exchange keys
            _ if exchange && provider_type == PROV_RSA_SIG => Err(NTE_BAD_ALGID),
            AT_KEYEXCHANGE | AT_SIGNATURE | CALG_RSA_SIGN | CALG_RSA_KEYX if rsa_family => {
                Self::rsa(bits)
            }
            AT_SIGNATURE | CALG_ECDSA if ec_family => Self::ecdsa(bits),
            CALG_ED25519 if ec_family => match bits {
                0 | 255 | 256 => Ok(KeySpec::Ed25519),
                _ => Err(NTE_BAD_FLAGS),
            },
            _ => Err(NTE_BAD_ALGID),
        }
    }

    fn rsa(bits: u32) -> Result<Self, NativeCode> {
        let bits = if bits == 0 { DEFAULT_RSA_BITS } else { bits };
        if (MIN_RSA_BITS..=MAX_RSA_BITS).contains(&bits) && bits % 8 == 0 {
            Ok(KeySpec::Rsa(bits))
        } else {
            Err(NTE_BAD_FLAGS)
        }
    }

    fn ecdsa(bits: u32) -> Result<Self, NativeCode> {
        match bits {
            0 | 256 => Ok(KeySpec::EcdsaP256),
            384 => Ok(KeySpec::EcdsaP384),
            _ => Err(NTE_BAD_FLAGS),
        }
    }

    pub(crate) fn generate(self) -> Result<SoftwareKey, NativeCode> {
        match self {
            KeySpec::Rsa(bits) => SoftwareKey::generate_rsa(bits as usize),
            KeySpec::EcdsaP256 => Ok(SoftwareKey::generate_ecdsa_p256()),
            KeySpec::EcdsaP384 => Ok(SoftwareKey::generate_ecdsa_p384()),
            KeySpec::Ed25519 => Ok(SoftwareKey::generate_ed25519()),
        }
    }
}

/// Key material held by the software provider.
pub(crate) enum SoftwareKey {
    Rsa {
        private: Box<RsaPrivateKey>,
        public: RsaPublicKey,
    },
    EcdsaP256 {
        signing_key: P256SigningKey,
        verifying_key: P256VerifyingKey,
    },
    EcdsaP384 {
        signing_key: P384SigningKey,
        verifying_key: P384VerifyingKey,
    },
    Ed25519 {
        signing_key: Ed25519SigningKey,
    },
}

impl SoftwareKey {
    fn generate_rsa(bits: usize) -> Result<Self, NativeCode> {
        let mut rng = rand_core::OsRng;
        let private = RsaPrivateKey::new(&mut rng, bits).map_err(|_| NTE_FAIL)?;
        let public = RsaPublicKey::from(&private);
        Ok(SoftwareKey::Rsa {
            private: Box::new(private),
            public,
        })
    }

    fn generate_ecdsa_p256() -> Self {
        let mut rng = rand_core::OsRng;
        let signing_key = P256SigningKey::random(&mut rng);
        let verifying_key = *signing_key.verifying_key();
        SoftwareKey::EcdsaP256 {
            signing_key,
            verifying_key,
        }
    }

    fn generate_ecdsa_p384() -> Self {
        let mut rng = rand_core::OsRng;
        let signing_key = P384SigningKey::random(&mut rng);
        let verifying_key = *signing_key.verifying_key();
        SoftwareKey::EcdsaP384 {
            signing_key,
            verifying_key,
        }
    }

    fn generate_ed25519() -> Self {
        let mut rng = rand_core::OsRng;
        let signing_key = Ed25519SigningKey::generate(&mut rng);
        SoftwareKey::Ed25519 { signing_key }
    }

    /// Whether this key can produce signatures for `algorithm`.
    pub(crate) fn supports(&self, algorithm: SignatureAlgorithm) -> bool {
        match self {
            SoftwareKey::Rsa { .. } => algorithm.is_rsa(),
            SoftwareKey::EcdsaP256 { .. } => algorithm == SignatureAlgorithm::Sha256WithECDSA,
            SoftwareKey::EcdsaP384 { .. } => algorithm == SignatureAlgorithm::Sha384WithECDSA,
            SoftwareKey::Ed25519 { .. } => algorithm == SignatureAlgorithm::Ed25519,
        }
    }

    pub(crate) fn subject_public_key_info(&self) -> Result<SubjectPublicKeyInfoOwned, NativeCode> {
        match self {
            SoftwareKey::Rsa { public, .. } => {
                SubjectPublicKeyInfoOwned::from_key(public.clone()).map_err(|_| NTE_FAIL)
            }
            SoftwareKey::EcdsaP256 { verifying_key, .. } => {
                SubjectPublicKeyInfoOwned::from_key(*verifying_key).map_err(|_| NTE_FAIL)
            }
            SoftwareKey::EcdsaP384 { verifying_key, .. } => {
                SubjectPublicKeyInfoOwned::from_key(*verifying_key).map_err(|_| NTE_FAIL)
            }
            SoftwareKey::Ed25519 { signing_key } => {
                let pk_bytes = signing_key.verifying_key().to_bytes();
                Ok(SubjectPublicKeyInfoOwned {
                    algorithm: AlgorithmIdentifierOwned {
                        oid: const_oid::db::rfc8410::ID_ED_25519,
                        parameters: None,
                    },
                    subject_public_key: der::asn1::BitString::from_bytes(&pk_bytes)
                        .map_err(|_| NTE_FAIL)?,
                })
            }
        }
    }

    /// Signs `data` as `algorithm` requires: PKCS#1 v1.5 for RSA, DER-encoded
    /// `(r, s)` for ECDSA, raw 64 bytes for Ed25519.
    pub(crate) fn sign(&self, algorithm: SignatureAlgorithm, data: &[u8]) -> Result<Vec<u8>, NativeCode> {
        match (self, algorithm) {
            (SoftwareKey::Rsa { private, .. }, SignatureAlgorithm::Sha256WithRSA) => {
                let signing_key = RsaSigningKey::<Sha256>::new(private.as_ref().clone());
                Ok(signing_key.sign(data).to_vec())
            }
            (SoftwareKey::Rsa { private, .. }, SignatureAlgorithm::Sha384WithRSA) => {
                let signing_key = RsaSigningKey::<Sha384>::new(private.as_ref().clone());
                Ok(signing_key.sign(data).to_vec())
            }
            (SoftwareKey::Rsa { private, .. }, SignatureAlgorithm::Sha512WithRSA) => {
                let signing_key = RsaSigningKey::<Sha512>::new(private.as_ref().clone());
                Ok(signing_key.sign(data).to_vec())
            }
            (SoftwareKey::EcdsaP256 { signing_key, .. }, SignatureAlgorithm::Sha256WithECDSA) => {
                let signature: p256::ecdsa::Signature = signing_key.sign(data);
                Ok(signature.to_der().as_bytes().to_vec())
            }
            (SoftwareKey::EcdsaP384 { signing_key, .. }, SignatureAlgorithm::Sha384WithECDSA) => {
                let signature: p384::ecdsa::Signature = signing_key.sign(data);
                Ok(signature.to_der().as_bytes().to_vec())
            }
            (SoftwareKey::Ed25519 { signing_key }, SignatureAlgorithm::Ed25519) => {
                let signature: ed25519_dalek::Signature = signing_key.sign(data);
                Ok(signature.to_bytes().to_vec())
            }
            _ => Err(NTE_BAD_ALGID),
        }
    }
}
