//! # cspcert - Self-Signed Certificates through a Cryptographic Service Provider
//!
//! cspcert creates self-signed X.509 certificates the way a native
//! cryptographic service provider does it: open a provider context, generate a
//! key pair inside it, encode the subject name, and ask the provider to build
//! the certificate and sign it with the key it just generated. Every provider
//! resource is owned by a scoped wrapper and released on every exit path, in
//! the order the provider needs: certificate memory, subject blob, key,
//! context.
//!
//! The provider is a trait ([`provider::CryptoProvider`]). The crate ships
//! [`provider::SoftwareProvider`], a pure Rust implementation built on the
//! RustCrypto libraries that speaks the same flags, algorithm ids and error
//! codes as CryptoAPI.
//!
//! ## Supported Key Types
//!
//! - **RSA**: 1024 to 16384 bits, 2048 by default (`PROV_RSA_FULL`,
//!   `PROV_RSA_SIG`, `PROV_RSA_AES`)
//! - **ECDSA**: P-256 and P-384 (`PROV_EC_ECDSA_SIG`)
//! - **Ed25519**: `CALG_ED25519` under `PROV_EC_ECDSA_SIG`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cspcert::{
//!     cert::params::{AlgorithmIdentifier, ProviderParams, SelfSignedRequest},
//!     factory::SelfSignedCertificateFactory,
//!     provider::{key_length_flags, software::SOFTWARE_PROVIDER_NAME, SoftwareProvider, CRYPT_NEWKEYSET, PROV_RSA_AES},
//! };
//! use time::macros::datetime;
//!
//! # fn main() -> Result<(), cspcert::error::CspCertError> {
//! let provider = SoftwareProvider::new();
//! let factory = SelfSignedCertificateFactory::new(&provider);
//!
//! let request = SelfSignedRequest::builder()
//!     .subject("CN=example.com,O=Example Corp,C=US".to_string())
//!     .not_before(datetime!(2024-01-01 0:00 UTC))
//!     .not_after(datetime!(2025-01-01 0:00 UTC))
//!     .signature_algorithm(AlgorithmIdentifier::build("1.2.840.113549.1.1.11", None)?)
//!     .provider(
//!         ProviderParams::builder()
//!             .container_name("example-container".to_string())
//!             .provider_name(SOFTWARE_PROVIDER_NAME.to_string())
//!             .provider_type(PROV_RSA_AES)
//!             .acquire_flags(CRYPT_NEWKEYSET)
//!             .key_spec_flags(key_length_flags(3072))
//!             .build(),
//!     )
//!     .build();
//!
//! let certificate = factory.create_self_signed(&request)?;
//! println!("{}", certificate.to_pem());
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every failure is one [`error::CspCertError`]. Errors raised by the provider
//! carry its native code unchanged together with the provider's description:
//!
//! ```rust
//! use cspcert::cert::params::{ProviderParams, SelfSignedRequest, SignatureAlgorithm};
//! use cspcert::error::CspCertError;
//! use cspcert::factory::SelfSignedCertificateFactory;
//! use cspcert::provider::{codes::NTE_KEYSET_NOT_DEF, SoftwareProvider, PROV_RSA_FULL};
//! use time::macros::datetime;
//!
//! let provider = SoftwareProvider::new();
//! let request = SelfSignedRequest::builder()
//!     .subject("CN=test".to_string())
//!     .not_before(datetime!(2024-01-01 0:00 UTC))
//!     .not_after(datetime!(2025-01-01 0:00 UTC))
//!     .signature_algorithm(SignatureAlgorithm::Sha256WithRSA.into())
//!     .provider(
//!         ProviderParams::builder()
//!             .provider_name("No Such Provider".to_string())
//!             .provider_type(PROV_RSA_FULL)
//!             .build(),
//!     )
//!     .build();
//!
//! match SelfSignedCertificateFactory::new(&provider).create_self_signed(&request) {
//!     Err(CspCertError::ProviderAcquisition { code, .. }) => assert_eq!(code, NTE_KEYSET_NOT_DEF),
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`factory`]: the create-and-self-sign pipeline and its timeout wrapper
//! - [`provider`]: the provider trait, handles, constants and native codes
//! - [`context`]: scoped provider contexts
//! - [`key`]: scoped key pairs bound to their context
//! - [`subject`]: distinguished names to subject/issuer blobs and back
//! - [`calendar`]: UTC instants, calendar fields and native ticks
//! - [`cert`]: certificate bytes and request parameters
//! - [`error`]: error types

pub mod calendar;
pub mod cert;
pub mod context;
pub mod error;
pub mod factory;
pub mod key;
pub mod pem_utils;
pub mod provider;
pub mod subject;
