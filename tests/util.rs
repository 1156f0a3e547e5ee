#![allow(dead_code)]

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use cspcert::calendar::CalendarTime;
use cspcert::cert::params::{
    AlgorithmIdentifier, ExtensionParam, ProviderParams, SelfSignedRequest, SignatureAlgorithm,
};
use cspcert::error::NativeCode;
use cspcert::provider::software::SOFTWARE_PROVIDER_NAME;
use cspcert::provider::{
    CALG_ED25519, CRYPT_VERIFYCONTEXT, CertificateHandle, ContextHandle, CryptoProvider,
    KeyHandle, PROV_EC_ECDSA_SIG, PROV_RSA_AES, SoftwareProvider, key_length_flags,
};
use cspcert::subject::SubjectIssuerBlob;
use time::macros::datetime;

/// Installs a test-friendly subscriber; `RUST_LOG=debug` shows provider traffic.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Ephemeral ECDSA P-256 context parameters.
pub fn ec_params() -> ProviderParams {
    ProviderParams::builder()
        .provider_name(SOFTWARE_PROVIDER_NAME.to_string())
        .provider_type(PROV_EC_ECDSA_SIG)
        .acquire_flags(CRYPT_VERIFYCONTEXT)
        .build()
}

/// Ephemeral Ed25519 context parameters.
pub fn ed25519_params() -> ProviderParams {
    ProviderParams::builder()
        .provider_name(SOFTWARE_PROVIDER_NAME.to_string())
        .provider_type(PROV_EC_ECDSA_SIG)
        .acquire_flags(CRYPT_VERIFYCONTEXT)
        .key_algorithm(CALG_ED25519)
        .build()
}

/// Ephemeral RSA context parameters with the given modulus size.
pub fn rsa_params(bits: u16) -> ProviderParams {
    ProviderParams::builder()
        .provider_name(SOFTWARE_PROVIDER_NAME.to_string())
        .provider_type(PROV_RSA_AES)
        .acquire_flags(CRYPT_VERIFYCONTEXT)
        .key_spec_flags(key_length_flags(bits))
        .build()
}

/// A request valid for calendar year 2024.
pub fn request(
    subject: &str,
    provider: ProviderParams,
    algorithm: AlgorithmIdentifier,
) -> SelfSignedRequest {
    SelfSignedRequest::builder()
        .subject(subject.to_string())
        .not_before(datetime!(2024-01-01 0:00 UTC))
        .not_after(datetime!(2025-01-01 0:00 UTC))
        .signature_algorithm(algorithm)
        .provider(provider)
        .build()
}

pub fn ecdsa_request(subject: &str) -> SelfSignedRequest {
    request(subject, ec_params(), SignatureAlgorithm::Sha256WithECDSA.into())
}

/// Provider calls observed by [`RecordingProvider`], in call order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    AcquireContext,
    ReleaseContext,
    GenerateKey,
    DestroyKey,
    CreateCertificate,
    ReadCertificate,
    FreeCertificate,
}

/// Wraps a [`SoftwareProvider`], logging every call and optionally failing
/// one of them with a chosen code.
pub struct RecordingProvider {
    pub inner: SoftwareProvider,
    events: Mutex<Vec<Event>>,
    failure: Option<(Event, NativeCode)>,
    key_delay: Duration,
}

impl RecordingProvider {
    pub fn new() -> Self {
        Self {
            inner: SoftwareProvider::new(),
            events: Mutex::new(Vec::new()),
            failure: None,
            key_delay: Duration::ZERO,
        }
    }

    pub fn failing_at(event: Event, code: NativeCode) -> Self {
        Self {
            failure: Some((event, code)),
            ..Self::new()
        }
    }

    pub fn with_key_delay(delay: Duration) -> Self {
        Self {
            key_delay: delay,
            ..Self::new()
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn position(&self, event: Event) -> Option<usize> {
        self.events().iter().position(|e| *e == event)
    }

    fn record(&self, event: Event) -> Result<(), NativeCode> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
        match self.failure {
            Some((failing, code)) if failing == event => Err(code),
            _ => Ok(()),
        }
    }
}

impl CryptoProvider for RecordingProvider {
    fn acquire_context(
        &self,
        container: Option<&str>,
        provider_name: &str,
        provider_type: u32,
        flags: u32,
    ) -> Result<ContextHandle, NativeCode> {
        self.record(Event::AcquireContext)?;
        self.inner
            .acquire_context(container, provider_name, provider_type, flags)
    }

    fn release_context(&self, context: ContextHandle) -> Result<(), NativeCode> {
        self.record(Event::ReleaseContext)?;
        self.inner.release_context(context)
    }

    fn generate_key(
        &self,
        context: ContextHandle,
        algorithm: u32,
        flags: u32,
    ) -> Result<KeyHandle, NativeCode> {
        self.record(Event::GenerateKey)?;
        std::thread::sleep(self.key_delay);
        self.inner.generate_key(context, algorithm, flags)
    }

    fn destroy_key(&self, key: KeyHandle) -> Result<(), NativeCode> {
        self.record(Event::DestroyKey)?;
        self.inner.destroy_key(key)
    }

    fn create_self_signed_certificate(
        &self,
        context: ContextHandle,
        key: KeyHandle,
        subject_issuer: &SubjectIssuerBlob,
        signature_algorithm: &AlgorithmIdentifier,
        start: &CalendarTime,
        end: &CalendarTime,
        extensions: &[ExtensionParam],
    ) -> Result<CertificateHandle, NativeCode> {
        self.record(Event::CreateCertificate)?;
        self.inner.create_self_signed_certificate(
            context,
            key,
            subject_issuer,
            signature_algorithm,
            start,
            end,
            extensions,
        )
    }

    fn encoded_certificate_len(&self, certificate: CertificateHandle) -> Result<usize, NativeCode> {
        self.inner.encoded_certificate_len(certificate)
    }

    fn read_certificate(
        &self,
        certificate: CertificateHandle,
        out: &mut [u8],
    ) -> Result<usize, NativeCode> {
        self.record(Event::ReadCertificate)?;
        self.inner.read_certificate(certificate, out)
    }

    fn free_certificate(&self, certificate: CertificateHandle) -> Result<(), NativeCode> {
        self.record(Event::FreeCertificate)?;
        self.inner.free_certificate(certificate)
    }

    fn error_message(&self, code: NativeCode) -> String {
        self.inner.error_message(code)
    }
}
