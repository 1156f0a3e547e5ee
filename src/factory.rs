use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, info_span, warn};

use crate::calendar::to_provider_time;
use crate::cert::CertificateBytes;
use crate::cert::params::{SelfSignedRequest, ValidityPeriod};
use crate::context::ProviderContext;
use crate::error::{CspCertError, NativeCode, Result};
use crate::key::KeyPairHandle;
use crate::provider::{CertificateHandle, CryptoProvider};
use crate::subject::SubjectBlobCodec;

/// Creates self-signed certificates through a [`CryptoProvider`].
///
/// Each call opens its own context, so one factory may serve many threads at
/// once; nothing is cached between calls.
///
/// ```
/// use cspcert::cert::params::{ProviderParams, SelfSignedRequest, SignatureAlgorithm};
/// use cspcert::factory::SelfSignedCertificateFactory;
/// use cspcert::provider::{SoftwareProvider, CRYPT_VERIFYCONTEXT, PROV_EC_ECDSA_SIG};
/// use cspcert::provider::software::SOFTWARE_PROVIDER_NAME;
/// use time::macros::datetime;
///
/// let provider = SoftwareProvider::new();
/// let factory = SelfSignedCertificateFactory::new(&provider);
/// let request = SelfSignedRequest::builder()
///     .subject("CN=example.com".to_string())
///     .not_before(datetime!(2024-01-01 0:00 UTC))
///     .not_after(datetime!(2025-01-01 0:00 UTC))
///     .signature_algorithm(SignatureAlgorithm::Sha256WithECDSA.into())
///     .provider(
///         ProviderParams::builder()
///             .provider_name(SOFTWARE_PROVIDER_NAME.to_string())
///             .provider_type(PROV_EC_ECDSA_SIG)
///             .acquire_flags(CRYPT_VERIFYCONTEXT)
///             .build(),
///     )
///     .build();
///
/// let certificate = factory.create_self_signed(&request).unwrap();
/// assert!(!certificate.is_empty());
/// ```
pub struct SelfSignedCertificateFactory<'p, P: CryptoProvider + ?Sized> {
    provider: &'p P,
}

impl<'p, P: CryptoProvider + ?Sized> SelfSignedCertificateFactory<'p, P> {
    pub fn new(provider: &'p P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &'p P {
        self.provider
    }

    /// Creates one self-signed certificate.
    ///
    /// The validity period is checked before the provider is touched. After
    /// that the context is acquired, a key generated in it, the subject
    /// encoded, and the provider asked to build and sign the certificate with
    /// that key. The result is copied out of provider memory before anything
    /// is released. Resources are released in reverse order on every path:
    /// certificate memory, subject blob, key, context.
    ///
    /// Exactly one of the certificate or an error comes back; nothing is
    /// retried.
    pub fn create_self_signed(&self, request: &SelfSignedRequest) -> Result<CertificateBytes> {
        let span = info_span!("create_self_signed", subject = %request.subject);
        let _entered = span.enter();

        let validity = ValidityPeriod::new(request.not_before, request.not_after)?;
        let start = to_provider_time(validity.not_before())?;
        let end = to_provider_time(validity.not_after())?;

        let params = &request.provider;
        let mut context = ProviderContext::acquire_with(self.provider, params)?;
        let mut key = KeyPairHandle::generate(&context, params.key_algorithm, params.key_spec_flags)?;
        let subject_issuer = SubjectBlobCodec::encode(&request.subject)?;

        let created = self.provider.create_self_signed_certificate(
            context.handle().map_err(|code| self.creation_error(code))?,
            key.handle().map_err(|code| self.creation_error(code))?,
            &subject_issuer,
            &request.signature_algorithm,
            &start,
            &end,
            &request.extensions,
        );
        let certificate = ProviderCertificate {
            provider: self.provider,
            handle: created.map_err(|code| self.creation_error(code))?,
        };
        let bytes = certificate.copy_out().map_err(|code| self.creation_error(code))?;

        drop(certificate);
        drop(subject_issuer);
        key.destroy()?;
        drop(key);
        context.release()?;

        info!(
            len = bytes.len(),
            thumbprint = %bytes.thumbprint_hex(),
            algorithm = request.signature_algorithm.object_id(),
            "created self-signed certificate"
        );
        Ok(bytes)
    }

    fn creation_error(&self, code: NativeCode) -> CspCertError {
        CspCertError::CertificateCreation {
            code,
            message: self.provider.error_message(code),
        }
    }
}

/// Runs [`SelfSignedCertificateFactory::create_self_signed`] on a worker
/// thread and stops waiting after `timeout`.
///
/// Provider calls cannot be interrupted. On timeout the worker is abandoned,
/// not killed: it runs to completion in the background and releases its own
/// resources, and its result is discarded.
pub fn create_self_signed_with_timeout<P>(
    provider: Arc<P>,
    request: SelfSignedRequest,
    timeout: Duration,
) -> Result<CertificateBytes>
where
    P: CryptoProvider + ?Sized + 'static,
{
    let (sender, receiver) = mpsc::sync_channel(1);
    thread::Builder::new()
        .name("cspcert-worker".to_string())
        .spawn(move || {
            let result = SelfSignedCertificateFactory::new(provider.as_ref()).create_self_signed(&request);
            // the receiver is gone once the caller has timed out
            let _ = sender.send(result);
        })
        .map_err(|e| CspCertError::Worker(format!("failed to spawn: {e}")))?;

    match receiver.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => {
            warn!(?timeout, "abandoning certificate creation after timeout");
            Err(CspCertError::TimedOut(timeout))
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(CspCertError::Worker(
            "exited without a result".to_string(),
        )),
    }
}

/// Certificate memory owned by the provider, freed on drop.
struct ProviderCertificate<'p, P: CryptoProvider + ?Sized> {
    provider: &'p P,
    handle: CertificateHandle,
}

impl<P: CryptoProvider + ?Sized> ProviderCertificate<'_, P> {
    /// Copies the encoding into caller-owned memory with the size-then-fill
    /// protocol.
    fn copy_out(&self) -> std::result::Result<CertificateBytes, NativeCode> {
        let len = self.provider.encoded_certificate_len(self.handle)?;
        let mut data = vec![0u8; len];
        let written = self.provider.read_certificate(self.handle, &mut data)?;
        data.truncate(written);
        debug!(certificate = self.handle.0, len = written, "copied certificate out of provider memory");
        Ok(CertificateBytes::new(data))
    }
}

impl<P: CryptoProvider + ?Sized> Drop for ProviderCertificate<'_, P> {
    fn drop(&mut self) {
        match self.provider.free_certificate(self.handle) {
            Ok(()) => debug!(certificate = self.handle.0, "freed provider certificate"),
            Err(code) => warn!(
                certificate = self.handle.0,
                %code,
                "failed to free provider certificate: {}",
                self.provider.error_message(code)
            ),
        }
    }
}
