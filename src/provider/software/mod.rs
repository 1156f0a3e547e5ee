//! A cryptographic service provider implemented in pure Rust.
//!
//! [`SoftwareProvider`] keeps every context, key and certificate in handle
//! tables, hands out opaque numeric handles, and reports failures with the
//! same native codes a CryptoAPI provider would. Key material and signatures
//! come from the RustCrypto crates (`rsa`, `p256`, `p384`, `ed25519-dalek`);
//! certificates are assembled with `x509-cert`.
//!
//! Slow work (RSA key generation, signing) runs outside the table lock, so
//! independent contexts make progress in parallel.

mod keys;
mod tbs;

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace};

use self::keys::{KeySpec, SoftwareKey};
use super::codes::*;
use super::{
    CRYPT_ARCHIVABLE, CRYPT_EXPORTABLE, CRYPT_MACHINE_KEYSET, CRYPT_NEWKEYSET, CRYPT_SILENT,
    CRYPT_USER_PROTECTED, CRYPT_VERIFYCONTEXT, CertificateHandle, ContextHandle, CryptoProvider,
    KeyHandle, PROV_EC_ECDSA_SIG, PROV_RSA_AES, PROV_RSA_FULL, PROV_RSA_SIG, key_length_from_flags,
    os_error_message,
};
use crate::calendar::CalendarTime;
use crate::cert::params::{AlgorithmIdentifier, ExtensionParam};
use crate::error::NativeCode;
use crate::subject::SubjectIssuerBlob;

/// Name the default [`SoftwareProvider`] registers under.
pub const SOFTWARE_PROVIDER_NAME: &str = "Software Cryptographic Provider";

const ACQUIRE_FLAGS: u32 = CRYPT_VERIFYCONTEXT | CRYPT_NEWKEYSET | CRYPT_MACHINE_KEYSET | CRYPT_SILENT;
const KEY_OPTION_FLAGS: u32 = CRYPT_EXPORTABLE | CRYPT_USER_PROTECTED | CRYPT_ARCHIVABLE;

/// Counts of handles currently open on a [`SoftwareProvider`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OpenHandles {
    pub contexts: usize,
    pub keys: usize,
    pub certificates: usize,
}

struct ContextEntry {
    provider_type: u32,
    live_keys: usize,
}

struct KeyEntry {
    context: u64,
    material: Arc<SoftwareKey>,
}

#[derive(Default)]
struct ProviderState {
    containers: HashSet<String>,
    contexts: HashMap<u64, ContextEntry>,
    keys: HashMap<u64, KeyEntry>,
    certificates: HashMap<u64, Vec<u8>>,
}

/// A thread-safe, in-process cryptographic provider.
///
/// ```
/// use cspcert::provider::{CryptoProvider, SoftwareProvider, CRYPT_VERIFYCONTEXT, PROV_EC_ECDSA_SIG};
/// use cspcert::provider::software::SOFTWARE_PROVIDER_NAME;
///
/// let provider = SoftwareProvider::new();
/// let ctx = provider
///     .acquire_context(None, SOFTWARE_PROVIDER_NAME, PROV_EC_ECDSA_SIG, CRYPT_VERIFYCONTEXT)
///     .unwrap();
/// provider.release_context(ctx).unwrap();
/// assert_eq!(provider.open_handles().contexts, 0);
/// ```
pub struct SoftwareProvider {
    name: String,
    provider_types: Vec<u32>,
    state: Mutex<ProviderState>,
    next_handle: AtomicU64,
}

impl Default for SoftwareProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareProvider {
    /// Registers [`SOFTWARE_PROVIDER_NAME`] for the RSA and ECDSA provider types.
    pub fn new() -> Self {
        Self::with_registration(
            SOFTWARE_PROVIDER_NAME,
            &[PROV_RSA_FULL, PROV_RSA_SIG, PROV_RSA_AES, PROV_EC_ECDSA_SIG],
        )
    }

    /// Registers under a custom name for a subset of provider types.
    pub fn with_registration(name: &str, provider_types: &[u32]) -> Self {
        Self {
            name: name.to_string(),
            provider_types: provider_types.to_vec(),
            state: Mutex::new(ProviderState::default()),
            next_handle: AtomicU64::new(1),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn open_handles(&self) -> OpenHandles {
        let state = self.state();
        OpenHandles {
            contexts: state.contexts.len(),
            keys: state.keys.len(),
            certificates: state.certificates.len(),
        }
    }

    /// Whether a named key container exists (in the user namespace unless
    /// `machine` is set).
    pub fn has_container(&self, name: &str, machine: bool) -> bool {
        self.state().containers.contains(&container_key(name, machine))
    }

    fn state(&self) -> MutexGuard<'_, ProviderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_handle(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::Relaxed)
    }
}

fn container_key(name: &str, machine: bool) -> String {
    if machine {
        format!("machine\\{name}")
    } else {
        format!("user\\{name}")
    }
}

impl CryptoProvider for SoftwareProvider {
    fn acquire_context(
        &self,
        container: Option<&str>,
        provider_name: &str,
        provider_type: u32,
        flags: u32,
    ) -> Result<ContextHandle, NativeCode> {
        if flags & !ACQUIRE_FLAGS != 0 {
            return Err(NTE_BAD_FLAGS);
        }
        if !provider_name.is_empty() && provider_name != self.name {
            return Err(NTE_KEYSET_NOT_DEF);
        }
        if !self.provider_types.contains(&provider_type) {
            return Err(NTE_PROV_TYPE_NO_MATCH);
        }

        let ephemeral = flags & CRYPT_VERIFYCONTEXT == CRYPT_VERIFYCONTEXT;
        let container = container.filter(|name| !name.is_empty());
        let mut state = self.state();
        match (container, ephemeral) {
            (Some(_), true) => return Err(NTE_BAD_FLAGS),
            (None, _) => {}
            (Some(name), false) => {
                let key = container_key(name, flags & CRYPT_MACHINE_KEYSET != 0);
                if flags & CRYPT_NEWKEYSET != 0 {
                    if !state.containers.insert(key) {
                        return Err(NTE_EXISTS);
                    }
                } else if !state.containers.contains(&key) {
                    return Err(NTE_BAD_KEYSET);
                }
            }
        }

        let handle = self.next_handle();
        state.contexts.insert(
            handle,
            ContextEntry {
                provider_type,
                live_keys: 0,
            },
        );
        trace!(context = handle, ?container, "software provider opened context");
        Ok(ContextHandle(handle))
    }

    fn release_context(&self, context: ContextHandle) -> Result<(), NativeCode> {
        let mut state = self.state();
        let entry = state.contexts.get(&context.0).ok_or(NTE_BAD_UID)?;
        if entry.live_keys > 0 {
            debug!(
                context = context.0,
                live_keys = entry.live_keys,
                "refusing to release a context that still owns keys"
            );
            return Err(ERROR_BUSY);
        }
        state.contexts.remove(&context.0);
        Ok(())
    }

    fn generate_key(
        &self,
        context: ContextHandle,
        algorithm: u32,
        flags: u32,
    ) -> Result<KeyHandle, NativeCode> {
        let options = flags & 0xFFFF;
        // no user interface to confirm protected keys
        if options & !KEY_OPTION_FLAGS != 0 || options & CRYPT_USER_PROTECTED != 0 {
            return Err(NTE_BAD_FLAGS);
        }
        let provider_type = self
            .state()
            .contexts
            .get(&context.0)
            .map(|entry| entry.provider_type)
            .ok_or(NTE_BAD_UID)?;

        let spec = KeySpec::resolve(provider_type, algorithm, key_length_from_flags(flags))?;
        let material = Arc::new(spec.generate()?);

        let mut state = self.state();
        let entry = state.contexts.get_mut(&context.0).ok_or(NTE_BAD_UID)?;
        entry.live_keys += 1;
        let handle = self.next_handle();
        state.keys.insert(
            handle,
            KeyEntry {
                context: context.0,
                material,
            },
        );
        trace!(context = context.0, key = handle, ?spec, "software provider generated key");
        Ok(KeyHandle(handle))
    }

    fn destroy_key(&self, key: KeyHandle) -> Result<(), NativeCode> {
        let mut state = self.state();
        let entry = state.keys.remove(&key.0).ok_or(NTE_BAD_KEY)?;
        if let Some(context) = state.contexts.get_mut(&entry.context) {
            context.live_keys = context.live_keys.saturating_sub(1);
        }
        Ok(())
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
        let material = {
            let state = self.state();
            if !state.contexts.contains_key(&context.0) {
                return Err(NTE_BAD_UID);
            }
            let entry = state.keys.get(&key.0).ok_or(NTE_BAD_KEY)?;
            if entry.context != context.0 {
                return Err(NTE_BAD_KEY);
            }
            Arc::clone(&entry.material)
        };

        let encoded = tbs::build_self_signed(
            &material,
            subject_issuer,
            signature_algorithm,
            start,
            end,
            extensions,
        )?;

        let handle = self.next_handle();
        trace!(certificate = handle, len = encoded.len(), "software provider created certificate");
        self.state().certificates.insert(handle, encoded);
        Ok(CertificateHandle(handle))
    }

    fn encoded_certificate_len(&self, certificate: CertificateHandle) -> Result<usize, NativeCode> {
        self.state()
            .certificates
            .get(&certificate.0)
            .map(Vec::len)
            .ok_or(ERROR_INVALID_PARAMETER)
    }

    fn read_certificate(
        &self,
        certificate: CertificateHandle,
        out: &mut [u8],
    ) -> Result<usize, NativeCode> {
        let state = self.state();
        let encoded = state
            .certificates
            .get(&certificate.0)
            .ok_or(ERROR_INVALID_PARAMETER)?;
        let target = out.get_mut(..encoded.len()).ok_or(ERROR_INSUFFICIENT_BUFFER)?;
        target.copy_from_slice(encoded);
        Ok(encoded.len())
    }

    fn free_certificate(&self, certificate: CertificateHandle) -> Result<(), NativeCode> {
        self.state()
            .certificates
            .remove(&certificate.0)
            .map(|_| ())
            .ok_or(ERROR_INVALID_PARAMETER)
    }

    fn error_message(&self, code: NativeCode) -> String {
        let message = match code {
            NTE_BAD_UID => "Bad UID.",
            NTE_BAD_KEY => "Bad Key.",
            NTE_BAD_ALGID => "Invalid algorithm specified.",
            NTE_BAD_FLAGS => "Invalid flags specified.",
            NTE_EXISTS => "Object already exists.",
            NTE_BAD_PROV_TYPE => "Invalid provider type specified.",
            NTE_BAD_KEYSET => "Keyset does not exist.",
            NTE_KEYSET_NOT_DEF => "The requested provider does not exist.",
            NTE_PROV_TYPE_NO_MATCH => "Provider type does not match registered value.",
            NTE_FAIL => "An internal error occurred.",
            CRYPT_E_INVALID_X500_STRING => "The string contains an invalid X500 name attribute key, oid, value or delimiter.",
            CRYPT_E_ASN1_BADTAG => "ASN1 bad tag value met.",
            ERROR_BUSY => "The requested resource is in use.",
            ERROR_INSUFFICIENT_BUFFER => "The data area passed to a system call is too small.",
            ERROR_INVALID_PARAMETER => "The parameter is incorrect.",
            other => return os_error_message(other),
        };
        message.to_string()
    }
}
