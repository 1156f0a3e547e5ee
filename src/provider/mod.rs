//! The native cryptographic provider seam.
//!
//! [`CryptoProvider`] is the capability surface the rest of the crate calls
//! through: open/close a context, generate/destroy a key, create a
//! self-signed certificate in provider-owned memory, copy it out, free it,
//! and describe an error code. Handles are opaque numbers owned by the
//! provider; the RAII wrappers in [`crate::context`] and [`crate::key`] make
//! sure each one is given back.
//!
//! The constants below use the CryptoAPI values so that parameters written
//! for a Windows provider carry over unchanged.

pub mod software;

use crate::calendar::CalendarTime;
use crate::cert::params::{AlgorithmIdentifier, ExtensionParam};
use crate::error::NativeCode;
use crate::subject::SubjectIssuerBlob;

pub use software::SoftwareProvider;

/// Opaque handle to an open provider context.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct ContextHandle(pub u64);

/// Opaque handle to a key living inside a provider context.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct KeyHandle(pub u64);

/// Opaque handle to a certificate held in provider-owned memory.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct CertificateHandle(pub u64);

// Context acquisition flags.
pub const CRYPT_VERIFYCONTEXT: u32 = 0xF000_0000;
pub const CRYPT_NEWKEYSET: u32 = 0x0000_0008;
pub const CRYPT_MACHINE_KEYSET: u32 = 0x0000_0020;
pub const CRYPT_SILENT: u32 = 0x0000_0040;

// Key generation flags. The upper 16 bits carry the key length.
pub const CRYPT_EXPORTABLE: u32 = 0x0000_0001;
pub const CRYPT_USER_PROTECTED: u32 = 0x0000_0002;
pub const CRYPT_ARCHIVABLE: u32 = 0x0000_4000;

// Key algorithms.
pub const AT_KEYEXCHANGE: u32 = 1;
pub const AT_SIGNATURE: u32 = 2;
pub const CALG_RSA_SIGN: u32 = 0x0000_2400;
pub const CALG_RSA_KEYX: u32 = 0x0000_a400;
pub const CALG_ECDSA: u32 = 0x0000_2203;
/// Not a registered CryptoAPI identifier; understood by [`SoftwareProvider`].
pub const CALG_ED25519: u32 = 0x0000_2250;

// Provider types.
pub const PROV_RSA_FULL: u32 = 1;
pub const PROV_RSA_SIG: u32 = 2;
pub const PROV_EC_ECDSA_SIG: u32 = 14;
pub const PROV_RSA_AES: u32 = 24;

/// Packs a key length in bits into the upper half of the key flags.
pub const fn key_length_flags(bits: u16) -> u32 {
    (bits as u32) << 16
}

/// Extracts the key length in bits from key flags; 0 means provider default.
pub const fn key_length_from_flags(flags: u32) -> u32 {
    flags >> 16
}

/// Native error codes reported by providers.
pub mod codes {
    use crate::error::NativeCode;

    pub const ERROR_INVALID_PARAMETER: NativeCode = NativeCode(87);
    pub const ERROR_INSUFFICIENT_BUFFER: NativeCode = NativeCode(122);
    pub const ERROR_BUSY: NativeCode = NativeCode(170);
    pub const NTE_BAD_UID: NativeCode = NativeCode(0x8009_0001);
    pub const NTE_BAD_KEY: NativeCode = NativeCode(0x8009_0003);
    pub const NTE_BAD_ALGID: NativeCode = NativeCode(0x8009_0008);
    pub const NTE_BAD_FLAGS: NativeCode = NativeCode(0x8009_0009);
    pub const NTE_EXISTS: NativeCode = NativeCode(0x8009_000F);
    pub const NTE_BAD_PROV_TYPE: NativeCode = NativeCode(0x8009_0014);
    pub const NTE_BAD_KEYSET: NativeCode = NativeCode(0x8009_0016);
    pub const NTE_KEYSET_NOT_DEF: NativeCode = NativeCode(0x8009_0019);
    pub const NTE_PROV_TYPE_NO_MATCH: NativeCode = NativeCode(0x8009_001B);
    pub const NTE_FAIL: NativeCode = NativeCode(0x8009_0020);
    pub const CRYPT_E_INVALID_X500_STRING: NativeCode = NativeCode(0x8009_2023);
    pub const CRYPT_E_ASN1_BADTAG: NativeCode = NativeCode(0x8009_310B);
}

/// A handle-based cryptographic service provider.
///
/// Implementations must be safe to call from many threads at once as long as
/// each thread works on its own handles. A single context and the keys derived
/// from it are never used from two threads simultaneously by this crate.
pub trait CryptoProvider: Send + Sync {
    /// Opens a context on `container` (None or empty for an ephemeral one).
    fn acquire_context(
        &self,
        container: Option<&str>,
        provider_name: &str,
        provider_type: u32,
        flags: u32,
    ) -> Result<ContextHandle, NativeCode>;

    /// Closes a context. Every key generated in it must be destroyed first.
    fn release_context(&self, context: ContextHandle) -> Result<(), NativeCode>;

    /// Generates a key pair of `algorithm` inside `context`.
    fn generate_key(
        &self,
        context: ContextHandle,
        algorithm: u32,
        flags: u32,
    ) -> Result<KeyHandle, NativeCode>;

    fn destroy_key(&self, key: KeyHandle) -> Result<(), NativeCode>;

    /// Creates a certificate for `key` whose subject and issuer are both
    /// `subject_issuer`, signed with the key's own private half.
    ///
    /// The encoded certificate stays in provider-owned memory until
    /// [`CryptoProvider::free_certificate`] is called.
    #[allow(clippy::too_many_arguments)]
    fn create_self_signed_certificate(
        &self,
        context: ContextHandle,
        key: KeyHandle,
        subject_issuer: &SubjectIssuerBlob,
        signature_algorithm: &AlgorithmIdentifier,
        start: &CalendarTime,
        end: &CalendarTime,
        extensions: &[ExtensionParam],
    ) -> Result<CertificateHandle, NativeCode>;

    /// Size in bytes of the encoded certificate behind `certificate`.
    fn encoded_certificate_len(&self, certificate: CertificateHandle) -> Result<usize, NativeCode>;

    /// Copies the encoded certificate into `out`, returning the bytes written.
    fn read_certificate(
        &self,
        certificate: CertificateHandle,
        out: &mut [u8],
    ) -> Result<usize, NativeCode>;

    fn free_certificate(&self, certificate: CertificateHandle) -> Result<(), NativeCode>;

    /// Describes a native code in human-readable form.
    fn error_message(&self, code: NativeCode) -> String {
        os_error_message(code)
    }
}

/// Looks a code up through the operating system's error-message facility.
pub fn os_error_message(code: NativeCode) -> String {
    std::io::Error::from_raw_os_error(code.0 as i32).to_string()
}
