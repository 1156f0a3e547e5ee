use tracing::{debug, warn};

use crate::context::ProviderContext;
use crate::error::{CspCertError, Result};
use crate::provider::{CryptoProvider, KeyHandle};

/// A key pair generated inside a [`ProviderContext`].
///
/// The handle borrows its context, so the borrow checker rules out releasing
/// or dropping the context first: the key is always destroyed before the
/// context that owns it is released.
pub struct KeyPairHandle<'c, 'p, P: CryptoProvider + ?Sized> {
    context: &'c ProviderContext<'p, P>,
    handle: Option<KeyHandle>,
    algorithm: u32,
}

impl<'c, 'p, P: CryptoProvider + ?Sized> KeyPairHandle<'c, 'p, P> {
    /// Generates a key of `algorithm` inside `context`.
    ///
    /// `flags` carries the key length in its upper 16 bits (see
    /// [`crate::provider::key_length_flags`]) and generation options in the
    /// lower ones.
    ///
    /// # Errors
    /// `KeyGeneration` carrying the provider's code unchanged, including when
    /// the context has already been released.
    pub fn generate(
        context: &'c ProviderContext<'p, P>,
        algorithm: u32,
        flags: u32,
    ) -> Result<Self> {
        let provider = context.provider();
        let handle = context
            .handle()
            .and_then(|ctx| provider.generate_key(ctx, algorithm, flags))
            .map_err(|code| CspCertError::KeyGeneration {
                code,
                message: provider.error_message(code),
            })?;
        debug!(key = handle.0, algorithm, flags, "generated key pair");
        Ok(Self {
            context,
            handle: Some(handle),
            algorithm,
        })
    }

    /// Destroys the key. Idempotent; a second call returns `Ok`.
    pub fn destroy(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        let provider = self.context.provider();
        provider
            .destroy_key(handle)
            .map_err(|code| CspCertError::ResourceRelease {
                resource: "key",
                code,
                message: provider.error_message(code),
            })?;
        debug!(key = handle.0, "destroyed key pair");
        Ok(())
    }

    pub fn is_destroyed(&self) -> bool {
        self.handle.is_none()
    }

    /// The live handle, or `NTE_BAD_KEY` once destroyed.
    pub fn handle(&self) -> std::result::Result<KeyHandle, crate::error::NativeCode> {
        self.handle.ok_or(crate::provider::codes::NTE_BAD_KEY)
    }

    pub fn algorithm(&self) -> u32 {
        self.algorithm
    }

    pub fn context(&self) -> &'c ProviderContext<'p, P> {
        self.context
    }
}

impl<P: CryptoProvider + ?Sized> Drop for KeyPairHandle<'_, '_, P> {
    fn drop(&mut self) {
        if let Err(e) = self.destroy() {
            warn!("{e}");
        }
    }
}

impl<P: CryptoProvider + ?Sized> std::fmt::Debug for KeyPairHandle<'_, '_, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPairHandle")
            .field("handle", &self.handle)
            .field("algorithm", &self.algorithm)
            .finish()
    }
}
