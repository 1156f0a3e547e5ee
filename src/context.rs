//! Scoped ownership of a provider context.

use std::cell::Cell;
use std::marker::PhantomData;

use tracing::{debug, warn};

use crate::cert::params::ProviderParams;
use crate::error::{CspCertError, Result};
use crate::provider::codes::NTE_BAD_UID;
use crate::provider::{ContextHandle, CryptoProvider};

/// An open context on a cryptographic provider.
///
/// The context is released exactly once: by [`ProviderContext::release`] or,
/// failing that, when the value is dropped. Keys generated through
/// [`crate::key::KeyPairHandle::generate`] borrow the context, so it cannot be
/// released or dropped while any of them is alive.
///
/// A context may move to another thread but is never shared between threads.
pub struct ProviderContext<'p, P: CryptoProvider + ?Sized> {
    provider: &'p P,
    handle: Option<ContextHandle>,
    container_name: Option<String>,
    provider_name: String,
    provider_type: u32,
    _not_sync: PhantomData<Cell<()>>,
}

impl<'p, P: CryptoProvider + ?Sized> ProviderContext<'p, P> {
    /// Opens a context.
    ///
    /// An empty or absent `container_name` asks for an ephemeral container.
    ///
    /// # Errors
    /// `ProviderAcquisition` carrying the provider's code unchanged.
    pub fn acquire(
        provider: &'p P,
        container_name: Option<&str>,
        provider_name: &str,
        provider_type: u32,
        flags: u32,
    ) -> Result<Self> {
        let container_name = container_name.filter(|name| !name.is_empty());
        let handle = provider
            .acquire_context(container_name, provider_name, provider_type, flags)
            .map_err(|code| CspCertError::ProviderAcquisition {
                code,
                message: provider.error_message(code),
            })?;
        debug!(
            context = handle.0,
            container = container_name.unwrap_or("<ephemeral>"),
            provider = provider_name,
            provider_type,
            "acquired provider context"
        );
        Ok(Self {
            provider,
            handle: Some(handle),
            container_name: container_name.map(str::to_string),
            provider_name: provider_name.to_string(),
            provider_type,
            _not_sync: PhantomData,
        })
    }

    /// Opens a context described by `params`.
    pub fn acquire_with(provider: &'p P, params: &ProviderParams) -> Result<Self> {
        Self::acquire(
            provider,
            params.container_name.as_deref(),
            &params.provider_name,
            params.provider_type,
            params.acquire_flags,
        )
    }

    /// Releases the context.
    ///
    /// Calling this again, or after a failed release, does nothing and
    /// returns `Ok`. The handle is forgotten even when the provider reports
    /// a failure, so it is never released twice.
    pub fn release(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        self.provider.release_context(handle).map_err(|code| {
            CspCertError::ResourceRelease {
                resource: "provider context",
                code,
                message: self.provider.error_message(code),
            }
        })?;
        debug!(context = handle.0, "released provider context");
        Ok(())
    }

    pub fn is_released(&self) -> bool {
        self.handle.is_none()
    }

    /// The live handle, or `NTE_BAD_UID` once released.
    pub fn handle(&self) -> std::result::Result<ContextHandle, crate::error::NativeCode> {
        self.handle.ok_or(NTE_BAD_UID)
    }

    pub fn provider(&self) -> &'p P {
        self.provider
    }

    pub fn container_name(&self) -> Option<&str> {
        self.container_name.as_deref()
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    pub fn provider_type(&self) -> u32 {
        self.provider_type
    }
}

impl<P: CryptoProvider + ?Sized> Drop for ProviderContext<'_, P> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("{e}");
        }
    }
}

impl<P: CryptoProvider + ?Sized> std::fmt::Debug for ProviderContext<'_, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderContext")
            .field("handle", &self.handle)
            .field("container_name", &self.container_name)
            .field("provider_name", &self.provider_name)
            .field("provider_type", &self.provider_type)
            .finish()
    }
}
