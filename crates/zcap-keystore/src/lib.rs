//! The in-memory key store (`spec.md` §5/§6 external collaborator) plus
//! the `PublicKeyResolver` and `RevocationOracle` traits `SPEC_FULL.md`
//! §4.10 calls for, and a sync adapter bridging the resolver trait to
//! `zcap_chain::PublicKeyLookup` so a host can plug either into the
//! (synchronous) chain validator.
//!
//! Modeled on `clasp-registry`'s `EntityStore`/`MemoryEntityStore` pair:
//! an `async-trait` storage interface, an `RwLock<HashMap<_>>` backing
//! store, duplicate inserts rejected rather than silently overwritten.
//! Private key bytes use the zeroize-on-drop pattern `clasp-crypto`'s
//! `ECDHKeyPair`/`SigningKeyPair` use for their raw key bytes.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Errors from the key store. Distinct from `zcap_model::ZcapFault` since
/// this crate is an external collaborator, not part of the verification
/// core itself -- but it follows the same flat, one-variant-per-failure
/// shape as `zcap_model::ZcapFault` / `clasp-registry::RegistryError`.
#[derive(Debug, Error)]
pub enum KeyStoreError {
    #[error("a key is already bound to verification method {0:?}")]
    AlreadyExists(String),

    #[error("no key bound to verification method {0:?}")]
    NotFound(String),

    #[error("key store lock poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, KeyStoreError>;

/// Private key bytes, zeroed on drop. Not `Clone` -- duplicating raw
/// signing key material should always be a deliberate, visible operation.
#[derive(Zeroize, ZeroizeOnDrop)]
struct SigningKeyMaterial([u8; 32]);

/// What the store holds per verification method: the public key every
/// resolver consults, and (for an entity's own keys) the private key
/// material needed to sign with it.
pub struct KeyEntry {
    pub public_key: [u8; 32],
    private_key: Option<SigningKeyMaterial>,
}

impl KeyEntry {
    pub fn public_only(public_key: [u8; 32]) -> Self {
        Self { public_key, private_key: None }
    }

    pub fn with_private(public_key: [u8; 32], private_key: [u8; 32]) -> Self {
        Self {
            public_key,
            private_key: Some(SigningKeyMaterial(private_key)),
        }
    }

    pub fn private_key(&self) -> Option<&[u8; 32]> {
        self.private_key.as_ref().map(|k| &k.0)
    }
}

/// Storage backend for key material, keyed by verification method URI.
#[async_trait]
pub trait KeyStore: Send + Sync {
    async fn insert(&self, verification_method: String, entry: KeyEntry) -> Result<()>;
    async fn lookup(&self, verification_method: &str) -> Result<Option<[u8; 32]>>;
    async fn remove(&self, verification_method: &str) -> Result<()>;
    async fn resolve_by_verification_method(&self, verification_method: &str) -> Result<Option<[u8; 32]>>;
    async fn clear_all(&self) -> Result<()>;
}

/// In-memory key store. Concurrent inserts of distinct verification
/// methods succeed independently; concurrent inserts of the same id are
/// linearized by the `RwLock` write lock and exactly one wins.
pub struct MemoryKeyStore {
    keys: RwLock<HashMap<String, KeyEntry>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self { keys: RwLock::new(HashMap::new()) }
    }
}

impl Default for MemoryKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn insert(&self, verification_method: String, entry: KeyEntry) -> Result<()> {
        let mut keys = self.keys.write().map_err(|_| KeyStoreError::Poisoned)?;
        if keys.contains_key(&verification_method) {
            return Err(KeyStoreError::AlreadyExists(verification_method));
        }
        keys.insert(verification_method, entry);
        Ok(())
    }

    async fn lookup(&self, verification_method: &str) -> Result<Option<[u8; 32]>> {
        let keys = self.keys.read().map_err(|_| KeyStoreError::Poisoned)?;
        Ok(keys.get(verification_method).map(|e| e.public_key))
    }

    async fn remove(&self, verification_method: &str) -> Result<()> {
        let mut keys = self.keys.write().map_err(|_| KeyStoreError::Poisoned)?;
        // Dropping the removed `KeyEntry` runs `SigningKeyMaterial`'s
        // `ZeroizeOnDrop` glue, zeroing any private key bytes it held.
        keys.remove(verification_method)
            .map(|_| ())
            .ok_or_else(|| KeyStoreError::NotFound(verification_method.to_string()))
    }

    async fn resolve_by_verification_method(&self, verification_method: &str) -> Result<Option<[u8; 32]>> {
        self.lookup(verification_method).await
    }

    async fn clear_all(&self) -> Result<()> {
        let mut keys = self.keys.write().map_err(|_| KeyStoreError::Poisoned)?;
        keys.clear();
        Ok(())
    }
}

impl MemoryKeyStore {
    /// Borrow the private key bound to `verification_method`, if any,
    /// running `with` against it without copying the bytes out.
    pub fn with_private_key<R>(
        &self,
        verification_method: &str,
        with: impl FnOnce(&[u8; 32]) -> R,
    ) -> Result<Option<R>> {
        let keys = self.keys.read().map_err(|_| KeyStoreError::Poisoned)?;
        Ok(keys.get(verification_method).and_then(|e| e.private_key()).map(with))
    }
}

/// Given a `verificationMethod` URI, returns its public key or "not
/// found". The core's chain validator consumes a synchronous flavor of
/// this (`zcap_chain::PublicKeyLookup`); production hosts resolving via
/// DID documents or an HSM implement this trait directly.
#[async_trait]
pub trait PublicKeyResolver: Send + Sync {
    async fn resolve(&self, verification_method: &str) -> Option<[u8; 32]>;
}

#[async_trait]
impl PublicKeyResolver for MemoryKeyStore {
    async fn resolve(&self, verification_method: &str) -> Option<[u8; 32]> {
        self.lookup(verification_method).await.ok().flatten()
    }
}

/// Given a capability id, returns revoked/not. The core ships only the
/// no-op default; `spec.md` §9 notes the source's `IsRevoked` always
/// returns `false` -- revocation registries are out of scope here.
#[async_trait]
pub trait RevocationOracle: Send + Sync {
    async fn is_revoked(&self, capability_id: &str) -> bool;
}

pub struct NoopRevocationOracle;

#[async_trait]
impl RevocationOracle for NoopRevocationOracle {
    async fn is_revoked(&self, _capability_id: &str) -> bool {
        false
    }
}

/// Bridges an async [`PublicKeyResolver`] to the synchronous
/// [`zcap_chain::PublicKeyLookup`] the chain validator expects, by
/// blocking on a dedicated current-thread runtime. The verification core
/// itself stays free of a mandatory async runtime dependency (`spec.md`
/// §5: "expose them as blocking calls") -- this adapter is how a host
/// with an async resolver bridges into that contract.
pub struct BlockingResolver<'a, R: PublicKeyResolver> {
    resolver: &'a R,
    runtime: tokio::runtime::Runtime,
}

impl<'a, R: PublicKeyResolver> BlockingResolver<'a, R> {
    pub fn new(resolver: &'a R) -> std::io::Result<Self> {
        Ok(Self {
            resolver,
            runtime: tokio::runtime::Builder::new_current_thread().build()?,
        })
    }
}

impl<R: PublicKeyResolver> zcap_chain::PublicKeyLookup for BlockingResolver<'_, R> {
    fn lookup(&self, verification_method: &str) -> Option<[u8; 32]> {
        self.runtime.block_on(self.resolver.resolve(verification_method))
    }
}
