//! One-time spending keys and envelope signing.

use std::collections::HashMap;
use std::fmt;

use alloy_primitives::{Address, Bytes};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use fragment_core::Fragment;
use zeroize::Zeroize;

use crate::{
    contracts::SafeTransaction,
    error::{Error, Result},
};

/// 32-byte secp256k1 scalar controlling one fragment's wallet. Wiped on drop.
#[derive(Clone, Zeroize)]
pub struct SpendingKey([u8; 32]);

impl SpendingKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn from_hex(text: &str) -> Result<Self> {
        let raw = hex::decode(text.trim().trim_start_matches("0x"))
            .map_err(|err| Error::InvalidInput(format!("spending key hex: {err}")))?;
        let bytes: [u8; 32] = raw
            .try_into()
            .map_err(|_| Error::InvalidInput("spending key must be 32 bytes".into()))?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    fn signer(&self) -> Result<PrivateKeySigner> {
        PrivateKeySigner::from_slice(&self.0)
            .map_err(|err| Error::InvalidInput(format!("spending key is not a valid scalar: {err}")))
    }

    /// EVM address controlled by this key.
    pub fn address(&self) -> Result<Address> {
        Ok(self.signer()?.address())
    }
}

impl Drop for SpendingKey {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl fmt::Debug for SpendingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SpendingKey(..)")
    }
}

/// Derives the one-time key for a fragment. Implementations return exactly
/// 32 bytes; no format detection happens downstream.
pub trait SpendingKeyDeriver: Send + Sync {
    fn derive_spending_key(&self, fragment: &Fragment) -> Result<SpendingKey>;
}

/// Signs a Safe transaction for `wallet` on `chain_id`, returning Safe's
/// packed `r || s || v` signature bytes.
pub trait EnvelopeSigner: Send + Sync {
    fn sign_envelope(
        &self,
        key: &SpendingKey,
        wallet: Address,
        tx: &SafeTransaction,
        chain_id: u64,
    ) -> Result<Bytes>;
}

/// Signs the EIP-712 `SafeTx` hash with a local secp256k1 key.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalEnvelopeSigner;

impl EnvelopeSigner for LocalEnvelopeSigner {
    fn sign_envelope(
        &self,
        key: &SpendingKey,
        wallet: Address,
        tx: &SafeTransaction,
        chain_id: u64,
    ) -> Result<Bytes> {
        let digest = tx.signing_hash(wallet, chain_id);
        let signature = key
            .signer()?
            .sign_hash_sync(&digest)
            .map_err(|err| Error::InvalidInput(format!("sign safe tx: {err}")))?;
        // v is 27/28, which Safe reads as a plain ECDSA signature.
        Ok(Bytes::from(signature.as_bytes().to_vec()))
    }
}

/// Keys held in memory, looked up by fragment owner address.
#[derive(Default)]
pub struct StaticKeyring {
    keys: HashMap<Address, SpendingKey>,
}

impl StaticKeyring {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `key` under the address it controls.
    pub fn insert(&mut self, key: SpendingKey) -> Result<Address> {
        let owner = key.address()?;
        self.keys.insert(owner, key);
        Ok(owner)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl SpendingKeyDeriver for StaticKeyring {
    fn derive_spending_key(&self, fragment: &Fragment) -> Result<SpendingKey> {
        self.keys
            .get(&fragment.owner_address)
            .cloned()
            .ok_or_else(|| {
                Error::InvalidInput(format!("no key for owner {}", fragment.owner_address))
            })
    }
}
