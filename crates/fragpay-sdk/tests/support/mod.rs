#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use alloy_primitives::{Address, Bytes};
use fragment_core::{Fragment, TokenAmount};
use fragpay_sdk::{
    contracts::SafeTransaction, EnvelopeSigner, Error, Result, SafeProxyDeployer, SettlementBuilder,
    SpendingKey, StaticKeyring, WalletStatus, LocalEnvelopeSigner,
};

pub const CHAIN_ID: u64 = 8453;

pub fn token() -> Address {
    Address::repeat_byte(0xEE)
}

pub fn destination() -> Address {
    Address::repeat_byte(0xD0)
}

pub fn factory() -> Address {
    Address::repeat_byte(0xFA)
}

pub fn amount(s: &str) -> TokenAmount {
    TokenAmount::parse(s, 18).unwrap()
}

pub fn key(i: u8) -> SpendingKey {
    SpendingKey::from_bytes([i; 32])
}

/// Fragment `i` is owned by `key(i)`; its wallet is `0x1i1i..`.
pub fn fragment(i: u8, balance: &str) -> Fragment {
    Fragment {
        balance: amount(balance),
        owner_address: key(i).address().unwrap(),
        wallet_address: Address::repeat_byte(0x10 + i),
        selection_index: i as u64,
        token_address: token(),
        wallet_deployed: false,
    }
}

pub fn keyring(ids: &[u8]) -> StaticKeyring {
    let mut ring = StaticKeyring::new();
    for &i in ids {
        ring.insert(key(i)).unwrap();
    }
    ring
}

#[derive(Clone, Default)]
pub struct MockChain {
    pub deployed: Arc<Mutex<HashSet<Address>>>,
    pub nonces: Arc<Mutex<HashMap<Address, u64>>>,
    pub status_unavailable: Arc<Mutex<HashSet<Address>>>,
    pub nonce_unavailable: Arc<Mutex<HashSet<Address>>>,
    pub status_reads: Arc<Mutex<Vec<Address>>>,
}

impl MockChain {
    pub fn deploy(&self, wallet: Address, nonce: u64) {
        self.deployed.lock().unwrap().insert(wallet);
        self.nonces.lock().unwrap().insert(wallet, nonce);
    }
}

impl WalletStatus for MockChain {
    fn is_deployed(&self, wallet: Address) -> Result<bool> {
        self.status_reads.lock().unwrap().push(wallet);
        if self.status_unavailable.lock().unwrap().contains(&wallet) {
            return Err(Error::Transport("eth_getCode timed out".into()));
        }
        Ok(self.deployed.lock().unwrap().contains(&wallet))
    }

    fn read_nonce(&self, wallet: Address) -> Result<u64> {
        if self.nonce_unavailable.lock().unwrap().contains(&wallet) {
            return Err(Error::Transport("nonce() reverted".into()));
        }
        Ok(self.nonces.lock().unwrap().get(&wallet).copied().unwrap_or(0))
    }
}

pub struct FailingSigner;

impl EnvelopeSigner for FailingSigner {
    fn sign_envelope(
        &self,
        _key: &SpendingKey,
        _wallet: Address,
        _tx: &SafeTransaction,
        _chain_id: u64,
    ) -> Result<Bytes> {
        Err(Error::InvalidInput("hardware signer unplugged".into()))
    }
}

pub fn deployer() -> SafeProxyDeployer {
    SafeProxyDeployer {
        factory: factory(),
        singleton: Address::repeat_byte(0x51),
        fallback_handler: Address::repeat_byte(0xFB),
    }
}

pub fn builder(chain: &MockChain, keys: StaticKeyring) -> SettlementBuilder {
    SettlementBuilder::new(
        CHAIN_ID,
        Arc::new(chain.clone()),
        Arc::new(deployer()),
        Arc::new(keys),
        Arc::new(LocalEnvelopeSigner),
    )
}
