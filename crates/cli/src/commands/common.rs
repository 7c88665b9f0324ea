use std::{collections::HashSet, fs, path::Path, sync::Arc};

use alloy_primitives::{keccak256, Address};
use anyhow::{anyhow, ensure, Context, Result};
use fragment_core::{fragments_from_json, Fragment, TokenAmount};
use fragpay_sdk::{SpendingKey, StaticKeyring, WalletStatus};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sponsor_rpc::{RpcError, SponsorRequest, SponsoredTx};

use fragpay_sdk::{Error as SdkError, Result as SdkResult, SponsorGateway};

/// Wallet state taken from the fragment records' own deployment hints.
/// Deployed wallets are assumed to sit at nonce 0.
#[derive(Clone, Default)]
pub struct DryRunChain {
    deployed: HashSet<Address>,
}

impl DryRunChain {
    pub fn from_fragments(fragments: &[Fragment]) -> Self {
        Self {
            deployed: fragments
                .iter()
                .filter(|f| f.wallet_deployed)
                .map(|f| f.wallet_address)
                .collect(),
        }
    }
}

impl WalletStatus for DryRunChain {
    fn is_deployed(&self, wallet: Address) -> SdkResult<bool> {
        Ok(self.deployed.contains(&wallet))
    }

    fn read_nonce(&self, wallet: Address) -> SdkResult<u64> {
        if self.deployed.contains(&wallet) {
            Ok(0)
        } else {
            Err(SdkError::Transport(format!("{wallet} has no code")))
        }
    }
}

/// Records the sponsor request instead of sending it.
#[derive(Clone, Default)]
pub struct DryRunGateway {
    last: Arc<Mutex<Option<SponsorRequest>>>,
}

impl DryRunGateway {
    pub fn last_request(&self) -> Option<SponsorRequest> {
        self.last.lock().clone()
    }
}

impl SponsorGateway for DryRunGateway {
    fn submit(&self, request: &SponsorRequest) -> std::result::Result<SponsoredTx, RpcError> {
        let body = serde_json::to_vec(request).map_err(|err| RpcError::Decode(err.to_string()))?;
        *self.last.lock() = Some(request.clone());
        Ok(SponsoredTx {
            transaction_hash: Some(Value::String(format_hex(keccak256(&body).as_slice()))),
            ..SponsoredTx::default()
        })
    }
}

pub fn read_json<T: DeserializeOwned>(path: &Path, label: &str) -> Result<T> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {label} {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse {label} {}", path.display()))
}

pub fn load_fragments(path: &Path) -> Result<Vec<Fragment>> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("read fragments {}", path.display()))?;
    fragments_from_json(&raw)
}

/// Keyring file: a JSON array of 32-byte hex keys.
pub fn load_keyring(path: &Path) -> Result<StaticKeyring> {
    let keys: Vec<String> = read_json(path, "keyring")?;
    let mut ring = StaticKeyring::new();
    for (i, text) in keys.iter().enumerate() {
        let key = SpendingKey::from_hex(text).with_context(|| format!("keyring entry {i}"))?;
        ring.insert(key)?;
    }
    Ok(ring)
}

/// Decimals from the flag, else the fragments, else 18.
pub fn resolve_decimals(flag: Option<u8>, fragments: &[Fragment]) -> Result<u8> {
    if let Some(decimals) = flag {
        return Ok(decimals);
    }
    let mut seen = fragments.iter().map(Fragment::decimals);
    let Some(first) = seen.next() else {
        return Ok(18);
    };
    ensure!(
        seen.all(|d| d == first),
        "fragments disagree on decimals; pass --decimals"
    );
    Ok(first)
}

pub fn parse_amount(text: &str, decimals: u8, label: &str) -> Result<TokenAmount> {
    TokenAmount::parse(text, decimals).with_context(|| format!("invalid {label} {text:?}"))
}

pub fn parse_address(value: &str) -> Result<Address> {
    let bytes = parse_hex_vec(value, "address")?;
    ensure!(
        bytes.len() == 20,
        "address must be 20 bytes, got {}",
        bytes.len()
    );
    Ok(Address::from_slice(&bytes))
}

pub fn parse_hex_vec(value: &str, label: &str) -> Result<Vec<u8>> {
    let trimmed = value.trim().trim_start_matches("0x");
    hex::decode(trimmed).map_err(|e| anyhow!("decode {label}: {e}"))
}

pub fn format_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
