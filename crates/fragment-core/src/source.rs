use std::collections::BTreeMap;

use alloy_primitives::Address;
use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{amount::TokenAmount, model::Fragment};

/// Boundary to whatever stores the payer's fragments.
pub trait FragmentSource: Send + Sync {
    fn list_fragments(&self) -> anyhow::Result<Vec<Fragment>>;

    /// Spendable fragments for one token, ordered by selection index.
    fn spendable(&self, filter: &FragmentFilter) -> anyhow::Result<Vec<Fragment>> {
        let all = self.list_fragments()?;
        Ok(filter.apply(&all).into_iter().cloned().collect())
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct FragmentFilter {
    pub token: Option<Address>,
    pub min_balance: Option<TokenAmount>,
}

impl FragmentFilter {
    pub fn for_token(token: Address) -> Self {
        Self {
            token: Some(token),
            min_balance: None,
        }
    }

    pub fn matches(&self, fragment: &Fragment) -> bool {
        if fragment.balance.is_zero() {
            return false;
        }
        if let Some(token) = self.token {
            if fragment.token_address != token {
                return false;
            }
        }
        match self.min_balance {
            Some(min) if min.decimals() == fragment.decimals() => {
                fragment.balance.units() >= min.units()
            }
            Some(_) => false,
            None => true,
        }
    }

    pub fn apply<'a>(&self, fragments: &'a [Fragment]) -> Vec<&'a Fragment> {
        let mut kept: Vec<&Fragment> = fragments.iter().filter(|f| self.matches(f)).collect();
        kept.sort_by_key(|f| f.selection_index);
        kept
    }
}

/// Fragments keyed by wallet address. Re-inserting a wallet replaces it.
#[derive(Default)]
pub struct InMemorySource {
    fragments: parking_lot::RwLock<BTreeMap<Address, Fragment>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fragments(fragments: impl IntoIterator<Item = Fragment>) -> Self {
        let source = Self::new();
        for fragment in fragments {
            source.put(fragment);
        }
        source
    }

    pub fn put(&self, fragment: Fragment) {
        self.fragments.write().insert(fragment.wallet_address, fragment);
    }

    pub fn remove(&self, wallet: &Address) -> Option<Fragment> {
        self.fragments.write().remove(wallet)
    }

    pub fn len(&self) -> usize {
        self.fragments.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.read().is_empty()
    }
}

impl FragmentSource for InMemorySource {
    fn list_fragments(&self) -> anyhow::Result<Vec<Fragment>> {
        Ok(self.fragments.read().values().cloned().collect())
    }
}

/// Balance as it arrives from upstream: decimal string or JSON number.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BalanceField {
    Text(String),
    Number(serde_json::Number),
}

impl BalanceField {
    fn to_amount(&self, decimals: u8) -> anyhow::Result<TokenAmount> {
        match self {
            Self::Text(text) => TokenAmount::parse(text, decimals),
            Self::Number(number) => TokenAmount::parse(&number.to_string(), decimals),
        }
    }
}

/// External fragment record (camelCase JSON).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FragmentRecord {
    pub balance: BalanceField,
    pub wallet_address: Address,
    pub owner_address: Address,
    pub selection_index: u64,
    pub token_address: Address,
    pub decimals: u8,
    #[serde(default, rename = "isWalletDeployed")]
    pub wallet_deployed: Option<bool>,
}

impl FragmentRecord {
    pub fn into_fragment(self) -> anyhow::Result<Fragment> {
        let balance = self.balance.to_amount(self.decimals).with_context(|| {
            format!(
                "fragment #{} ({}) has an invalid balance",
                self.selection_index, self.wallet_address
            )
        })?;
        Ok(Fragment {
            balance,
            owner_address: self.owner_address,
            wallet_address: self.wallet_address,
            selection_index: self.selection_index,
            token_address: self.token_address,
            wallet_deployed: self.wallet_deployed.unwrap_or(false),
        })
    }
}

impl From<&Fragment> for FragmentRecord {
    fn from(fragment: &Fragment) -> Self {
        Self {
            balance: BalanceField::Text(fragment.balance.to_string()),
            wallet_address: fragment.wallet_address,
            owner_address: fragment.owner_address,
            selection_index: fragment.selection_index,
            token_address: fragment.token_address,
            decimals: fragment.decimals(),
            wallet_deployed: Some(fragment.wallet_deployed),
        }
    }
}

/// Parses a JSON array of fragment records.
pub fn fragments_from_json(json: &str) -> anyhow::Result<Vec<Fragment>> {
    let records: Vec<FragmentRecord> =
        serde_json::from_str(json).context("fragment records are not valid JSON")?;
    records.into_iter().map(FragmentRecord::into_fragment).collect()
}
