use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::amount::TokenAmount;
use crate::score::Score;

/// A spendable balance held by a one-time address and its wallet contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub balance: TokenAmount,
    /// One-time address owning the wallet contract.
    pub owner_address: Address,
    pub wallet_address: Address,
    /// Derivation index of the one-time address; also the wallet salt nonce.
    pub selection_index: u64,
    pub token_address: Address,
    /// Cached hint from the source; settlement re-queries the chain.
    pub wallet_deployed: bool,
}

impl Fragment {
    pub fn decimals(&self) -> u8 {
        self.balance.decimals()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    ExactMatch,
    BranchAndBound,
    Knapsack,
    LargestFirst,
    SmallestFirst,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExactMatch => "exact_match",
            Self::BranchAndBound => "branch_and_bound",
            Self::Knapsack => "knapsack",
            Self::LargestFirst => "largest_first",
            Self::SmallestFirst => "smallest_first",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChosenFragment {
    pub fragment: Fragment,
    pub amount_to_draw: TokenAmount,
    pub is_full_draw: bool,
}

impl ChosenFragment {
    pub fn full(fragment: Fragment) -> Self {
        Self {
            amount_to_draw: fragment.balance,
            fragment,
            is_full_draw: true,
        }
    }

    pub fn partial(fragment: Fragment, amount: TokenAmount) -> Self {
        let is_full_draw = amount == fragment.balance;
        Self {
            fragment,
            amount_to_draw: amount,
            is_full_draw,
        }
    }
}

/// Outcome of coin selection. Unreached selections are informational only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub chosen: Vec<ChosenFragment>,
    pub total_drawn: TokenAmount,
    pub target: TokenAmount,
    pub reached: bool,
    pub strategy: Strategy,
    pub change: TokenAmount,
    pub score: Score,
    /// Sum of every eligible fragment offered to the selector.
    pub available_total: TokenAmount,
}

impl Selection {
    pub fn fragment_count(&self) -> usize {
        self.chosen.len()
    }

    /// Remaining amount needed when the target was not reached.
    pub fn shortfall(&self) -> TokenAmount {
        self.target.saturating_sub(self.total_drawn)
    }

    /// Trims the draws, last chosen fragment first, so that exactly the target
    /// leaves the fragments. The remainder stays behind in those wallets.
    /// Draws trimmed to zero are dropped.
    pub fn leave_change_in_last_fragment(&self) -> Selection {
        let mut out = self.clone();
        if !self.reached || self.change.is_zero() {
            return out;
        }
        let mut remaining = self.change;
        for chosen in out.chosen.iter_mut().rev() {
            if remaining.is_zero() {
                break;
            }
            let cut = if chosen.amount_to_draw.units() < remaining.units() {
                chosen.amount_to_draw
            } else {
                remaining
            };
            chosen.amount_to_draw = chosen.amount_to_draw.saturating_sub(cut);
            chosen.is_full_draw = chosen.amount_to_draw == chosen.fragment.balance;
            remaining = remaining.saturating_sub(cut);
        }
        out.chosen.retain(|c| !c.amount_to_draw.is_zero());
        out.total_drawn = out.target;
        out.change = TokenAmount::zero(self.target.decimals());
        out
    }
}
