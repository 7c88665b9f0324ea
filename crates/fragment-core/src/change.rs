//! Change classification. Advisory only: the selection is never modified.

use serde::{Deserialize, Serialize};

use crate::{amount::TokenAmount, config::ChangePolicy, model::Selection};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeClass {
    NoChange,
    Dust,
    Reasonable,
    Excessive,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    None,
    Donate,
    CreateChangeFragment,
    Consolidate,
}

impl ChangeAction {
    /// Settlement operations the action adds on top of the payment itself.
    pub fn extra_operations(self) -> usize {
        match self {
            Self::CreateChangeFragment => 1,
            Self::None | Self::Donate | Self::Consolidate => 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeDisposition {
    pub change_amount: TokenAmount,
    pub classification: ChangeClass,
    pub recommended_action: ChangeAction,
    pub dust_threshold: TokenAmount,
    pub extra_operations: usize,
}

/// Classifies `change` against `target` with the default ratios and the
/// caller's `dust_threshold`. [`advise_default`] also takes the default dust.
pub fn advise(
    change: TokenAmount,
    target: TokenAmount,
    dust_threshold: TokenAmount,
) -> ChangeDisposition {
    let policy = ChangePolicy::default();
    classify(
        change,
        target,
        dust_threshold,
        policy.reasonable_max_bps,
        policy.excessive_min_bps,
    )
}

/// [`advise`] with the default dust threshold at `target`'s precision.
/// A threshold finer than the token's precision counts as zero.
pub fn advise_default(change: TokenAmount, target: TokenAmount) -> ChangeDisposition {
    let decimals = target.decimals();
    let dust = TokenAmount::parse(&ChangePolicy::default().dust_threshold, decimals)
        .unwrap_or_else(|_| TokenAmount::zero(decimals));
    advise(change, target, dust)
}

#[derive(Clone, Debug, Default)]
pub struct ChangeAdvisor {
    policy: ChangePolicy,
}

impl ChangeAdvisor {
    pub fn new(policy: ChangePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ChangePolicy {
        &self.policy
    }

    /// Dust threshold at the given token precision.
    pub fn dust_threshold(&self, decimals: u8) -> anyhow::Result<TokenAmount> {
        TokenAmount::parse(&self.policy.dust_threshold, decimals)
    }

    pub fn advise(
        &self,
        change: TokenAmount,
        target: TokenAmount,
    ) -> anyhow::Result<ChangeDisposition> {
        let dust = self.dust_threshold(target.decimals())?;
        Ok(classify(
            change,
            target,
            dust,
            self.policy.reasonable_max_bps,
            self.policy.excessive_min_bps,
        ))
    }

    pub fn advise_selection(&self, selection: &Selection) -> anyhow::Result<ChangeDisposition> {
        self.advise(selection.change, selection.target)
    }
}

fn classify(
    change: TokenAmount,
    target: TokenAmount,
    dust: TokenAmount,
    reasonable_max_bps: u32,
    excessive_min_bps: u32,
) -> ChangeDisposition {
    let (classification, action) = if change.is_zero() {
        (ChangeClass::NoChange, ChangeAction::None)
    } else if change.units() < dust.units() {
        (ChangeClass::Dust, ChangeAction::Donate)
    } else if change.units() > target.mul_bps(excessive_min_bps).units() {
        (ChangeClass::Excessive, ChangeAction::CreateChangeFragment)
    } else if change.units() <= target.mul_bps(reasonable_max_bps).units() {
        (ChangeClass::Reasonable, ChangeAction::CreateChangeFragment)
    } else {
        // Between the reasonable and excessive bands.
        (ChangeClass::Reasonable, ChangeAction::Consolidate)
    };

    ChangeDisposition {
        change_amount: change,
        classification,
        recommended_action: action,
        dust_threshold: dust,
        extra_operations: action.extra_operations(),
    }
}
