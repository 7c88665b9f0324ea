//! Selection quality score. Lower is better.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::amount::TokenAmount;
use crate::config::ScoreWeights;

/// Score in micro-points (1 point = 1_000_000).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Score(pub i128);

impl Score {
    pub const SCALE: i128 = 1_000_000;

    pub fn points(self) -> f64 {
        self.0 as f64 / Self::SCALE as f64
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.points())
    }
}

/// ```text
/// score = w_count × fragments
///       + w_change × change
///       + (total > 2×target ? w_overshoot × (total − 2×target) : 0)
///       − (fragments ≤ 2 && change < 10% target ? bonus : 0)
/// ```
/// Amount terms are taken in micro-tokens so that integer math reproduces
/// the per-token weights exactly at that resolution.
pub fn score(
    fragment_count: usize,
    total: TokenAmount,
    target: TokenAmount,
    weights: &ScoreWeights,
) -> Score {
    let change = total.saturating_sub(target);
    let change_micros = change.micros() as i128;

    let mut value = weights.per_fragment as i128 * Score::SCALE * fragment_count as i128;
    value += weights.per_change_token as i128 * change_micros;

    let double_target = target.units().saturating_mul(2);
    if total.units() > double_target {
        let excess = TokenAmount::new(total.units() - double_target, total.decimals());
        value += weights.per_overshoot_token as i128 * excess.micros() as i128;
    }

    let efficient = fragment_count <= weights.efficient_max_fragments
        && change.units() < target.mul_bps(weights.efficient_change_bps).units();
    if efficient {
        value -= weights.efficiency_bonus as i128 * Score::SCALE;
    }
    Score(value)
}
