use serde::{Deserialize, Serialize};

/// Tuning knobs for the selection cascade. Ratios are basis points of the
/// target (10_000 = 100%).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Branch-and-bound abandons a branch once its sum exceeds this ratio.
    pub bnb_max_sum_bps: u32,
    /// Branch-and-bound never includes more fragments than this.
    pub bnb_max_fragments: usize,
    /// Inclusion is only attempted while the overshoot stays within this ratio.
    pub bnb_overshoot_tolerance_bps: u32,
    /// Hard cap on visited search nodes.
    pub bnb_max_nodes: usize,
    /// Knapsack is skipped when `fragments × table width` exceeds this.
    pub knapsack_max_cells: usize,
    /// Largest-first prefers a single fragment up to this ratio.
    pub single_fragment_max_bps: u32,
    pub weights: ScoreWeights,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            bnb_max_sum_bps: 15_000,
            bnb_max_fragments: 6,
            bnb_overshoot_tolerance_bps: 1_000,
            bnb_max_nodes: 100_000,
            knapsack_max_cells: 4_000_000,
            single_fragment_max_bps: 15_000,
            weights: ScoreWeights::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub per_fragment: u32,
    /// Per whole token of change.
    pub per_change_token: u32,
    /// Per whole token drawn beyond twice the target.
    pub per_overshoot_token: u32,
    pub efficiency_bonus: u32,
    pub efficient_max_fragments: usize,
    pub efficient_change_bps: u32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            per_fragment: 100,
            per_change_token: 1_000,
            per_overshoot_token: 500,
            efficiency_bonus: 200,
            efficient_max_fragments: 2,
            efficient_change_bps: 1_000,
        }
    }
}

/// Thresholds used to classify change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangePolicy {
    /// Decimal string in token units; parsed with the token's decimals.
    pub dust_threshold: String,
    /// Change up to this ratio of the target is reasonable.
    pub reasonable_max_bps: u32,
    /// Change above this ratio of the target is excessive.
    pub excessive_min_bps: u32,
}

impl Default for ChangePolicy {
    fn default() -> Self {
        Self {
            dust_threshold: "0.00001".into(),
            reasonable_max_bps: 3_000,
            excessive_min_bps: 5_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: SelectorConfig =
            serde_json::from_str(r#"{"bnb_max_fragments": 4, "weights": {"per_fragment": 50}}"#)
                .unwrap();
        assert_eq!(cfg.bnb_max_fragments, 4);
        assert_eq!(cfg.weights.per_fragment, 50);
        assert_eq!(cfg.weights.per_change_token, 1_000);
        assert_eq!(cfg.bnb_max_sum_bps, 15_000);
    }
}
