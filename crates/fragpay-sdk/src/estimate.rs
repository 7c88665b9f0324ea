//! Rough gas estimate for a sponsored batch. Advisory only.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::batch::BatchOperation;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimateOptions {
    pub base_gas_per_call: u64,
    pub gas_per_calldata_byte: u64,
    pub batch_overhead_gas: u64,
    /// Multiplier in basis points; 12_000 adds 20%.
    pub safety_margin_bps: u32,
    pub gas_price_wei: Option<u128>,
}

impl Default for EstimateOptions {
    fn default() -> Self {
        Self {
            base_gas_per_call: 50_000,
            gas_per_calldata_byte: 16,
            batch_overhead_gas: 21_000,
            safety_margin_bps: 12_000,
            gas_price_wei: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasEstimate {
    pub operations: usize,
    pub calldata_bytes: u64,
    /// Before the safety margin.
    pub raw_gas: u64,
    pub gas_limit: u64,
    pub cost_wei: Option<U256>,
}

pub fn estimate_cost(operations: &[BatchOperation], options: &EstimateOptions) -> GasEstimate {
    let calldata_bytes: u64 = operations.iter().map(|op| op.call_data.len() as u64).sum();
    let raw_gas = options
        .base_gas_per_call
        .saturating_mul(operations.len() as u64)
        .saturating_add(options.gas_per_calldata_byte.saturating_mul(calldata_bytes))
        .saturating_add(options.batch_overhead_gas);
    let gas_limit = (raw_gas as u128 * options.safety_margin_bps as u128).div_ceil(10_000);
    let gas_limit = u64::try_from(gas_limit).unwrap_or(u64::MAX);
    let cost_wei = options
        .gas_price_wei
        .map(|price| U256::from(gas_limit) * U256::from(price));

    GasEstimate {
        operations: operations.len(),
        calldata_bytes,
        raw_gas,
        gas_limit,
        cost_wei,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, Bytes};

    #[test]
    fn sums_components_then_applies_margin() {
        let ops = vec![
            BatchOperation::new(Address::repeat_byte(1), Bytes::from(vec![0u8; 100])),
            BatchOperation::new(Address::repeat_byte(2), Bytes::from(vec![0u8; 36])),
        ];
        let estimate = estimate_cost(
            &ops,
            &EstimateOptions {
                gas_price_wei: Some(2),
                ..EstimateOptions::default()
            },
        );
        // 2 × 50_000 + 136 × 16 + 21_000
        assert_eq!(estimate.raw_gas, 123_176);
        assert_eq!(estimate.gas_limit, 147_812);
        assert_eq!(estimate.cost_wei, Some(U256::from(295_624u64)));
    }

    #[test]
    fn empty_batch_costs_overhead_only() {
        let estimate = estimate_cost(&[], &EstimateOptions::default());
        assert_eq!(estimate.raw_gas, 21_000);
        assert_eq!(estimate.gas_limit, 25_200);
        assert!(estimate.cost_wei.is_none());
    }
}
