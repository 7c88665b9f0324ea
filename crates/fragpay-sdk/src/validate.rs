use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::{batch::BatchOperation, executor::BatchMetadata};

/// Above this many operations sponsors start rejecting on gas limits.
pub const MAX_RECOMMENDED_OPERATIONS: usize = 20;

pub const KNOWN_OPERATION_TYPES: &[&str] = &[
    "payment",
    "payment_with_change",
    "transfer",
    "deployment",
    "consolidation",
];

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Structural checks only; nothing here touches the network.
pub fn validate_request(operations: &[BatchOperation], metadata: &BatchMetadata) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if operations.is_empty() {
        errors.push("batch contains no operations".to_string());
    }
    for (i, op) in operations.iter().enumerate() {
        if op.target == Address::ZERO {
            errors.push(format!("operation {i}: target address is missing or zero"));
        }
        if op.call_data.is_empty() {
            errors.push(format!("operation {i}: call data is empty"));
        }
    }

    if operations.len() > MAX_RECOMMENDED_OPERATIONS {
        warnings.push(format!(
            "batch has {} operations; more than {MAX_RECOMMENDED_OPERATIONS} may exceed sponsor gas limits",
            operations.len()
        ));
    }
    if let Some(kind) = metadata.operation_type.as_deref() {
        if !KNOWN_OPERATION_TYPES.contains(&kind) {
            warnings.push(format!("unrecognized operation_type {kind:?}"));
        }
    }

    ValidationReport {
        is_valid: errors.is_empty(),
        errors,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Bytes;

    fn op(target: u8, data: &[u8]) -> BatchOperation {
        let target = if target == 0 {
            Address::ZERO
        } else {
            Address::repeat_byte(target)
        };
        BatchOperation::new(target, Bytes::from(data.to_vec()))
    }

    #[test]
    fn empty_batch_is_invalid() {
        let report = validate_request(&[], &BatchMetadata::default());
        assert!(!report.is_valid);
        assert_eq!(report.errors, vec!["batch contains no operations"]);
    }

    #[test]
    fn reports_every_structural_error() {
        let ops = [op(0, &[1]), op(2, &[]), op(3, &[1])];
        let report = validate_request(&ops, &BatchMetadata::default());
        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors[0].starts_with("operation 0"));
        assert!(report.errors[1].starts_with("operation 1"));
    }

    #[test]
    fn large_batches_and_unknown_types_only_warn() {
        let ops: Vec<_> = (1..=21).map(|i| op(i, &[0xaa])).collect();
        let metadata = BatchMetadata {
            operation_type: Some("airdrop".into()),
            ..BatchMetadata::default()
        };
        let report = validate_request(&ops, &metadata);
        assert!(report.is_valid);
        assert_eq!(report.warnings.len(), 2);
    }
}
