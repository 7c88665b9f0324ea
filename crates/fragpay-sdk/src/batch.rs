//! Ordered settlement batch and per-fragment build trace.

use alloy_primitives::{Address, Bytes};
use fragment_core::TokenAmount;
use serde::{Deserialize, Serialize};
use sponsor_rpc::WireCall;

use crate::error::{BuildStage, Error, Result};

/// One Multicall3 `Call3` entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOperation {
    pub target: Address,
    #[serde(default)]
    pub allow_failure: bool,
    pub call_data: Bytes,
}

impl BatchOperation {
    pub fn new(target: Address, call_data: Bytes) -> Self {
        Self {
            target,
            allow_failure: false,
            call_data,
        }
    }
}

impl From<&BatchOperation> for WireCall {
    fn from(op: &BatchOperation) -> Self {
        WireCall {
            target: op.target,
            allow_failure: op.allow_failure,
            call_data: op.call_data.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Deployment,
    Transfer,
    ChangeTransfer,
}

/// Per-fragment build progress. Transfers can only be signed once deployment
/// state has been resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentState {
    Unknown,
    Undeployed,
    Deployed,
    OperationsAppended,
    Signed,
}

impl FragmentState {
    pub fn advance(self, next: FragmentState, wallet: Address) -> Result<FragmentState> {
        use FragmentState::*;
        let allowed = matches!(
            (self, next),
            (Unknown, Undeployed)
                | (Unknown, Deployed)
                | (Undeployed, OperationsAppended)
                | (Deployed, OperationsAppended)
                | (OperationsAppended, Signed)
        );
        if allowed {
            Ok(next)
        } else {
            Err(Error::build(
                wallet,
                BuildStage::StateTransition,
                format!("illegal transition {self:?} -> {next:?}"),
            ))
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TracedOperation {
    pub index: usize,
    pub kind: OperationKind,
    pub nonce: Option<u64>,
    pub recipient: Option<Address>,
    pub amount: Option<TokenAmount>,
}

/// What the builder did for one chosen fragment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentTrace {
    pub wallet: Address,
    pub selection_index: u64,
    pub was_deployed: bool,
    pub state: FragmentState,
    pub operations: Vec<TracedOperation>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementBatch {
    pub chain_id: u64,
    pub token: Address,
    pub destination: Address,
    /// Amount delivered to the destination.
    pub amount: TokenAmount,
    /// Amount routed to a change recipient, zero when none.
    pub change: TokenAmount,
    pub operations: Vec<BatchOperation>,
    pub traces: Vec<FragmentTrace>,
}

impl SettlementBatch {
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn deployment_count(&self) -> usize {
        self.traces.iter().filter(|t| !t.was_deployed).count()
    }
}
