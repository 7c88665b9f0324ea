//! Sponsored submission of a settlement batch.

use alloy_primitives::Address;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sponsor_rpc::{scalar_text, RpcError, SponsorClient, SponsorRequest, SponsoredTx, WireCall};

use crate::{
    batch::BatchOperation,
    config::SettlementConfig,
    error::{Error, Result},
    estimate::{estimate_cost, EstimateOptions, GasEstimate},
    validate::{validate_request, ValidationReport},
};

const PENDING: &str = "pending";
const NOT_AVAILABLE: &str = "N/A";

/// Anything that can hand a batch to a gas sponsor.
pub trait SponsorGateway: Send + Sync {
    fn submit(&self, request: &SponsorRequest) -> std::result::Result<SponsoredTx, RpcError>;
}

impl SponsorGateway for SponsorClient {
    fn submit(&self, request: &SponsorRequest) -> std::result::Result<SponsoredTx, RpcError> {
        SponsorClient::submit(self, request)
    }
}

impl<G: SponsorGateway + ?Sized> SponsorGateway for Box<G> {
    fn submit(&self, request: &SponsorRequest) -> std::result::Result<SponsoredTx, RpcError> {
        (**self).submit(request)
    }
}

/// Free-form context forwarded to the sponsor next to the batch.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fragment_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<Address>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BatchMetadata {
    pub fn with_type(kind: impl Into<String>) -> Self {
        Self {
            operation_type: Some(kind.into()),
            ..Self::default()
        }
    }
}

/// Normalized sponsor outcome. Missing fields carry sentinels, never errors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementResult {
    pub transaction_hash: String,
    pub block_number: String,
    pub gas_used: String,
    pub gas_cost: String,
    pub explorer_url: String,
    pub sponsor_address: String,
    pub chain_name: String,
}

impl SettlementResult {
    pub fn is_pending(&self) -> bool {
        self.transaction_hash == PENDING
    }

    fn from_sponsored(tx: SponsoredTx) -> Self {
        let text = |value: Option<&Value>| {
            value
                .and_then(scalar_text)
                .unwrap_or_else(|| NOT_AVAILABLE.to_string())
        };
        Self {
            transaction_hash: tx
                .transaction_hash
                .as_ref()
                .and_then(scalar_text)
                .unwrap_or_else(|| PENDING.to_string()),
            block_number: text(tx.block_number.as_ref()),
            gas_used: text(tx.gas_used.as_ref()),
            gas_cost: text(tx.gas_cost.as_ref()),
            explorer_url: text(tx.execution_detail("explorerUrl")),
            sponsor_address: text(tx.sponsor_address.as_ref()),
            chain_name: text(tx.execution_detail("chainName")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedExecution {
    pub result: SettlementResult,
    pub warnings: Vec<String>,
}

pub struct SponsoredExecutor<G: SponsorGateway> {
    gateway: G,
}

impl SponsoredExecutor<SponsorClient> {
    pub fn from_config(config: &SettlementConfig) -> Result<Self> {
        if config.sponsor_endpoint.is_empty() {
            return Err(Error::InvalidInput("sponsor_endpoint is not configured".into()));
        }
        let client = SponsorClient::new(
            &config.sponsor_endpoint,
            config.sponsor_auth(),
            config.sponsor_timeout(),
        )
        .map_err(|err| Error::InvalidInput(format!("sponsor client: {err}")))?;
        Ok(Self::new(client))
    }
}

impl<G: SponsorGateway> SponsoredExecutor<G> {
    pub fn new(gateway: G) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// One submission, no retries. A timeout leaves the outcome unknown to us;
    /// it surfaces as a network-class `SponsorshipFailed`.
    pub fn execute(
        &self,
        operations: &[BatchOperation],
        metadata: &BatchMetadata,
    ) -> Result<SettlementResult> {
        let request = SponsorRequest {
            multicall_data: operations.iter().map(WireCall::from).collect(),
            metadata: serde_json::to_value(metadata)
                .map_err(|err| Error::InvalidInput(format!("metadata: {err}")))?,
        };
        info!("submitting {} operations to sponsor", operations.len());
        match self.gateway.submit(&request) {
            Ok(tx) => {
                let result = SettlementResult::from_sponsored(tx);
                info!(
                    "sponsor accepted batch: tx={} block={}",
                    result.transaction_hash, result.block_number
                );
                Ok(result)
            }
            Err(err) => {
                let err = Error::from(err);
                warn!("sponsor submission failed: {err}");
                Err(err)
            }
        }
    }

    pub fn execute_validated(
        &self,
        operations: &[BatchOperation],
        metadata: &BatchMetadata,
    ) -> Result<ValidatedExecution> {
        let report = self.validate_request(operations, metadata);
        if !report.is_valid {
            return Err(Error::ValidationFailed {
                errors: report.errors,
            });
        }
        for warning in &report.warnings {
            warn!("batch warning: {warning}");
        }
        let result = self.execute(operations, metadata)?;
        Ok(ValidatedExecution {
            result,
            warnings: report.warnings,
        })
    }

    pub fn validate_request(
        &self,
        operations: &[BatchOperation],
        metadata: &BatchMetadata,
    ) -> ValidationReport {
        validate_request(operations, metadata)
    }

    pub fn estimate_cost(
        &self,
        operations: &[BatchOperation],
        options: &EstimateOptions,
    ) -> GasEstimate {
        estimate_cost(operations, options)
    }
}
