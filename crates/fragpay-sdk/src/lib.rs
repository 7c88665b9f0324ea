//! fragpay SDK: settles a fragment selection as one sponsored, atomic batch.
//!
//! Pieces:
//! - contracts: ERC-20, Safe and Safe proxy factory encodings
//! - wallet / keys: collaborator traits for deployment state, deployment
//!   calls, one-time keys and envelope signing, with EVM defaults
//! - builder: selection → ordered `SettlementBatch`
//! - executor: submission to the gas sponsor, validation, cost estimate
//! - payment: the select → advise → build → execute pipeline

pub mod batch;
pub mod builder;
pub mod config;
pub mod contracts;
pub mod error;
pub mod estimate;
pub mod executor;
pub mod keys;
pub mod payment;
pub mod transport;
pub mod validate;
pub mod wallet;

pub use batch::{
    BatchOperation, FragmentState, FragmentTrace, OperationKind, SettlementBatch, TracedOperation,
};
pub use builder::SettlementBuilder;
pub use config::SettlementConfig;
pub use error::{BuildStage, Error, ErrorCode, Result};
pub use estimate::{estimate_cost, EstimateOptions, GasEstimate};
pub use executor::{
    BatchMetadata, SettlementResult, SponsorGateway, SponsoredExecutor, ValidatedExecution,
};
pub use keys::{EnvelopeSigner, LocalEnvelopeSigner, SpendingKey, SpendingKeyDeriver, StaticKeyring};
pub use payment::{PaymentCoordinator, PaymentPlan, PaymentReceipt, PaymentRequest};
pub use transport::{AlloyHttpTransport, EvmCall, EvmViewTransport};
pub use validate::{validate_request, ValidationReport};
pub use wallet::{
    DeploymentBuilder, DeploymentCall, EvmWalletStatus, SafeProxyDeployer, WalletDeployment,
    WalletStatus,
};
