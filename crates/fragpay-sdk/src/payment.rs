//! select → advise → build → validate → execute, shared by every caller.

use alloy_primitives::Address;
use fragment_core::{
    ChangeAction, ChangeAdvisor, ChangeDisposition, CoinSelector, Fragment, FragmentFilter,
    FragmentSource, Selection, TokenAmount,
};
use log::{debug, info};
use serde::Serialize;

use crate::{
    batch::SettlementBatch,
    builder::SettlementBuilder,
    error::{Error, Result},
    estimate::{estimate_cost, EstimateOptions, GasEstimate},
    executor::{BatchMetadata, SettlementResult, SponsorGateway, SponsoredExecutor},
    validate::{validate_request, ValidationReport},
};

/// Who gets paid, in what, and where change goes.
#[derive(Clone, Debug)]
pub struct PaymentRequest {
    pub destination: Address,
    pub token: Address,
    /// Receives change when the advisor recommends a change fragment.
    /// Without one the change stays in the last chosen wallet.
    pub change_recipient: Option<Address>,
    pub metadata: BatchMetadata,
}

impl PaymentRequest {
    pub fn new(destination: Address, token: Address) -> Self {
        Self {
            destination,
            token,
            change_recipient: None,
            metadata: BatchMetadata::default(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct PaymentPlan {
    pub selection: Selection,
    pub change: ChangeDisposition,
    pub batch: SettlementBatch,
    pub metadata: BatchMetadata,
    pub validation: ValidationReport,
    pub estimate: GasEstimate,
}

#[derive(Clone, Debug, Serialize)]
pub struct PaymentReceipt {
    pub plan: PaymentPlan,
    pub result: SettlementResult,
}

pub struct PaymentCoordinator<G: SponsorGateway> {
    selector: CoinSelector,
    advisor: ChangeAdvisor,
    builder: SettlementBuilder,
    executor: SponsoredExecutor<G>,
    request: PaymentRequest,
    estimate_options: EstimateOptions,
}

impl<G: SponsorGateway> PaymentCoordinator<G> {
    pub fn new(
        selector: CoinSelector,
        advisor: ChangeAdvisor,
        builder: SettlementBuilder,
        executor: SponsoredExecutor<G>,
        request: PaymentRequest,
    ) -> Self {
        Self {
            selector,
            advisor,
            builder,
            executor,
            request,
            estimate_options: EstimateOptions::default(),
        }
    }

    pub fn with_estimate_options(mut self, options: EstimateOptions) -> Self {
        self.estimate_options = options;
        self
    }

    pub fn request(&self) -> &PaymentRequest {
        &self.request
    }

    /// Everything short of submission.
    pub fn plan(&self, fragments: &[Fragment], target: TokenAmount) -> Result<PaymentPlan> {
        if target.is_zero() {
            return Err(Error::InvalidInput("payment target must be positive".into()));
        }
        let selection = self.selector.select(fragments, target);
        if !selection.reached {
            return Err(Error::InsufficientFunds {
                requested: target,
                available: selection.available_total,
            });
        }
        info!(
            "selected {} fragment(s) via {} for {} (change {})",
            selection.fragment_count(),
            selection.strategy.as_str(),
            target,
            selection.change
        );

        let change = self
            .advisor
            .advise_selection(&selection)
            .map_err(|err| Error::InvalidInput(format!("change policy: {err:#}")))?;
        debug!(
            "change {:?}: {:?}",
            change.classification, change.recommended_action
        );

        let req = &self.request;
        let (batch, default_type) = match (change.recommended_action, req.change_recipient) {
            (ChangeAction::CreateChangeFragment, Some(recipient)) => (
                self.builder
                    .build_with_change(&selection, req.destination, req.token, recipient)?,
                "payment_with_change",
            ),
            (ChangeAction::CreateChangeFragment, None) | (ChangeAction::Consolidate, _) => (
                self.builder.build(
                    &selection.leave_change_in_last_fragment(),
                    req.destination,
                    req.token,
                )?,
                "payment",
            ),
            (ChangeAction::None, _) | (ChangeAction::Donate, _) => (
                self.builder.build(&selection, req.destination, req.token)?,
                "payment",
            ),
        };

        let mut metadata = req.metadata.clone();
        metadata
            .operation_type
            .get_or_insert_with(|| default_type.to_string());
        metadata.fragment_count = Some(selection.fragment_count());
        metadata.total_amount = Some(target.to_string());
        metadata.token = Some(req.token);

        let validation = validate_request(&batch.operations, &metadata);
        let estimate = estimate_cost(&batch.operations, &self.estimate_options);
        Ok(PaymentPlan {
            selection,
            change,
            batch,
            metadata,
            validation,
            estimate,
        })
    }

    /// Plans, validates and submits. Exactly one sponsor call on success.
    pub fn pay(&self, fragments: &[Fragment], target: TokenAmount) -> Result<PaymentReceipt> {
        let plan = self.plan(fragments, target)?;
        let outcome = self
            .executor
            .execute_validated(&plan.batch.operations, &plan.metadata)?;
        Ok(PaymentReceipt {
            plan,
            result: outcome.result,
        })
    }

    /// Pays from whatever `source` holds in the request's token.
    pub fn pay_from_source(
        &self,
        source: &dyn FragmentSource,
        target: TokenAmount,
    ) -> Result<PaymentReceipt> {
        let fragments = source
            .spendable(&FragmentFilter::for_token(self.request.token))
            .map_err(|err| Error::InvalidInput(format!("fragment source: {err:#}")))?;
        self.pay(&fragments, target)
    }
}
