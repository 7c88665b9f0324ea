//! Turns a selection into one ordered, signed batch.
//!
//! Per chosen fragment, in selection order:
//! 1. resolve deployment state (a failed status read counts as undeployed)
//! 2. append the deployment call when undeployed
//! 3. pick the Safe nonce (0 when undeployed, read otherwise)
//! 4. derive the one-time key, sign each transfer envelope, append `execTransaction`
//!
//! Any failure past step 1 aborts the whole build; no partial batch escapes.

use std::collections::HashSet;
use std::sync::Arc;

use alloy_primitives::{Address, U256};
use fragment_core::{ChosenFragment, Selection, TokenAmount};
use log::{debug, info, warn};

use crate::{
    batch::{
        BatchOperation, FragmentState, FragmentTrace, OperationKind, SettlementBatch,
        TracedOperation,
    },
    contracts::SafeTransaction,
    error::{BuildStage, Error, Result},
    keys::{EnvelopeSigner, SpendingKeyDeriver},
    wallet::{DeploymentBuilder, WalletDeployment, WalletStatus},
};

/// Outgoing transfer from one wallet.
struct Payout {
    recipient: Address,
    amount: TokenAmount,
    kind: OperationKind,
}

#[derive(Clone)]
pub struct SettlementBuilder {
    chain_id: u64,
    status: Arc<dyn WalletStatus>,
    deployer: Arc<dyn DeploymentBuilder>,
    keys: Arc<dyn SpendingKeyDeriver>,
    signer: Arc<dyn EnvelopeSigner>,
}

impl SettlementBuilder {
    pub fn new(
        chain_id: u64,
        status: Arc<dyn WalletStatus>,
        deployer: Arc<dyn DeploymentBuilder>,
        keys: Arc<dyn SpendingKeyDeriver>,
        signer: Arc<dyn EnvelopeSigner>,
    ) -> Self {
        Self {
            chain_id,
            status,
            deployer,
            keys,
            signer,
        }
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Sends every drawn amount, change included, to `destination`.
    pub fn build(
        &self,
        selection: &Selection,
        destination: Address,
        token: Address,
    ) -> Result<SettlementBatch> {
        self.preflight(selection, destination, token)?;
        let plan: Vec<Vec<Payout>> = selection
            .chosen
            .iter()
            .map(|chosen| {
                vec![Payout {
                    recipient: destination,
                    amount: chosen.amount_to_draw,
                    kind: OperationKind::Transfer,
                }]
            })
            .collect();
        self.assemble(selection, destination, token, plan)
    }

    /// Pays exactly the target to `destination` and routes the change to
    /// `change_recipient` as extra envelopes on the fragments that hold it
    /// (the last chosen fragment for any minimal selection).
    pub fn build_with_change(
        &self,
        selection: &Selection,
        destination: Address,
        token: Address,
        change_recipient: Address,
    ) -> Result<SettlementBatch> {
        self.preflight(selection, destination, token)?;
        if change_recipient == Address::ZERO {
            return Err(Error::InvalidInput("change recipient is the zero address".into()));
        }
        if selection.change.is_zero() {
            return self.build(selection, destination, token);
        }

        let trimmed = selection.leave_change_in_last_fragment();
        let plan = selection
            .chosen
            .iter()
            .map(|chosen| {
                let paid = trimmed
                    .chosen
                    .iter()
                    .find(|t| t.fragment.wallet_address == chosen.fragment.wallet_address)
                    .map(|t| t.amount_to_draw)
                    .unwrap_or_else(|| TokenAmount::zero(chosen.amount_to_draw.decimals()));
                let change = chosen.amount_to_draw.saturating_sub(paid);
                let mut payouts = Vec::with_capacity(2);
                if !paid.is_zero() {
                    payouts.push(Payout {
                        recipient: destination,
                        amount: paid,
                        kind: OperationKind::Transfer,
                    });
                }
                if !change.is_zero() {
                    payouts.push(Payout {
                        recipient: change_recipient,
                        amount: change,
                        kind: OperationKind::ChangeTransfer,
                    });
                }
                payouts
            })
            .collect();
        self.assemble(selection, destination, token, plan)
    }

    fn preflight(&self, selection: &Selection, destination: Address, token: Address) -> Result<()> {
        if !selection.reached {
            return Err(Error::InsufficientFunds {
                requested: selection.target,
                available: selection.available_total,
            });
        }
        if destination == Address::ZERO {
            return Err(Error::InvalidInput("destination is the zero address".into()));
        }
        if selection.chosen.is_empty() {
            return Err(Error::InvalidInput("selection contains no fragments".into()));
        }
        let mut seen = HashSet::with_capacity(selection.chosen.len());
        for chosen in &selection.chosen {
            let wallet = chosen.fragment.wallet_address;
            if !seen.insert(wallet) {
                return Err(Error::build(
                    wallet,
                    BuildStage::Preflight,
                    "wallet appears twice in the selection",
                ));
            }
            if chosen.fragment.token_address != token {
                return Err(Error::build(
                    wallet,
                    BuildStage::Preflight,
                    format!(
                        "fragment holds token {}, payment is in {token}",
                        chosen.fragment.token_address
                    ),
                ));
            }
        }
        Ok(())
    }

    fn assemble(
        &self,
        selection: &Selection,
        destination: Address,
        token: Address,
        plan: Vec<Vec<Payout>>,
    ) -> Result<SettlementBatch> {
        let decimals = selection.target.decimals();
        let mut batch = SettlementBatch {
            chain_id: self.chain_id,
            token,
            destination,
            amount: TokenAmount::zero(decimals),
            change: TokenAmount::zero(decimals),
            operations: Vec::new(),
            traces: Vec::with_capacity(selection.chosen.len()),
        };

        for (chosen, payouts) in selection.chosen.iter().zip(plan) {
            let trace = self.append_fragment(&mut batch, chosen, token, &payouts)?;
            for payout in &payouts {
                match payout.kind {
                    OperationKind::ChangeTransfer => {
                        batch.change = batch.change.saturating_add(payout.amount)
                    }
                    _ => batch.amount = batch.amount.saturating_add(payout.amount),
                }
            }
            batch.traces.push(trace);
        }

        info!(
            "built settlement batch: fragments={} operations={} deployments={} amount={} change={}",
            batch.traces.len(),
            batch.operations.len(),
            batch.deployment_count(),
            batch.amount,
            batch.change
        );
        Ok(batch)
    }

    fn append_fragment(
        &self,
        batch: &mut SettlementBatch,
        chosen: &ChosenFragment,
        token: Address,
        payouts: &[Payout],
    ) -> Result<FragmentTrace> {
        let fragment = &chosen.fragment;
        let wallet = fragment.wallet_address;
        let mut state = FragmentState::Unknown;
        let mut traced = Vec::with_capacity(payouts.len() + 1);

        let deployed = match self.status.is_deployed(wallet) {
            Ok(deployed) => deployed,
            Err(err) => {
                warn!("deployment status for {wallet} unavailable, assuming undeployed: {err}");
                false
            }
        };
        if deployed != fragment.wallet_deployed {
            debug!("wallet {wallet}: cached deployment hint was {}", fragment.wallet_deployed);
        }

        let nonce = if deployed {
            state = state.advance(FragmentState::Deployed, wallet)?;
            self.status
                .read_nonce(wallet)
                .map_err(|err| Error::build(wallet, BuildStage::NonceRead, err))?
        } else {
            state = state.advance(FragmentState::Undeployed, wallet)?;
            let call = self
                .deployer
                .deployment_call(&WalletDeployment::from(fragment))
                .map_err(|err| Error::build(wallet, BuildStage::DeploymentCall, err))?;
            traced.push(TracedOperation {
                index: batch.operations.len(),
                kind: OperationKind::Deployment,
                nonce: None,
                recipient: None,
                amount: None,
            });
            batch
                .operations
                .push(BatchOperation::new(call.target, call.data));
            0
        };
        state = state.advance(FragmentState::OperationsAppended, wallet)?;

        let key = self
            .keys
            .derive_spending_key(fragment)
            .map_err(|err| Error::build(wallet, BuildStage::KeyDerivation, err))?;
        let controlled = key
            .address()
            .map_err(|err| Error::build(wallet, BuildStage::KeyDerivation, err))?;
        if controlled != fragment.owner_address {
            return Err(Error::build(
                wallet,
                BuildStage::KeyDerivation,
                format!(
                    "derived key controls {controlled}, wallet owner is {}",
                    fragment.owner_address
                ),
            ));
        }

        for (offset, payout) in payouts.iter().enumerate() {
            let tx_nonce = nonce + offset as u64;
            let tx = SafeTransaction::token_transfer(
                token,
                payout.recipient,
                U256::from(payout.amount.units()),
                tx_nonce,
            );
            let signature = self
                .signer
                .sign_envelope(&key, wallet, &tx, self.chain_id)
                .map_err(|err| Error::build(wallet, BuildStage::Signing, err))?;
            traced.push(TracedOperation {
                index: batch.operations.len(),
                kind: payout.kind,
                nonce: Some(tx_nonce),
                recipient: Some(payout.recipient),
                amount: Some(payout.amount),
            });
            batch
                .operations
                .push(BatchOperation::new(wallet, tx.exec_calldata(signature)));
        }
        state = state.advance(FragmentState::Signed, wallet)?;
        debug!(
            "fragment #{} ({wallet}): deployed={deployed} nonce={nonce} envelopes={}",
            fragment.selection_index,
            payouts.len()
        );

        Ok(FragmentTrace {
            wallet,
            selection_index: fragment.selection_index,
            was_deployed: deployed,
            state,
            operations: traced,
        })
    }
}
