use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{ensure, Context, Result};
use clap::Args;
use fragment_core::{ChangeAdvisor, ChangePolicy, CoinSelector, InMemorySource, SelectorConfig};
use fragpay_sdk::{
    AlloyHttpTransport, EvmViewTransport, EvmWalletStatus, LocalEnvelopeSigner, PaymentCoordinator,
    PaymentReceipt, PaymentRequest, SafeProxyDeployer, SettlementBuilder, SettlementConfig,
    SponsorGateway, SponsoredExecutor, WalletStatus,
};

use super::common::{
    load_fragments, load_keyring, parse_address, parse_amount, print_json, read_json,
    resolve_decimals, DryRunChain, DryRunGateway,
};

#[derive(Clone, Debug, Args)]
pub struct PayArgs {
    /// SettlementConfig JSON (chain, Safe contracts, sponsor endpoint).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// JSON array of fragment records.
    #[arg(long)]
    pub fragments: PathBuf,

    /// JSON array of hex spending keys, one per fragment owner.
    #[arg(long)]
    pub keys: PathBuf,

    /// Amount to pay, in token units.
    #[arg(long)]
    pub target: String,

    /// Payment recipient (0x-prefixed).
    #[arg(long)]
    pub destination: String,

    /// Token contract; the zero address pays in the native coin.
    #[arg(long)]
    pub token: String,

    /// Receives excessive change as a fresh fragment.
    #[arg(long)]
    pub change_recipient: Option<String>,

    #[arg(long)]
    pub decimals: Option<u8>,

    /// Overrides the operation_type sent to the sponsor.
    #[arg(long)]
    pub operation_type: Option<String>,

    /// SelectorConfig JSON overriding the defaults.
    #[arg(long)]
    pub selector_config: Option<PathBuf>,

    /// ChangePolicy JSON overriding the defaults.
    #[arg(long)]
    pub policy: Option<PathBuf>,

    /// Build with fragment deployment hints and record the sponsor request
    /// instead of sending it.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Write the sponsor request body here (dry-run only).
    #[arg(long)]
    pub request_out: Option<PathBuf>,

    /// Print the full receipt as JSON.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

pub fn run(args: PayArgs) -> Result<()> {
    ensure!(
        args.request_out.is_none() || args.dry_run,
        "--request-out only applies to --dry-run"
    );
    let config = match &args.config {
        Some(path) => SettlementConfig::load(path)?,
        None => SettlementConfig::default(),
    };
    let fragments = load_fragments(&args.fragments)?;
    let decimals = resolve_decimals(args.decimals, &fragments)?;
    let target = parse_amount(&args.target, decimals, "target")?;

    let mut request = PaymentRequest::new(
        parse_address(&args.destination)?,
        parse_address(&args.token)?,
    );
    request.change_recipient = args
        .change_recipient
        .as_deref()
        .map(parse_address)
        .transpose()?;
    request.metadata.operation_type = args.operation_type.clone();

    let planner = Planner {
        config: &config,
        selector: CoinSelector::new(match &args.selector_config {
            Some(path) => read_json::<SelectorConfig>(path, "selector config")?,
            None => SelectorConfig::default(),
        }),
        advisor: ChangeAdvisor::new(match &args.policy {
            Some(path) => read_json::<ChangePolicy>(path, "change policy")?,
            None => ChangePolicy::default(),
        }),
        keys: &args.keys,
        request,
    };
    let source = InMemorySource::from_fragments(fragments.iter().cloned());

    if args.dry_run {
        let gateway = DryRunGateway::default();
        let receipt = planner.pay(
            Arc::new(DryRunChain::from_fragments(&fragments)),
            SponsoredExecutor::new(gateway.clone()),
            &source,
            target,
        )?;
        report(&receipt, "dry-run", args.json)?;
        if let Some(path) = &args.request_out {
            let sent = gateway
                .last_request()
                .context("dry run recorded no sponsor request")?;
            fs::write(path, serde_json::to_string_pretty(&sent)?)
                .with_context(|| format!("write {}", path.display()))?;
        }
        return Ok(());
    }

    let rpc_url = config
        .rpc_url
        .as_deref()
        .context("rpc_url must be configured unless --dry-run")?;
    let transport = AlloyHttpTransport::new(rpc_url)?;
    ensure!(
        transport.chain_id() == config.chain_id,
        "rpc_url serves chain {}, config says {}",
        transport.chain_id(),
        config.chain_id
    );
    let receipt = planner.pay(
        Arc::new(EvmWalletStatus::new(transport)),
        SponsoredExecutor::from_config(&config)?,
        &source,
        target,
    )?;
    report(&receipt, "live", args.json)
}

struct Planner<'a> {
    config: &'a SettlementConfig,
    selector: CoinSelector,
    advisor: ChangeAdvisor,
    keys: &'a PathBuf,
    request: PaymentRequest,
}

impl Planner<'_> {
    fn pay<G: SponsorGateway>(
        self,
        status: Arc<dyn WalletStatus>,
        executor: SponsoredExecutor<G>,
        source: &InMemorySource,
        target: fragment_core::TokenAmount,
    ) -> Result<PaymentReceipt> {
        let builder = SettlementBuilder::new(
            self.config.chain_id,
            status,
            Arc::new(SafeProxyDeployer::from_config(self.config)),
            Arc::new(load_keyring(self.keys)?),
            Arc::new(LocalEnvelopeSigner),
        );
        let coordinator =
            PaymentCoordinator::new(self.selector, self.advisor, builder, executor, self.request);
        Ok(coordinator.pay_from_source(source, target)?)
    }
}

fn report(receipt: &PaymentReceipt, mode: &str, json: bool) -> Result<()> {
    if json {
        return print_json(receipt);
    }
    let plan = &receipt.plan;
    println!("mode={mode}");
    println!("strategy={}", plan.selection.strategy.as_str());
    println!("fragments={}", plan.selection.fragment_count());
    println!(
        "change={} ({:?} -> {:?})",
        plan.change.change_amount, plan.change.classification, plan.change.recommended_action
    );
    println!("paid={}", plan.batch.amount);
    println!("operations={}", plan.batch.len());
    println!("deployments={}", plan.batch.deployment_count());
    println!("gas_limit={}", plan.estimate.gas_limit);
    for warning in &plan.validation.warnings {
        println!("warning={warning}");
    }
    let result = &receipt.result;
    println!("tx_hash={}", result.transaction_hash);
    println!("block={}", result.block_number);
    println!("explorer={}", result.explorer_url);
    Ok(())
}
