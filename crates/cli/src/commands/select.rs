use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Args;
use fragment_core::{
    ChangeAdvisor, ChangePolicy, CoinSelector, FragmentFilter, Selection, SelectorConfig,
};

use super::common::{
    load_fragments, parse_address, parse_amount, print_json, read_json, resolve_decimals,
};

#[derive(Clone, Debug, Args)]
pub struct SelectArgs {
    /// JSON array of fragment records.
    #[arg(long)]
    pub fragments: PathBuf,

    /// Amount to cover, in token units (e.g. 0.0003).
    #[arg(long)]
    pub target: String,

    /// Token decimals; defaults to the fragments' own.
    #[arg(long)]
    pub decimals: Option<u8>,

    /// Only consider fragments of this token (0x-prefixed).
    #[arg(long)]
    pub token: Option<String>,

    /// SelectorConfig JSON overriding the defaults.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print the full selection as JSON.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Clone, Debug, Args)]
pub struct AdviseArgs {
    /// Change left after the payment, in token units.
    #[arg(long)]
    pub change: String,

    /// Payment target, in token units.
    #[arg(long)]
    pub target: String,

    #[arg(long, default_value_t = 18)]
    pub decimals: u8,

    /// Dust threshold override, in token units.
    #[arg(long)]
    pub dust: Option<String>,

    /// ChangePolicy JSON overriding the defaults.
    #[arg(long)]
    pub policy: Option<PathBuf>,
}

pub fn run_select(args: SelectArgs) -> Result<()> {
    let mut fragments = load_fragments(&args.fragments)?;
    if let Some(token) = &args.token {
        let filter = FragmentFilter::for_token(parse_address(token)?);
        fragments = filter.apply(&fragments).into_iter().cloned().collect();
    }
    let decimals = resolve_decimals(args.decimals, &fragments)?;
    let target = parse_amount(&args.target, decimals, "target")?;
    let config = match &args.config {
        Some(path) => read_json::<SelectorConfig>(path, "selector config")?,
        None => SelectorConfig::default(),
    };

    let selection = CoinSelector::new(config).select(&fragments, target);
    if args.json {
        return print_json(&selection);
    }
    print_summary(&selection);
    Ok(())
}

fn print_summary(selection: &Selection) {
    println!("reached={}", selection.reached);
    println!("strategy={}", selection.strategy.as_str());
    println!("target={}", selection.target);
    println!("total_drawn={}", selection.total_drawn);
    println!("change={}", selection.change);
    println!("available={}", selection.available_total);
    if !selection.reached {
        println!("shortfall={}", selection.shortfall());
    }
    println!("score={:.6}", selection.score.points());
    println!("fragments={}", selection.fragment_count());
    for chosen in &selection.chosen {
        println!(
            "chosen=#{} {} {}{}",
            chosen.fragment.selection_index,
            chosen.fragment.wallet_address,
            chosen.amount_to_draw,
            if chosen.is_full_draw { "" } else { " partial" }
        );
    }
}

pub fn run_advise(args: AdviseArgs) -> Result<()> {
    let mut policy = match &args.policy {
        Some(path) => read_json::<ChangePolicy>(path, "change policy")?,
        None => ChangePolicy::default(),
    };
    if let Some(dust) = args.dust {
        policy.dust_threshold = dust;
    }
    let change = parse_amount(&args.change, args.decimals, "change")?;
    let target = parse_amount(&args.target, args.decimals, "target")?;
    let disposition = ChangeAdvisor::new(policy)
        .advise(change, target)
        .map_err(|err| anyhow!("change policy: {err:#}"))?;
    print_json(&disposition)
}
