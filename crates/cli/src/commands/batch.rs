use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use fragpay_sdk::{estimate_cost, validate_request, BatchMetadata, BatchOperation, EstimateOptions};
use serde::Deserialize;

use super::common::{print_json, read_json};

/// Same shape as the body sent to the sponsor, so `pay --request-out`
/// output can be fed straight back in.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchFile {
    multicall_data: Vec<BatchOperation>,
    #[serde(default)]
    metadata: BatchMetadata,
}

#[derive(Clone, Debug, Args)]
pub struct BatchArgs {
    /// JSON file with `multicallData` and optional `metadata`.
    #[arg(long)]
    pub batch: PathBuf,
}

#[derive(Clone, Debug, Args)]
pub struct EstimateArgs {
    #[command(flatten)]
    pub input: BatchArgs,

    /// Gas price used to turn the limit into a wei cost.
    #[arg(long)]
    pub gas_price_wei: Option<u128>,

    /// Safety margin in basis points (12000 = +20%).
    #[arg(long)]
    pub margin_bps: Option<u32>,
}

pub fn run_validate(args: BatchArgs) -> Result<()> {
    let file: BatchFile = read_json(&args.batch, "batch")?;
    let report = validate_request(&file.multicall_data, &file.metadata);
    print_json(&report)?;
    if !report.is_valid {
        bail!("batch failed validation ({} error(s))", report.errors.len());
    }
    Ok(())
}

pub fn run_estimate(args: EstimateArgs) -> Result<()> {
    let file: BatchFile = read_json(&args.input.batch, "batch")?;
    let mut options = EstimateOptions::default();
    options.gas_price_wei = args.gas_price_wei;
    if let Some(margin) = args.margin_bps {
        options.safety_margin_bps = margin;
    }
    print_json(&estimate_cost(&file.multicall_data, &options))
}
