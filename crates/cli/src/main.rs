mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "fragpay-cli", about = "fragpay developer CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Choose fragments covering a target amount.
    Select(commands::select::SelectArgs),
    /// Classify change left over by a payment.
    Advise(commands::select::AdviseArgs),
    /// Check a batch file against the sponsor's submission rules.
    Validate(commands::batch::BatchArgs),
    /// Rough gas estimate for a batch file.
    Estimate(commands::batch::EstimateArgs),
    /// Select, build and submit a sponsored payment (or --dry-run it).
    Pay(commands::pay::PayArgs),
}

fn main() {
    let cli = Cli::parse();
    let outcome = match cli.command {
        Commands::Select(args) => commands::select::run_select(args),
        Commands::Advise(args) => commands::select::run_advise(args),
        Commands::Validate(args) => commands::batch::run_validate(args),
        Commands::Estimate(args) => commands::batch::run_estimate(args),
        Commands::Pay(args) => commands::pay::run(args),
    };
    if let Err(err) = outcome {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}
