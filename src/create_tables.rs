//! Drops and recreates every staging, fact, and dimension table.

use anyhow::Result;
use clap::Parser;
use sparkify_dwh::cli_style::{get_styles, print_error, print_success};
use sparkify_dwh::logging::init_logging;
use sparkify_dwh::runner::{load_config, run_pipeline, version, RunArgs};
use sparkify_dwh::Pipeline;

#[derive(Parser, Debug)]
#[command(name = "create-tables", version = version(), styles = get_styles())]
#[command(about = "Drop and recreate the Sparkify warehouse tables")]
struct CliArgs {
    #[command(flatten)]
    run: RunArgs,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();
    init_logging()?;

    let config = load_config(&cli_args.run)?;
    match run_pipeline(&Pipeline::setup(), &config, cli_args.run.dry_run).await {
        Ok(report) => {
            print_success(&format!(
                "Tables recreated in {:.2?}",
                report.total_elapsed()
            ));
            Ok(())
        }
        Err(e) => {
            print_error(&format!("{:#}", e));
            Err(e)
        }
    }
}
