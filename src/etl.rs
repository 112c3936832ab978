//! Loads the S3 datasets into staging, fills the star schema, and reports
//! row counts, quality warnings, and the exploration queries.

use anyhow::Result;
use clap::Parser;
use sparkify_dwh::cli_style::{get_styles, print_error, print_pipeline_report, print_success};
use sparkify_dwh::logging::init_logging;
use sparkify_dwh::runner::{load_config, run_pipeline, version, RunArgs};
use sparkify_dwh::Pipeline;

#[derive(Parser, Debug)]
#[command(name = "etl", version = version(), styles = get_styles())]
#[command(about = "Load the Sparkify datasets into the warehouse star schema")]
struct CliArgs {
    #[command(flatten)]
    run: RunArgs,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();
    init_logging()?;

    let config = load_config(&cli_args.run)?;
    match run_pipeline(&Pipeline::etl(), &config, cli_args.run.dry_run).await {
        Ok(report) => {
            print_pipeline_report(&report);
            print_success(&format!("ETL finished in {:.2?}", report.total_elapsed()));
            Ok(())
        }
        Err(e) => {
            print_error(&format!("{:#}", e));
            Err(e)
        }
    }
}
