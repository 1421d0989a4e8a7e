use std::path::Path;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};

use textprep::config::{update_config, Config};
use textprep::constants::{CONFIG_PATH, CONFIG_TEMPLATE_PATH, ENV_PATH, METRICS_SNAPSHOT_PATH};
use textprep::logging::init_logging;
use textprep::metrics;
use textprep::Pipeline;

#[derive(Parser)]
#[command(name = "textprep")]
#[command(about = "Prepare labelled free-text data for classifier training")]
#[command(version)]
struct Cli {
    /// Regenerate the config file from its template and the environment before running
    #[arg(long)]
    update_config: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(Path::new(ENV_PATH));
    let recorder = metrics::install_recorder();

    let outcome = run(&cli);
    if let Some(handle) = &recorder {
        if let Err(e) = metrics::write_snapshot(handle, Path::new(METRICS_SNAPSHOT_PATH)) {
            warn!("Could not write metrics snapshot: {}", e);
        }
    }
    if let Err(e) = outcome {
        error!("Run failed: {:#}", e);
        return Err(e);
    }
    Ok(())
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    if cli.update_config {
        update_config(Path::new(CONFIG_TEMPLATE_PATH), Path::new(CONFIG_PATH))
            .context("failed to update configuration")?;
    }

    let config = Config::load(Path::new(CONFIG_PATH)).context("failed to load configuration")?;
    info!(
        "Preparing {} -> {} from {}",
        config.features_name,
        config.target_name,
        config.input_data.display()
    );

    let artifact = Pipeline::new(config).run()?;

    println!("\n📊 Preparation Results:");
    println!("   Rows: {}", artifact.rows);
    for (label, count) in &artifact.class_counts {
        println!("   {}: {}", label, count);
    }
    if let Some(path) = &artifact.staged_to {
        println!("   Output file: {}", path.display());
    }
    Ok(())
}
