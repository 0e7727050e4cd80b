use anyhow::Context;
use clap::Parser;
use packagetrack::utils::{logger, validation::Validate};
use packagetrack::{
    register_default_carriers, CarrierRegistry, CliConfig, ConfigProvider, FileConfig, HttpTransport,
    NullConfig, Package, ProbeStrategy, TrackingError,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }
    tracing::debug!("CLI config: {:?}", cli);

    let config = load_config(&cli)?;
    let transport = Arc::new(HttpTransport::with_timeout(Duration::from_secs(cli.timeout_seconds)));
    let strategy = if cli.concurrent_probes {
        ProbeStrategy::Concurrent
    } else {
        ProbeStrategy::Sequential
    };
    let registry = Arc::new(CarrierRegistry::with_probe_strategy(strategy));
    register_default_carriers(&registry, config, transport);

    let mut exit_code = 0;
    for tracking_number in &cli.tracking_numbers {
        if let Err(err) = report(&cli, Package::new(tracking_number.as_str(), Arc::clone(&registry))).await {
            tracing::error!(tracking_number = %tracking_number, "Lookup failed: {}", err);
            eprintln!("{}: {}", tracking_number, err);
            exit_code = exit_code.max(err.exit_code());
        }
    }

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}

fn load_config(cli: &CliConfig) -> anyhow::Result<Arc<dyn ConfigProvider>> {
    let file = match &cli.config {
        Some(path) => Some(
            FileConfig::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
        ),
        None => FileConfig::load_default().context("Failed to load default config")?,
    };

    match file {
        Some(file) => {
            file.validate().context("Invalid carrier configuration")?;
            tracing::info!("Using carrier configuration from {:?}", file.path());
            Ok(Arc::new(file))
        }
        None => {
            tracing::warn!("No configuration file found; carriers needing credentials will fail");
            Ok(Arc::new(NullConfig))
        }
    }
}

async fn report(cli: &CliConfig, package: Package) -> Result<(), TrackingError> {
    let carrier = package.carrier().await?;
    let url = package.url().await?;

    if cli.url_only {
        println!("{}\t{}\t{}", package.tracking_number(), carrier.short_name(), url);
        return Ok(());
    }

    let info = package.track().await?;
    if cli.json {
        let rendered = serde_json::to_string_pretty(&info)
            .map_err(|e| TrackingError::api(format!("Failed to render result: {}", e)))?;
        println!("{}", rendered);
    } else {
        println!("{} ({})", info.tracking_number, carrier.long_name());
        println!("  Status:   {}", info.status());
        println!("  Location: {}", info.location());
        println!("  Updated:  {}", info.last_update());
        if let Some(date) = info.delivery_date {
            let label = if info.is_delivered { "Delivered" } else { "Expected" };
            println!("  {}: {}", label, date);
        }
        println!("  Track:    {}", url);
    }
    Ok(())
}
