use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use kms_provisioner::config::DEFAULT_CONFIG_PATH;
use kms_provisioner::{
    render_plan, render_rows, AwsKms, Environment, OutputFormat, ProvisionConfig, Provisioner,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kms-provisioner")]
#[command(about = "Provision KMS signing keys for every environment, network and agent role")]
struct Cli {
    /// Path to the provisioning config
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Override the AWS region from the config
    #[arg(long)]
    region: Option<String>,

    /// Provision only these environments (repeatable)
    #[arg(short, long = "environment")]
    environments: Vec<Environment>,

    /// Number of keys resolved in parallel
    #[arg(long)]
    concurrency: Option<usize>,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create missing keys and report every key with its address (default)
    Provision,
    /// Show which keys exist and which would be created, without changing anything
    Plan,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    // stdout carries the report only
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("kms_provisioner=info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = ProvisionConfig::load(&cli.config)?;
    config.apply_overrides(cli.region, cli.environments, cli.concurrency);
    config.validate_runtime()?;
    let taxonomy = config.taxonomy()?;

    info!("🌍 Using AWS region: {}", taxonomy.region);
    let kms = Arc::new(AwsKms::from_region(&taxonomy.region).await);
    let provisioner = Provisioner::new(kms, config.list_page_size, config.concurrency);

    match cli.command.unwrap_or(Commands::Provision) {
        Commands::Provision => {
            let rows = provisioner.run(&taxonomy).await?;
            println!("{}", render_rows(&rows, cli.format)?);
        }
        Commands::Plan => {
            let entries = provisioner.plan(&taxonomy).await?;
            println!("{}", render_plan(&entries, cli.format)?);
        }
    }

    Ok(())
}
