// Inscription deployer CLI
// Deploys the InscriptionFactory contract and verifies it on a block explorer

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use env_logger::Env;
use inscription_deployer::artifact::DEFAULT_CONTRACT;
use inscription_deployer::commands::{self, print_error};
use inscription_deployer::config::{DeployConfig, OutputFormat};
use std::path::PathBuf;

fn print_banner() {
    println!(
        "{}",
        "    ◆ inscription-deploy ◆  contract deployment & verification"
            .bright_cyan()
            .bold()
    );
    println!();
}

#[derive(Parser)]
#[command(name = "inscription-deploy")]
#[command(about = "Deploy and verify the InscriptionFactory contract", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Network to use (defaults to the configured default network)
    #[arg(short, long, global = true)]
    network: Option<String>,

    /// Override the selected network's RPC URL, e.g. a local test node
    #[arg(short, long, global = true, env = "RPC_URL")]
    rpc_url: Option<String>,

    /// Settings file (defaults to ./deployer.toml, then ~/.inscription/deployer.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format: text, json or table
    #[arg(short, long, global = true)]
    format: Option<OutputFormat>,

    #[arg(short, long, global = true)]
    debug: bool,

    #[arg(long, global = true)]
    no_banner: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy a compiled contract with the network's first account
    Deploy {
        /// Contract to deploy, `path/Source.sol:Name` or `Name`
        #[arg(long, default_value = DEFAULT_CONTRACT)]
        contract: String,

        /// Artifact directory (overrides the configured path)
        #[arg(long)]
        artifacts: Option<PathBuf>,
    },

    /// Verify a deployed contract's source on the block explorer
    Verify {
        /// Deployed contract address
        #[arg(value_name = "ADDRESS")]
        address: String,

        #[arg(long, default_value = DEFAULT_CONTRACT)]
        contract: String,

        #[arg(long)]
        artifacts: Option<PathBuf>,
    },

    /// List the network's signing accounts
    Accounts {
        /// Also fetch each account's balance
        #[arg(long)]
        balances: bool,
    },

    /// Inspect or create settings
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Write deployer.toml with the current settings
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
        /// Write to ~/.inscription instead of the working directory
        #[arg(long)]
        global: bool,
    },
}

#[tokio::main]
async fn main() {
    // `.env` must be loaded before clap reads env-backed arguments
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        print_error(&format!("{:?}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Initialize logger
    let env = if cli.debug {
        Env::default().default_filter_or("debug")
    } else {
        Env::default().default_filter_or("info")
    };
    env_logger::init_from_env(env);

    // Load configuration, then apply command line overrides
    let mut config = DeployConfig::load(cli.config.as_deref())?;
    if let Some(format) = cli.format {
        config.output_format = format;
    }
    if cli.debug {
        config.debug = true;
    }
    let network = cli
        .network
        .unwrap_or_else(|| config.default_network.clone());
    if let Some(url) = cli.rpc_url {
        config = config.with_rpc_url(&network, url)?;
    }
    let config = config;

    if !cli.no_banner && config.output_format != OutputFormat::Json {
        print_banner();
    }

    match cli.command {
        Commands::Deploy {
            contract,
            artifacts,
        } => commands::deploy::run(&config, &network, &contract, artifacts).await,
        Commands::Verify {
            address,
            contract,
            artifacts,
        } => commands::verify::run(&config, &network, &address, &contract, artifacts).await,
        Commands::Accounts { balances } => {
            commands::accounts::run(&config, &network, balances).await
        }
        Commands::Config(ConfigCommands::Show) => commands::config::show(&config, &network).await,
        Commands::Config(ConfigCommands::Init { force, global }) => {
            commands::config::init(&config, force, global).await
        }
    }
}
