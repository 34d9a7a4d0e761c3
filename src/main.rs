use airdrop_sender::config::{get_tx_explorer_url, Config};
use airdrop_sender::import;
use airdrop_sender::metadata::{self, TokenMetadata};
use airdrop_sender::operation_log::OperationLog;
use airdrop_sender::settings::Settings;
use airdrop_sender::{compute_total, utils, AirdropOrchestrator, ChainClient, EthersClient, SubmissionState};
use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use ethers::types::Address;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "airdrop-sender", version, about = "Send an ERC-20 token to many recipients in one transaction")]
struct Cli {
    #[command(flatten)]
    network: NetworkArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct NetworkArgs {
    /// RPC endpoint (overrides RPC_URL, the settings file and the built-in network table)
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    /// Chain to operate on (overrides CHAIN_ID)
    #[arg(long, global = true)]
    chain_id: Option<u64>,

    /// Airdrop contract for the active chain (overrides AIRDROP_CONTRACT and the settings file)
    #[arg(long, global = true)]
    airdrop_contract: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the total of an amount list (invalid entries are skipped)
    Total(AmountsArgs),
    /// Look up name, symbol, decimals and supply of a token
    TokenInfo {
        #[arg(long)]
        token: String,
    },
    /// Approve (if needed) and airdrop
    Send(SendArgs),
}

#[derive(Args)]
struct AmountsArgs {
    /// Amounts separated by commas or newlines
    #[arg(long, conflicts_with = "amounts_file")]
    amounts: Option<String>,
    #[arg(long)]
    amounts_file: Option<PathBuf>,
}

#[derive(Args)]
struct SendArgs {
    #[arg(long)]
    token: String,
    /// Recipients separated by commas or newlines
    #[arg(long, conflicts_with_all = ["recipients_file", "csv"])]
    recipients: Option<String>,
    #[arg(long, conflicts_with = "csv")]
    recipients_file: Option<PathBuf>,
    #[command(flatten)]
    amounts: AmountsArgs,
    /// CSV file of `address,amount` rows instead of separate lists
    #[arg(long)]
    csv: Option<PathBuf>,
    /// Hex private key of the sending account
    #[arg(long, env = "PRIVATE_KEY", hide_env_values = true)]
    private_key: String,
}

fn read_text(inline: Option<String>, file: Option<PathBuf>, what: &str) -> Result<String> {
    match (inline, file) {
        (Some(text), _) => Ok(text),
        (None, Some(path)) => fs::read_to_string(&path).with_context(|| format!("Failed to read {} from {:?}", what, path)),
        (None, None) => Err(anyhow!("No {} given", what)),
    }
}

fn load_config(network: &NetworkArgs) -> Result<Config> {
    let settings = Settings::load();
    let mut config = match Config::from_settings(&settings) {
        Ok(config) => config,
        Err(e) => {
            warn!("Ignoring settings: {:#}", e);
            Config::default()
        }
    };
    config.apply_env()?;

    if let Some(chain_id) = network.chain_id {
        config.set_chain(chain_id);
    }
    if let Some(rpc) = &network.rpc_url {
        config.set_rpc_url(rpc);
    }
    if let Some(contract) = &network.airdrop_contract {
        config.set_airdrop_contract(contract)?;
    }
    info!("Using {} (chain {}) via {}", config.network_label(), config.chain_id, config.rpc_url);
    Ok(config)
}

fn print_metadata(token: Address, metadata: &TokenMetadata) {
    println!("Token:        {:?}", token);
    println!("Name:         {}", metadata.name.as_deref().unwrap_or("n/a"));
    println!("Symbol:       {}", metadata.symbol.as_deref().unwrap_or("n/a"));
    println!(
        "Decimals:     {}",
        metadata.decimals.map(|d| d.to_string()).unwrap_or_else(|| "n/a".to_string())
    );
    println!("Total supply: {}", metadata.total_supply.as_deref().unwrap_or("n/a"));
}

async fn token_info(config: &Config, token: &str) -> Result<()> {
    let token = metadata::parse_token_input(token).ok_or_else(|| anyhow!("Invalid token address: {}", token))?;
    let client = EthersClient::read_only(config).await?;
    let details = metadata::resolve(&client, token).await?;
    print_metadata(token, &details);
    Ok(())
}

async fn send(config: &Config, args: SendArgs) -> Result<()> {
    let (recipients, amounts) = match &args.csv {
        Some(path) => {
            let lists = import::load_csv_file(path)?;
            (lists.recipients, lists.amounts)
        }
        None => (
            read_text(args.recipients, args.recipients_file, "recipients")?,
            read_text(args.amounts.amounts, args.amounts.amounts_file, "amounts")?,
        ),
    };

    let client: Arc<dyn ChainClient> = Arc::new(EthersClient::with_private_key(config, &args.private_key).await?);

    // Display only; failure here never blocks the airdrop
    let token_details = match metadata::parse_token_input(&args.token) {
        Some(token) => metadata::resolve(client.as_ref(), token).await.ok(),
        None => None,
    };
    let decimals = token_details.as_ref().and_then(|m| m.decimals);
    let symbol = token_details.as_ref().and_then(|m| m.symbol.clone());
    info!(
        "Total to send: {}",
        utils::format_with_symbol(compute_total(&amounts), decimals, symbol.as_deref())
    );

    let log = OperationLog::default_location();
    let orchestrator = AirdropOrchestrator::new(client, config.targets.clone()).with_operation_log(log.clone());

    let mut states = orchestrator.subscribe();
    let progress = tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = states.borrow_and_update().clone();
            match state {
                SubmissionState::AwaitingWalletApproval | SubmissionState::AwaitingWalletAirdropSignature => {
                    println!("... {}", state.display_text())
                }
                _ => println!("{}", state.display_text()),
            }
        }
    });

    let outcome = orchestrator.submit(&args.token, &recipients, &amounts).await;
    drop(orchestrator);
    let _ = progress.await;

    let receipt = outcome?;
    let tx = format!("{:?}", receipt.airdrop_tx);
    println!("Airdrop confirmed in block {:?}: {}", receipt.block_number, tx);
    if let Some(url) = get_tx_explorer_url(receipt.chain_id, &tx) {
        println!("{}", url);
    }
    info!("Recorded in {:?}", log.path());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let Cli { network, command } = Cli::parse();

    match command {
        Command::Total(amounts) => {
            let text = read_text(amounts.amounts, amounts.amounts_file, "amounts")?;
            println!("{}", compute_total(&text));
        }
        Command::TokenInfo { token } => {
            let config = load_config(&network)?;
            token_info(&config, &token).await?;
        }
        Command::Send(args) => {
            let config = load_config(&network)?;
            send(&config, args).await?;
        }
    }

    Ok(())
}
