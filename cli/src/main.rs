//! Ballot terminal client: renders the election contract and runs election
//! actions through the connected wallet.

mod shutdown;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use ballot_client::logging::init_logging;
use ballot_client::{Action, ClientConfig, Controller, TxState, View};
use ballot_gateway::RpcElectionContract;
use ballot_wallet::{ConnectionEvent, ConnectionManager, HttpWalletProvider, WalletProvider};
use clap::Parser;

use crate::shutdown::ShutdownController;

#[derive(Parser)]
#[command(name = "ballot", about = "Terminal client for the election contract")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base;
    /// flags and environment variables override them.
    #[arg(long, env = "BALLOT_CONFIG")]
    config: Option<PathBuf>,

    /// Wallet JSON-RPC endpoint.
    #[arg(long, env = "BALLOT_WALLET_URL")]
    wallet_url: Option<String>,

    /// Address of the deployed election contract.
    #[arg(long, env = "BALLOT_CONTRACT")]
    contract: Option<String>,

    /// Refuse to run when the wallet is on another chain.
    #[arg(long, env = "BALLOT_CHAIN_ID")]
    chain_id: Option<u64>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "BALLOT_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "BALLOT_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Print the current election state once.
    Status,
    /// Re-render on every change until Ctrl-C.
    Watch,
    /// Register a voter (owner only).
    RegisterVoter { address: String },
    /// Add a candidate (owner only).
    AddCandidate { name: String },
    /// Open the voting phase (owner only).
    StartVoting,
    /// Close the voting phase (owner only).
    EndVoting,
    /// Vote for a candidate by id.
    Vote { candidate_id: u64 },
}

impl Command {
    fn action(&self) -> Option<Action> {
        match self {
            Self::Status | Self::Watch => None,
            Self::RegisterVoter { address } => Some(Action::RegisterVoter(address.clone())),
            Self::AddCandidate { name } => Some(Action::AddCandidate(name.clone())),
            Self::StartVoting => Some(Action::StartVoting),
            Self::EndVoting => Some(Action::EndVoting),
            Self::Vote { candidate_id } => Some(Action::Vote(*candidate_id)),
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let path = path.to_string_lossy();
            ClientConfig::from_toml_file(&path)
                .with_context(|| format!("failed to load config from {path}"))?
        }
        None => ClientConfig::default(),
    };

    if let Some(url) = &cli.wallet_url {
        config.wallet_url = url.clone();
    }
    if let Some(contract) = &cli.contract {
        config.contract_address = contract.clone();
    }
    if cli.chain_id.is_some() {
        config.expected_chain_id = cli.chain_id;
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.log_format = format.clone();
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(config.log_format()?, &config.log_level)
        .map_err(|e| anyhow!("failed to initialise logging: {e}"))?;

    let http = HttpWalletProvider::new(config.wallet_url.clone())?;
    let watcher = http.spawn_watcher(config.account_poll_interval());
    let provider: Arc<dyn WalletProvider> = Arc::new(http);

    let contract = RpcElectionContract::new(Arc::clone(&provider), config.contract_address()?)
        .with_receipt_polling(config.receipt_poll_interval(), config.dropped_after_polls);
    let connection = Arc::new(ConnectionManager::new(
        Some(provider),
        config.expected_chain(),
    ));
    let controller = Arc::new(
        Controller::new(connection, Arc::new(contract)).with_max_candidates(config.max_candidates),
    );

    let result = run(&cli.command, &controller).await;
    watcher.abort();
    result
}

async fn run(command: &Command, controller: &Arc<Controller>) -> anyhow::Result<()> {
    let account = controller.connect().await?;
    tracing::info!(%account, "connected");

    if let Some(action) = command.action() {
        return execute(controller, action).await;
    }
    match command {
        Command::Watch => watch(controller).await,
        _ => {
            print_snapshot(controller);
            Ok(())
        }
    }
}

/// Run one action, printing each transition, then the refreshed state.
async fn execute(controller: &Controller, action: Action) -> anyhow::Result<()> {
    let mut events = controller.subscribe_transactions();
    let running = controller.execute(action);
    tokio::pin!(running);

    let state = loop {
        tokio::select! {
            state = &mut running => break state,
            Ok(event) = events.recv() => println!("{}", event.state),
        }
    };
    while let Ok(event) = events.try_recv() {
        println!("{}", event.state);
    }

    println!();
    print_snapshot(controller);
    match state {
        TxState::Failed { kind, message } => Err(anyhow!("{}: {message}", kind.as_str())),
        _ => Ok(()),
    }
}

async fn watch(controller: &Arc<Controller>) -> anyhow::Result<()> {
    let shutdown = Arc::new(ShutdownController::new());
    let mut stop = shutdown.subscribe();
    let runner = tokio::spawn(Arc::clone(controller).run(shutdown.subscribe()));
    let signals = {
        let shutdown = Arc::clone(&shutdown);
        tokio::spawn(async move { shutdown.wait_for_signal().await })
    };

    let mut snapshots = controller.subscribe_snapshot();
    let mut session = controller.subscribe_session();
    print_snapshot(controller);

    loop {
        tokio::select! {
            _ = stop.recv() => break,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                print_snapshot(controller);
            }
            event = session.recv() => match event {
                Ok(ConnectionEvent::NetworkChanged { chain_id, .. }) => {
                    println!("Wallet switched to chain {chain_id}; reconnecting.");
                    if let Err(e) = controller.connect().await {
                        println!("Reconnect failed: {e}");
                    }
                }
                Ok(ConnectionEvent::Disconnected { .. }) => {
                    println!("Wallet disconnected.");
                }
                Ok(ConnectionEvent::AccountChanged(ctx)) => {
                    println!("Active account is now {}.", ctx.account());
                }
                Ok(ConnectionEvent::Unchanged) => {}
                Err(e) => tracing::debug!("session events: {e}"),
            },
        }
    }

    signals.abort();
    runner.await.context("controller loop panicked")?;
    Ok(())
}

fn print_snapshot(controller: &Controller) {
    match controller.snapshot() {
        Some(snapshot) => {
            for line in View::render(&snapshot).to_lines() {
                println!("{line}");
            }
            println!("Contract: {}", controller.contract_address());
        }
        None => println!("No wallet connected."),
    }
}
