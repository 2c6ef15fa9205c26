use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

use chaindash::commands::get_help_text;
use chaindash::{ChatController, Config, DevProvider, Exchange, GeminiClient, WalletManager};

#[derive(Parser)]
#[command(name = "chaindash")]
#[command(version)]
#[command(about = "Chat with an AI assistant that drives your wallet", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat (default)
    Chat,
    /// List the commands the assistant can issue
    Commands,
    /// Show or update configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Store a Gemini API key in config.toml
    SetKey { key: String },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chaindash=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        None | Some(Commands::Chat) => run_chat().await,
        Some(Commands::Commands) => {
            println!("{}", get_help_text());
            Ok(())
        }
        Some(Commands::Config { action: None }) => show_config(),
        Some(Commands::Config {
            action: Some(ConfigAction::SetKey { key }),
        }) => set_api_key(key),
    }
}

fn show_config() -> Result<()> {
    let config = Config::load()?;
    let rendered = toml::to_string_pretty(&config.redacted()).context("Failed to render config")?;

    println!("📁 {}\n", config.config_path().display());
    println!("{rendered}");
    if !config.has_api_key() {
        println!("⚠️  No API key configured. Run 'chaindash config set-key <KEY>' or set GEMINI_API_KEY.");
    }
    Ok(())
}

fn set_api_key(key: String) -> Result<()> {
    let mut config = Config::load()?;
    config.set_api_key(key);
    config.save_to(&config.config_path())?;
    println!("✅ API key saved to {}", config.config_path().display());
    Ok(())
}

async fn run_chat() -> Result<()> {
    let config = Config::load()?;
    let model = GeminiClient::from_config(&config)?;
    let provider = DevProvider::random(config.wallet.chain_id, config.wallet.dev_balance.clone());
    tracing::info!(account = provider.account(), chain_id = config.wallet.chain_id, "Using development wallet");

    let mut chat = ChatController::from_config(model, WalletManager::new(provider), &config);

    println!("🚀 chaindash ({})", config.assistant.model);
    println!("Ask about your wallet, or type 'exit' to quit.\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input, "exit" | "quit") {
            break;
        }

        print_exchange(&chat.submit(input).await);
    }

    println!("👋 Bye");
    Ok(())
}

fn print_exchange(exchange: &Exchange) {
    for reply in &exchange.replies {
        let marker = if reply.is_error() { "❌" } else { "🤖" };
        println!("{marker} {}\n", reply.content);
    }
}
