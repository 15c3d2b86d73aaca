mod app;
mod config;
mod error;
mod http;
mod live;
mod render;
mod socket;
mod state;
mod terminal;
#[cfg(test)]
mod test_helpers;

use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use time::OffsetDateTime;
use tokio::io::BufReader;

use crate::app::Visualizer;
use crate::config::{ClientConfig, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_HOST, DEFAULT_PORT};
use crate::error::ClientError;
use crate::http::{HttpMessageClient, MessageApi};
use crate::live::LiveFormat;

const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

#[derive(Parser, Debug)]
#[command(name = "typing-visualizer", about = "Compare HTTP and WebSocket updates for a typed text field")]
struct Cli {
    #[arg(long, env = "TYPING_HOST", default_value = DEFAULT_HOST)]
    host: String,

    #[arg(long, env = "TYPING_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    #[arg(long, env = "TYPING_FORMAT", value_enum, default_value_t = LiveFormat::Plain)]
    format: LiveFormat,

    #[arg(long, env = "TYPING_CONNECT_TIMEOUT_SECS", default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS)]
    connect_timeout_secs: u64,

    #[arg(long, env = "TYPING_LOG", default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive session (default).
    Live,
    /// Check that the backend answers on `/`.
    Ping,
    Http(HttpCommand),
}

#[derive(Args, Debug)]
struct HttpCommand {
    #[command(subcommand)]
    command: HttpSubcommand,
}

#[derive(Subcommand, Debug)]
enum HttpSubcommand {
    /// Write `text`, then read back the latest value.
    Send { text: String },
    /// Read the latest value.
    Get,
}

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    let cli = Cli::parse();
    tracing_subscriber::fmt().with_max_level(cli.log_level).with_writer(std::io::stderr).init();

    let config = ClientConfig::new(&cli.host, cli.port, cli.format, cli.connect_timeout_secs)?;

    match cli.command.unwrap_or(Command::Live) {
        Command::Live => run_live(&config).await,
        Command::Ping => run_ping(&config).await,
        Command::Http(command) => run_http(&config, command).await,
    }
}

async fn run_live(config: &ClientConfig) -> Result<(), ClientError> {
    let (mut vis, mut events) = Visualizer::mount(config)?;
    let mut stdout = std::io::stdout();
    println!("{}", terminal::HELP);

    let input = BufReader::new(tokio::io::stdin());
    tokio::select! {
        result = terminal::run_session(&mut vis, &mut events, input, &mut stdout) => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("interrupted"),
    }

    terminal::shutdown(&mut vis, &mut events, SHUTDOWN_GRACE, &mut stdout).await
}

async fn run_ping(config: &ClientConfig) -> Result<(), ClientError> {
    let client = HttpMessageClient::new(config)?;
    let info = client.ping().await?;
    print_json(&info)
}

async fn run_http(config: &ClientConfig, command: HttpCommand) -> Result<(), ClientError> {
    let client = HttpMessageClient::new(config)?;
    match command.command {
        HttpSubcommand::Send { text } => {
            let value = http::round_trip(&client, &text, OffsetDateTime::now_utc()).await?;
            println!("{}", render::http_panel(Some(&value)));
            Ok(())
        }
        HttpSubcommand::Get => {
            let body = client.get_message().await?;
            print_json(&serde_json::to_value(body)?)
        }
    }
}

fn print_json(value: &Value) -> Result<(), ClientError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
