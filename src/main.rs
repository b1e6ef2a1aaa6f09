//! BinancePyramid - Main Entry Point
//!
//! Drives one position lifecycle at a time on Binance USDT-M futures from
//! operator commands read on stdin.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use binance_pyramid::{
    config, parse_command, ApiCredentials, BinanceFuturesClient, BoxedNotifier, Command,
    NoopNotifier, StrategyConfig, StrategyMachine, StrategyRunner, WebhookNotifier,
};

/// CLI arguments for the application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Use the paper-trading parameter scaling
    #[arg(long)]
    paper: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting BinancePyramid");
    info!("Configuration file: {}", args.config);

    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    let mut app_config = config::load_config(Some(&args.config))?;
    config::load_from_env(&mut app_config);

    let strategy_config = if args.paper || app_config.settings.paper {
        info!("paper-trading parameter set active");
        StrategyConfig::paper()
    } else {
        app_config.strategy.clone()
    };

    let credentials = match (&app_config.exchange.api_key, &app_config.exchange.api_secret) {
        (Some(key), Some(secret)) => Some(ApiCredentials {
            api_key: key.clone(),
            api_secret: secret.clone(),
        }),
        _ => {
            warn!("no API credentials configured; signed endpoints will fail");
            None
        }
    };

    let mut client = BinanceFuturesClient::new(&app_config.exchange.rest_url)?
        .with_recv_window(app_config.exchange.recv_window_ms);
    if let Some(creds) = credentials {
        client = client.with_credentials(creds);
    }
    let exchange = Arc::new(client);

    let notifier: BoxedNotifier = match &app_config.settings.notify_webhook {
        Some(url) => Box::new(WebhookNotifier::new(url.clone())),
        None => Box::new(NoopNotifier),
    };

    let machine = StrategyMachine::new(
        exchange,
        strategy_config,
        &app_config.settings,
        notifier,
    );

    let (tx, rx) = mpsc::channel::<Command>(32);
    let poll_interval = Duration::from_millis(app_config.settings.poll_interval_ms);
    let runner = StrategyRunner::new(machine, rx, poll_interval);
    let runner_handle = tokio::spawn(runner.run());

    info!("ready; commands: start/confirm/cancel/reset/status/quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim().to_string();
        if line == "quit" || line == "exit" {
            break;
        }
        if line == "status" {
            let (reply_tx, reply_rx) = oneshot::channel();
            if tx.send(Command::Status(reply_tx)).await.is_err() {
                break;
            }
            match reply_rx.await {
                Ok(status) => println!("{}", status),
                Err(_) => break,
            }
            continue;
        }
        match parse_command(&line) {
            Ok(Some(cmd)) => {
                if tx.send(cmd).await.is_err() {
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => warn!("{}", e),
        }
    }

    info!("shutting down");
    drop(tx);
    runner_handle.await?;
    Ok(())
}
