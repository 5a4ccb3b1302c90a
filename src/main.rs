#![allow(missing_docs)]

//! Courier dev-runner.
//!
//! Thin CLI around the library entry points for local runs: builds an
//! execution context from the process environment (or a dotenv-format
//! file via `--env-file`), invokes the dispatcher, and routes failures
//! through the classifier exactly as the calling framework would.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use courier::context::ExecutionContext;
use courier::dispatch::{DeliveryMode, Dispatcher, SendRequest};
use courier::handler;
use courier::logging;

#[derive(Parser)]
#[command(name = "courier", version, about = "Single-shot message dispatcher")]
struct Cli {
    /// Emit JSON log lines instead of human-readable output.
    #[arg(long, global = true)]
    log_json: bool,

    /// Load context from a dotenv-format file instead of the process
    /// environment. The file must be 0600.
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send one message.
    Send {
        /// Message text.
        #[arg(long)]
        text: String,
        /// Target channel (required unless --webhook).
        #[arg(long)]
        channel: Option<String>,
        /// Deliver via the pre-authorized webhook URL.
        #[arg(long)]
        webhook: bool,
        /// Explicit address override (falls back to $ADDRESS).
        #[arg(long)]
        address: Option<String>,
    },
    /// Acknowledge a graceful shutdown.
    Halt {
        /// Shutdown reason.
        #[arg(long)]
        reason: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.log_json {
        logging::init_json();
    } else {
        logging::init();
    }

    // Local convenience only; the framework supplies the bags itself.
    let ctx = match &cli.env_file {
        Some(path) => ExecutionContext::from_env_file(path)?,
        None => ExecutionContext::from_process_env(),
    };

    match cli.command {
        Command::Send {
            text,
            channel,
            webhook,
            address,
        } => {
            let request = SendRequest {
                text,
                channel,
                mode: if webhook {
                    DeliveryMode::Webhook
                } else {
                    DeliveryMode::Api
                },
                address,
            };
            let dispatcher = Dispatcher::new();

            match dispatcher.invoke(&request, &ctx).await {
                Ok(result) => {
                    println!("{}", serde_json::to_string_pretty(&result)?);
                    Ok(())
                }
                // Feed the failure through the error entry point the
                // way the framework would on a failed run.
                Err(error) => match dispatcher.on_error(error, &request, &ctx).await {
                    Ok(outcome) => {
                        println!("{}", serde_json::to_string_pretty(&outcome)?);
                        Ok(())
                    }
                    Err(fatal) => Err(fatal.into()),
                },
            }
        }
        Command::Halt { reason } => {
            let ack = handler::halt(reason);
            println!("{}", serde_json::to_string_pretty(&ack)?);
            Ok(())
        }
    }
}
