use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use clap::Parser;
use skv_gateway::logging::{self, LogTarget};
use skv_gateway::{Gateway, GatewayConfig};
use tracing::info;

/// Run one gateway action against the configured stores.
#[derive(Debug, Parser)]
#[command(name = "skv-gateway", version)]
struct Args {
    /// JSON process config.
    #[arg(long, default_value = "./conf")]
    config: PathBuf,
    /// Append logs here instead of stderr.
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// Action name, e.g. sign_up.
    #[arg(long, default_value = "sign_up")]
    action: String,
    /// JSON object payload for the action.
    #[arg(long)]
    data: String,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let target = match args.log_file {
        Some(path) => LogTarget::File(path),
        None => LogTarget::Stderr,
    };
    logging::init(&target).context("init logging")?;

    let config = GatewayConfig::load(&args.config)
        .with_context(|| format!("gateway load failed, {}", args.config.display()))?;
    let gateway = Gateway::connect(&config).context("gateway load failed")?;
    info!(stores = config.stores.len(), "gateway ready");

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as i64;
    let reply = gateway.dispatch(&args.action, &args.data, now);
    println!("{}", reply.body());
    Ok(())
}
