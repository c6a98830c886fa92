use clap::Parser;
use tracing_subscriber::EnvFilter;

use tribot_runtime::config::DEFAULT_SPEED_CAP;
use tribot_runtime::runtime::{self, RuntimeOptions};

/// Control runtime for the tribot three-wheel omni base.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Log wheel commands instead of publishing them to the wheel nodes
    #[arg(long)]
    dry_run: bool,

    /// Global PWM speed cap (0-255)
    #[arg(long, default_value_t = DEFAULT_SPEED_CAP)]
    speed_cap: u16,

    /// Disable moving-average smoothing of raw sensor inputs
    #[arg(long)]
    no_smoothing: bool,
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    let args = Args::parse();
    let options = RuntimeOptions {
        dry_run: args.dry_run,
        speed_cap: args.speed_cap.min(DEFAULT_SPEED_CAP),
        no_smoothing: args.no_smoothing,
    };

    if let Err(e) = runtime::run(options).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
