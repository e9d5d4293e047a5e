use clap::Parser;
use client::network::{Client, ProbeOptions};
use log::info;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Behave like a vanilla client and never register the side channel
    #[arg(long)]
    vanilla: bool,

    /// Delay before registering the side channel in milliseconds
    #[arg(short = 'r', long, default_value = "100")]
    register_delay_ms: u64,

    /// World to switch to after registering
    #[arg(short = 'w', long)]
    change_world: Option<String>,

    /// How long to stay connected in milliseconds
    #[arg(short = 'd', long, default_value = "5000")]
    duration_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting probe client...");
    info!("Connecting to: {}", args.server);
    if args.vanilla {
        info!("Running as a vanilla client");
    } else {
        info!("Registering side channel after {}ms", args.register_delay_ms);
    }

    let options = ProbeOptions {
        vanilla: args.vanilla,
        register_delay: Duration::from_millis(args.register_delay_ms),
        change_world: args.change_world,
        duration: Duration::from_millis(args.duration_ms),
    };

    let mut client = Client::new(&args.server, options).await?;
    client.run().await?;

    Ok(())
}
