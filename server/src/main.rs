use clap::Parser;
use log::info;
use server::config::{BridgeConfig, HostConfig};
use server::events::LogSink;
use server::handler::NoopHandler;
use server::network::HostServer;
use shared::ServerRule;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Reference host for enhanced clients")]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Milliseconds a client has to register the side channel
    #[arg(short, long, default_value_t = shared::DEFAULT_GRACE_PERIOD_MS)]
    grace_ms: u64,

    #[arg(short, long, default_value = "32")]
    max_clients: usize,

    /// Seconds of silence before a client is dropped
    #[arg(short, long, default_value = "5")]
    timeout: u64,

    /// World names, first one is the spawn world (repeatable)
    #[arg(short, long = "world")]
    worlds: Vec<String>,

    /// Send world names instead of world ids
    #[arg(long)]
    named_worlds: bool,

    /// Server rules to enable for every client (repeatable)
    #[arg(short, long = "rule")]
    rules: Vec<ServerRule>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let defaults = HostConfig::default();

    let config = HostConfig {
        bind_addr: format!("{}:{}", args.host, args.port),
        max_clients: args.max_clients,
        client_timeout: Duration::from_secs(args.timeout),
        worlds: if args.worlds.is_empty() {
            defaults.worlds
        } else {
            args.worlds
        },
        named_worlds: args.named_worlds,
        rules: args.rules,
        bridge: BridgeConfig::default().with_grace_period(Duration::from_millis(args.grace_ms)),
    };
    config.validate()?;

    info!("Starting host on {}", config.bind_addr);
    info!(
        "Grace period: {:?}, max clients: {}, worlds: {:?}",
        config.bridge.grace_period, config.max_clients, config.worlds
    );

    let mut host = HostServer::new(config, Arc::new(NoopHandler), Arc::new(LogSink)).await?;
    host.run().await?;

    Ok(())
}
