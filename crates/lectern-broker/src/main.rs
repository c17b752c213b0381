//! lectern-broker: WebSocket broker for local collaboration bus testing.

use clap::Parser;
use lectern_broker::Broker;

#[derive(Parser)]
#[command(name = "lectern-broker", about = "Development broker for the lectern collaboration bus")]
struct Args {
    /// Port to listen on.
    #[arg(short, long, default_value_t = 4000)]
    port: u16,

    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lectern_broker=info".into()),
        )
        .init();

    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);

    let broker = match Broker::start(&addr).await {
        Ok(broker) => broker,
        Err(e) => {
            tracing::error!(%addr, error = %e, "Failed to bind TCP listener");
            std::process::exit(1);
        }
    };

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
    }

    tracing::info!("Shutting down");
    broker.shutdown().await;
}
