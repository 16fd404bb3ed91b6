use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use probevisor::{Config, HeartbeatProbe, ProbeRegistry, agent};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = Config::default();
    let mut registry = ProbeRegistry::new();
    registry.register(
        HeartbeatProbe::NAME,
        HeartbeatProbe::factory(cfg.heartbeat_interval),
    );

    agent::run(registry, cfg, |ev| println!("[{}] {}", ev.probe_name, ev.data))
        .await
        .context("probe agent failed")?;
    Ok(())
}
