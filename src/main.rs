use std::sync::Arc;

use chainindex::client::NullClient;
use chainindex::config::{self, IndexerConfig};
use chainindex::store::{KvStore, MemoryStore, RocksStore};
use chainindex::telemetry::{init_tracing, TelemetryConfig};
use chainindex::IndexDb;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::load_config().unwrap_or_else(|err| {
        eprintln!("failed to load config, falling back to defaults: {}", err);
        IndexerConfig {
            network: 0,
            memory: true,
            prefix: ".".to_string(),
            location: None,
            max_files: 64,
            cache_size: 16 * 1024 * 1024,
            compression: true,
            indexers: vec!["tx".to_string(), "addr".to_string()],
            channel_capacity: 256,
            rollback_chunk_size: 10_000,
        }
    });

    init_tracing(TelemetryConfig::default())?;
    tracing::info!(network = cfg.network, memory = cfg.memory, "starting chainindexd");

    let store: Arc<dyn KvStore> = if cfg.memory {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(RocksStore::open(cfg.store_path(), cfg.max_files as i32, cfg.cache_size, cfg.compression)?)
    };

    // No concrete chain producer ships with the core; `NullClient` exercises
    // the wiring without reintroducing a P2P/RPC surface.
    let client = Arc::new(NullClient);

    let db = IndexDb::open(store, client, &cfg.indexers, cfg.network, cfg.rollback_chunk_size).await?;

    let (events_tx, events_rx) = tokio::sync::mpsc::channel(cfg.channel_capacity);
    let (errors_tx, mut errors_rx) = tokio::sync::mpsc::unbounded_channel();

    let error_logger = tokio::spawn(async move {
        while let Some(err) = errors_rx.recv().await {
            tracing::error!(error = %err, "index db reported an error");
        }
    });

    config::init_global_config(cfg).ok();

    // Nothing feeds this binary's channel — a concrete chain producer is
    // outside the core's scope (§1) — so close it immediately and let
    // `run` demonstrate a clean shutdown rather than hang forever.
    drop(events_tx);
    db.run(events_rx, errors_tx).await;
    db.close();
    error_logger.await.ok();

    Ok(())
}
