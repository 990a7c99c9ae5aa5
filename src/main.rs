use linekv::config::Config;
use linekv::persistence::{aof, rdb};
use linekv::server;
use linekv::store::DataStore;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = Config::load(&args);

    // Recovery (spec §4.G, §9 open question 1): the AOF is opened append-only
    // and never truncated or rotated when a snapshot is taken, so it is never
    // a post-snapshot tail — it is the complete history since the store was
    // last empty. Loading the snapshot and then replaying the whole file on
    // top would double-apply every record already folded into that snapshot
    // (non-idempotent ops like RPUSH/INCR/LPOP would diverge from the live
    // store). Resolved as AOF-only recovery: when appendonly is on, the AOF
    // alone reconstructs state and the snapshot is not loaded; the snapshot
    // only matters for recovery when appendonly is off.
    let rdb_path = config.rdb_path();
    let mut store = if config.appendonly {
        DataStore::new(config.databases)
    } else if std::path::Path::new(&rdb_path).exists() {
        match rdb::load(&rdb_path, config.databases) {
            Ok(store) => {
                info!("loaded snapshot from {rdb_path}");
                store
            }
            Err(e) => {
                tracing::warn!("failed to load snapshot: {e}, starting empty");
                DataStore::new(config.databases)
            }
        }
    } else {
        DataStore::new(config.databases)
    };

    if config.appendonly {
        let aof_path = config.aof_path();
        match aof::replay(&aof_path, &mut store) {
            Ok(count) => info!("replayed {count} AOF records from {aof_path}"),
            Err(e) => tracing::warn!("failed to replay AOF: {e}"),
        }
    }

    let aof_path = config.aof_path();
    let aof_capacity = config.aof_channel_capacity;
    let appendonly = config.appendonly;
    let store = Arc::new(RwLock::new(store));
    let config = Arc::new(RwLock::new(config));

    let (aof_tx, _writer_handle) = if appendonly {
        aof::spawn_writer(aof_path, aof_capacity).unwrap_or_else(|e| {
            tracing::error!("fatal: failed to open AOF file: {e}");
            std::process::exit(1);
        })
    } else {
        aof::spawn_disabled(aof_capacity)
    };

    server::run_server(store, config, aof_tx).await
}
