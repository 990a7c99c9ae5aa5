use crate::command;
use crate::config::SharedConfig;
use crate::connection::ClientState;
use crate::persistence::aof::AofSender;
use crate::persistence::rdb;
use crate::store::SharedStore;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{debug, info};

pub async fn run_server(store: SharedStore, config: SharedConfig, aof: AofSender) -> std::io::Result<()> {
    let (bind, port, snapshot_interval, rdb_path) = {
        let cfg = config.read().await;
        (cfg.bind.clone(), cfg.port, cfg.snapshot_interval_secs, cfg.rdb_path())
    };

    let addr = format!("{bind}:{port}");
    let listener = TcpListener::bind(&addr).await?;
    info!("linekv listening on {addr}");

    let snapshot_store = store.clone();
    tokio::spawn(snapshot_loop(snapshot_store, rdb_path.clone(), snapshot_interval));

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = result?;
                debug!("new connection from {peer_addr}");

                let store = store.clone();
                let config = config.clone();
                let aof = aof.clone();

                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, store, config, aof).await {
                        debug!("connection error from {peer_addr}: {e}");
                    }
                    debug!("connection closed: {peer_addr}");
                });
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                let guard = store.read().await;
                if let Err(e) = rdb::save(&guard, &rdb_path) {
                    tracing::warn!("final snapshot failed: {e}");
                }
                return Ok(());
            }
        }
    }
}

async fn handle_connection(stream: TcpStream, store: SharedStore, config: SharedConfig, aof: AofSender) -> std::io::Result<()> {
    let mut client = ClientState::new();
    let mut lines = Framed::new(stream, LinesCodec::new());

    while let Some(line) = lines.next().await {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                let _ = lines.send(format!("ERR protocol error: {e}")).await;
                return Ok(());
            }
        };

        let reply = process_line(&line, &store, &config, &mut client, &aof).await;
        lines.send(reply).await?;
    }

    Ok(())
}

async fn process_line(line: &str, store: &SharedStore, config: &SharedConfig, client: &mut ClientState, aof: &AofSender) -> String {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some((&cmd, args)) = tokens.split_first() else {
        return crate::error::LineKvError::Generic("empty command".to_string()).to_reply();
    };
    let cmd = cmd.to_uppercase();

    if !client.authenticated && cmd != "AUTH" {
        return crate::error::LineKvError::NoAuth.to_reply();
    }

    command::dispatch(&cmd, args, store, config, client, aof).await.render()
}

/// Periodic snapshotter: holds the read lock for the duration of the dump
/// and is a single interval loop, so ticks never overlap (spec §4.F).
async fn snapshot_loop(store: SharedStore, path: String, interval_secs: u64) {
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
    loop {
        ticker.tick().await;
        let guard = store.read().await;
        match rdb::save(&guard, &path) {
            Ok(()) => debug!("snapshot written to {path}"),
            Err(e) => tracing::warn!("snapshot failed: {e}"),
        }
    }
}
