use super::{wrong_arg_count, Reply};
use crate::config::SharedConfig;
use crate::connection::ClientState;
use crate::persistence::aof::AofSender;
use crate::store::SharedStore;

/// `AUTH password` — always permitted regardless of auth state (spec §7).
pub async fn cmd_auth(args: &[&str], client: &mut ClientState, config: &SharedConfig) -> Reply {
    let [password] = args else { return wrong_arg_count("AUTH") };
    let expected = config.read().await.password.clone();
    if *password == expected {
        client.authenticated = true;
        Reply::Ok
    } else {
        Reply::Error(crate::error::LineKvError::InvalidPassword.to_reply())
    }
}

/// `SELECT index` — validates `0 <= index < databases` and updates the
/// connection's current-db, which is adapter-side state (spec §4.D/§4.H).
pub async fn cmd_select(args: &[&str], client: &mut ClientState, config: &SharedConfig) -> Reply {
    let [index] = args else { return wrong_arg_count("SELECT") };
    let Ok(index) = index.parse::<usize>() else {
        return Reply::Error(crate::error::LineKvError::NotInteger.to_reply());
    };
    let databases = config.read().await.databases;
    if index < databases {
        client.db_index = index;
        Reply::Ok
    } else {
        Reply::Error(crate::error::LineKvError::Generic("DB index is out of range".to_string()).to_reply())
    }
}

/// `FLUSHDB` — drops all keys in the caller's current database.
pub async fn cmd_flushdb(args: &[&str], store: &SharedStore, client: &ClientState, aof: &AofSender) -> Reply {
    if !args.is_empty() {
        return wrong_arg_count("FLUSHDB");
    }
    let idx = client.db_index;
    let mut guard = store.write().await;
    guard.db(idx).flush();
    let _ = aof.send(format!("FLUSHDB {idx}")).await;
    drop(guard);
    Reply::Ok
}

/// `FLUSHALL` — drops all keys in every database. The AOF record has no
/// database index (spec §6).
pub async fn cmd_flushall(args: &[&str], store: &SharedStore, aof: &AofSender) -> Reply {
    if !args.is_empty() {
        return wrong_arg_count("FLUSHALL");
    }
    let mut guard = store.write().await;
    guard.flush_all();
    let _ = aof.send("FLUSHALL".to_string()).await;
    drop(guard);
    Reply::Ok
}
