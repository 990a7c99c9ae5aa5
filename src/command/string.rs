use super::{wrong_arg_count, wrong_type_error, Reply};
use crate::connection::ClientState;
use crate::persistence::aof::AofSender;
use crate::store::entry::Entry;
use crate::store::{SharedStore, Touch};
use crate::types::rstring::LineString;
use crate::types::Value;

/// `SET key value` — unconditional overwrite, clears any prior expiration
/// (spec §4.D). No purge bookkeeping needed: `Database::set` replaces
/// whatever was there, live or stale, in one step.
pub async fn cmd_set(args: &[&str], store: &SharedStore, client: &ClientState, aof: &AofSender) -> Reply {
    let [key, value] = args else { return wrong_arg_count("SET") };
    let idx = client.db_index;

    let mut guard = store.write().await;
    guard
        .db(idx)
        .set(key.to_string(), Entry::new(Value::String(LineString::new(value.to_string()))));
    guard.dirty += 1;
    let _ = aof.send(format!("SET {idx} {key} {value}")).await;
    drop(guard);

    Reply::Ok
}

/// `GET key` — read-only; never purges (spec §4.A).
pub async fn cmd_get(args: &[&str], store: &SharedStore, client: &ClientState) -> Reply {
    let [key] = args else { return wrong_arg_count("GET") };
    let guard = store.read().await;
    match guard.databases[client.db_index].peek(key) {
        Some(entry) => match entry.value.as_string() {
            Some(s) => Reply::Bulk(s.as_str().to_string()),
            None => wrong_type_error(),
        },
        None => Reply::Null,
    }
}

/// `SETNX key value` — set only if absent (a stale, expired entry counts
/// as absent and is purged in the same critical section).
pub async fn cmd_setnx(args: &[&str], store: &SharedStore, client: &ClientState, aof: &AofSender) -> Reply {
    let [key, value] = args else { return wrong_arg_count("SETNX") };
    let idx = client.db_index;

    let mut guard = store.write().await;
    let db = guard.db(idx);
    let (purged, set) = match db.touch_mut(key) {
        Touch::Found(_) => (false, false),
        Touch::Purged => {
            db.set(key.to_string(), Entry::new(Value::String(LineString::new(value.to_string()))));
            (true, true)
        }
        Touch::Missing => {
            db.set(key.to_string(), Entry::new(Value::String(LineString::new(value.to_string()))));
            (false, true)
        }
    };
    if set {
        guard.dirty += 1;
    }

    if purged {
        let _ = aof.send(format!("DEL {idx} {key}")).await;
    }
    let reply = if set {
        let _ = aof.send(format!("SET {idx} {key} {value}")).await;
        Reply::Int(1)
    } else {
        Reply::Int(0)
    };
    drop(guard);
    reply
}

async fn incr_or_decr(args: &[&str], store: &SharedStore, client: &ClientState, aof: &AofSender, delta: i64, cmd_name: &str) -> Reply {
    let [key] = args else { return wrong_arg_count(cmd_name) };
    let idx = client.db_index;

    let mut guard = store.write().await;
    let db = guard.db(idx);
    let (purged, result) = match db.touch_mut(key) {
        Touch::Found(entry) => {
            let result = match entry.value.as_string_mut() {
                Some(s) => s.incr_by(delta).map_err(|_| ()),
                None => Err(()),
            };
            (false, result)
        }
        Touch::Purged => {
            db.set(key.to_string(), Entry::new(Value::String(LineString::from_i64(delta))));
            (true, Ok(delta))
        }
        Touch::Missing => {
            db.set(key.to_string(), Entry::new(Value::String(LineString::from_i64(delta))));
            (false, Ok(delta))
        }
    };
    if result.is_ok() {
        guard.dirty += 1;
    }

    if purged {
        let _ = aof.send(format!("DEL {idx} {key}")).await;
    }

    let reply = match result {
        Ok(new_val) => {
            let _ = aof.send(format!("{cmd_name} {idx} {key}")).await;
            Reply::Int(new_val)
        }
        Err(()) => Reply::Error(crate::error::LineKvError::NotInteger.to_reply()),
    };
    drop(guard);
    reply
}

pub async fn cmd_incr(args: &[&str], store: &SharedStore, client: &ClientState, aof: &AofSender) -> Reply {
    incr_or_decr(args, store, client, aof, 1, "INCR").await
}

pub async fn cmd_decr(args: &[&str], store: &SharedStore, client: &ClientState, aof: &AofSender) -> Reply {
    incr_or_decr(args, store, client, aof, -1, "DECR").await
}
