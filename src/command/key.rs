use super::{arg_to_i64, wrong_arg_count, Reply};
use crate::connection::ClientState;
use crate::persistence::aof::AofSender;
use crate::store::entry::now_millis;
use crate::store::SharedStore;

/// `DEL key` — removes the key unconditionally. A stale (already-expired)
/// entry is purged but not counted or logged, since it was already
/// logically absent (spec §4.D, `Database::del`).
pub async fn cmd_del(args: &[&str], store: &SharedStore, client: &ClientState, aof: &AofSender) -> Reply {
    let [key] = args else { return wrong_arg_count("DEL") };
    let idx = client.db_index;

    let mut guard = store.write().await;
    let removed = guard.db(idx).del(key);
    if removed {
        guard.dirty += 1;
    }

    let reply = if removed {
        let _ = aof.send(format!("DEL {idx} {key}")).await;
        Reply::Int(1)
    } else {
        Reply::Int(0)
    };
    drop(guard);
    reply
}

/// `EXISTS key` — read-only; never purges.
pub async fn cmd_exists(args: &[&str], store: &SharedStore, client: &ClientState) -> Reply {
    let [key] = args else { return wrong_arg_count("EXISTS") };
    let guard = store.read().await;
    let exists = guard.databases[client.db_index].peek(key).is_some();
    Reply::Int(if exists { 1 } else { 0 })
}

/// `EXPIRE key ttl_seconds` — sets an absolute deadline iff the key
/// exists and is live.
pub async fn cmd_expire(args: &[&str], store: &SharedStore, client: &ClientState, aof: &AofSender) -> Reply {
    let [key, ttl] = args else { return wrong_arg_count("EXPIRE") };
    let Some(ttl_seconds) = arg_to_i64(ttl) else {
        return Reply::Error(crate::error::LineKvError::NotInteger.to_reply());
    };
    let idx = client.db_index;

    let mut guard = store.write().await;
    let db = guard.db(idx);
    let purged = matches!(db.touch_mut(key), crate::store::Touch::Purged);
    let expires_at = (now_millis() as i64 + ttl_seconds * 1000).max(0) as u64;
    let set = db.set_expiry(key, expires_at);

    if purged {
        let _ = aof.send(format!("DEL {idx} {key}")).await;
    }
    let reply = if set {
        let _ = aof.send(format!("EXPIRE {idx} {key} {ttl_seconds}")).await;
        Reply::Int(1)
    } else {
        Reply::Int(0)
    };
    drop(guard);
    reply
}

/// `TTL key` — `-2` absent, `-1` no expiry, else whole seconds remaining.
/// Read-only; does not purge even when it observes `-2`.
pub async fn cmd_ttl(args: &[&str], store: &SharedStore, client: &ClientState) -> Reply {
    let [key] = args else { return wrong_arg_count("TTL") };
    let guard = store.read().await;
    match guard.databases[client.db_index].peek(key) {
        Some(entry) => Reply::Int(entry.ttl_seconds()),
        None => Reply::Int(-2),
    }
}

/// `TYPE key` — `"string"`, `"list"`, or `"none"`.
pub async fn cmd_type(args: &[&str], store: &SharedStore, client: &ClientState) -> Reply {
    let [key] = args else { return wrong_arg_count("TYPE") };
    let guard = store.read().await;
    let type_name = guard.databases[client.db_index]
        .peek(key)
        .map(|e| e.value.type_name())
        .unwrap_or("none");
    Reply::Bulk(type_name.to_string())
}

/// `RENAME src dst` — requires `src` to exist; overwrites `dst` and its
/// expiration. `src`'s TTL is not carried to `dst` (spec §9 open question
/// 2, resolved: dropped).
pub async fn cmd_rename(args: &[&str], store: &SharedStore, client: &ClientState, aof: &AofSender) -> Reply {
    let [src, dst] = args else { return wrong_arg_count("RENAME") };
    let idx = client.db_index;

    let mut guard = store.write().await;
    let db = guard.db(idx);
    let purged = matches!(db.touch_mut(src), crate::store::Touch::Purged);
    let renamed = db.rename(src, dst);

    if purged {
        let _ = aof.send(format!("DEL {idx} {src}")).await;
    }
    let reply = if renamed {
        let _ = aof.send(format!("RENAME {idx} {src} {dst}")).await;
        Reply::Ok
    } else {
        Reply::Error(crate::error::LineKvError::NoSuchKey.to_reply())
    };
    drop(guard);
    reply
}

/// `KEYS pattern` — read-only; excludes (without purging) expired keys.
pub async fn cmd_keys(args: &[&str], store: &SharedStore, client: &ClientState) -> Reply {
    let [pattern] = args else { return wrong_arg_count("KEYS") };
    let guard = store.read().await;
    let keys = guard.databases[client.db_index].keys(pattern);
    Reply::List(keys)
}
