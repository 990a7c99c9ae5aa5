use super::{arg_to_i64, wrong_arg_count, wrong_type_error, Reply};
use crate::connection::ClientState;
use crate::persistence::aof::AofSender;
use crate::store::entry::Entry;
use crate::store::{SharedStore, Touch};
use crate::types::list::LineList;
use crate::types::Value;

async fn push(args: &[&str], store: &SharedStore, client: &ClientState, aof: &AofSender, from_head: bool, cmd_name: &str) -> Reply {
    let [key, rest @ ..] = args else { return wrong_arg_count(cmd_name) };
    if rest.is_empty() {
        return wrong_arg_count(cmd_name);
    }
    let idx = client.db_index;

    let mut guard = store.write().await;
    let db = guard.db(idx);
    let (purged, result) = match db.touch_mut(key) {
        Touch::Found(entry) => (
            false,
            match entry.value.as_list_mut() {
                Some(list) => {
                    for v in rest {
                        if from_head {
                            list.lpush(v.to_string());
                        } else {
                            list.rpush(v.to_string());
                        }
                    }
                    Ok(list.len())
                }
                None => Err(()),
            },
        ),
        Touch::Purged => (true, Ok(new_list(db, key, rest, from_head))),
        Touch::Missing => (false, Ok(new_list(db, key, rest, from_head))),
    };

    if purged {
        let _ = aof.send(format!("DEL {idx} {key}")).await;
    }
    let reply = match result {
        Ok(len) => {
            let _ = aof.send(format!("{cmd_name} {idx} {key} {}", rest.join(" "))).await;
            Reply::Int(len as i64)
        }
        Err(()) => wrong_type_error(),
    };
    drop(guard);
    reply
}

fn new_list(db: &mut crate::store::Database, key: &str, values: &[&str], from_head: bool) -> usize {
    let mut list = LineList::new();
    for v in values {
        if from_head {
            list.lpush(v.to_string());
        } else {
            list.rpush(v.to_string());
        }
    }
    let len = list.len();
    db.set(key.to_string(), Entry::new(Value::List(list)));
    len
}

/// `LPUSH key v1 v2 …` — the last argument ends up at the head (spec
/// §4.D): calling `LineList::lpush` once per argument in order already
/// produces that ordering, no reversal needed.
pub async fn cmd_lpush(args: &[&str], store: &SharedStore, client: &ClientState, aof: &AofSender) -> Reply {
    push(args, store, client, aof, true, "LPUSH").await
}

pub async fn cmd_rpush(args: &[&str], store: &SharedStore, client: &ClientState, aof: &AofSender) -> Reply {
    push(args, store, client, aof, false, "RPUSH").await
}

async fn pop(args: &[&str], store: &SharedStore, client: &ClientState, aof: &AofSender, from_head: bool, cmd_name: &str) -> Reply {
    let (key, requested) = match args {
        [key] => (*key, None),
        [key, count] => match arg_to_i64(count) {
            Some(n) => (*key, Some(n)),
            None => return Reply::Error(crate::error::LineKvError::NotInteger.to_reply()),
        },
        _ => return wrong_arg_count(cmd_name),
    };
    if matches!(requested, Some(n) if n < 0) {
        return Reply::Error(crate::error::LineKvError::NegativeCount.to_reply());
    }
    let idx = client.db_index;

    let mut guard = store.write().await;
    let db = guard.db(idx);

    let mut wrong_type = false;
    let mut emptied = false;
    let mut popped: Vec<String> = Vec::new();
    let purged = match db.touch_mut(key) {
        Touch::Found(entry) => {
            match entry.value.as_list_mut() {
                Some(list) => {
                    let want = requested.unwrap_or(1) as usize;
                    for _ in 0..want {
                        let v = if from_head { list.lpop() } else { list.rpop() };
                        match v {
                            Some(v) => popped.push(v),
                            None => break,
                        }
                    }
                    emptied = list.is_empty();
                }
                None => wrong_type = true,
            }
            false
        }
        Touch::Purged => true,
        Touch::Missing => false,
    };
    if emptied {
        db.del(key);
    }

    if purged {
        let _ = aof.send(format!("DEL {idx} {key}")).await;
    }
    if wrong_type {
        drop(guard);
        return wrong_type_error();
    }
    if !popped.is_empty() {
        let _ = aof.send(format!("{cmd_name} {idx} {key} {}", popped.len())).await;
    }

    let reply = if requested.is_none() {
        match popped.into_iter().next() {
            Some(v) => Reply::Bulk(v),
            None => Reply::Null,
        }
    } else {
        Reply::List(popped)
    };
    drop(guard);
    reply
}

pub async fn cmd_lpop(args: &[&str], store: &SharedStore, client: &ClientState, aof: &AofSender) -> Reply {
    pop(args, store, client, aof, true, "LPOP").await
}

pub async fn cmd_rpop(args: &[&str], store: &SharedStore, client: &ClientState, aof: &AofSender) -> Reply {
    pop(args, store, client, aof, false, "RPOP").await
}

/// `LRANGE key start stop` — read-only; never purges.
pub async fn cmd_lrange(args: &[&str], store: &SharedStore, client: &ClientState) -> Reply {
    let [key, start, stop] = args else { return wrong_arg_count("LRANGE") };
    let (Some(start), Some(stop)) = (arg_to_i64(start), arg_to_i64(stop)) else {
        return Reply::Error(crate::error::LineKvError::NotInteger.to_reply());
    };
    let guard = store.read().await;
    match guard.databases[client.db_index].peek(key) {
        Some(entry) => match entry.value.as_list() {
            Some(list) => Reply::List(list.range(start, stop).into_iter().cloned().collect()),
            None => wrong_type_error(),
        },
        None => Reply::List(vec![]),
    }
}

/// `LTRIM key start stop` — retains only the clamped slice; deletes the
/// key outright if that slice is empty, logging `DEL` instead of an
/// `LTRIM` record with an empty range (spec §9 open question 3).
pub async fn cmd_ltrim(args: &[&str], store: &SharedStore, client: &ClientState, aof: &AofSender) -> Reply {
    let [key, start, stop] = args else { return wrong_arg_count("LTRIM") };
    let (Some(start), Some(stop)) = (arg_to_i64(start), arg_to_i64(stop)) else {
        return Reply::Error(crate::error::LineKvError::NotInteger.to_reply());
    };
    let idx = client.db_index;

    let mut guard = store.write().await;
    let db = guard.db(idx);

    let mut wrong_type = false;
    let mut existed = false;
    let mut applied: Option<(usize, usize)> = None;
    let purged = match db.touch_mut(key) {
        Touch::Found(entry) => {
            existed = true;
            match entry.value.as_list_mut() {
                Some(list) => applied = list.trim(start, stop),
                None => wrong_type = true,
            }
            false
        }
        Touch::Purged => true,
        Touch::Missing => false,
    };
    if existed && !wrong_type && applied.is_none() {
        db.del(key);
    }

    if purged {
        let _ = aof.send(format!("DEL {idx} {key}")).await;
    }
    if wrong_type {
        drop(guard);
        return wrong_type_error();
    }
    match applied {
        Some((s, e)) => {
            let _ = aof.send(format!("LTRIM {idx} {key} {s} {e}")).await;
        }
        None if existed => {
            let _ = aof.send(format!("DEL {idx} {key}")).await;
        }
        None => {}
    }
    drop(guard);
    Reply::Ok
}
