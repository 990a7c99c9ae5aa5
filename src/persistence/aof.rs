use crate::store::entry::{now_millis, Entry};
use crate::store::DataStore;
use crate::types::list::LineList;
use crate::types::rstring::LineString;
use crate::types::Value;
use std::io::{self, BufRead, Write};
use tokio::sync::mpsc;

/// Producer-side handle: command handlers `send().await` one record per
/// mutation before releasing the keyspace lock (spec §4.E, invariant 3).
/// Bounded so a write-heavy burst backpressures on the channel, not on
/// unbounded memory growth.
pub type AofSender = mpsc::Sender<String>;

/// Spawn the single AOF writer task and return the sender side of its
/// bounded channel. Opening the file is synchronous so a misconfigured
/// `--dir` fails before the server starts accepting connections.
pub fn spawn_writer(path: String, capacity: usize) -> io::Result<(AofSender, tokio::task::JoinHandle<()>)> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)?;
    let (tx, rx) = mpsc::channel(capacity);
    let handle = tokio::spawn(writer_loop(file, rx));
    Ok((tx, handle))
}

/// When `--appendonly no`, command handlers still hold an `AofSender` and
/// still call `send().await` on every mutation — this just drains the
/// channel onto the floor instead of a file, so no command path needs to
/// branch on whether AOF is enabled.
pub fn spawn_disabled(capacity: usize) -> (AofSender, tokio::task::JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel(capacity);
    let handle = tokio::spawn(async move { while rx.recv().await.is_some() {} });
    (tx, handle)
}

/// Drains the channel and appends each record as its own line. Flushing is
/// best-effort: we flush on a 1s tick rather than per record, matching
/// spec's "no explicit fsync per record". A write error is fatal — the
/// durability contract is broken otherwise, so we log and exit rather than
/// silently continue logging to a file the writer can no longer trust.
async fn writer_loop(file: std::fs::File, mut rx: mpsc::Receiver<String>) {
    let mut writer = io::BufWriter::new(file);
    let mut flush_tick = tokio::time::interval(std::time::Duration::from_secs(1));

    loop {
        tokio::select! {
            record = rx.recv() => {
                match record {
                    Some(record) => {
                        if let Err(e) = writeln!(writer, "{record}") {
                            tracing::error!("fatal: AOF write failed: {e}");
                            std::process::exit(1);
                        }
                    }
                    None => {
                        let _ = writer.flush();
                        return;
                    }
                }
            }
            _ = flush_tick.tick() => {
                let _ = writer.flush();
            }
        }
    }
}

/// Replay an AOF file directly against a `DataStore`, bypassing the
/// channel and reusing none of the AOF-emitting command handlers — this is
/// the "logging diverted" path spec §4.G requires, grounded on the
/// teacher's `aof::replay`/`apply_command` split.
pub fn replay(path: &str, store: &mut DataStore) -> io::Result<usize> {
    let file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let reader = io::BufReader::new(file);
    let mut applied = 0usize;

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        if apply_record(store, &line) {
            applied += 1;
        } else {
            tracing::warn!("skipping malformed or unknown AOF record: {line}");
        }
    }

    Ok(applied)
}

fn apply_record(store: &mut DataStore, line: &str) -> bool {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some(&cmd) = tokens.first() else { return false };

    if cmd == "FLUSHALL" {
        store.flush_all();
        return true;
    }

    let Some(db_index) = tokens.get(1).and_then(|s| s.parse::<usize>().ok()) else { return false };
    if db_index >= store.databases.len() {
        return false;
    }
    let args = &tokens[2..];
    let db = store.db(db_index);

    match cmd {
        "SET" => match args {
            [key, value] => {
                db.set(key.to_string(), Entry::new(Value::String(LineString::new(value.to_string()))));
                true
            }
            _ => false,
        },
        "DEL" => match args {
            [key] => {
                db.del(key);
                true
            }
            _ => false,
        },
        "EXPIRE" => match args {
            [key, ttl] => match ttl.parse::<i64>() {
                Ok(ttl) => {
                    let expires_at = (now_millis() as i64 + ttl * 1000).max(0) as u64;
                    db.set_expiry(key, expires_at);
                    true
                }
                Err(_) => false,
            },
            _ => false,
        },
        "INCR" | "DECR" => match args {
            [key] => {
                let delta = if cmd == "INCR" { 1 } else { -1 };
                match db.touch_mut(key) {
                    crate::store::Touch::Found(entry) => match entry.value.as_string_mut() {
                        Some(s) => s.incr_by(delta).is_ok(),
                        None => false,
                    },
                    crate::store::Touch::Purged | crate::store::Touch::Missing => {
                        db.set(key.to_string(), Entry::new(Value::String(LineString::from_i64(delta))));
                        true
                    }
                }
            }
            _ => false,
        },
        "LPUSH" | "RPUSH" => match args {
            [key, rest @ ..] if !rest.is_empty() => {
                ensure_list(db, key);
                if let Some(list) = db.touch_mut(key).into_list() {
                    for v in rest {
                        if cmd == "LPUSH" {
                            list.lpush(v.to_string());
                        } else {
                            list.rpush(v.to_string());
                        }
                    }
                    true
                } else {
                    false
                }
            }
            _ => false,
        },
        "LPOP" | "RPOP" => match args {
            [key, count] => match count.parse::<usize>() {
                Ok(n) => {
                    if let Some(list) = db.touch_mut(key).into_list() {
                        for _ in 0..n {
                            let popped = if cmd == "LPOP" { list.lpop() } else { list.rpop() };
                            if popped.is_none() {
                                break;
                            }
                        }
                        if list.is_empty() {
                            db.del(key);
                        }
                    }
                    true
                }
                Err(_) => false,
            },
            _ => false,
        },
        "LTRIM" => match args {
            [key, start, stop] => match (start.parse::<i64>(), stop.parse::<i64>()) {
                (Ok(start), Ok(stop)) => {
                    if let Some(list) = db.touch_mut(key).into_list()
                        && list.trim(start, stop).is_none()
                    {
                        db.del(key);
                    }
                    true
                }
                _ => false,
            },
            _ => false,
        },
        "RENAME" => match args {
            [src, dst] => {
                db.rename(src, dst);
                true
            }
            _ => false,
        },
        "FLUSHDB" => {
            db.flush();
            true
        }
        _ => false,
    }
}

fn ensure_list(db: &mut crate::store::Database, key: &str) {
    if matches!(db.touch_mut(key), crate::store::Touch::Missing | crate::store::Touch::Purged) {
        db.set(key.to_string(), Entry::new(Value::List(LineList::new())));
    }
}
