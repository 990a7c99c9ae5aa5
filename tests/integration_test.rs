use linekv::config::Config;
use linekv::persistence::aof;
use linekv::store::DataStore;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tokio::sync::RwLock;

fn start_server(port: u16) -> tokio::task::JoinHandle<()> {
    let tmp = std::env::temp_dir().join(format!("linekv-test-{port}"));
    let _ = std::fs::create_dir_all(&tmp);

    let config = Config {
        port,
        dir: tmp.to_string_lossy().to_string(),
        appendonly: false,
        ..Default::default()
    };
    let num_dbs = config.databases;
    let config = Arc::new(RwLock::new(config));
    let store = Arc::new(RwLock::new(DataStore::new(num_dbs)));
    let (aof_tx, _handle) = aof::spawn_disabled(16);

    tokio::spawn(async move {
        let _ = linekv::server::run_server(store, config, aof_tx).await;
    })
}

async fn connect(port: u16) -> BufStream<TcpStream> {
    for i in 0..50 {
        match TcpStream::connect(("127.0.0.1", port)).await {
            Ok(stream) => {
                let mut conn = BufStream::new(stream);
                send(&mut conn, "AUTH guest").await;
                return conn;
            }
            Err(_) if i < 49 => tokio::time::sleep(std::time::Duration::from_millis(50)).await,
            Err(e) => panic!("failed to connect: {e}"),
        }
    }
    unreachable!()
}

async fn send(conn: &mut BufStream<TcpStream>, line: &str) -> String {
    conn.write_all(line.as_bytes()).await.unwrap();
    conn.write_all(b"\n").await.unwrap();
    conn.flush().await.unwrap();
    let mut reply = String::new();
    conn.read_line(&mut reply).await.unwrap();
    reply.trim_end_matches(['\r', '\n']).to_string()
}

#[tokio::test]
async fn test_set_get() {
    let port = 16391;
    let _server = start_server(port);
    let mut conn = connect(port).await;

    assert_eq!(send(&mut conn, "SET mykey myvalue").await, "OK");
    assert_eq!(send(&mut conn, "GET mykey").await, "myvalue");
    assert_eq!(send(&mut conn, "GET missing").await, "NULL");
}

#[tokio::test]
async fn test_incr_decr() {
    let port = 16392;
    let _server = start_server(port);
    let mut conn = connect(port).await;

    assert_eq!(send(&mut conn, "SET counter 10").await, "OK");
    assert_eq!(send(&mut conn, "INCR counter").await, "11");
    assert_eq!(send(&mut conn, "DECR counter").await, "10");

    assert_eq!(send(&mut conn, "SET notanumber abc").await, "OK");
    assert!(send(&mut conn, "INCR notanumber").await.starts_with("ERR"));
}

#[tokio::test]
async fn test_del_exists() {
    let port = 16393;
    let _server = start_server(port);
    let mut conn = connect(port).await;

    send(&mut conn, "SET key1 val1").await;
    send(&mut conn, "SET key2 val2").await;

    assert_eq!(send(&mut conn, "EXISTS key1").await, "1");
    assert_eq!(send(&mut conn, "DEL key1").await, "1");
    assert_eq!(send(&mut conn, "EXISTS key1").await, "0");
    assert_eq!(send(&mut conn, "DEL key1").await, "0");
}

#[tokio::test]
async fn test_expire_ttl() {
    let port = 16394;
    let _server = start_server(port);
    let mut conn = connect(port).await;

    send(&mut conn, "SET transient val").await;
    assert_eq!(send(&mut conn, "EXPIRE transient 100").await, "1");
    let ttl: i64 = send(&mut conn, "TTL transient").await.parse().unwrap();
    assert!(ttl > 0 && ttl <= 100);

    assert_eq!(send(&mut conn, "EXPIRE transient 0").await, "1");
    assert_eq!(send(&mut conn, "GET transient").await, "NULL");
    assert_eq!(send(&mut conn, "EXISTS transient").await, "0");
}

#[tokio::test]
async fn test_lpush_rpush_order() {
    let port = 16395;
    let _server = start_server(port);
    let mut conn = connect(port).await;

    send(&mut conn, "RPUSH mylist a b c").await;
    assert_eq!(send(&mut conn, "LRANGE mylist 0 -1").await, "[a b c]");

    send(&mut conn, "LPUSH mylist z").await;
    assert_eq!(send(&mut conn, "LRANGE mylist 0 -1").await, "[z a b c]");
}

#[tokio::test]
async fn test_lpop_rpop() {
    let port = 16396;
    let _server = start_server(port);
    let mut conn = connect(port).await;

    send(&mut conn, "RPUSH mylist a b c").await;
    assert_eq!(send(&mut conn, "LPOP mylist").await, "a");
    assert_eq!(send(&mut conn, "RPOP mylist").await, "c");
    assert_eq!(send(&mut conn, "LRANGE mylist 0 -1").await, "[b]");
}

#[tokio::test]
async fn test_ltrim_to_empty_deletes_key() {
    let port = 16397;
    let _server = start_server(port);
    let mut conn = connect(port).await;

    send(&mut conn, "RPUSH mylist a b c").await;
    assert_eq!(send(&mut conn, "LTRIM mylist 5 10").await, "OK");
    assert_eq!(send(&mut conn, "EXISTS mylist").await, "0");
}

#[tokio::test]
async fn test_rename_drops_ttl() {
    let port = 16398;
    let _server = start_server(port);
    let mut conn = connect(port).await;

    send(&mut conn, "SET src val").await;
    send(&mut conn, "EXPIRE src 100").await;
    assert_eq!(send(&mut conn, "RENAME src dst").await, "OK");
    assert_eq!(send(&mut conn, "GET dst").await, "val");
    assert_eq!(send(&mut conn, "TTL dst").await, "-1");
}

#[tokio::test]
async fn test_auth_required() {
    let port = 16399;
    let _server = start_server(port);
    for i in 0..50 {
        if TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
            break;
        }
        if i == 49 {
            panic!("server never came up");
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }

    let stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    let mut conn = BufStream::new(stream);
    assert!(send(&mut conn, "GET mykey").await.starts_with("NOAUTH"));
    assert_eq!(send(&mut conn, "AUTH guest").await, "OK");
    assert_eq!(send(&mut conn, "GET mykey").await, "NULL");
}

#[tokio::test]
async fn test_select_multiple_databases() {
    let port = 16400;
    let _server = start_server(port);
    let mut conn = connect(port).await;

    send(&mut conn, "SET onlyindb0 val").await;
    assert_eq!(send(&mut conn, "SELECT 1").await, "OK");
    assert_eq!(send(&mut conn, "GET onlyindb0").await, "NULL");
    assert_eq!(send(&mut conn, "SELECT 0").await, "OK");
    assert_eq!(send(&mut conn, "GET onlyindb0").await, "val");
}

/// Spec §8 property 5: replaying the AOF produced by a sequence of mutating
/// commands against a fresh store reproduces the live store's state. Runs a
/// real server with `--appendonly yes` so the AOF records actually written
/// reflect the lock-before-log ordering command handlers commit under, then
/// replays that file into a second, independent store and compares.
#[tokio::test]
async fn test_aof_replay_matches_live_store() {
    let port = 16401;
    let tmp = std::env::temp_dir().join(format!("linekv-test-{port}"));
    let _ = std::fs::create_dir_all(&tmp);
    let aof_path = tmp.join("appendonly.aof").to_string_lossy().to_string();

    let config = Config {
        port,
        dir: tmp.to_string_lossy().to_string(),
        appendonly: true,
        ..Default::default()
    };
    let num_dbs = config.databases;
    let config = Arc::new(RwLock::new(config));
    let store = Arc::new(RwLock::new(DataStore::new(num_dbs)));
    let (aof_tx, _writer_handle) = aof::spawn_writer(aof_path.clone(), 16).unwrap();

    let server_store = store.clone();
    let server_config = config.clone();
    tokio::spawn(async move {
        let _ = linekv::server::run_server(server_store, server_config, aof_tx).await;
    });

    let mut conn = connect(port).await;
    send(&mut conn, "RPUSH mylist a").await;
    send(&mut conn, "RPUSH mylist b").await;
    send(&mut conn, "LPOP mylist").await;
    send(&mut conn, "SET counter 10").await;
    send(&mut conn, "INCR counter").await;
    send(&mut conn, "DECR counter").await;
    send(&mut conn, "SET removed val").await;
    send(&mut conn, "DEL removed").await;

    // The AOF writer only flushes its buffer on a 1s tick (or on shutdown);
    // wait for one to land before reading the file back.
    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

    let mut replayed = DataStore::new(num_dbs);
    aof::replay(&aof_path, &mut replayed).unwrap();

    let live = store.read().await;

    let live_list: Vec<&String> = live.databases[0].peek("mylist").unwrap().value.as_list().unwrap().iter().collect();
    let replayed_list: Vec<&String> = replayed.databases[0].peek("mylist").unwrap().value.as_list().unwrap().iter().collect();
    assert_eq!(live_list, replayed_list);
    assert_eq!(live_list, vec!["b"]);

    let live_counter = live.databases[0].peek("counter").unwrap().value.as_string().unwrap().as_str();
    let replayed_counter = replayed.databases[0].peek("counter").unwrap().value.as_string().unwrap().as_str();
    assert_eq!(live_counter, replayed_counter);
    assert_eq!(live_counter, "10");

    assert!(live.databases[0].peek("removed").is_none());
    assert!(replayed.databases[0].peek("removed").is_none());
}
