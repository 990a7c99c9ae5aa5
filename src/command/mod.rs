pub mod key;
pub mod list;
pub mod server_cmd;
pub mod string;

use crate::config::SharedConfig;
use crate::connection::ClientState;
use crate::persistence::aof::AofSender;
use crate::store::SharedStore;

/// A formatted reply line, per spec §6's reply grammar.
pub enum Reply {
    Ok,
    Null,
    Int(i64),
    Bulk(String),
    List(Vec<String>),
    Error(String),
}

impl Reply {
    pub fn render(&self) -> String {
        match self {
            Reply::Ok => "OK".to_string(),
            Reply::Null => "NULL".to_string(),
            Reply::Int(n) => n.to_string(),
            Reply::Bulk(s) => s.clone(),
            Reply::List(items) => format!("[{}]", items.join(" ")),
            Reply::Error(msg) => msg.clone(),
        }
    }
}

impl From<crate::error::LineKvError> for Reply {
    fn from(e: crate::error::LineKvError) -> Self {
        Reply::Error(e.to_reply())
    }
}

/// Dispatch one already-tokenized command line to its handler. `cmd` is
/// the upper-cased first token; `args` are the remaining whitespace-
/// separated tokens (spec §4.H).
pub async fn dispatch(
    cmd: &str,
    args: &[&str],
    store: &SharedStore,
    config: &SharedConfig,
    client: &mut ClientState,
    aof: &AofSender,
) -> Reply {
    match cmd {
        "AUTH" => server_cmd::cmd_auth(args, client, config).await,
        "SELECT" => server_cmd::cmd_select(args, client, config).await,
        "FLUSHDB" => server_cmd::cmd_flushdb(args, store, client, aof).await,
        "FLUSHALL" => server_cmd::cmd_flushall(args, store, aof).await,

        "SET" => string::cmd_set(args, store, client, aof).await,
        "GET" => string::cmd_get(args, store, client).await,
        "SETNX" => string::cmd_setnx(args, store, client, aof).await,
        "INCR" => string::cmd_incr(args, store, client, aof).await,
        "DECR" => string::cmd_decr(args, store, client, aof).await,

        "DEL" => key::cmd_del(args, store, client, aof).await,
        "EXISTS" => key::cmd_exists(args, store, client).await,
        "EXPIRE" => key::cmd_expire(args, store, client, aof).await,
        "TTL" => key::cmd_ttl(args, store, client).await,
        "TYPE" => key::cmd_type(args, store, client).await,
        "RENAME" => key::cmd_rename(args, store, client, aof).await,
        "KEYS" => key::cmd_keys(args, store, client).await,

        "LPUSH" => list::cmd_lpush(args, store, client, aof).await,
        "RPUSH" => list::cmd_rpush(args, store, client, aof).await,
        "LPOP" => list::cmd_lpop(args, store, client, aof).await,
        "RPOP" => list::cmd_rpop(args, store, client, aof).await,
        "LRANGE" => list::cmd_lrange(args, store, client).await,
        "LTRIM" => list::cmd_ltrim(args, store, client, aof).await,

        _ => Reply::Error(crate::error::LineKvError::UnknownCommand(cmd.to_string()).to_reply()),
    }
}

/// Parse an `&str` argument as an i64, for commands that take numeric
/// arguments (EXPIRE ttl, LRANGE/LTRIM indices, LPOP/RPOP count).
pub fn arg_to_i64(arg: &str) -> Option<i64> {
    arg.parse().ok()
}

pub fn wrong_type_error() -> Reply {
    Reply::Error(crate::error::LineKvError::WrongType.to_reply())
}

pub fn wrong_arg_count(cmd: &str) -> Reply {
    Reply::Error(crate::error::LineKvError::WrongArgCount(cmd.to_string()).to_reply())
}
