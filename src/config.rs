use std::sync::Arc;
use tokio::sync::RwLock;

/// Server configuration, assembled from defaults, environment variables, and
/// CLI flags (flags win over env, env wins over defaults).
#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    pub databases: usize,
    pub password: String,

    // Persistence
    pub dbfilename: String,
    pub dir: String,
    pub appendonly: bool,
    pub aof_channel_capacity: usize,
    pub snapshot_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind: "127.0.0.1".to_string(),
            port: 6379,
            databases: 16,
            password: "guest".to_string(),
            dbfilename: "snapshot.lkv".to_string(),
            dir: ".".to_string(),
            appendonly: true,
            aof_channel_capacity: 1024,
            snapshot_interval_secs: 60,
        }
    }
}

impl Config {
    /// Load defaults, then environment variables (`PORT`, `PASSWORD`), then
    /// CLI flags, in that order of increasing precedence.
    pub fn load(args: &[String]) -> Self {
        let mut config = Config::default();
        config.apply_env();
        config.apply_args(args);
        config
    }

    fn apply_env(&mut self) {
        if let Ok(port) = std::env::var("PORT")
            && let Ok(p) = port.parse()
        {
            self.port = p;
        }
        if let Ok(password) = std::env::var("PASSWORD") {
            self.password = password;
        }
    }

    fn apply_args(&mut self, args: &[String]) {
        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--port" => {
                    if i + 1 < args.len() {
                        if let Ok(p) = args[i + 1].parse() {
                            self.port = p;
                        }
                        i += 1;
                    }
                }
                "--bind" => {
                    if i + 1 < args.len() {
                        self.bind = args[i + 1].clone();
                        i += 1;
                    }
                }
                "--password" => {
                    if i + 1 < args.len() {
                        self.password = args[i + 1].clone();
                        i += 1;
                    }
                }
                "--dbfilename" => {
                    if i + 1 < args.len() {
                        self.dbfilename = args[i + 1].clone();
                        i += 1;
                    }
                }
                "--dir" => {
                    if i + 1 < args.len() {
                        self.dir = args[i + 1].clone();
                        i += 1;
                    }
                }
                "--appendonly" => {
                    if i + 1 < args.len() {
                        self.appendonly = args[i + 1] == "yes";
                        i += 1;
                    }
                }
                "--databases" => {
                    if i + 1 < args.len() {
                        if let Ok(d) = args[i + 1].parse() {
                            self.databases = d;
                        }
                        i += 1;
                    }
                }
                _ => {}
            }
            i += 1;
        }
    }

    pub fn rdb_path(&self) -> String {
        format!("{}/{}", self.dir, self.dbfilename)
    }

    pub fn aof_path(&self) -> String {
        format!("{}/appendonly.aof", self.dir)
    }
}

pub type SharedConfig = Arc<RwLock<Config>>;
