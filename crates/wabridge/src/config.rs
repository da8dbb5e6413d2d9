use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use directories::ProjectDirs;

use wabridge_db::StoreConfig;
use wabridge_ipc::NetworkConfig;

#[derive(Parser, Debug)]
#[command(name = "wabridge")]
#[command(version, about = "WhatsApp message store with a local REST bridge")]
pub struct Config {
    /// Directory holding the message database
    #[arg(long, env = "WHATSAPP_STORE_DIR")]
    pub store_dir: Option<PathBuf>,

    /// Database file (defaults to <store-dir>/messages.db)
    #[arg(long, env = "WHATSAPP_DB_PATH")]
    pub db_path: Option<PathBuf>,

    #[arg(long, env = "WHATSAPP_API_HOST", default_value = "127.0.0.1")]
    pub host: String,

    #[arg(short, long, env = "WHATSAPP_API_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Level for the bridge's own crates; RUST_LOG still applies on top
    #[arg(long, env = "WHATSAPP_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Network client executable
    #[arg(long, env = "WHATSAPP_CLIENT_CMD", default_value = "whatsapp-client")]
    pub client_cmd: String,

    #[arg(long, env = "WHATSAPP_CLIENT_ARGS", value_delimiter = ' ', num_args = 0..)]
    pub client_args: Vec<String>,

    /// Working directory of the network client (defaults to the store dir)
    #[arg(long, env = "WHATSAPP_CLIENT_DIR")]
    pub client_dir: Option<PathBuf>,

    /// Seconds an outbound command may wait for its result
    #[arg(long, env = "WHATSAPP_API_TIMEOUT", default_value_t = 30)]
    pub api_timeout: u64,

    #[arg(long, env = "WHATSAPP_DB_MAX_CONNECTIONS", default_value_t = 10)]
    pub db_max_connections: u32,

    #[arg(long, env = "WHATSAPP_DB_MIN_CONNECTIONS", default_value_t = 5)]
    pub db_min_connections: u32,
}

impl Config {
    pub fn store_dir(&self) -> PathBuf {
        self.store_dir.clone().unwrap_or_else(default_store_dir)
    }

    pub fn store_config(&self) -> StoreConfig {
        let base = StoreConfig::in_dir(self.store_dir());
        StoreConfig {
            db_path: self.db_path.clone().unwrap_or(base.db_path.clone()),
            max_connections: self.db_max_connections.max(1),
            min_connections: self.db_min_connections.min(self.db_max_connections.max(1)),
            ..base
        }
    }

    pub fn network_config(&self) -> NetworkConfig {
        NetworkConfig {
            program: self.client_cmd.clone(),
            args: self.client_args.clone(),
            working_dir: self.client_dir.clone().unwrap_or_else(|| self.store_dir()),
            command_timeout: Duration::from_secs(self.api_timeout),
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_store_dir() -> PathBuf {
    ProjectDirs::from("net", "wabridge", "wabridge")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("store"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_follow_store_dir() {
        let config = Config::try_parse_from(["wabridge", "--store-dir", "/srv/wa"]).unwrap();

        let store = config.store_config();
        assert_eq!(store.db_path, PathBuf::from("/srv/wa/messages.db"));
        assert_eq!(store.max_connections, 10);
        assert_eq!(store.min_connections, 5);

        let network = config.network_config();
        assert_eq!(network.working_dir, PathBuf::from("/srv/wa"));
        assert_eq!(network.command_timeout, Duration::from_secs(30));
        assert_eq!(config.listen_addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_explicit_values() {
        let config = Config::try_parse_from([
            "wabridge",
            "--store-dir",
            "/srv/wa",
            "--db-path",
            "/var/lib/wa.db",
            "--port",
            "9000",
            "--client-args",
            "run",
            "index.ts",
            "--db-max-connections",
            "2",
        ])
        .unwrap();

        let store = config.store_config();
        assert_eq!(store.db_path, PathBuf::from("/var/lib/wa.db"));
        assert_eq!(store.max_connections, 2);
        assert_eq!(store.min_connections, 2);
        assert_eq!(config.network_config().args, vec!["run", "index.ts"]);
        assert_eq!(config.port, 9000);
    }
}
