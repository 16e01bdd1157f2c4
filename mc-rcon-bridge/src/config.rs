use crate::Opt;
use anyhow::Context;
use mc_rcon_bridge_lib::RconConfig;
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncWriteExt},
};

/// Environment variable that overrides `rcon.password` when set
pub const PASSWORD_ENV_VAR: &str = "MC_RCON_PASSWORD";

/// Represents the mc-rcon-bridge config structure
#[derive(Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct Config {
    /// RCON connection options
    pub rcon: Rcon,
    /// Chat relay and presence options
    pub bridge: Bridge,
    /// Logging-related config options
    pub logging: Logging,
}

impl Config {
    /// Load a config file at `path`
    ///
    /// If the config does not exist at the path a default config will be created,
    /// returned, and also written to the path.
    ///
    /// This will not overwrite an existing file, however.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        if !path.exists() {
            let default_config = Self::default();
            default_config
                .store(path)
                .await
                .with_context(|| "Failed to save default config file")?;

            Ok(default_config)
        } else {
            let mut file = File::open(path)
                .await
                .with_context(|| format!("Failed to open config file at {:?}", path))?;
            let mut buffer = String::new();
            file.read_to_string(&mut buffer)
                .await
                .with_context(|| format!("Failed to read config file at {:?}", path))?;

            toml::from_str(&buffer)
                .with_context(|| format!("Failed to parse config file at {:?}", path))
        }
    }

    /// Write the current config to `path`
    ///
    /// This will overwrite whatever file is currently at `path`.
    pub async fn store(&self, path: impl AsRef<Path>) -> Result<(), anyhow::Error> {
        let path = path.as_ref();
        let mut file = File::create(path)
            .await
            .with_context(|| format!("Failed to open config file at {:?}", path))?;

        file.write_all(toml::to_string(self)?.as_bytes())
            .await
            .with_context(|| format!("Failed to write config file to {:?}", path))
    }

    /// Merge args passed in via the CLI into this config
    pub fn merge_in_args(&mut self, args: &Opt) {
        if let Some(host) = &args.host {
            self.rcon.host = host.clone();
        }

        if let Some(port) = args.port {
            self.rcon.port = port;
        }
    }

    /// Replace the configured RCON password with `password`, if there is one
    ///
    /// Meant to be fed the value of `PASSWORD_ENV_VAR`.
    pub fn apply_password_override(&mut self, password: Option<String>) {
        if let Some(password) = password.filter(|p| !p.is_empty()) {
            self.rcon.password = password;
        }
    }
}

/// RCON connection options
///
/// Timing values are in seconds; anything left out uses the library defaults.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct Rcon {
    pub host: String,
    pub port: u16,
    /// `rcon.password` from the server's `server.properties`
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keepalive_interval_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_wait_secs: Option<u64>,
}

impl Default for Rcon {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 25575,
            password: "".into(),
            connect_timeout_secs: None,
            command_timeout_secs: None,
            keepalive_interval_secs: None,
            ready_wait_secs: None,
        }
    }
}

impl Rcon {
    /// Builds the library config these options describe
    ///
    /// This does not validate the result; `RconManager::new` does.
    pub fn to_rcon_config(&self) -> RconConfig {
        let mut config = RconConfig::new(self.host.clone(), self.port, self.password.clone());

        if let Some(secs) = self.connect_timeout_secs {
            config = config.with_connect_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.command_timeout_secs {
            config = config.with_command_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.keepalive_interval_secs {
            config = config.with_keepalive_interval(Duration::from_secs(secs));
        }
        if let Some(secs) = self.ready_wait_secs {
            config = config.with_ready_wait(Duration::from_secs(secs));
        }

        config
    }
}

/// Chat relay and presence options
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct Bridge {
    /// Name used in the presence line
    pub server_name: String,
    /// Path to the server's `latest.log`, if it is reachable from here
    ///
    /// Chat is only relayed when this is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,
    /// How often to poll for status and chat, in seconds
    pub poll_interval_secs: u64,
}

impl Default for Bridge {
    fn default() -> Self {
        Self {
            server_name: "Minecraft".into(),
            log_path: None,
            poll_interval_secs: 15,
        }
    }
}

impl Bridge {
    /// The poll interval, never shorter than a second
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

/// Logging-related config options
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct Logging {
    /// Where the log file is written
    pub file: PathBuf,
    /// Logging level for mc-rcon-bridge dependencies
    ///
    /// This only affects file logging.
    #[serde(with = "LevelDef")]
    pub all: log::Level,
    /// Logging level for mc-rcon-bridge itself
    ///
    /// This only affects file logging.
    #[serde(rename = "self")]
    #[serde(with = "LevelDef")]
    pub self_level: log::Level,
    /// Logging level for relayed chat
    ///
    /// This only affects file logging.
    #[serde(with = "LevelDef")]
    pub chat: log::Level,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            file: "./mc-rcon-bridge.log".into(),
            all: log::Level::Warn,
            self_level: log::Level::Debug,
            chat: log::Level::Info,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(remote = "log::Level")]
enum LevelDef {
    Error = 1,
    Warn,
    Info,
    Debug,
    Trace,
}

#[cfg(test)]
mod test {
    use super::*;
    use structopt::StructOpt;

    #[tokio::test]
    async fn load_writes_default_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config::load(&path).await.unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());

        // An existing file is read back rather than replaced
        let mut edited = Config::default();
        edited.rcon.password = "hunter2".into();
        edited.bridge.log_path = Some("/srv/mc/logs/latest.log".into());
        edited.store(&path).await.unwrap();
        assert_eq!(Config::load(&path).await.unwrap(), edited);
    }

    #[tokio::test]
    async fn unparseable_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        tokio::fs::write(&path, "this is not toml = =").await.unwrap();

        assert!(Config::load(&path).await.is_err());
    }

    #[test]
    fn parse_handwritten() {
        let config: Config = toml::from_str(
            r#"
            [rcon]
            host = "mc.example.com"
            port = 25576
            password = "hunter2"
            ready_wait_secs = 2

            [bridge]
            server_name = "Survival"
            log_path = "/srv/mc/logs/latest.log"
            poll_interval_secs = 0

            [logging]
            file = "bridge.log"
            all = "Warn"
            self = "Info"
            chat = "Info"
            "#,
        )
        .unwrap();

        assert_eq!(config.logging.self_level, log::Level::Info);
        assert_eq!(config.bridge.poll_interval(), Duration::from_secs(1));

        let rcon = config.rcon.to_rcon_config();
        assert_eq!(rcon.address(), "mc.example.com:25576");
        assert_eq!(rcon.password, "hunter2");
        assert_eq!(rcon.ready_wait, Duration::from_secs(2));
        assert_eq!(
            rcon.connect_timeout,
            RconConfig::new("h", 1, "").connect_timeout
        );
    }

    #[test]
    fn args_override_config() {
        let mut config = Config::default();
        let opt = Opt::from_iter(&["mc-rcon-bridge", "--host", "10.0.0.2", "--port", "1234", "status"]);
        config.merge_in_args(&opt);

        assert_eq!(config.rcon.host, "10.0.0.2");
        assert_eq!(config.rcon.port, 1234);
    }

    #[test]
    fn password_override() {
        let mut config = Config::default();
        config.rcon.password = "from-file".into();

        config.apply_password_override(None);
        assert_eq!(config.rcon.password, "from-file");

        config.apply_password_override(Some("".into()));
        assert_eq!(config.rcon.password, "from-file");

        config.apply_password_override(Some("from-env".into()));
        assert_eq!(config.rcon.password, "from-env");
    }
}
