use std::path::Path;
use std::time::Duration;

use mud::GameSettings;
use net::rate_limiter::RateLimitConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    pub telnet_addr: String,
    pub idle_timeout_secs: u64,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            telnet_addr: "0.0.0.0:4000".to_string(),
            idle_timeout_secs: 1800,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorldSection {
    pub content_dir: String,
    pub start_room: String,
}

impl Default for WorldSection {
    fn default() -> Self {
        Self {
            content_dir: "content".to_string(),
            start_room: "town_square".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CombatSection {
    pub fatigue_secs: f64,
}

impl Default for CombatSection {
    fn default() -> Self {
        Self { fatigue_secs: 15.0 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LairSection {
    pub check_interval_secs: u64,
}

impl Default for LairSection {
    fn default() -> Self {
        Self {
            check_interval_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub path: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: "data/player.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SecuritySection {
    pub max_connections_total: usize,
    pub max_connections_per_ip: usize,
    pub max_commands_per_second: u32,
    pub max_input_length: usize,
}

impl Default for SecuritySection {
    fn default() -> Self {
        Self {
            max_connections_total: 1000,
            max_connections_per_ip: 5,
            max_commands_per_second: 20,
            max_input_length: 4096,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    pub autosave_secs: u64,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self { autosave_secs: 300 }
    }
}

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub net: NetConfig,
    pub world: WorldSection,
    pub combat: CombatSection,
    pub lairs: LairSection,
    pub database: DatabaseSection,
    pub security: SecuritySection,
    pub session: SessionSection,
}

impl ServerConfig {
    /// Load configuration from an optional TOML file path.
    pub fn load(config_path: Option<&str>) -> Result<Self, Box<dyn std::error::Error>> {
        let config = match config_path {
            Some(path) if Path::new(path).exists() => {
                let content = std::fs::read_to_string(path)?;
                toml::from_str(&content)?
            }
            _ => Self::default(),
        };
        Ok(config)
    }

    pub fn to_rate_limits(&self) -> RateLimitConfig {
        RateLimitConfig {
            max_connections_total: self.security.max_connections_total,
            max_connections_per_ip: self.security.max_connections_per_ip,
            max_commands_per_second: self.security.max_commands_per_second,
            max_input_length: self.security.max_input_length,
        }
    }

    pub fn to_game_settings(&self) -> GameSettings {
        GameSettings {
            start_room: self.world.start_room.clone(),
            fatigue_cooldown: Duration::from_secs_f64(self.combat.fatigue_secs.max(0.0)),
            autosave_interval: Duration::from_secs(self.session.autosave_secs.max(1)),
            idle_timeout: Duration::from_secs(self.net.idle_timeout_secs.max(1)),
            max_commands_per_second: self.security.max_commands_per_second,
        }
    }

    pub fn lair_interval(&self) -> Duration {
        Duration::from_secs(self.lairs.check_interval_secs.max(1))
    }
}

/// Parse CLI arguments and load config.
/// Supports: --config <path>
pub fn parse_cli_args() -> ServerConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<&str> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                if let Some(val) = args.get(i + 1) {
                    config_path = Some(val.as_str());
                    i += 2;
                } else {
                    eprintln!("--config requires a path argument");
                    std::process::exit(1);
                }
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                std::process::exit(1);
            }
        }
    }

    match ServerConfig::load(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    }
}
