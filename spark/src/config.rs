use anyhow::{ensure, Context, Result};
use directories::ProjectDirs;
use ratatui::style::Color;
use serde::Deserialize;
use spark_ipc::DEFAULT_SOCKET_PATH;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub block_duration_secs: u64,
    /// Block duration used with `--test`.
    pub test_block_duration_secs: u64,
    pub tick_interval_ms: u64,
    pub socket_path: PathBuf,
    pub log_level: String,
    pub theme: Theme,
    pub icons: Icons,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Theme {
    #[serde(deserialize_with = "hex_to_color")]
    pub background: Color,
    #[serde(deserialize_with = "hex_to_color")]
    pub foreground: Color,
    #[serde(deserialize_with = "hex_to_color")]
    pub accent: Color,
    #[serde(deserialize_with = "hex_to_color")]
    pub pending: Color,
    #[serde(deserialize_with = "hex_to_color")]
    pub running: Color,
    #[serde(deserialize_with = "hex_to_color")]
    pub paused: Color,
    #[serde(deserialize_with = "hex_to_color")]
    pub done: Color,
    #[serde(deserialize_with = "hex_to_color")]
    pub track: Color,
    #[serde(deserialize_with = "hex_to_color")]
    pub muted: Color,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Icons {
    pub header: String,
    pub pending: String,
    pub running: String,
    pub paused: String,
    pub done: String,
    pub separator: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            block_duration_secs: 5 * 60,
            test_block_duration_secs: 5,
            tick_interval_ms: 16,
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            log_level: "info".to_string(),
            theme: Theme::default(),
            icons: Icons::default(),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: Color::Rgb(9, 14, 19),
            foreground: Color::Rgb(197, 201, 199),
            accent: Color::Rgb(230, 195, 132),
            pending: Color::Rgb(164, 167, 164),
            running: Color::Rgb(127, 180, 202),
            paused: Color::Rgb(196, 178, 138),
            done: Color::Rgb(138, 154, 123),
            track: Color::Rgb(13, 12, 12),
            muted: Color::Rgb(98, 100, 98),
        }
    }
}

impl Default for Icons {
    fn default() -> Self {
        Self {
            header: "⚡".to_string(),
            pending: "○".to_string(),
            running: "▶".to_string(),
            paused: "⏸".to_string(),
            done: "✓".to_string(),
            separator: "│".to_string(),
        }
    }
}

impl Config {
    /// Per-block duration in milliseconds.
    pub fn block_duration_ms(&self, test_mode: bool) -> u64 {
        let secs = if test_mode {
            self.test_block_duration_secs
        } else {
            self.block_duration_secs
        };
        secs.saturating_mul(1000)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn log_level(&self) -> Result<tracing::Level> {
        self.log_level
            .parse()
            .with_context(|| format!("Invalid log_level {:?}", self.log_level))
    }
}

fn hex_to_color<'de, D>(deserializer: D) -> Result<Color, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = serde::Deserialize::deserialize(deserializer)?;
    if !s.starts_with('#') || s.len() != 7 {
        return Err(serde::de::Error::custom("invalid hex color format"));
    }
    let r = u8::from_str_radix(&s[1..3], 16).map_err(serde::de::Error::custom)?;
    let g = u8::from_str_radix(&s[3..5], 16).map_err(serde::de::Error::custom)?;
    let b = u8::from_str_radix(&s[5..7], 16).map_err(serde::de::Error::custom)?;
    Ok(Color::Rgb(r, g, b))
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "sparkpractice", "Spark")
}

/// Loads `path` if given, otherwise `spark.toml` from the platform config
/// directory. Only the default location may be missing.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match project_dirs() {
            Some(dirs) => {
                let path = dirs.config_dir().join("spark.toml");
                if !path.exists() {
                    return Ok(Config::default());
                }
                path
            }
            None => return Ok(Config::default()),
        },
    };
    let config_str = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file at {:?}", path))?;
    parse_config(&config_str)
        .with_context(|| format!("Failed to parse config file at {:?}", path))
}

/// Parses a config file. Block durations must be non-zero.
pub fn parse_config(config_str: &str) -> Result<Config> {
    let config: Config = toml::from_str(config_str)?;
    ensure!(
        config.block_duration_secs > 0,
        "block_duration_secs must be greater than zero"
    );
    ensure!(
        config.test_block_duration_secs > 0,
        "test_block_duration_secs must be greater than zero"
    );
    Ok(config)
}

/// Log file used while the terminal UI owns stdout.
pub fn log_path() -> Result<PathBuf> {
    let dirs = project_dirs().context("Could not determine data directory")?;
    let data_dir = dirs.data_local_dir();
    fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;
    Ok(data_dir.join("spark.log"))
}
