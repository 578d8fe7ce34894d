//! Process-wide configuration: the "Constants" component (spec §1, out
//! of scope by interface, specified only as a passive typed bag in §6).
//!
//! Loaded once at startup from a TOML file. Every field is immutable
//! thereafter except `blue_is_left_side`, which the Referee Engine
//! flips via [`Config::swap_sides`] between halves (spec.md §3's
//! ownership invariant).

use std::{
    env::var_os,
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, Ordering},
};

use serde::Deserialize;
use vss_geometry::{FieldDimensions, Side};

const CONFIG_FILE_NAME: &str = "vss_referee.toml";
const CONFIG_ENV_VAR: &str = "VSS_REFEREE_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not locate {CONFIG_FILE_NAME}; pass --config or set {CONFIG_ENV_VAR}")]
    NotFound,
    #[error("failed to read config file {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    thread_frequency_hz: f32,
    referee_address: String,
    referee_port: u16,
    vision_address: String,
    vision_port: u16,
    replacer_address: String,
    replacer_port: u16,
    simulator_address: String,
    simulator_port: u16,
    transition_time_s: f32,
    ball_radius_m: f32,
    robot_length_m: f32,
    half_time_s: f32,
    ball_min_speed_for_stuck: f32,
    stucked_ball_time_s: f32,
    qt_players: u8,
    blue_team_name: String,
    yellow_team_name: String,
    blue_is_left_side: bool,
    field: FieldDimensions,
    #[serde(default)]
    rng_seed: Option<u64>,
}

/// A UDP endpoint address/port pair.
#[derive(Clone, Debug, PartialEq)]
pub struct Endpoint {
    pub address: String,
    pub port: u16,
}

impl Endpoint {
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// Process-wide, immutable (except [`Config::swap_sides`]) configuration.
#[derive(Debug)]
pub struct Config {
    pub thread_frequency_hz: f32,
    pub referee_endpoint: Endpoint,
    pub vision_endpoint: Endpoint,
    pub replacer_endpoint: Endpoint,
    pub simulator_endpoint: Endpoint,
    pub transition_time_s: f32,
    pub ball_radius_m: f32,
    pub robot_length_m: f32,
    pub half_time_s: f32,
    pub ball_min_speed_for_stuck: f32,
    pub stucked_ball_time_s: f32,
    pub qt_players: u8,
    pub blue_team_name: String,
    pub yellow_team_name: String,
    pub field: FieldDimensions,
    pub rng_seed: Option<u64>,
    blue_is_left_side: AtomicBool,
}

impl From<RawConfig> for Config {
    fn from(raw: RawConfig) -> Self {
        Self {
            thread_frequency_hz: raw.thread_frequency_hz,
            referee_endpoint: Endpoint {
                address: raw.referee_address,
                port: raw.referee_port,
            },
            vision_endpoint: Endpoint {
                address: raw.vision_address,
                port: raw.vision_port,
            },
            replacer_endpoint: Endpoint {
                address: raw.replacer_address,
                port: raw.replacer_port,
            },
            simulator_endpoint: Endpoint {
                address: raw.simulator_address,
                port: raw.simulator_port,
            },
            transition_time_s: raw.transition_time_s,
            ball_radius_m: raw.ball_radius_m,
            robot_length_m: raw.robot_length_m,
            half_time_s: raw.half_time_s,
            ball_min_speed_for_stuck: raw.ball_min_speed_for_stuck,
            stucked_ball_time_s: raw.stucked_ball_time_s,
            qt_players: raw.qt_players,
            blue_team_name: raw.blue_team_name,
            yellow_team_name: raw.yellow_team_name,
            field: raw.field,
            rng_seed: raw.rng_seed,
            blue_is_left_side: AtomicBool::new(raw.blue_is_left_side),
        }
    }
}

impl Config {
    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        let raw: RawConfig = toml::from_str(contents)?;
        Ok(raw.into())
    }

    /// Reads config from `explicit_path` if given, otherwise searches
    /// ancestor directories for `vss_referee.toml`, falling back to the
    /// `VSS_REFEREE_CONFIG` environment variable.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit_path {
            Some(path) => path.to_path_buf(),
            None => find_config_path()?,
        };

        let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;

        Self::from_toml_str(&contents).map_err(|source| ConfigError::Parse { path, source })
    }

    pub fn blue_is_left_side(&self) -> bool {
        self.blue_is_left_side.load(Ordering::Relaxed)
    }

    /// Flips which side blue defends. Only the Referee Engine calls this,
    /// and only between halves (spec.md §3).
    pub fn swap_sides(&self) {
        self.blue_is_left_side.fetch_xor(true, Ordering::Relaxed);
    }

    pub fn blue_side(&self) -> Side {
        if self.blue_is_left_side() {
            Side::Left
        } else {
            Side::Right
        }
    }

    pub fn yellow_side(&self) -> Side {
        self.blue_side().mirrored()
    }
}

fn find_config_path() -> Result<PathBuf, ConfigError> {
    let current_dir = std::env::current_dir().map_err(|source| ConfigError::Read {
        path: PathBuf::from("."),
        source,
    })?;

    let found = current_dir.ancestors().find_map(|ancestor| {
        let candidate = ancestor.join(CONFIG_FILE_NAME);
        candidate.is_file().then_some(candidate)
    });

    found
        .or_else(|| var_os(CONFIG_ENV_VAR).map(PathBuf::from))
        .ok_or(ConfigError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_toml() -> &'static str {
        r#"
        thread_frequency_hz = 60.0
        referee_address = "127.0.0.1"
        referee_port = 10001
        vision_address = "224.0.0.1"
        vision_port = 10002
        replacer_address = "224.0.0.1"
        replacer_port = 10003
        simulator_address = "127.0.0.1"
        simulator_port = 10004
        transition_time_s = 4.0
        ball_radius_m = 0.02134
        robot_length_m = 0.08
        half_time_s = 300.0
        ball_min_speed_for_stuck = 0.05
        stucked_ball_time_s = 4.0
        qt_players = 3
        blue_team_name = "Blue"
        yellow_team_name = "Yellow"
        blue_is_left_side = true

        [field]
        field_length = 1.5
        field_width = 1.3
        goal_area_depth = 0.15
        goal_area_width = 0.7
        goal_width = 0.4
        center_radius = 0.2
        "#
    }

    #[test]
    fn parses_a_complete_config() {
        let config = Config::from_toml_str(sample_toml()).expect("parse config");
        assert_eq!(config.qt_players, 3);
        assert!(config.blue_is_left_side());
        assert_eq!(config.field.field_length, 1.5);
    }

    #[test]
    fn swap_sides_flips_and_is_idempotent_under_two_swaps() {
        let config = Config::from_toml_str(sample_toml()).expect("parse config");
        assert!(config.blue_is_left_side());
        config.swap_sides();
        assert!(!config.blue_is_left_side());
        config.swap_sides();
        assert!(config.blue_is_left_side());
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(Config::from_toml_str("not valid toml [[[").is_err());
    }
}
