//! Simulation configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("world border must have positive dimensions, got {width}x{height}")]
    InvalidBorder { width: f64, height: f64 },

    #[error("tick interval must be at least 1 ms")]
    ZeroTickInterval,

    #[error("player minimum size must be positive, got {0}")]
    InvalidPlayerMinSize(f64),

    #[error("food size range is empty: min {min} > max {max}")]
    EmptyFoodSizeRange { min: f64, max: f64 },
}

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub border: BorderConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub food: FoodConfig,
    #[serde(default)]
    pub virus: VirusConfig,
    #[serde(default)]
    pub eject: EjectConfig,
}

impl Config {
    /// Load configuration from `petri.toml` or write out the defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = Path::new("petri.toml");
        let config: Self = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str(&contents)?
        } else {
            info!("No petri.toml found, creating default config");
            let default_config = Self::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            default_config
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants the simulation depends on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.border.width <= 0.0 || self.border.height <= 0.0 {
            return Err(ConfigError::InvalidBorder {
                width: self.border.width,
                height: self.border.height,
            });
        }
        if self.server.tick_interval_ms == 0 {
            return Err(ConfigError::ZeroTickInterval);
        }
        if self.player.min_size <= 0.0 {
            return Err(ConfigError::InvalidPlayerMinSize(self.player.min_size));
        }
        if self.food.min_size > self.food.max_size {
            return Err(ConfigError::EmptyFoodSizeRange {
                min: self.food.min_size,
                max: self.food.max_size,
            });
        }
        Ok(())
    }

    /// Simulated ticks per wall-clock second at the nominal interval.
    pub fn ticks_per_second(&self) -> u64 {
        (1000 / self.server.tick_interval_ms).max(1)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            border: BorderConfig::default(),
            player: PlayerConfig::default(),
            food: FoodConfig::default(),
            virus: VirusConfig::default(),
            eject: EjectConfig::default(),
        }
    }
}

/// General server settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Server name shown in stats output.
    #[serde(default = "default_name")]
    pub name: String,
    /// Game mode (0 = FFA, 1 = Teams).
    #[serde(default)]
    pub gamemode: u32,
    /// Minimum tick interval in milliseconds; the scheduler never runs faster.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Maximum entries on the leaderboard.
    #[serde(default = "default_max_leaderboard")]
    pub max_leaderboard: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            gamemode: 0,
            tick_interval_ms: default_tick_interval(),
            max_leaderboard: default_max_leaderboard(),
        }
    }
}

fn default_name() -> String {
    "Petri #1".to_string()
}
fn default_tick_interval() -> u64 {
    40
}
fn default_max_leaderboard() -> usize {
    10
}

/// World border configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BorderConfig {
    #[serde(default = "default_border_size")]
    pub width: f64,
    #[serde(default = "default_border_size")]
    pub height: f64,
}

impl Default for BorderConfig {
    fn default() -> Self {
        Self {
            width: default_border_size(),
            height: default_border_size(),
        }
    }
}

fn default_border_size() -> f64 {
    14142.0
}

/// Player cell configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlayerConfig {
    #[serde(default = "default_player_min_size")]
    pub start_size: f64,
    #[serde(default = "default_player_min_size")]
    pub min_size: f64,
    #[serde(default = "default_player_max_size")]
    pub max_size: f64,
    #[serde(default = "default_player_max_cells")]
    pub max_cells: usize,
    #[serde(default = "default_player_speed")]
    pub speed: f64,
    /// Fraction of size lost per simulated second.
    #[serde(default = "default_player_decay_rate")]
    pub decay_rate: f64,
    /// Base seconds before a split cell may recombine.
    #[serde(default = "default_player_recombine_time")]
    pub recombine_time: f64,
    /// Boost distance applied to freshly split cells.
    #[serde(default = "default_boost_speed")]
    pub split_speed: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            start_size: default_player_min_size(),
            min_size: default_player_min_size(),
            max_size: default_player_max_size(),
            max_cells: default_player_max_cells(),
            speed: default_player_speed(),
            decay_rate: default_player_decay_rate(),
            recombine_time: default_player_recombine_time(),
            split_speed: default_boost_speed(),
        }
    }
}

fn default_player_min_size() -> f64 {
    32.0
}
fn default_player_max_size() -> f64 {
    1500.0
}
fn default_player_max_cells() -> usize {
    16
}
fn default_player_speed() -> f64 {
    30.0
}
fn default_player_decay_rate() -> f64 {
    0.002
}
fn default_player_recombine_time() -> f64 {
    30.0
}
fn default_boost_speed() -> f64 {
    780.0
}

/// Food configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FoodConfig {
    #[serde(default = "default_food_min_size")]
    pub min_size: f64,
    #[serde(default = "default_food_max_size")]
    pub max_size: f64,
    #[serde(default = "default_food_min_amount")]
    pub min_amount: usize,
    #[serde(default = "default_food_max_amount")]
    pub max_amount: usize,
    /// Food cells spawned per spawn cycle.
    #[serde(default = "default_food_spawn_amount")]
    pub spawn_amount: usize,
    /// Randomize new food sizes between min and max.
    #[serde(default = "default_true")]
    pub mass_grow: bool,
    /// Ticks between spawn cycles.
    #[serde(default = "default_spawn_interval")]
    pub spawn_interval: u64,
}

impl Default for FoodConfig {
    fn default() -> Self {
        Self {
            min_size: default_food_min_size(),
            max_size: default_food_max_size(),
            min_amount: default_food_min_amount(),
            max_amount: default_food_max_amount(),
            spawn_amount: default_food_spawn_amount(),
            mass_grow: default_true(),
            spawn_interval: default_spawn_interval(),
        }
    }
}

fn default_food_min_size() -> f64 {
    10.0
}
fn default_food_max_size() -> f64 {
    20.0
}
fn default_food_min_amount() -> usize {
    100
}
fn default_food_max_amount() -> usize {
    500
}
fn default_food_spawn_amount() -> usize {
    10
}
fn default_true() -> bool {
    true
}
fn default_spawn_interval() -> u64 {
    20
}

/// Virus configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VirusConfig {
    #[serde(default = "default_virus_min_size")]
    pub min_size: f64,
    #[serde(default = "default_virus_max_size")]
    pub max_size: f64,
    /// Maximum viruses on the map; at this amount ejected mass passes through.
    #[serde(default = "default_virus_max_amount")]
    pub max_amount: usize,
    /// Maximum total cells a player may have after a virus pop.
    #[serde(default = "default_virus_max_cells")]
    pub max_cells: usize,
    /// Minimum mass per split piece when a virus pops a player.
    #[serde(default = "default_virus_split_div")]
    pub split_div: f64,
    /// Boost distance of a virus launched by an overfed virus.
    #[serde(default = "default_boost_speed")]
    pub shoot_speed: f64,
}

impl Default for VirusConfig {
    fn default() -> Self {
        Self {
            min_size: default_virus_min_size(),
            max_size: default_virus_max_size(),
            max_amount: default_virus_max_amount(),
            max_cells: default_virus_max_cells(),
            split_div: default_virus_split_div(),
            shoot_speed: default_boost_speed(),
        }
    }
}

fn default_virus_min_size() -> f64 {
    100.0
}
fn default_virus_max_size() -> f64 {
    140.0
}
fn default_virus_max_amount() -> usize {
    50
}
fn default_virus_max_cells() -> usize {
    16
}
fn default_virus_split_div() -> f64 {
    36.0
}

/// Ejected mass configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EjectConfig {
    #[serde(default = "default_eject_size")]
    pub size: f64,
    /// Minimum ticks between ejects per player.
    #[serde(default = "default_eject_cooldown")]
    pub cooldown: u64,
    #[serde(default = "default_boost_speed")]
    pub speed: f64,
    /// Percent chance for a spawning player to rise from resting ejected mass.
    #[serde(default = "default_eject_spawn_player")]
    pub spawn_player: u32,
}

impl Default for EjectConfig {
    fn default() -> Self {
        Self {
            size: default_eject_size(),
            cooldown: default_eject_cooldown(),
            speed: default_boost_speed(),
            spawn_player: default_eject_spawn_player(),
        }
    }
}

fn default_eject_size() -> f64 {
    37.0
}
fn default_eject_cooldown() -> u64 {
    3
}
fn default_eject_spawn_player() -> u32 {
    50
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn rejects_degenerate_border() {
        let mut config = Config::default();
        config.border.width = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidBorder { .. })
        ));
    }

    #[test]
    fn rejects_zero_tick_interval() {
        let mut config = Config::default();
        config.server.tick_interval_ms = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroTickInterval)));
    }

    #[test]
    fn ticks_per_second_from_interval() {
        let config = Config::default();
        assert_eq!(config.ticks_per_second(), 25);
    }
}
