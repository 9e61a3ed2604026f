//! Конфигурация симуляции (TOML → SimConfig)
//!
//! Все поля имеют defaults из оригинального баланса, поэтому TOML может
//! переопределять только нужные значения.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::time::DEFAULT_MAX_DELTA;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Корневой конфиг
///
/// Десериализуется через `SimConfigFile`: секции `[player]`/`[enemy]` — это
/// overrides поверх своих defaults, а не поверх общего `ActorConfig::default()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SimConfigFile")]
pub struct SimConfig {
    /// Верхняя граница delta time (секунды)
    pub max_delta: f32,
    /// Длительность Hit (stagger) состояния
    pub hit_duration: f32,
    pub knockback: KnockbackConfig,
    pub animation: AnimationConfig,
    pub player: ActorConfig,
    pub enemy: ActorConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_delta: DEFAULT_MAX_DELTA,
            hit_duration: 0.5,
            knockback: KnockbackConfig::default(),
            animation: AnimationConfig::default(),
            player: ActorConfig::player(),
            enemy: ActorConfig::enemy(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SimConfigFile {
    max_delta: Option<f32>,
    hit_duration: Option<f32>,
    knockback: KnockbackConfig,
    animation: AnimationConfig,
    player: ActorOverrides,
    enemy: ActorOverrides,
}

impl From<SimConfigFile> for SimConfig {
    fn from(file: SimConfigFile) -> Self {
        let defaults = SimConfig::default();
        Self {
            max_delta: file.max_delta.unwrap_or(defaults.max_delta),
            hit_duration: file.hit_duration.unwrap_or(defaults.hit_duration),
            knockback: file.knockback,
            animation: file.animation,
            player: file.player.apply(ActorConfig::player()),
            enemy: file.enemy.apply(ActorConfig::enemy()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnockbackConfig {
    /// Время затухания knockback (секунды)
    pub duration: f32,
    /// Силы ниже порога игнорируются (анти-jitter)
    pub min_force: f32,
}

impl Default for KnockbackConfig {
    fn default() -> Self {
        Self {
            duration: 0.3,
            min_force: 0.1,
        }
    }
}

/// Fallback длительности one-shot клипов (если модель не отдала свои)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub attack: f32,
    pub hit: f32,
    pub death: f32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            attack: 0.8,
            hit: 0.4,
            death: 1.5,
        }
    }
}

/// Параметры актора (игрок или враг)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorConfig {
    pub max_health: u32,
    /// Окно неуязвимости после урона (секунды)
    pub invulnerability: f32,
    /// Скорость движения (m/s)
    pub speed: f32,
    /// Угловая скорость сглаживания поворота
    pub rotation_speed: f32,
    /// 0.0 = полный knockback, 1.0 = иммунитет
    pub knockback_resistance: f32,
    pub damage: u32,
    /// Радиус hit-теста атаки (метры)
    pub attack_range: f32,
    pub cooldown: f32,
    /// Конус атаки (радианы, полный угол); None = круговой удар
    pub attack_angle: Option<f32>,
    pub knockback_force: f32,
    /// Задержка до strike frame анимации
    pub strike_delay: f32,
    /// AI: радиус обнаружения
    pub detection_range: f32,
    /// AI: дистанция, с которой запрашивается Attack
    pub ai_attack_range: f32,
    pub collider_radius: f32,
    pub model_url: String,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self::player()
    }
}

impl ActorConfig {
    pub fn player() -> Self {
        Self {
            max_health: 100,
            invulnerability: 0.5,
            speed: 5.0,
            rotation_speed: 10.0,
            knockback_resistance: 0.2,
            damage: 25,
            attack_range: 2.0,
            cooldown: 1.0,
            attack_angle: Some(std::f32::consts::FRAC_PI_2),
            knockback_force: 10.0,
            strike_delay: 0.3,
            detection_range: 4.0,
            ai_attack_range: 1.0,
            collider_radius: 0.4,
            model_url: "models/player.glb".to_string(),
        }
    }

    pub fn enemy() -> Self {
        Self {
            max_health: 100,
            invulnerability: 0.5,
            speed: 3.0,
            rotation_speed: 5.0,
            knockback_resistance: 0.0,
            damage: 10,
            attack_range: 1.5,
            cooldown: 1.45,
            attack_angle: None,
            knockback_force: 8.0,
            strike_delay: 0.5,
            detection_range: 4.0,
            ai_attack_range: 1.0,
            collider_radius: 0.4,
            model_url: "models/enemy.glb".to_string(),
        }
    }

    fn validate(&self, label: &str) -> Result<(), ConfigError> {
        if self.max_health == 0 {
            return Err(ConfigError::Invalid(format!("{label}.max_health must be > 0")));
        }
        if !(0.0..=1.0).contains(&self.knockback_resistance) {
            return Err(ConfigError::Invalid(format!(
                "{label}.knockback_resistance must be in [0, 1], got {}",
                self.knockback_resistance
            )));
        }
        if self.ai_attack_range >= self.detection_range {
            return Err(ConfigError::Invalid(format!(
                "{label}: ai_attack_range ({}) must be < detection_range ({})",
                self.ai_attack_range, self.detection_range
            )));
        }
        let non_negative = [
            ("invulnerability", self.invulnerability),
            ("speed", self.speed),
            ("rotation_speed", self.rotation_speed),
            ("attack_range", self.attack_range),
            ("cooldown", self.cooldown),
            ("strike_delay", self.strike_delay),
            ("collider_radius", self.collider_radius),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!("{label}.{field} must be >= 0, got {value}")));
            }
        }
        Ok(())
    }
}

/// Частичная секция актора из TOML
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ActorOverrides {
    max_health: Option<u32>,
    invulnerability: Option<f32>,
    speed: Option<f32>,
    rotation_speed: Option<f32>,
    knockback_resistance: Option<f32>,
    damage: Option<u32>,
    attack_range: Option<f32>,
    cooldown: Option<f32>,
    /// >= 2π фактически выключает конус
    attack_angle: Option<f32>,
    knockback_force: Option<f32>,
    strike_delay: Option<f32>,
    detection_range: Option<f32>,
    ai_attack_range: Option<f32>,
    collider_radius: Option<f32>,
    model_url: Option<String>,
}

impl ActorOverrides {
    fn apply(self, base: ActorConfig) -> ActorConfig {
        ActorConfig {
            max_health: self.max_health.unwrap_or(base.max_health),
            invulnerability: self.invulnerability.unwrap_or(base.invulnerability),
            speed: self.speed.unwrap_or(base.speed),
            rotation_speed: self.rotation_speed.unwrap_or(base.rotation_speed),
            knockback_resistance: self.knockback_resistance.unwrap_or(base.knockback_resistance),
            damage: self.damage.unwrap_or(base.damage),
            attack_range: self.attack_range.unwrap_or(base.attack_range),
            cooldown: self.cooldown.unwrap_or(base.cooldown),
            attack_angle: self.attack_angle.or(base.attack_angle),
            knockback_force: self.knockback_force.unwrap_or(base.knockback_force),
            strike_delay: self.strike_delay.unwrap_or(base.strike_delay),
            detection_range: self.detection_range.unwrap_or(base.detection_range),
            ai_attack_range: self.ai_attack_range.unwrap_or(base.ai_attack_range),
            collider_radius: self.collider_radius.unwrap_or(base.collider_radius),
            model_url: self.model_url.unwrap_or(base.model_url),
        }
    }
}

impl SimConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.max_delta > 0.0) {
            return Err(ConfigError::Invalid(format!("max_delta must be > 0, got {}", self.max_delta)));
        }
        if !(self.knockback.duration > 0.0) {
            return Err(ConfigError::Invalid("knockback.duration must be > 0".to_string()));
        }
        if self.hit_duration < 0.0 {
            return Err(ConfigError::Invalid("hit_duration must be >= 0".to_string()));
        }
        self.player.validate("player")?;
        self.enemy.validate("enemy")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SimConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_delta, 0.1);
        assert_eq!(config.enemy.detection_range, 4.0);
        assert_eq!(config.enemy.ai_attack_range, 1.0);
        assert_eq!(config.player.damage, 25);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SimConfig::from_toml_str(
            r#"
            max_delta = 0.05

            [enemy]
            damage = 15
            cooldown = 2.0
            "#,
        )
        .expect("valid toml");

        assert_eq!(config.max_delta, 0.05);
        assert_eq!(config.enemy.damage, 15);
        assert_eq!(config.enemy.cooldown, 2.0);
        // Остальное — из enemy defaults, не из player
        assert_eq!(config.enemy.attack_range, 1.5);
        assert_eq!(config.enemy.model_url, "models/enemy.glb");
        assert_eq!(config.player, ActorConfig::player());
        assert_eq!(config.knockback.duration, 0.3);
    }

    #[test]
    fn test_attack_range_must_be_below_detection() {
        let result = SimConfig::from_toml_str(
            r#"
            [enemy]
            detection_range = 1.0
            ai_attack_range = 2.0
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_broken_toml_is_parse_error() {
        let result = SimConfig::from_toml_str("max_delta = [");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
