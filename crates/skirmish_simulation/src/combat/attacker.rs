//! Attacker component — параметры и таймеры атаки
//!
//! Cooldown расходуется в момент начала атаки (`start_attack`), а не при
//! подтверждённом попадании. Сам удар происходит позже, на strike frame.

use bevy::prelude::*;

use crate::config::ActorConfig;
use crate::registry::{ComponentKind, SimComponent};
use crate::time::OneShot;

/// Атакующий актор (игрок или враг)
#[derive(Component, Debug, Clone)]
pub struct Attacker {
    owner: Entity,

    /// Урон за одно попадание
    pub damage: u32,

    /// Радиус hit-теста (метры, горизонтальная дистанция)
    pub range: f32,

    /// Cooldown между атаками (секунды)
    pub cooldown: f32,

    /// Оставшийся cooldown (уменьшается до 0)
    cooldown_remaining: f32,

    /// Полный угол конуса (радианы); None = удар по кругу
    pub attack_angle: Option<f32>,

    /// Сила knockback, передаваемая в `damage.taken`
    pub knockback_force: f32,

    /// Задержка от начала атаки до strike frame
    pub strike_delay: f32,

    strike: Option<OneShot>,

    /// Теги, по которым выбираются цели удара
    pub target_tags: Vec<String>,
}

impl Default for Attacker {
    fn default() -> Self {
        Self {
            owner: Entity::PLACEHOLDER,
            damage: 25,
            range: 2.0,
            cooldown: 1.0,
            cooldown_remaining: 0.0,
            attack_angle: None,
            knockback_force: 0.0,
            strike_delay: 0.0,
            strike: None,
            target_tags: Vec::new(),
        }
    }
}

impl Attacker {
    pub fn new(damage: u32, range: f32, cooldown: f32) -> Self {
        Self {
            damage,
            range,
            cooldown: cooldown.max(0.0),
            ..Default::default()
        }
    }

    pub fn from_config(config: &ActorConfig, target_tag: &str) -> Self {
        Self {
            attack_angle: config.attack_angle,
            knockback_force: config.knockback_force,
            strike_delay: config.strike_delay,
            target_tags: vec![target_tag.to_string()],
            ..Self::new(config.damage, config.attack_range, config.cooldown)
        }
    }

    pub fn with_target_tag(mut self, tag: impl Into<String>) -> Self {
        self.target_tags.push(tag.into());
        self
    }

    pub fn with_cone(mut self, angle: f32) -> Self {
        self.attack_angle = Some(angle);
        self
    }

    pub fn with_knockback(mut self, force: f32) -> Self {
        self.knockback_force = force;
        self
    }

    pub fn with_strike_delay(mut self, delay: f32) -> Self {
        self.strike_delay = delay.max(0.0);
        self
    }

    /// Может ли атаковать (cooldown истёк)
    pub fn can_attack(&self) -> bool {
        self.cooldown_remaining <= 0.0
    }

    pub fn cooldown_remaining(&self) -> f32 {
        self.cooldown_remaining
    }

    /// Начать атаку: cooldown = полная длительность, взвести strike таймер.
    /// На cooldown'е → false, ничего не меняется.
    pub fn start_attack(&mut self) -> bool {
        if !self.can_attack() {
            return false;
        }
        self.cooldown_remaining = self.cooldown;
        self.strike = Some(OneShot::new(self.strike_delay));
        true
    }

    /// Атака прервана или закончилась: несработавший strike отменяется
    pub fn end_attack(&mut self) {
        self.strike = None;
    }

    pub fn strike_pending(&self) -> bool {
        self.strike.is_some()
    }

    /// Уменьшить cooldown (clamp в 0)
    pub fn tick_cooldown(&mut self, delta: f32) {
        if self.cooldown_remaining > 0.0 {
            self.cooldown_remaining = (self.cooldown_remaining - delta).max(0.0);
        }
    }

    /// true на кадре strike frame (ровно один раз за атаку)
    pub fn tick_strike(&mut self, delta: f32) -> bool {
        let Some(timer) = self.strike.as_mut() else {
            return false;
        };
        if timer.tick(delta) {
            self.strike = None;
            return true;
        }
        false
    }
}

impl SimComponent for Attacker {
    const KIND: ComponentKind = ComponentKind::Combat;

    fn owner(&self) -> Entity {
        self.owner
    }

    fn on_add(&mut self, owner: Entity) {
        self.owner = owner;
    }

    fn on_remove(&mut self) {
        self.strike = None;
    }

    fn on_disable(&mut self) {
        self.strike = None;
    }
}
