//! Movement компоненты: скорость/поворот, knockback

use bevy::prelude::*;
use std::f32::consts::PI;

use crate::config::{ActorConfig, KnockbackConfig};
use crate::registry::{ComponentKind, EntityTransform, SimComponent};

/// Kinematic движение entity
///
/// Intent выставляет текущее состояние FSM (Walk/Chase), Movement phase его
/// потребляет. Пока активен knockback, intents игнорируются.
#[derive(Component, Debug, Clone)]
pub struct Movement {
    owner: Entity,
    /// Скорость (m/s)
    pub speed: f32,
    /// Угловая скорость сглаживания (1/s)
    pub rotation_speed: f32,
    /// 0.0 = полный knockback, 1.0 = иммунитет
    pub knockback_resistance: f32,
    pub knockback_duration: f32,
    /// Эффективные силы ниже порога игнорируются
    pub min_knockback_force: f32,
    intent: Vec3,
    knockback: Option<Knockback>,
}

impl Default for Movement {
    fn default() -> Self {
        Self::new(5.0, 10.0)
    }
}

impl Movement {
    pub fn new(speed: f32, rotation_speed: f32) -> Self {
        let knockback = KnockbackConfig::default();
        Self {
            owner: Entity::PLACEHOLDER,
            speed,
            rotation_speed,
            knockback_resistance: 0.0,
            knockback_duration: knockback.duration,
            min_knockback_force: knockback.min_force,
            intent: Vec3::ZERO,
            knockback: None,
        }
    }

    pub fn from_config(actor: &ActorConfig, knockback: &KnockbackConfig) -> Self {
        Self {
            knockback_resistance: actor.knockback_resistance.clamp(0.0, 1.0),
            knockback_duration: knockback.duration,
            min_knockback_force: knockback.min_force,
            ..Self::new(actor.speed, actor.rotation_speed)
        }
    }

    pub fn with_resistance(mut self, resistance: f32) -> Self {
        self.knockback_resistance = resistance.clamp(0.0, 1.0);
        self
    }

    pub fn intent(&self) -> Vec3 {
        self.intent
    }

    pub fn set_intent(&mut self, direction: Vec3) {
        self.intent = direction;
    }

    pub(crate) fn take_intent(&mut self) -> Vec3 {
        std::mem::take(&mut self.intent)
    }

    pub fn is_knocked_back(&self) -> bool {
        self.knockback.is_some()
    }

    pub fn knockback(&self) -> Option<&Knockback> {
        self.knockback.as_ref()
    }

    /// Начать knockback. Возвращает эффективную силу или None (ниже порога).
    ///
    /// Новый knockback заменяет текущий.
    pub fn apply_knockback(&mut self, direction: Vec3, force: f32) -> Option<f32> {
        let direction = Vec3::new(direction.x, 0.0, direction.z).normalize_or_zero();
        let effective = force * (1.0 - self.knockback_resistance);
        if direction == Vec3::ZERO || !effective.is_finite() || effective < self.min_knockback_force {
            return None;
        }
        self.knockback = Some(Knockback::new(direction * effective, self.knockback_duration));
        Some(effective)
    }

    /// Продвинуть knockback на delta: (смещение за кадр, закончился ли)
    pub(crate) fn tick_knockback(&mut self, delta: f32) -> (Vec3, bool) {
        let Some(knockback) = self.knockback.as_mut() else {
            return (Vec3::ZERO, false);
        };
        let displacement = knockback.advance(delta);
        if knockback.is_finished() {
            self.knockback = None;
            return (displacement, true);
        }
        (displacement, false)
    }

    pub(crate) fn clear_knockback(&mut self) {
        self.knockback = None;
    }
}

impl SimComponent for Movement {
    const KIND: ComponentKind = ComponentKind::Movement;

    fn owner(&self) -> Entity {
        self.owner
    }

    fn on_add(&mut self, owner: Entity) {
        self.owner = owner;
    }

    fn on_disable(&mut self) {
        self.intent = Vec3::ZERO;
        self.knockback = None;
    }

    fn on_remove(&mut self) {
        self.intent = Vec3::ZERO;
        self.knockback = None;
    }
}

/// Затухающий толчок: скорость v(t) = v0 · (1 - t / T), ровно 0 при t ≥ T
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Knockback {
    initial_velocity: Vec3,
    duration: f32,
    elapsed: f32,
}

impl Knockback {
    pub fn new(initial_velocity: Vec3, duration: f32) -> Self {
        Self {
            initial_velocity,
            duration: duration.max(f32::EPSILON),
            elapsed: 0.0,
        }
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Скорость в момент t от начала толчка
    pub fn velocity_at(&self, t: f32) -> Vec3 {
        let decay = (1.0 - t / self.duration).clamp(0.0, 1.0);
        self.initial_velocity * decay
    }

    pub fn current_velocity(&self) -> Vec3 {
        self.velocity_at(self.elapsed)
    }

    /// Смещение за [elapsed, elapsed + delta] (точный интеграл линейного затухания)
    pub fn advance(&mut self, delta: f32) -> Vec3 {
        let start = self.elapsed;
        let end = (start + delta.max(0.0)).min(self.duration);
        self.elapsed = end;

        let step = end - start;
        let speed_sum = (2.0 - (start + end) / self.duration) * 0.5;
        self.initial_velocity * step * speed_sum
    }
}

/// Кратчайшая разница углов, завёрнутая в [-π, π]
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = (angle + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped < -PI {
        wrapped + 2.0 * PI
    } else {
        wrapped
    }
}

/// Сдвинуть transform по направлению и довернуть к курсу. false если direction == 0.
///
/// Поворот: yaw += diff · min(1, rotation_speed · delta), diff по кратчайшей дуге.
pub fn steer(transform: &mut EntityTransform, direction: Vec3, speed: f32, rotation_speed: f32, delta: f32) -> bool {
    let heading = Vec3::new(direction.x, 0.0, direction.z);
    if heading.length_squared() <= f32::EPSILON {
        return false;
    }
    let heading = heading.normalize();

    let target_yaw = heading.x.atan2(heading.z);
    let diff = wrap_angle(target_yaw - transform.yaw);
    let factor = (rotation_speed * delta).clamp(0.0, 1.0);
    transform.yaw = wrap_angle(transform.yaw + diff * factor);

    transform.translation += heading * speed * delta;
    true
}
