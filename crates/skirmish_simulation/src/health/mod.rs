//! Health domain: урон, лечение, окно неуязвимости, сигнал смерти
//!
//! Поток урона:
//! `damage.taken` → `apply_damage` → `health.damaged` (Hit + knockback)
//!                                 → `health.zero` (ровно один раз → Death)

use bevy::prelude::*;

use crate::events::{DamageInfo, EventBus, EventPayload, GameEvent, HandlerError, Topic};
use crate::registry::{ComponentKind, EntityRegistry, SimComponent};

#[cfg(test)]
mod health_tests;

/// Результат `take_damage`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Неуязвимость или уже мёртв (grace, не ошибка)
    Ignored,
    Damaged { remaining: u32 },
    /// Первое пересечение нуля
    Killed,
}

/// Здоровье entity
///
/// Инвариант: 0 ≤ current ≤ max
#[derive(Component, Debug, Clone)]
pub struct Health {
    owner: Entity,
    current: u32,
    max: u32,
    /// Окно неуязвимости после урона (секунды)
    pub invulnerability_duration: f32,
    invulnerable_timer: f32,
    /// health.zero уже отправлен
    zero_signaled: bool,
    last_source: Option<Entity>,
}

impl Default for Health {
    fn default() -> Self {
        Self::new(100, 0.5)
    }
}

impl Health {
    pub fn new(max: u32, invulnerability_duration: f32) -> Self {
        Self {
            owner: Entity::PLACEHOLDER,
            current: max,
            max,
            invulnerability_duration: invulnerability_duration.max(0.0),
            invulnerable_timer: 0.0,
            zero_signaled: false,
            last_source: None,
        }
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn is_alive(&self) -> bool {
        self.current > 0
    }

    pub fn is_invulnerable(&self) -> bool {
        self.invulnerable_timer > 0.0
    }

    pub fn invulnerable_remaining(&self) -> f32 {
        self.invulnerable_timer
    }

    /// Последний, кто нанёс урон (weak)
    pub fn last_source(&self) -> Option<Entity> {
        self.last_source
    }

    pub fn percentage(&self) -> f32 {
        if self.max == 0 {
            return 0.0;
        }
        self.current as f32 / self.max as f32
    }

    /// Нанести урон. No-op при неуязвимости или нулевом здоровье.
    pub fn take_damage(&mut self, amount: u32, source: Option<Entity>) -> DamageOutcome {
        if self.is_invulnerable() || !self.is_alive() {
            return DamageOutcome::Ignored;
        }

        self.current = self.current.saturating_sub(amount);
        self.invulnerable_timer = self.invulnerability_duration;
        if source.is_some() {
            self.last_source = source;
        }

        if self.current == 0 {
            if self.zero_signaled {
                return DamageOutcome::Ignored;
            }
            self.zero_signaled = true;
            return DamageOutcome::Killed;
        }
        DamageOutcome::Damaged { remaining: self.current }
    }

    /// Лечение (clamp к max). Мёртвых не лечит. Возвращает реально добавленное.
    pub fn heal(&mut self, amount: u32) -> u32 {
        if !self.is_alive() {
            return 0;
        }
        let before = self.current;
        self.current = self.current.saturating_add(amount).min(self.max);
        self.current - before
    }

    /// Тик окна неуязвимости
    pub fn tick(&mut self, delta: f32) {
        if self.invulnerable_timer > 0.0 {
            self.invulnerable_timer = (self.invulnerable_timer - delta).max(0.0);
        }
    }
}

impl SimComponent for Health {
    const KIND: ComponentKind = ComponentKind::Health;

    fn owner(&self) -> Entity {
        self.owner
    }

    fn on_add(&mut self, owner: Entity) {
        self.owner = owner;
    }
}

/// Применить урон к цели и разослать последствия
pub fn apply_damage(registry: &mut EntityRegistry, bus: &EventBus, info: DamageInfo) -> Result<DamageOutcome, HandlerError> {
    let outcome = match registry.get_mut::<Health>(info.target) {
        Some(mut health) => health.take_damage(info.amount, info.source),
        None => {
            return Err(HandlerError::MissingComponent {
                entity: info.target,
                kind: ComponentKind::Health,
            })
        }
    };

    match outcome {
        DamageOutcome::Ignored => {}
        DamageOutcome::Damaged { remaining } => {
            crate::logger::log(&format!(
                "{:?} took {} damage from {:?} ({} left)",
                info.target, info.amount, info.source, remaining
            ));
            bus.publish(
                registry,
                GameEvent::new(
                    Topic::HEALTH_DAMAGED,
                    EventPayload::Damaged {
                        entity: info.target,
                        amount: info.amount,
                        remaining,
                        source: info.source,
                        direction: info.direction,
                        knockback: info.knockback,
                    },
                ),
            );
        }
        DamageOutcome::Killed => {
            crate::logger::log_info(&format!("{:?} health reached zero (source {:?})", info.target, info.source));
            bus.publish(
                registry,
                GameEvent::new(
                    Topic::HEALTH_ZERO,
                    EventPayload::HealthZero {
                        entity: info.target,
                        source: info.source,
                    },
                ),
            );
        }
    }

    Ok(outcome)
}

/// Лечение с публикацией `health.healed` (только если что-то добавилось)
pub fn apply_heal(registry: &mut EntityRegistry, bus: &EventBus, entity: Entity, amount: u32) -> Option<u32> {
    let (healed, current) = {
        let mut health = registry.get_mut::<Health>(entity)?;
        let healed = health.heal(amount);
        (healed, health.current())
    };

    if healed > 0 {
        bus.publish(
            registry,
            GameEvent::new(
                Topic::HEALTH_HEALED,
                EventPayload::Healed {
                    entity,
                    amount: healed,
                    current,
                },
            ),
        );
    }
    Some(healed)
}

/// Health phase: тик неуязвимости
pub fn update(registry: &mut EntityRegistry, entity: Entity, delta: f32) {
    if let Some(mut health) = registry.get_mut::<Health>(entity) {
        health.tick(delta);
    }
}

/// Подписка на `damage.taken`
pub fn subscribe_handlers(bus: &EventBus) {
    bus.subscribe(Topic::DAMAGE_TAKEN, |event, registry, bus| {
        if let EventPayload::Damage(info) = event.payload() {
            apply_damage(registry, bus, *info)?;
        }
        Ok(())
    });
}
