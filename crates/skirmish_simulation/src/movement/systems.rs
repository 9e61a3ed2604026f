//! Movement phase: intent → steer, knockback, collision reconcile

use bevy::prelude::*;

use super::collision::{CollisionOracle, CollisionResponse};
use super::components::{steer, Movement};
use crate::events::{EventBus, EventPayload, GameEvent, Topic};
use crate::registry::{ComponentKind, EntityRegistry};

/// Сдвинуть entity в направлении. No-op (false): нулевой вектор, knockback,
/// выключенный/отсутствующий Movement.
pub fn move_entity(registry: &mut EntityRegistry, entity: Entity, direction: Vec3, delta: f32) -> bool {
    if !registry.is_enabled(entity, ComponentKind::Movement) {
        return false;
    }
    let (speed, rotation_speed) = match registry.get::<Movement>(entity) {
        Some(movement) if !movement.is_knocked_back() => (movement.speed, movement.rotation_speed),
        _ => return false,
    };
    match registry.transform_mut(entity) {
        Some(mut transform) => steer(&mut transform, direction, speed, rotation_speed, delta),
        None => false,
    }
}

/// Толкнуть entity. Публикует `knockback.start` если сила прошла порог.
pub fn apply_knockback(registry: &mut EntityRegistry, bus: &EventBus, entity: Entity, direction: Vec3, force: f32) -> bool {
    if !registry.is_enabled(entity, ComponentKind::Movement) {
        return false;
    }
    let applied = registry
        .get_mut::<Movement>(entity)
        .and_then(|mut movement| movement.apply_knockback(direction, force));

    let Some(effective) = applied else {
        return false;
    };
    bus.publish(
        registry,
        GameEvent::new(
            Topic::KNOCKBACK_START,
            EventPayload::KnockbackStart {
                entity,
                direction: Vec3::new(direction.x, 0.0, direction.z).normalize_or_zero(),
                force: effective,
            },
        ),
    );
    true
}

/// Оборвать активный knockback (смерть, выключение Movement) с `knockback.end`.
/// false если толчка не было.
pub fn stop_knockback(registry: &mut EntityRegistry, bus: &EventBus, entity: Entity) -> bool {
    let stopped = registry.get_mut::<Movement>(entity).is_some_and(|mut movement| {
        let active = movement.is_knocked_back();
        movement.clear_knockback();
        active
    });
    if stopped {
        bus.publish(
            registry,
            GameEvent::new(Topic::KNOCKBACK_END, EventPayload::KnockbackEnd { entity }),
        );
    }
    stopped
}

/// Movement phase для одной entity
pub fn update(registry: &mut EntityRegistry, bus: &EventBus, collision: &dyn CollisionOracle, entity: Entity, delta: f32) {
    let Some(before) = registry.position(entity) else {
        return;
    };

    let intent = match registry.get_mut::<Movement>(entity) {
        Some(mut movement) => movement.take_intent(),
        None => return,
    };
    move_entity(registry, entity, intent, delta);

    let (displacement, ended) = match registry.get_mut::<Movement>(entity) {
        Some(mut movement) => movement.tick_knockback(delta),
        None => (Vec3::ZERO, false),
    };
    if displacement != Vec3::ZERO {
        if let Some(mut transform) = registry.transform_mut(entity) {
            transform.translation += displacement;
        }
    }

    if registry.position(entity) != Some(before) {
        resolve_collision(registry, bus, collision, entity, before);
    }

    if ended {
        bus.publish(
            registry,
            GameEvent::new(Topic::KNOCKBACK_END, EventPayload::KnockbackEnd { entity }),
        );
    }
}

/// Спросить oracle и применить политику: Blocked → откат, Push → коррекция
pub fn resolve_collision(
    registry: &mut EntityRegistry,
    bus: &EventBus,
    collision: &dyn CollisionOracle,
    entity: Entity,
    before: Vec3,
) -> Option<CollisionResponse> {
    let response = collision.check_collision(registry, entity)?;

    let correction = match response {
        CollisionResponse::Blocked { .. } => {
            let mut transform = registry.transform_mut(entity)?;
            let correction = before - transform.translation;
            transform.translation = before;
            correction
        }
        CollisionResponse::Push { correction, .. } => {
            registry.transform_mut(entity)?.translation += correction;
            correction
        }
    };

    bus.publish(
        registry,
        GameEvent::new(
            Topic::COLLISION,
            EventPayload::Collision {
                entity,
                other: response.other(),
                correction,
            },
        ),
    );
    Some(response)
}

/// Подписка: `health.damaged` → knockback по направлению удара
pub fn subscribe_handlers(bus: &EventBus) {
    bus.subscribe(Topic::HEALTH_DAMAGED, |event, registry, bus| {
        if let EventPayload::Damaged {
            entity,
            direction,
            knockback,
            ..
        } = event.payload()
        {
            if *knockback > 0.0 && registry.has::<Movement>(*entity) {
                apply_knockback(registry, bus, *entity, *direction, *knockback);
            }
        }
        Ok(())
    });
}
