//! AI phase: восприятие → закон перехода → запрос к FSM

use bevy::prelude::*;

use super::AiController;
use crate::events::EventBus;
use crate::fsm::{self, StateId};
use crate::health::Health;
use crate::registry::{EntityRegistry, EntityTransform};

/// Найти ближайшую живую враждебную entity (любая дистанция)
///
/// Равные дистанции: выигрывает меньший index (кандидаты отсортированы).
pub fn find_nearest_hostile(
    registry: &mut EntityRegistry,
    self_entity: Entity,
    self_transform: &EntityTransform,
    hostile_tags: &[String],
) -> Option<(Entity, Vec3, f32)> {
    let mut nearest: Option<(Entity, Vec3, f32)> = None;

    for (candidate, position) in registry.tagged(hostile_tags) {
        // Не атакуем себя
        if candidate == self_entity {
            continue;
        }

        // Только живые цели
        if !registry.get::<Health>(candidate).is_some_and(Health::is_alive) {
            continue;
        }

        let distance = self_transform.horizontal_distance(position);
        if nearest.is_none_or(|(_, _, best)| distance < best) {
            nearest = Some((candidate, position, distance));
        }
    }

    nearest
}

/// AI update одной entity. Возвращает запрошенное состояние (если было).
pub fn update(registry: &mut EntityRegistry, bus: &EventBus, entity: Entity) -> Option<StateId> {
    let hostile_tags = registry.get::<AiController>(entity)?.hostile_tags.clone();
    let transform = *registry.transform(entity)?;

    let nearest = find_nearest_hostile(registry, entity, &transform, &hostile_tags);

    let request = {
        let current = fsm::current_state(registry, entity);
        let mut ai = registry.get_mut::<AiController>(entity)?;
        ai.perceive(transform.translation, nearest.map(|(target, position, _)| (target, position)));
        ai.decide(nearest.map(|(_, _, distance)| distance), current)
    };

    if let Some(state) = request {
        fsm::set_state(registry, bus, entity, state);
    }
    request
}
