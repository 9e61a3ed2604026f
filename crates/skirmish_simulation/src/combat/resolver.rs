//! Hit test и разрешение удара
//!
//! Strike frame → кандидаты по target_tags → дистанция + конус → `damage.taken`

use bevy::prelude::*;
use std::f32::consts::TAU;

use super::Attacker;
use crate::events::{DamageInfo, EventBus, GameEvent};
use crate::health::Health;
use crate::registry::EntityRegistry;

/// Допуск на float ошибку при сравнении угла/дистанции
const HIT_EPSILON: f32 = 1e-4;

/// Горизонтальный вектор (y обнулён)
pub fn horizontal(vector: Vec3) -> Vec3 {
    Vec3::new(vector.x, 0.0, vector.z)
}

/// Попадает ли удар из `origin` (смотрящего в `forward`) по точке `target`
///
/// - горизонтальная дистанция ≤ range
/// - если задан конус: угол между forward и направлением на цель ≤ angle / 2
///   (конус ≥ 2π эквивалентен кругу)
pub fn is_hit(origin: Vec3, forward: Vec3, target: Vec3, range: f32, attack_angle: Option<f32>) -> bool {
    let to_target = horizontal(target - origin);
    let distance = to_target.length();
    if distance > range + HIT_EPSILON {
        return false;
    }

    let Some(angle) = attack_angle else {
        return true;
    };
    if angle >= TAU || distance <= HIT_EPSILON {
        return true;
    }

    let forward = horizontal(forward);
    if forward.length_squared() <= f32::EPSILON {
        return true;
    }

    forward.angle_between(to_target) <= angle * 0.5 + HIT_EPSILON
}

/// Собрать попадания удара `attacker` (без публикации)
///
/// Кандидаты: активные entity с одним из target_tags, живые, не сам атакующий.
pub fn collect_hits(registry: &mut EntityRegistry, attacker: Entity) -> Vec<DamageInfo> {
    let Some(stats) = registry.get::<Attacker>(attacker).cloned() else {
        return Vec::new();
    };
    let Some(origin) = registry.transform(attacker).copied() else {
        return Vec::new();
    };
    let forward = origin.forward();

    registry
        .tagged(&stats.target_tags)
        .into_iter()
        .filter(|(candidate, _)| *candidate != attacker)
        .filter(|(candidate, _)| registry.get::<Health>(*candidate).is_some_and(Health::is_alive))
        .filter(|(_, position)| is_hit(origin.translation, forward, *position, stats.range, stats.attack_angle))
        .map(|(target, position)| DamageInfo {
            target,
            source: Some(attacker),
            amount: stats.damage,
            direction: horizontal(position - origin.translation).normalize_or_zero(),
            knockback: stats.knockback_force,
        })
        .collect()
}

/// Разрешить удар: `damage.taken` на каждое попадание. Возвращает число попаданий.
pub fn resolve_strike(registry: &mut EntityRegistry, bus: &EventBus, attacker: Entity) -> usize {
    let hits = collect_hits(registry, attacker);
    if hits.is_empty() {
        crate::logger::log(&format!("{:?} strike missed", attacker));
    }
    for hit in &hits {
        crate::logger::log(&format!(
            "⚔️ {:?} hits {:?} for {} (knockback {:.1})",
            attacker, hit.target, hit.amount, hit.knockback
        ));
        bus.publish(registry, GameEvent::damage_taken(*hit));
    }
    hits.len()
}

/// Combat phase: cooldown + strike таймер
pub fn update(registry: &mut EntityRegistry, bus: &EventBus, entity: Entity, delta: f32) {
    let strike = match registry.get_mut::<Attacker>(entity) {
        Some(mut attacker) => {
            attacker.tick_cooldown(delta);
            attacker.tick_strike(delta)
        }
        None => return,
    };

    if strike {
        resolve_strike(registry, bus, entity);
    }
}
