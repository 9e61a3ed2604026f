//! Collision boundary
//!
//! Симуляция не решает коллизии сама: после интеграции движения спрашивает
//! `CollisionOracle`. Solid коллайдер → откат на позицию до движения,
//! PushApart → коррекция вектором от oracle.

use bevy::prelude::*;

use crate::registry::{ComponentKind, EntityRegistry, SimComponent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColliderKind {
    /// Откат движения при пересечении
    #[default]
    Solid,
    /// Выталкивание на глубину пересечения
    PushApart,
}

/// Цилиндр вокруг entity (XZ круг + высота)
#[derive(Component, Debug, Clone, Copy)]
pub struct Collider {
    owner: Entity,
    pub radius: f32,
    pub height: f32,
    pub kind: ColliderKind,
}

impl Collider {
    pub fn new(radius: f32, height: f32, kind: ColliderKind) -> Self {
        Self {
            owner: Entity::PLACEHOLDER,
            radius: radius.max(0.0),
            height,
            kind,
        }
    }

    pub fn solid(radius: f32) -> Self {
        Self::new(radius, 2.0, ColliderKind::Solid)
    }

    pub fn push_apart(radius: f32) -> Self {
        Self::new(radius, 2.0, ColliderKind::PushApart)
    }
}

impl SimComponent for Collider {
    const KIND: ComponentKind = ComponentKind::Collider;

    fn requires() -> &'static [ComponentKind] {
        &[ComponentKind::Movement]
    }

    fn owner(&self) -> Entity {
        self.owner
    }

    fn on_add(&mut self, owner: Entity) {
        self.owner = owner;
    }
}

/// Ответ oracle на запрос о коллизии
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CollisionResponse {
    /// Движение заблокировано: вернуть позицию до движения
    Blocked { other: Option<Entity> },
    /// Коррекция позиции (добавляется к translation)
    Push { other: Option<Entity>, correction: Vec3 },
}

impl CollisionResponse {
    pub fn other(&self) -> Option<Entity> {
        match self {
            CollisionResponse::Blocked { other } | CollisionResponse::Push { other, .. } => *other,
        }
    }
}

/// Внешний collision oracle (физика хоста или reference реализация ниже)
pub trait CollisionOracle {
    fn check_collision(&self, registry: &EntityRegistry, entity: Entity) -> Option<CollisionResponse>;
}

/// Oracle без коллизий
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCollision;

impl CollisionOracle for NoCollision {
    fn check_collision(&self, _registry: &EntityRegistry, _entity: Entity) -> Option<CollisionResponse> {
        None
    }
}

/// Reference oracle: круги в плоскости XZ по компонентам Collider
///
/// Пересечение: distance < r1 + r2. Учитывается ближайший (по глубине) сосед.
#[derive(Debug, Clone, Copy, Default)]
pub struct CircleCollisionOracle;

impl CollisionOracle for CircleCollisionOracle {
    fn check_collision(&self, registry: &EntityRegistry, entity: Entity) -> Option<CollisionResponse> {
        let collider = *registry.get::<Collider>(entity)?;
        let position = registry.position(entity)?;

        let mut deepest: Option<(Entity, f32, Vec3)> = None;
        for (other, other_position, other_collider) in registry.colliders() {
            if other == entity || !registry.is_active(other) {
                continue;
            }
            let delta = Vec3::new(position.x - other_position.x, 0.0, position.z - other_position.z);
            let distance = delta.length();
            let depth = collider.radius + other_collider.radius - distance;
            if depth <= 0.0 {
                continue;
            }
            if deepest.is_none_or(|(_, best, _)| depth > best) {
                // Совпадающие центры: выталкиваем по +X
                let normal = if distance > f32::EPSILON { delta / distance } else { Vec3::X };
                deepest = Some((other, depth, normal));
            }
        }

        let (other, depth, normal) = deepest?;
        Some(match collider.kind {
            ColliderKind::Solid => CollisionResponse::Blocked { other: Some(other) },
            ColliderKind::PushApart => CollisionResponse::Push {
                other: Some(other),
                correction: normal * depth,
            },
        })
    }
}
