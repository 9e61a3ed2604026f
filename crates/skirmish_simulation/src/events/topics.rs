//! Topics и payloads событий
//!
//! Topic — иерархический dotted id (`damage.taken`). Payload — закрытый набор
//! структурных записей; handler матчит нужный вариант.

use bevy::prelude::*;
use std::borrow::Cow;

use crate::fsm::StateId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Topic(Cow<'static, str>);

impl Topic {
    pub const DAMAGE_TAKEN: Topic = Topic(Cow::Borrowed("damage.taken"));
    pub const HEALTH_DAMAGED: Topic = Topic(Cow::Borrowed("health.damaged"));
    pub const HEALTH_HEALED: Topic = Topic(Cow::Borrowed("health.healed"));
    pub const HEALTH_ZERO: Topic = Topic(Cow::Borrowed("health.zero"));
    pub const ENTITY_ATTACK: Topic = Topic(Cow::Borrowed("entity.attack"));
    pub const ENTITY_DIED: Topic = Topic(Cow::Borrowed("entity.died"));
    pub const ENTITY_DESTROYED: Topic = Topic(Cow::Borrowed("entity.destroyed"));
    pub const DEATH_ANIMATION_COMPLETE: Topic = Topic(Cow::Borrowed("entity.death_animation_complete"));
    pub const STATE_CHANGED: Topic = Topic(Cow::Borrowed("state.changed"));
    pub const KNOCKBACK_START: Topic = Topic(Cow::Borrowed("knockback.start"));
    pub const KNOCKBACK_END: Topic = Topic(Cow::Borrowed("knockback.end"));
    pub const COLLISION: Topic = Topic(Cow::Borrowed("collision"));
    pub const ANIMATION_COMPLETE: Topic = Topic(Cow::Borrowed("animation.complete"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// `damage.taken` находится внутри `damage`, но не внутри `dam`
    pub fn is_within(&self, prefix: &str) -> bool {
        let name = self.as_str();
        name == prefix
            || (name.len() > prefix.len() && name.starts_with(prefix) && name.as_bytes()[prefix.len()] == b'.')
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Результат подтверждённого попадания
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageInfo {
    pub target: Entity,
    /// Weak: источник мог уже быть уничтожен
    pub source: Option<Entity>,
    pub amount: u32,
    /// Горизонтальное направление source → target (normalized или ZERO)
    pub direction: Vec3,
    pub knockback: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    Damage(DamageInfo),
    Damaged {
        entity: Entity,
        amount: u32,
        remaining: u32,
        source: Option<Entity>,
        direction: Vec3,
        knockback: f32,
    },
    Healed {
        entity: Entity,
        amount: u32,
        current: u32,
    },
    HealthZero {
        entity: Entity,
        source: Option<Entity>,
    },
    Attack {
        attacker: Entity,
        position: Vec3,
        yaw: f32,
        damage: u32,
        range: f32,
    },
    Died {
        entity: Entity,
        killer: Option<Entity>,
        position: Vec3,
    },
    Destroyed {
        entity: Entity,
    },
    StateChanged {
        entity: Entity,
        from: Option<StateId>,
        to: StateId,
    },
    KnockbackStart {
        entity: Entity,
        direction: Vec3,
        force: f32,
    },
    KnockbackEnd {
        entity: Entity,
    },
    Collision {
        entity: Entity,
        other: Option<Entity>,
        correction: Vec3,
    },
    AnimationComplete {
        entity: Entity,
        clip: String,
    },
}

impl EventPayload {
    /// Entity, к которой относится событие
    pub fn entity(&self) -> Entity {
        match self {
            EventPayload::Damage(info) => info.target,
            EventPayload::Attack { attacker, .. } => *attacker,
            EventPayload::Damaged { entity, .. }
            | EventPayload::Healed { entity, .. }
            | EventPayload::HealthZero { entity, .. }
            | EventPayload::Died { entity, .. }
            | EventPayload::Destroyed { entity }
            | EventPayload::StateChanged { entity, .. }
            | EventPayload::KnockbackStart { entity, .. }
            | EventPayload::KnockbackEnd { entity }
            | EventPayload::Collision { entity, .. }
            | EventPayload::AnimationComplete { entity, .. } => *entity,
        }
    }
}

/// Immutable (topic, payload) пара
#[derive(Debug, Clone, PartialEq)]
pub struct GameEvent {
    topic: Topic,
    payload: EventPayload,
}

impl GameEvent {
    pub fn new(topic: Topic, payload: EventPayload) -> Self {
        Self { topic, payload }
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    pub fn payload(&self) -> &EventPayload {
        &self.payload
    }

    pub fn entity(&self) -> Entity {
        self.payload.entity()
    }

    pub fn damage_taken(info: DamageInfo) -> Self {
        Self::new(Topic::DAMAGE_TAKEN, EventPayload::Damage(info))
    }

    pub fn state_changed(entity: Entity, from: Option<StateId>, to: StateId) -> Self {
        Self::new(Topic::STATE_CHANGED, EventPayload::StateChanged { entity, from, to })
    }
}
