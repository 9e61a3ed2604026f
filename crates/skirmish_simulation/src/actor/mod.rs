//! Actor factories: сборка игрока и врага из компонентов
//!
//! Порядок добавления важен (required siblings):
//! Health → Movement → Collider → Attacker → Animator → StateMachine → Input/AI
//!
//! Отсутствующая модель — фатальная ошибка конструирования. Модель, которая
//! ещё грузится, не ошибка: entity создаётся неактивной (см. `activate_pending`).

use bevy::prelude::*;
use thiserror::Error;

use crate::ai::AiController;
use crate::animation::Animator;
use crate::assets::{AssetCache, AssetError, AssetLoader, ModelAsset};
use crate::combat::Attacker;
use crate::config::{ActorConfig, SimConfig};
use crate::events::{EventBus, EventPayload, GameEvent, Topic};
use crate::fsm::{self, StateId, StateMachine};
use crate::health::Health;
use crate::input::PlayerInput;
use crate::movement::{Collider, Movement};
use crate::registry::{ComponentKind, EntityRegistry, EntityTransform, RegistryError};

pub const PLAYER_TAG: &str = "player";
pub const ENEMY_TAG: &str = "enemy";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpawnError {
    #[error("actor '{0}' has no model url")]
    MissingModel(String),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Asset(#[from] AssetError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorKind {
    Player,
    Enemy,
}

impl ActorKind {
    pub fn tag(&self) -> &'static str {
        match self {
            ActorKind::Player => PLAYER_TAG,
            ActorKind::Enemy => ENEMY_TAG,
        }
    }

    pub fn hostile_tag(&self) -> &'static str {
        match self {
            ActorKind::Player => ENEMY_TAG,
            ActorKind::Enemy => PLAYER_TAG,
        }
    }

    pub fn config<'a>(&self, config: &'a SimConfig) -> &'a ActorConfig {
        match self {
            ActorKind::Player => &config.player,
            ActorKind::Enemy => &config.enemy,
        }
    }
}

/// URL модели, ожидающей загрузки (снимается при активации)
#[derive(Component, Debug, Clone, PartialEq, Eq)]
pub struct PendingModel {
    pub url: String,
}

/// Всё, что нужно factory кроме registry
pub struct SpawnContext<'a> {
    pub bus: &'a EventBus,
    pub assets: &'a mut AssetCache,
    pub loader: &'a mut dyn AssetLoader,
    pub config: &'a SimConfig,
}

pub fn spawn_player(registry: &mut EntityRegistry, ctx: SpawnContext, position: Vec3) -> Result<Entity, SpawnError> {
    spawn_actor(registry, ctx, ActorKind::Player, "Player", position)
}

pub fn spawn_enemy(
    registry: &mut EntityRegistry,
    ctx: SpawnContext,
    name: impl Into<String>,
    position: Vec3,
) -> Result<Entity, SpawnError> {
    spawn_actor(registry, ctx, ActorKind::Enemy, name, position)
}

pub fn spawn_actor(
    registry: &mut EntityRegistry,
    mut ctx: SpawnContext,
    kind: ActorKind,
    name: impl Into<String>,
    position: Vec3,
) -> Result<Entity, SpawnError> {
    let name = name.into();
    let actor = kind.config(ctx.config);

    if actor.model_url.trim().is_empty() {
        crate::logger::log_error(&format!("Cannot spawn '{}': model url is empty", name));
        return Err(SpawnError::MissingModel(name));
    }

    // Failed загрузка фатальна, Pending — entity стартует неактивной
    let model = ctx.assets.request(&actor.model_url, &mut *ctx.loader)?;

    let entity = registry.create_entity(name.clone(), EntityTransform::from_translation(position));
    if let Err(error) = attach_components(registry, ctx.bus, ctx.config, kind, entity, model.as_ref().map(|(_, asset)| asset)) {
        crate::logger::log_error(&format!("Spawn of '{}' failed: {}", name, error));
        destroy_entity(registry, ctx.bus, entity);
        return Err(error.into());
    }

    match model {
        Some((handle, _)) => {
            if let Some(mut meta) = registry.meta_mut(entity) {
                meta.model = Some(handle);
            }
        }
        None => {
            if let Some(mut meta) = registry.meta_mut(entity) {
                meta.active = false;
            }
            registry.world_mut().entity_mut(entity).insert(PendingModel {
                url: actor.model_url.clone(),
            });
            crate::logger::log(&format!("'{}' waits for model {}", name, actor.model_url));
        }
    }

    crate::logger::log_info(&format!("✅ Spawned {} '{}' {:?} at {:?}", kind.tag(), name, entity, position));
    Ok(entity)
}

fn attach_components(
    registry: &mut EntityRegistry,
    bus: &EventBus,
    config: &SimConfig,
    kind: ActorKind,
    entity: Entity,
    model: Option<&ModelAsset>,
) -> Result<(), RegistryError> {
    let actor = kind.config(config);

    if let Some(mut meta) = registry.meta_mut(entity) {
        meta.add_tag(kind.tag());
    }

    registry.add_component(entity, Health::new(actor.max_health, actor.invulnerability))?;
    registry.add_component(entity, Movement::from_config(actor, &config.knockback))?;
    registry.add_component(entity, Collider::solid(actor.collider_radius))?;
    registry.add_component(entity, Attacker::from_config(actor, kind.hostile_tag()))?;

    let mut animator = Animator::new(config.animation.clone());
    if let Some(model) = model {
        animator.apply_model(model);
    }
    registry.add_component(entity, animator)?;

    match kind {
        ActorKind::Player => {
            registry.add_component(entity, StateMachine::player(config.hit_duration))?;
            registry.add_component(entity, PlayerInput::new())?;
        }
        ActorKind::Enemy => {
            registry.add_component(entity, StateMachine::enemy(config.hit_duration))?;
            registry.add_component(entity, AiController::from_config(actor, kind.hostile_tag()))?;
        }
    }

    fsm::start(registry, bus, entity, StateId::Idle);
    Ok(())
}

/// Опросить недогруженные модели. Ready → активировать; Failed → уничтожить.
///
/// Возвращает (активированные, уничтоженные с ошибкой).
pub fn activate_pending(
    registry: &mut EntityRegistry,
    bus: &EventBus,
    assets: &mut AssetCache,
    loader: &mut dyn AssetLoader,
) -> (Vec<Entity>, Vec<(Entity, AssetError)>) {
    let mut pending: Vec<(Entity, String)> = {
        let mut query = registry.world_mut().query::<(Entity, &PendingModel)>();
        query
            .iter(registry.world())
            .map(|(entity, model)| (entity, model.url.clone()))
            .collect()
    };
    pending.sort_by_key(|(entity, _)| entity.index());

    let mut activated = Vec::new();
    let mut failed = Vec::new();

    for (entity, url) in pending {
        match assets.request(&url, loader) {
            Ok(Some((handle, asset))) => {
                registry.world_mut().entity_mut(entity).remove::<PendingModel>();
                if let Some(mut meta) = registry.meta_mut(entity) {
                    meta.model = Some(handle);
                    meta.active = true;
                }
                if let Some(mut animator) = registry.get_mut::<Animator>(entity) {
                    animator.apply_model(&asset);
                }
                crate::logger::log_info(&format!("Entity {:?} activated ({})", entity, url));
                activated.push(entity);
            }
            Ok(None) => {}
            Err(error) => {
                crate::logger::log_error(&format!("Entity {:?} dropped: {}", entity, error));
                destroy_entity(registry, bus, entity);
                failed.push((entity, error));
            }
        }
    }

    (activated, failed)
}

/// Уничтожить entity: remove hooks → detach модели → `entity.destroyed` → despawn
///
/// false если entity не существует.
pub fn destroy_entity(registry: &mut EntityRegistry, bus: &EventBus, entity: Entity) -> bool {
    let kinds = match registry.meta(entity) {
        Some(meta) => meta.kinds().to_vec(),
        None => return false,
    };

    // Обратный порядок: зависимые компоненты уходят раньше своих зависимостей
    for kind in kinds.iter().rev() {
        match kind {
            ComponentKind::Input => registry.run_remove_hook::<PlayerInput>(entity),
            ComponentKind::Ai => registry.run_remove_hook::<AiController>(entity),
            ComponentKind::StateMachine => registry.run_remove_hook::<StateMachine>(entity),
            ComponentKind::Animator => registry.run_remove_hook::<Animator>(entity),
            ComponentKind::Combat => registry.run_remove_hook::<Attacker>(entity),
            ComponentKind::Movement => registry.run_remove_hook::<Movement>(entity),
            ComponentKind::Health => registry.run_remove_hook::<Health>(entity),
            ComponentKind::Collider => registry.run_remove_hook::<Collider>(entity),
        }
        if let Some(mut meta) = registry.meta_mut(entity) {
            meta.detach_kind(*kind);
        }
    }

    if let Some(mut meta) = registry.meta_mut(entity) {
        meta.model = None;
        meta.active = false;
    }

    bus.publish(registry, GameEvent::new(Topic::ENTITY_DESTROYED, EventPayload::Destroyed { entity }));

    let removed = registry.despawn(entity);
    if removed {
        crate::logger::log(&format!("Entity {:?} destroyed", entity));
    }
    removed
}
