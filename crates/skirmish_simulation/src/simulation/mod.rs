//! Simulation — host-facing фасад
//!
//! Владеет registry, bus, конфигом и кешем моделей. Хост зовёт `update` раз
//! в кадр с сырым delta и набором сервисов (input, collision oracle); глобальных
//! синглтонов нет.
//!
//! Кадр:
//! 1. delta clamp (FrameClock)
//! 2. фазы в `UPDATE_ORDER`: Input → AI → StateMachine (+Animator) → Combat → Movement → Health
//! 3. события обрабатываются синхронно внутри фаз

use bevy::prelude::*;
use std::path::Path;

use crate::actor::{self, SpawnContext, SpawnError};
use crate::animation::{self, RenderProxy};
use crate::assets::{AssetCache, AssetError, AssetLoader, InstantLoader, ModelAsset};
use crate::config::SimConfig;
use crate::events::{DamageInfo, EventBus, HandlerError};
use crate::fsm::{self, StateId};
use crate::health::{self, DamageOutcome, Health};
use crate::input::{self, InputSource, NoInput};
use crate::movement::{self, CollisionOracle, NoCollision};
use crate::registry::{ComponentKind, EntityRegistry, UPDATE_ORDER};
use crate::time::FrameClock;
use crate::{ai, combat, DeterministicRng, SimError};

/// Внешние сервисы одного кадра
#[derive(Clone, Copy)]
pub struct FrameServices<'a> {
    pub input: &'a dyn InputSource,
    pub collision: &'a dyn CollisionOracle,
}

impl FrameServices<'static> {
    /// Без input и без коллизий
    pub fn headless() -> Self {
        Self {
            input: &NoInput,
            collision: &NoCollision,
        }
    }
}

impl<'a> FrameServices<'a> {
    pub fn new(input: &'a dyn InputSource, collision: &'a dyn CollisionOracle) -> Self {
        Self { input, collision }
    }
}

/// Loader для headless режима: модели игрока и врага с клипами из конфига
pub fn headless_loader(config: &SimConfig) -> InstantLoader {
    let model = ModelAsset::default()
        .with_clip("attacking", config.animation.attack)
        .with_clip("hit", config.animation.hit)
        .with_clip("death", config.animation.death);
    InstantLoader::new()
        .with_model(config.player.model_url.clone(), model.clone())
        .with_model(config.enemy.model_url.clone(), model)
}

pub struct Simulation {
    registry: EntityRegistry,
    bus: EventBus,
    config: SimConfig,
    assets: AssetCache,
    loader: Box<dyn AssetLoader>,
}

impl Simulation {
    pub fn new(config: SimConfig, seed: u64) -> Self {
        let loader = headless_loader(&config);
        Self::with_loader(config, seed, Box::new(loader))
    }

    pub fn with_loader(config: SimConfig, seed: u64, loader: Box<dyn AssetLoader>) -> Self {
        let mut registry = EntityRegistry::new();
        registry.world_mut().insert_resource(FrameClock::new(config.max_delta));
        registry.world_mut().insert_resource(DeterministicRng::new(seed));

        let bus = EventBus::new();
        // Порядок подписки = порядок реакции на health.damaged: сначала Hit, потом knockback
        health::subscribe_handlers(&bus);
        fsm::subscribe_handlers(&bus);
        movement::systems::subscribe_handlers(&bus);

        crate::logger::log_info(&format!("Simulation created (seed {})", seed));

        Self {
            registry,
            bus,
            config,
            assets: AssetCache::new(),
            loader,
        }
    }

    /// Конфиг из TOML файла (валидируется)
    pub fn from_config_file(path: impl AsRef<Path>, seed: u64) -> Result<Self, SimError> {
        let config = SimConfig::from_file(path)?;
        Ok(Self::new(config, seed))
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut EntityRegistry {
        &mut self.registry
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn clock(&self) -> Option<&FrameClock> {
        self.registry.world().get_resource::<FrameClock>()
    }

    pub fn state_of(&self, entity: Entity) -> Option<StateId> {
        fsm::current_state(&self.registry, entity)
    }

    pub fn health_of(&self, entity: Entity) -> Option<u32> {
        self.registry.get::<Health>(entity).map(Health::current)
    }

    pub fn position_of(&self, entity: Entity) -> Option<Vec3> {
        self.registry.position(entity)
    }

    /// Один кадр. Возвращает фактически использованный (clamped) delta.
    pub fn update(&mut self, raw_delta: f32, services: &FrameServices) -> f32 {
        let delta = match self.registry.world_mut().get_resource_mut::<FrameClock>() {
            Some(mut clock) => clock.advance(raw_delta),
            None => crate::time::clamp_delta(raw_delta, self.config.max_delta),
        };

        for kind in UPDATE_ORDER {
            for entity in self.registry.entities_for_phase(kind) {
                // Entity могла умереть или быть выключена раньше в этой же фазе
                if !self.registry.is_active(entity) || !self.registry.is_enabled(entity, kind) {
                    continue;
                }
                self.run_phase(kind, entity, delta, services);
            }
        }

        delta
    }

    fn run_phase(&mut self, kind: ComponentKind, entity: Entity, delta: f32, services: &FrameServices) {
        let registry = &mut self.registry;
        let bus = &self.bus;
        match kind {
            ComponentKind::Input => input::update(registry, entity, services.input),
            ComponentKind::Ai => {
                ai::update(registry, bus, entity);
            }
            ComponentKind::StateMachine => {
                fsm::update(registry, bus, entity, delta);
                animation::update(registry, bus, entity, delta);
            }
            ComponentKind::Combat => combat::resolver::update(registry, bus, entity, delta),
            ComponentKind::Movement => movement::systems::update(registry, bus, services.collision, entity, delta),
            ComponentKind::Health => health::update(registry, entity, delta),
            ComponentKind::Animator | ComponentKind::Collider => {}
        }
    }

    fn spawn_context(&mut self) -> (&mut EntityRegistry, SpawnContext<'_>) {
        (
            &mut self.registry,
            SpawnContext {
                bus: &self.bus,
                assets: &mut self.assets,
                loader: self.loader.as_mut(),
                config: &self.config,
            },
        )
    }

    pub fn spawn_player(&mut self, position: Vec3) -> Result<Entity, SpawnError> {
        let (registry, ctx) = self.spawn_context();
        actor::spawn_player(registry, ctx, position)
    }

    pub fn spawn_enemy(&mut self, name: impl Into<String>, position: Vec3) -> Result<Entity, SpawnError> {
        let (registry, ctx) = self.spawn_context();
        actor::spawn_enemy(registry, ctx, name, position)
    }

    pub fn destroy_entity(&mut self, entity: Entity) -> bool {
        actor::destroy_entity(&mut self.registry, &self.bus, entity)
    }

    /// Запрос перехода по имени (неизвестное имя → warning, false)
    pub fn set_state(&mut self, entity: Entity, name: &str) -> bool {
        fsm::set_state_by_name(&mut self.registry, &self.bus, entity, name)
    }

    /// Прямой урон (без направления и knockback), через тот же pipeline что и удар
    pub fn take_damage(&mut self, entity: Entity, amount: u32, source: Option<Entity>) -> Result<DamageOutcome, HandlerError> {
        health::apply_damage(
            &mut self.registry,
            &self.bus,
            DamageInfo {
                target: entity,
                source,
                amount,
                direction: Vec3::ZERO,
                knockback: 0.0,
            },
        )
    }

    pub fn heal(&mut self, entity: Entity, amount: u32) -> Option<u32> {
        health::apply_heal(&mut self.registry, &self.bus, entity, amount)
    }

    pub fn apply_knockback(&mut self, entity: Entity, direction: Vec3, force: f32) -> bool {
        movement::apply_knockback(&mut self.registry, &self.bus, entity, direction, force)
    }

    /// Опросить loader. Возвращает entity, уничтоженные из-за ошибки загрузки.
    pub fn poll_assets(&mut self) -> Vec<(Entity, AssetError)> {
        let (_, failed) = actor::activate_pending(&mut self.registry, &self.bus, &mut self.assets, self.loader.as_mut());
        failed
    }

    /// Отдать render proxy transform + клип каждой активной entity
    pub fn sync_render(&mut self, proxy: &mut dyn RenderProxy) {
        for entity in self.registry.entities() {
            if !self.registry.is_active(entity) {
                continue;
            }
            let Some(transform) = self.registry.transform(entity).copied() else {
                continue;
            };
            let clip = self
                .registry
                .get::<animation::Animator>(entity)
                .map_or("idle", animation::Animator::current_clip);
            proxy.present(entity, &transform, clip);
        }
    }

    /// Детерминированный snapshot: transform, здоровье, состояние (по index)
    pub fn snapshot(&mut self) -> Vec<u8> {
        let mut snapshot = Vec::new();

        for entity in self.registry.entities() {
            let transform = self.registry.transform(entity).copied().unwrap_or_default();
            let health = self.registry.get::<Health>(entity).map(Health::current);
            let state = fsm::current_state(&self.registry, entity);

            snapshot.extend_from_slice(&entity.index().to_le_bytes());
            snapshot.extend_from_slice(
                format!(
                    "{:?}|{:?}|{:?}|{:?}",
                    transform.translation,
                    transform.yaw,
                    health,
                    state.map(|state| state.name())
                )
                .as_bytes(),
            );
        }

        snapshot
    }
}
