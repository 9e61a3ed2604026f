//! Skirmish Simulation Core
//!
//! Real-time ядро action-игры поверх bevy_ecs `World`:
//! registry entity/компонентов, per-entity FSM, event-driven combat pipeline,
//! health/movement/knockback.
//!
//! Однопоточное, кадровое выполнение: хост зовёт `Simulation::update` с сырым
//! delta, всё (фазы, события, handlers) происходит синхронно в этом вызове.
//! Рендер, скелетная анимация, устройства ввода, загрузка моделей и физика —
//! внешние коллабораторы за узкими trait'ами.

use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

// Публичные модули
pub mod actor;
pub mod ai;
pub mod animation;
pub mod assets;
pub mod combat;
pub mod config;
pub mod events;
pub mod fsm;
pub mod health;
pub mod input;
pub mod logger;
pub mod movement;
pub mod registry;
pub mod scenario;
pub mod simulation;
pub mod time;

// Re-export основных типов
pub use actor::{ActorKind, SpawnError, ENEMY_TAG, PLAYER_TAG};
pub use ai::AiController;
pub use animation::{Animator, RenderProxy};
pub use assets::{AssetCache, AssetError, AssetLoader, InstantLoader, LoadState, ModelAsset, ModelHandle};
pub use combat::Attacker;
pub use config::{ActorConfig, ConfigError, SimConfig};
pub use events::{DamageInfo, EventBus, EventPayload, GameEvent, HandlerError, SubscriptionId, Topic};
pub use fsm::{StateId, StateMachine};
pub use health::{DamageOutcome, Health};
pub use input::{Action, InputSource, NoInput, PlayerInput, ScriptedInput};
pub use movement::{CircleCollisionOracle, Collider, ColliderKind, CollisionOracle, CollisionResponse, Movement, NoCollision};
pub use registry::{ComponentKind, EntityMeta, EntityRegistry, EntityTransform, RegistryError, SimComponent};
pub use simulation::{FrameServices, Simulation};
pub use time::FrameClock;

/// Любая ошибка, которую хост может получить от ядра
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Spawn(#[from] SpawnError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error(transparent)]
    Handler(#[from] HandlerError),
}

/// Детерминистичный RNG resource (seeded)
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

/// Headless симуляция с default конфигом (тесты, серверные прогоны)
pub fn create_headless_simulation(seed: u64) -> Simulation {
    logger::init_logger();
    Simulation::new(SimConfig::default(), seed)
}
