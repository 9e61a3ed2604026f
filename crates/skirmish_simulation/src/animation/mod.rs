//! Animation intent + render boundary
//!
//! Симуляция не проигрывает скелетную анимацию. `Animator` хранит только
//! запрошенный клип и таймер one-shot клипа; completion приходит из `tick`
//! ровно один раз (вместо host-timer callback'ов).

use bevy::prelude::*;
use std::collections::HashMap;

use crate::assets::ModelAsset;
use crate::config::AnimationConfig;
use crate::events::{EventBus, EventPayload, GameEvent, Topic};
use crate::fsm;
use crate::registry::{ComponentKind, EntityRegistry, EntityTransform, SimComponent};
use crate::time::OneShot;

#[derive(Debug, Clone, PartialEq)]
struct OneShotClip {
    name: String,
    timer: OneShot,
}

#[derive(Component, Debug, Clone)]
pub struct Animator {
    owner: Entity,
    looping: String,
    one_shot: Option<OneShotClip>,
    /// Длительности клипов из модели (секунды)
    durations: HashMap<String, f32>,
    fallback: AnimationConfig,
}

impl Default for Animator {
    fn default() -> Self {
        Self::new(AnimationConfig::default())
    }
}

impl Animator {
    pub fn new(fallback: AnimationConfig) -> Self {
        Self {
            owner: Entity::PLACEHOLDER,
            looping: "idle".to_string(),
            one_shot: None,
            durations: HashMap::new(),
            fallback,
        }
    }

    pub fn with_clip(mut self, name: impl Into<String>, duration: f32) -> Self {
        self.durations.insert(name.into(), duration);
        self
    }

    /// Взять длительности клипов из загруженной модели
    pub fn apply_model(&mut self, model: &ModelAsset) {
        for (name, duration) in &model.clips {
            self.durations.insert(name.clone(), *duration);
        }
    }

    /// Длительность клипа: модель → fallback конфиг → 0 (завершается на следующем tick)
    pub fn clip_duration(&self, name: &str) -> f32 {
        if let Some(duration) = self.durations.get(name) {
            return *duration;
        }
        match name {
            "attacking" => self.fallback.attack,
            "hit" => self.fallback.hit,
            "death" => self.fallback.death,
            _ => 0.0,
        }
    }

    /// Сменить looping клип (активный one-shot отменяется)
    pub fn play(&mut self, clip: &str) {
        self.looping = clip.to_string();
        self.one_shot = None;
    }

    /// Запустить one-shot клип (заменяет предыдущий one-shot без completion)
    pub fn play_one_shot(&mut self, clip: &str) {
        self.one_shot = Some(OneShotClip {
            name: clip.to_string(),
            timer: OneShot::new(self.clip_duration(clip)),
        });
    }

    /// Клип, который сейчас должен показывать render
    pub fn current_clip(&self) -> &str {
        self.one_shot.as_ref().map_or(self.looping.as_str(), |clip| clip.name.as_str())
    }

    pub fn is_playing_one_shot(&self) -> bool {
        self.one_shot.is_some()
    }

    /// Имя завершившегося one-shot клипа (ровно один раз)
    pub fn tick(&mut self, delta: f32) -> Option<String> {
        let finished = self.one_shot.as_mut().is_some_and(|clip| clip.timer.tick(delta));
        if finished {
            return self.one_shot.take().map(|clip| clip.name);
        }
        None
    }
}

impl SimComponent for Animator {
    const KIND: ComponentKind = ComponentKind::Animator;

    fn owner(&self) -> Entity {
        self.owner
    }

    fn on_add(&mut self, owner: Entity) {
        self.owner = owner;
    }

    fn on_remove(&mut self) {
        self.one_shot = None;
    }
}

/// Тик Animator: completion → текущее состояние FSM → `animation.complete`
pub fn update(registry: &mut EntityRegistry, bus: &EventBus, entity: Entity, delta: f32) {
    if !registry.is_enabled(entity, ComponentKind::Animator) {
        return;
    }
    let finished = match registry.get_mut::<Animator>(entity) {
        Some(mut animator) => animator.tick(delta),
        None => return,
    };

    if let Some(clip) = finished {
        fsm::animation_complete(registry, bus, entity, &clip);
        bus.publish(
            registry,
            GameEvent::new(Topic::ANIMATION_COMPLETE, EventPayload::AnimationComplete { entity, clip }),
        );
    }
}

/// Render boundary: хост получает transform и имя клипа каждый кадр
pub trait RenderProxy {
    fn present(&mut self, entity: Entity, transform: &EntityTransform, clip: &str);
}

/// Render proxy, который копит все вызовы present (headless/tests)
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    pub frames: Vec<(Entity, EntityTransform, String)>,
}

impl RenderProxy for RecordingRenderer {
    fn present(&mut self, entity: Entity, transform: &EntityTransform, clip: &str) {
        self.frames.push((entity, *transform, clip.to_string()));
    }
}
