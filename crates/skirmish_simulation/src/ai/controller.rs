//! AiController component + закон выбора состояния

use bevy::prelude::*;

use crate::config::ActorConfig;
use crate::fsm::StateId;
use crate::registry::{ComponentKind, SimComponent};

/// Perception state врага
///
/// `target` — weak ссылка (только lookup): цель может быть уничтожена в любой
/// момент, перед использованием проверяется через registry.
#[derive(Component, Debug, Clone)]
pub struct AiController {
    owner: Entity,
    /// Радиус обнаружения (метры)
    pub detection_range: f32,
    /// Дистанция, с которой запрашивается Attack (< detection_range)
    pub attack_range: f32,
    target: Option<Entity>,
    /// Копия позиции цели на момент последнего восприятия. Переживает потерю
    /// цели; только для запросов хоста, переходы FSM от неё не зависят.
    last_known_target_position: Option<Vec3>,
    /// Normalized горизонтальное направление на цель (для Chase)
    pub chase_direction: Vec3,
    /// Теги враждебных entity
    pub hostile_tags: Vec<String>,
}

impl Default for AiController {
    fn default() -> Self {
        Self::new(4.0, 1.0)
    }
}

impl AiController {
    pub fn new(detection_range: f32, attack_range: f32) -> Self {
        Self {
            owner: Entity::PLACEHOLDER,
            detection_range,
            attack_range,
            target: None,
            last_known_target_position: None,
            chase_direction: Vec3::ZERO,
            hostile_tags: Vec::new(),
        }
    }

    pub fn from_config(config: &ActorConfig, hostile_tag: &str) -> Self {
        Self::new(config.detection_range, config.ai_attack_range).with_hostile_tag(hostile_tag)
    }

    pub fn with_hostile_tag(mut self, tag: impl Into<String>) -> Self {
        self.hostile_tags.push(tag.into());
        self
    }

    pub fn target(&self) -> Option<Entity> {
        self.target
    }

    pub fn last_known_target_position(&self) -> Option<Vec3> {
        self.last_known_target_position
    }

    /// Обновить восприятие: цель и её позиция (или потеря цели)
    pub fn perceive(&mut self, own_position: Vec3, target: Option<(Entity, Vec3)>) {
        match target {
            Some((entity, position)) => {
                self.target = Some(entity);
                self.last_known_target_position = Some(position);
                let to_target = Vec3::new(position.x - own_position.x, 0.0, position.z - own_position.z);
                self.chase_direction = to_target.normalize_or_zero();
            }
            None => {
                // last_known остаётся: копия, а не ссылка
                self.target = None;
                self.chase_direction = Vec3::ZERO;
            }
        }
    }

    pub fn decide(&self, distance: Option<f32>, current: Option<StateId>) -> Option<StateId> {
        decide(distance, current, self.detection_range, self.attack_range)
    }
}

impl SimComponent for AiController {
    const KIND: ComponentKind = ComponentKind::Ai;

    fn requires() -> &'static [ComponentKind] {
        &[ComponentKind::StateMachine]
    }

    fn owner(&self) -> Entity {
        self.owner
    }

    fn on_add(&mut self, owner: Entity) {
        self.owner = owner;
    }

    fn on_disable(&mut self) {
        self.target = None;
        self.chase_direction = Vec3::ZERO;
    }
}

/// Закон перехода AI
///
/// - нет цели → Idle
/// - d ≤ attack_range → Attack (проверяется первым: ближний порог выигрывает)
/// - d ≤ detection_range → Chase (если уже не Chase)
/// - d > detection_range → Idle
///
/// В Attack/Hit/Death запросов нет: эти состояния завершаются сами.
pub fn decide(distance: Option<f32>, current: Option<StateId>, detection_range: f32, attack_range: f32) -> Option<StateId> {
    if current.is_some_and(|state| state.is_locked()) {
        return None;
    }

    let Some(distance) = distance else {
        return Some(StateId::Idle);
    };

    if distance <= attack_range {
        Some(StateId::Attack)
    } else if distance <= detection_range {
        (current != Some(StateId::Chase)).then_some(StateId::Chase)
    } else {
        Some(StateId::Idle)
    }
}
