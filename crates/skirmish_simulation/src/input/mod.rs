//! Input boundary: host input → per-frame intents игрока
//!
//! Симуляция не опрашивает устройства. Хост передаёт `InputSource` в
//! `FrameServices`, Input phase семплирует его в компонент `PlayerInput`.

use bevy::prelude::*;
use std::collections::HashSet;

use crate::registry::{ComponentKind, EntityRegistry, SimComponent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    MoveForward,
    MoveBackward,
    MoveLeft,
    MoveRight,
    Attack,
}

pub trait InputSource {
    fn is_action_pressed(&self, action: Action) -> bool;

    /// Unit vector в горизонтальной плоскости (forward = -Z, right = +X) или ZERO
    fn move_direction(&self) -> Vec3 {
        let mut direction = Vec3::ZERO;
        if self.is_action_pressed(Action::MoveForward) {
            direction.z -= 1.0;
        }
        if self.is_action_pressed(Action::MoveBackward) {
            direction.z += 1.0;
        }
        if self.is_action_pressed(Action::MoveLeft) {
            direction.x -= 1.0;
        }
        if self.is_action_pressed(Action::MoveRight) {
            direction.x += 1.0;
        }
        direction.normalize_or_zero()
    }
}

/// Источник без нажатий (для врагов-only сцен и тестов)
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInput;

impl InputSource for NoInput {
    fn is_action_pressed(&self, _action: Action) -> bool {
        false
    }
}

/// Скриптованный input для headless хостов и тестов
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    pressed: HashSet<Action>,
}

impl ScriptedInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, action: Action) -> Self {
        self.pressed.insert(action);
        self
    }

    pub fn press(&mut self, action: Action) {
        self.pressed.insert(action);
    }

    pub fn release(&mut self, action: Action) {
        self.pressed.remove(&action);
    }

    pub fn release_all(&mut self) {
        self.pressed.clear();
    }
}

impl InputSource for ScriptedInput {
    fn is_action_pressed(&self, action: Action) -> bool {
        self.pressed.contains(&action)
    }
}

/// Intents игрока за текущий кадр
#[derive(Component, Debug, Clone, Default)]
pub struct PlayerInput {
    owner: Option<Entity>,
    pub move_direction: Vec3,
    pub attack_pressed: bool,
}

impl PlayerInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample(&mut self, source: &dyn InputSource) {
        self.move_direction = source.move_direction();
        self.attack_pressed = source.is_action_pressed(Action::Attack);
    }

    pub fn clear(&mut self) {
        self.move_direction = Vec3::ZERO;
        self.attack_pressed = false;
    }
}

impl SimComponent for PlayerInput {
    const KIND: ComponentKind = ComponentKind::Input;

    fn requires() -> &'static [ComponentKind] {
        &[ComponentKind::StateMachine]
    }

    fn owner(&self) -> Entity {
        self.owner.unwrap_or(Entity::PLACEHOLDER)
    }

    fn on_add(&mut self, owner: Entity) {
        self.owner = Some(owner);
    }

    fn on_disable(&mut self) {
        self.clear();
    }
}

/// Input phase для одной entity
pub fn update(registry: &mut EntityRegistry, entity: Entity, source: &dyn InputSource) {
    if let Some(mut input) = registry.get_mut::<PlayerInput>(entity) {
        input.sample(source);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_direction_is_normalized() {
        let input = ScriptedInput::new().with(Action::MoveForward).with(Action::MoveRight);
        let direction = input.move_direction();

        assert!((direction.length() - 1.0).abs() < 1e-5);
        assert!(direction.x > 0.0);
        assert!(direction.z < 0.0);
        assert_eq!(direction.y, 0.0);
    }

    #[test]
    fn test_opposite_keys_cancel_out() {
        let input = ScriptedInput::new().with(Action::MoveLeft).with(Action::MoveRight);
        assert_eq!(input.move_direction(), Vec3::ZERO);
    }

    #[test]
    fn test_sample_and_release() {
        let mut source = ScriptedInput::new().with(Action::Attack).with(Action::MoveBackward);
        let mut input = PlayerInput::new();

        input.sample(&source);
        assert!(input.attack_pressed);
        assert_eq!(input.move_direction, Vec3::Z);

        source.release_all();
        input.sample(&source);
        assert!(!input.attack_pressed);
        assert_eq!(input.move_direction, Vec3::ZERO);
    }
}
