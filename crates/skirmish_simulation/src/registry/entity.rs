//! Базовые компоненты каждой entity: EntityMeta, EntityTransform

use bevy::prelude::*;
use std::collections::BTreeSet;

use super::ComponentKind;
use crate::assets::ModelHandle;

/// Метаданные entity (имя, теги, набор прикреплённых компонентов)
///
/// Спавнится вместе с entity и живёт до `destroy_entity`.
#[derive(Component, Debug, Clone)]
pub struct EntityMeta {
    pub name: String,
    tags: BTreeSet<String>,
    /// Какие SimComponent kinds прикреплены (порядок добавления)
    kinds: Vec<ComponentKind>,
    /// Прикреплённые, но выключенные kinds
    disabled: Vec<ComponentKind>,
    /// false пока модель грузится (update пропускает entity)
    pub active: bool,
    pub model: Option<ModelHandle>,
}

impl EntityMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags: BTreeSet::new(),
            kinds: Vec::new(),
            disabled: Vec::new(),
            active: true,
            model: None,
        }
    }

    pub fn add_tag(&mut self, tag: impl Into<String>) -> &mut Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn remove_tag(&mut self, tag: &str) -> &mut Self {
        self.tags.remove(tag);
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    pub fn has_kind(&self, kind: ComponentKind) -> bool {
        self.kinds.contains(&kind)
    }

    pub fn kinds(&self) -> &[ComponentKind] {
        &self.kinds
    }

    pub fn is_enabled(&self, kind: ComponentKind) -> bool {
        self.has_kind(kind) && !self.disabled.contains(&kind)
    }

    pub(crate) fn attach_kind(&mut self, kind: ComponentKind) {
        if !self.kinds.contains(&kind) {
            self.kinds.push(kind);
        }
    }

    pub(crate) fn detach_kind(&mut self, kind: ComponentKind) {
        self.kinds.retain(|k| *k != kind);
        self.disabled.retain(|k| *k != kind);
    }

    /// Возвращает true если флаг реально изменился
    pub(crate) fn set_kind_enabled(&mut self, kind: ComponentKind, enabled: bool) -> bool {
        let currently = !self.disabled.contains(&kind);
        if currently == enabled {
            return false;
        }
        if enabled {
            self.disabled.retain(|k| *k != kind);
        } else {
            self.disabled.push(kind);
        }
        true
    }
}

/// Transform entity (позиция, поворот вокруг Y, масштаб)
///
/// Пишет MovementSystem, читают render/animation коллабораторы.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct EntityTransform {
    pub translation: Vec3,
    /// Heading в радианах, всегда в [-π, π]
    pub yaw: f32,
    pub scale: Vec3,
}

impl Default for EntityTransform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            yaw: 0.0,
            scale: Vec3::ONE,
        }
    }
}

impl EntityTransform {
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }

    /// Направление взгляда в горизонтальной плоскости
    ///
    /// yaw = atan2(x, z), т.е. yaw 0 смотрит в +Z.
    pub fn forward(&self) -> Vec3 {
        Vec3::new(self.yaw.sin(), 0.0, self.yaw.cos())
    }

    pub fn rotation(&self) -> Quat {
        Quat::from_rotation_y(self.yaw)
    }

    /// Развернуться к точке (без сглаживания)
    pub fn look_at(&mut self, target: Vec3) {
        let to_target = target - self.translation;
        if to_target.x.abs() > f32::EPSILON || to_target.z.abs() > f32::EPSILON {
            self.yaw = to_target.x.atan2(to_target.z);
        }
    }

    pub fn horizontal_distance(&self, other: Vec3) -> f32 {
        let delta = other - self.translation;
        Vec3::new(delta.x, 0.0, delta.z).length()
    }
}
