//! Entity registry поверх bevy `World`
//!
//! Каждый компонент симуляции имеет статический `ComponentKind`, поэтому lookup
//! проверяется компилятором (`get::<Health>`), а не строкой с именем класса.
//!
//! Инварианты:
//! - на entity максимум один экземпляр каждого kind
//! - компонент не переживает свою entity
//! - `add_component` отклоняет компонент, если его required siblings ещё не добавлены

use bevy::ecs::component::Mutable;
use bevy::prelude::*;
use thiserror::Error;

pub mod entity;


pub use entity::{EntityMeta, EntityTransform};

/// Статический идентификатор вида компонента
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ComponentKind {
    Input,
    Ai,
    StateMachine,
    Animator,
    Combat,
    Movement,
    Health,
    Collider,
}

impl ComponentKind {
    pub fn name(&self) -> &'static str {
        match self {
            ComponentKind::Input => "Input",
            ComponentKind::Ai => "AI",
            ComponentKind::StateMachine => "StateMachine",
            ComponentKind::Animator => "Animator",
            ComponentKind::Combat => "Combat",
            ComponentKind::Movement => "Movement",
            ComponentKind::Health => "Health",
            ComponentKind::Collider => "Collider",
        }
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Порядок фаз `update`: intents от Input/AI видны StateMachine в том же кадре
pub const UPDATE_ORDER: [ComponentKind; 6] = [
    ComponentKind::Input,
    ComponentKind::Ai,
    ComponentKind::StateMachine,
    ComponentKind::Combat,
    ComponentKind::Movement,
    ComponentKind::Health,
];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("entity {0:?} not found")]
    EntityNotFound(Entity),
    #[error("component {component} requires {missing} on entity {entity:?}")]
    MissingDependency {
        entity: Entity,
        component: ComponentKind,
        missing: ComponentKind,
    },
    #[error("entity {entity:?} already has a {kind} component")]
    DuplicateComponent { entity: Entity, kind: ComponentKind },
    #[error("entity {entity:?} has no {kind} component")]
    ComponentNotFound { entity: Entity, kind: ComponentKind },
}

/// Компонент симуляции с lifecycle hooks
///
/// Back-reference на владельца — только `Entity` id (non-owning).
pub trait SimComponent: Component<Mutability = Mutable> + Sized {
    const KIND: ComponentKind;

    /// Kinds, которые должны быть на entity ДО добавления этого компонента
    fn requires() -> &'static [ComponentKind] {
        &[]
    }

    fn owner(&self) -> Entity;

    fn on_add(&mut self, owner: Entity);

    fn on_remove(&mut self) {}

    fn on_enable(&mut self) {}

    fn on_disable(&mut self) {}
}

/// Владеет всеми entity, их компонентами и simulation resources
pub struct EntityRegistry {
    world: World,
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self { world: World::new() }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Создать пустую entity (только meta + transform)
    pub fn create_entity(&mut self, name: impl Into<String>, transform: EntityTransform) -> Entity {
        let meta = EntityMeta::new(name);
        let entity = self.world.spawn((meta, transform)).id();
        crate::logger::log(&format!("Entity {:?} created", entity));
        entity
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.world.get::<EntityMeta>(entity).is_some()
    }

    pub fn meta(&self, entity: Entity) -> Option<&EntityMeta> {
        self.world.get::<EntityMeta>(entity)
    }

    pub fn meta_mut(&mut self, entity: Entity) -> Option<Mut<'_, EntityMeta>> {
        self.world.get_mut::<EntityMeta>(entity)
    }

    pub fn transform(&self, entity: Entity) -> Option<&EntityTransform> {
        self.world.get::<EntityTransform>(entity)
    }

    pub fn transform_mut(&mut self, entity: Entity) -> Option<Mut<'_, EntityTransform>> {
        self.world.get_mut::<EntityTransform>(entity)
    }

    pub fn position(&self, entity: Entity) -> Option<Vec3> {
        self.transform(entity).map(|t| t.translation)
    }

    pub fn is_active(&self, entity: Entity) -> bool {
        self.meta(entity).is_some_and(|meta| meta.active)
    }

    pub fn has_kind(&self, entity: Entity, kind: ComponentKind) -> bool {
        self.meta(entity).is_some_and(|meta| meta.has_kind(kind))
    }

    pub fn is_enabled(&self, entity: Entity, kind: ComponentKind) -> bool {
        self.meta(entity).is_some_and(|meta| meta.is_enabled(kind))
    }

    /// Добавить компонент: dependency check → on_add → insert
    pub fn add_component<C: SimComponent>(&mut self, entity: Entity, mut component: C) -> Result<(), RegistryError> {
        let meta = self.meta(entity).ok_or(RegistryError::EntityNotFound(entity))?;

        if meta.has_kind(C::KIND) {
            return Err(RegistryError::DuplicateComponent { entity, kind: C::KIND });
        }

        if let Some(missing) = C::requires().iter().find(|kind| !meta.has_kind(**kind)) {
            crate::logger::log_error(&format!(
                "Component {} requires {} (entity {:?})",
                C::KIND,
                missing,
                entity
            ));
            return Err(RegistryError::MissingDependency {
                entity,
                component: C::KIND,
                missing: *missing,
            });
        }

        component.on_add(entity);
        self.world.entity_mut(entity).insert(component);
        if let Some(mut meta) = self.meta_mut(entity) {
            meta.attach_kind(C::KIND);
        }
        Ok(())
    }

    /// Never fails: отсутствующая entity или компонент → None
    pub fn get<C: SimComponent>(&self, entity: Entity) -> Option<&C> {
        self.world.get::<C>(entity)
    }

    pub fn get_mut<C: SimComponent>(&mut self, entity: Entity) -> Option<Mut<'_, C>> {
        self.world.get_mut::<C>(entity)
    }

    pub fn has<C: SimComponent>(&self, entity: Entity) -> bool {
        self.get::<C>(entity).is_some()
    }

    /// Удалить компонент: on_remove вызывается ДО detach
    pub fn remove_component<C: SimComponent>(&mut self, entity: Entity) -> Result<C, RegistryError> {
        let dependents: Vec<ComponentKind> = self
            .meta(entity)
            .ok_or(RegistryError::EntityNotFound(entity))?
            .kinds()
            .to_vec();

        {
            let mut component = self
                .get_mut::<C>(entity)
                .ok_or(RegistryError::ComponentNotFound { entity, kind: C::KIND })?;
            component.on_remove();
        }

        if dependents.iter().any(|kind| required_by(*kind).contains(&C::KIND)) {
            crate::logger::log_warning(&format!(
                "Removing {} from {:?} while other components still depend on it",
                C::KIND,
                entity
            ));
        }

        let component = self
            .world
            .entity_mut(entity)
            .take::<C>()
            .ok_or(RegistryError::ComponentNotFound { entity, kind: C::KIND })?;
        if let Some(mut meta) = self.meta_mut(entity) {
            meta.detach_kind(C::KIND);
        }
        Ok(component)
    }

    /// Включить/выключить компонент; hooks только при реальном изменении
    pub fn set_enabled<C: SimComponent>(&mut self, entity: Entity, enabled: bool) -> Result<bool, RegistryError> {
        if !self.has::<C>(entity) {
            return Err(RegistryError::ComponentNotFound { entity, kind: C::KIND });
        }

        let changed = match self.meta_mut(entity) {
            Some(mut meta) => meta.set_kind_enabled(C::KIND, enabled),
            None => return Err(RegistryError::EntityNotFound(entity)),
        };

        if changed {
            if let Some(mut component) = self.get_mut::<C>(entity) {
                if enabled {
                    component.on_enable();
                } else {
                    component.on_disable();
                }
            }
        }
        Ok(changed)
    }

    /// Активные entity с включённым kind, отсортированные по index (детерминизм)
    pub fn entities_for_phase(&mut self, kind: ComponentKind) -> Vec<Entity> {
        let mut query = self.world.query::<(Entity, &EntityMeta)>();
        let mut entities: Vec<Entity> = query
            .iter(&self.world)
            .filter(|(_, meta)| meta.active && meta.is_enabled(kind))
            .map(|(entity, _)| entity)
            .collect();
        entities.sort_by_key(|entity| entity.index());
        entities
    }

    /// Все живые entity (по index)
    pub fn entities(&mut self) -> Vec<Entity> {
        let mut query = self.world.query::<(Entity, &EntityMeta)>();
        let mut entities: Vec<Entity> = query.iter(&self.world).map(|(entity, _)| entity).collect();
        entities.sort_by_key(|entity| entity.index());
        entities
    }

    /// Активные entity с любым из тегов (кандидаты для AI/hit-теста)
    pub fn tagged(&mut self, tags: &[String]) -> Vec<(Entity, Vec3)> {
        let mut query = self.world.query::<(Entity, &EntityMeta, &EntityTransform)>();
        let mut found: Vec<(Entity, Vec3)> = query
            .iter(&self.world)
            .filter(|(_, meta, _)| meta.active && tags.iter().any(|tag| meta.has_tag(tag)))
            .map(|(entity, _, transform)| (entity, transform.translation))
            .collect();
        found.sort_by_key(|(entity, _)| entity.index());
        found
    }

    /// Все коллайдеры (по index); read-only, поэтому через `try_query`
    pub fn colliders(&self) -> Vec<(Entity, Vec3, crate::movement::Collider)> {
        let Some(mut query) = self
            .world
            .try_query::<(Entity, &EntityTransform, &crate::movement::Collider)>()
        else {
            return Vec::new();
        };
        let mut found: Vec<(Entity, Vec3, crate::movement::Collider)> = query
            .iter(&self.world)
            .map(|(entity, transform, collider)| (entity, transform.translation, *collider))
            .collect();
        found.sort_by_key(|(entity, _, _)| entity.index());
        found
    }

    /// Despawn entity целиком. Вызывающий отвечает за on_remove hooks.
    pub(crate) fn despawn(&mut self, entity: Entity) -> bool {
        if !self.contains(entity) {
            return false;
        }
        let _ = self.world.despawn(entity);
        true
    }

    /// Вызвать on_remove конкретного kind (используется при destroy)
    pub(crate) fn run_remove_hook<C: SimComponent>(&mut self, entity: Entity) {
        if let Some(mut component) = self.get_mut::<C>(entity) {
            component.on_remove();
        }
    }
}

/// Какие kinds требует компонент данного kind (зеркало `SimComponent::requires`)
pub fn required_by(kind: ComponentKind) -> &'static [ComponentKind] {
    match kind {
        ComponentKind::Input => crate::input::PlayerInput::requires(),
        ComponentKind::Ai => crate::ai::AiController::requires(),
        ComponentKind::StateMachine => crate::fsm::StateMachine::requires(),
        ComponentKind::Animator => crate::animation::Animator::requires(),
        ComponentKind::Combat => crate::combat::Attacker::requires(),
        ComponentKind::Movement => crate::movement::Movement::requires(),
        ComponentKind::Health => crate::health::Health::requires(),
        ComponentKind::Collider => crate::movement::Collider::requires(),
    }
}
