//! Per-entity state machine (Idle/Walk/Chase/Attack/Hit/Death)
//!
//! Состояния — закрытый набор `StateId`, поведение каждого — unit struct с
//! `StateBehavior` (см. `states.rs`). Компонент `StateMachine` хранит только
//! данные; поведение получает `StateContext` с registry и bus.
//!
//! Transition (атомарный):
//! canExit(current) && canEnter(next) → exit → previous = current → current = next → enter → `state.changed`
//!
//! Death терминальна: canExit всегда false.

use bevy::prelude::*;

use crate::events::{EventBus, EventPayload, GameEvent, HandlerError, Topic};
use crate::registry::{ComponentKind, EntityRegistry, SimComponent};
use crate::time::OneShot;

pub mod states;


pub use states::{StateBehavior, StateContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StateId {
    Idle,
    Walk,
    Chase,
    Attack,
    Hit,
    Death,
}

impl StateId {
    pub const ALL: [StateId; 6] = [
        StateId::Idle,
        StateId::Walk,
        StateId::Chase,
        StateId::Attack,
        StateId::Hit,
        StateId::Death,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StateId::Idle => "idle",
            StateId::Walk => "walk",
            StateId::Chase => "chase",
            StateId::Attack => "attack",
            StateId::Hit => "hit",
            StateId::Death => "death",
        }
    }

    pub fn from_name(name: &str) -> Option<StateId> {
        Self::ALL.into_iter().find(|state| state.name() == name)
    }

    /// Looping/one-shot клип, который состояние запрашивает у Animator
    pub fn clip(&self) -> &'static str {
        match self {
            StateId::Idle => "idle",
            StateId::Walk | StateId::Chase => "walking",
            StateId::Attack => "attacking",
            StateId::Hit => "hit",
            StateId::Death => "death",
        }
    }

    /// Состояния, в которых AI и input не запрашивают переходы
    pub fn is_locked(&self) -> bool {
        matches!(self, StateId::Attack | StateId::Hit | StateId::Death)
    }
}

impl std::fmt::Display for StateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Набор состояний игрока
pub const PLAYER_STATES: [StateId; 5] = [StateId::Idle, StateId::Walk, StateId::Attack, StateId::Hit, StateId::Death];

/// Набор состояний врага (Chase вместо Walk)
pub const ENEMY_STATES: [StateId; 5] = [StateId::Idle, StateId::Chase, StateId::Attack, StateId::Hit, StateId::Death];

/// Данные FSM одной entity
#[derive(Component, Debug, Clone)]
pub struct StateMachine {
    owner: Entity,
    registered: Vec<StateId>,
    current: Option<StateId>,
    previous: Option<StateId>,
    time_in_state: f32,
    /// Длительность stagger'а (Hit)
    pub hit_duration: f32,
    pub(crate) hit_timer: Option<OneShot>,
    /// true пока идёт exit → enter
    transitioning: bool,
    /// Запрос, пришедший во время exit/enter (из handler'а); применяется сразу
    /// после текущего перехода. Death не вытесняется другими запросами.
    pending: Option<StateId>,
}

impl StateMachine {
    pub fn new(states: &[StateId], hit_duration: f32) -> Self {
        let mut registered = Vec::with_capacity(states.len());
        for state in states {
            if !registered.contains(state) {
                registered.push(*state);
            }
        }
        Self {
            owner: Entity::PLACEHOLDER,
            registered,
            current: None,
            previous: None,
            time_in_state: 0.0,
            hit_duration,
            hit_timer: None,
            transitioning: false,
            pending: None,
        }
    }

    pub fn player(hit_duration: f32) -> Self {
        Self::new(&PLAYER_STATES, hit_duration)
    }

    pub fn enemy(hit_duration: f32) -> Self {
        Self::new(&ENEMY_STATES, hit_duration)
    }

    pub fn current(&self) -> Option<StateId> {
        self.current
    }

    pub fn previous(&self) -> Option<StateId> {
        self.previous
    }

    pub fn time_in_state(&self) -> f32 {
        self.time_in_state
    }

    pub fn is_registered(&self, state: StateId) -> bool {
        self.registered.contains(&state)
    }

    pub fn registered(&self) -> &[StateId] {
        &self.registered
    }

    pub fn is_in(&self, state: StateId) -> bool {
        self.current == Some(state)
    }

    /// Отложенный запрос (есть только во время перехода)
    pub fn pending(&self) -> Option<StateId> {
        self.pending
    }

    fn defer(&mut self, next: StateId) {
        if self.pending != Some(StateId::Death) {
            self.pending = Some(next);
        }
    }
}

impl SimComponent for StateMachine {
    const KIND: ComponentKind = ComponentKind::StateMachine;

    fn owner(&self) -> Entity {
        self.owner
    }

    fn on_add(&mut self, owner: Entity) {
        self.owner = owner;
    }

    fn on_remove(&mut self) {
        self.current = None;
        self.hit_timer = None;
        self.pending = None;
    }
}

/// Текущее состояние entity (None если нет FSM или она не запущена)
pub fn current_state(registry: &EntityRegistry, entity: Entity) -> Option<StateId> {
    registry.get::<StateMachine>(entity).and_then(StateMachine::current)
}

/// Запросить переход. Возвращает true если переход состоялся.
///
/// No-op (false): нет FSM, состояние уже текущее, не зарегистрировано (warning),
/// отклонено canExit/canEnter.
///
/// Запрос во время другого перехода (handler события из exit/enter) откладывается
/// и применяется после него; сам вызов возвращает false.
pub fn set_state(registry: &mut EntityRegistry, bus: &EventBus, entity: Entity, next: StateId) -> bool {
    let (current, registered, transitioning) = match registry.get::<StateMachine>(entity) {
        Some(machine) => (machine.current, machine.is_registered(next), machine.transitioning),
        None => return false,
    };

    if !registered {
        crate::logger::log_warning(&format!("State '{}' not registered for {:?}", next, entity));
        return false;
    }
    if transitioning {
        if let Some(mut machine) = registry.get_mut::<StateMachine>(entity) {
            machine.defer(next);
        }
        return false;
    }
    if current == Some(next) {
        return false;
    }

    let mut ctx = StateContext {
        entity,
        registry: &mut *registry,
        bus,
    };

    if let Some(from) = current {
        if !states::behavior(from).can_exit(&ctx) {
            return false;
        }
    }
    if !states::behavior(next).can_enter(&ctx) {
        return false;
    }

    if let Some(mut machine) = ctx.registry.get_mut::<StateMachine>(entity) {
        machine.transitioning = true;
    }

    if let Some(from) = current {
        states::behavior(from).exit(&mut ctx);
    }

    // exit мог уничтожить entity (handler на событие) — тогда переход теряет смысл
    match ctx.registry.get_mut::<StateMachine>(entity) {
        Some(mut machine) => {
            machine.previous = current;
            machine.current = Some(next);
            machine.time_in_state = 0.0;
        }
        None => return false,
    }

    states::behavior(next).enter(&mut ctx);

    let pending = match ctx.registry.get_mut::<StateMachine>(entity) {
        Some(mut machine) => {
            machine.transitioning = false;
            machine.pending.take()
        }
        None => None,
    };

    crate::logger::log(&format!(
        "{:?}: {} → {}",
        entity,
        current.map_or("none", |state| state.name()),
        next
    ));
    bus.publish(registry, GameEvent::state_changed(entity, current, next));

    if let Some(deferred) = pending {
        set_state(registry, bus, entity, deferred);
    }
    true
}

/// То же по имени; неизвестное имя → warning, no-op
pub fn set_state_by_name(registry: &mut EntityRegistry, bus: &EventBus, entity: Entity, name: &str) -> bool {
    match StateId::from_name(name) {
        Some(state) => set_state(registry, bus, entity, state),
        None => {
            crate::logger::log_warning(&format!("State '{}' not found", name));
            false
        }
    }
}

/// Запустить FSM в начальном состоянии (обычно Idle)
pub fn start(registry: &mut EntityRegistry, bus: &EventBus, entity: Entity, initial: StateId) -> bool {
    set_state(registry, bus, entity, initial)
}

/// Per-frame update: делегирует только текущему состоянию
pub fn update(registry: &mut EntityRegistry, bus: &EventBus, entity: Entity, delta: f32) {
    let current = match registry.get_mut::<StateMachine>(entity) {
        Some(mut machine) => {
            machine.time_in_state += delta;
            machine.current
        }
        None => return,
    };

    if let Some(state) = current {
        let mut ctx = StateContext { entity, registry, bus };
        states::behavior(state).update(&mut ctx, delta);
    }
}

/// Доставить завершение one-shot клипа текущему состоянию
pub fn animation_complete(registry: &mut EntityRegistry, bus: &EventBus, entity: Entity, clip: &str) {
    if let Some(state) = current_state(registry, entity) {
        let mut ctx = StateContext { entity, registry, bus };
        states::behavior(state).on_animation_complete(&mut ctx, clip);
    }
}

/// Подписки FSM: health.damaged → Hit, health.zero → Death
pub fn subscribe_handlers(bus: &EventBus) {
    bus.subscribe(Topic::HEALTH_DAMAGED, |event, registry, bus| {
        if let EventPayload::Damaged { entity, .. } = event.payload() {
            if registry.has::<StateMachine>(*entity) {
                set_state(registry, bus, *entity, StateId::Hit);
            }
        }
        Ok(())
    });

    bus.subscribe(Topic::HEALTH_ZERO, |event, registry, bus| {
        let EventPayload::HealthZero { entity, .. } = event.payload() else {
            return Ok(());
        };
        if !registry.has::<StateMachine>(*entity) {
            return Err(HandlerError::MissingComponent {
                entity: *entity,
                kind: ComponentKind::StateMachine,
            });
        }
        set_state(registry, bus, *entity, StateId::Death);
        Ok(())
    });
}
