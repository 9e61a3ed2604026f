//! Event bus: синхронный publish/subscribe между entity
//!
//! Один экземпляр на сессию, создаётся `Simulation` и передаётся в системы явно.
//! Dispatch:
//! - handlers вызываются в порядке регистрации, в текущем стеке вызовов
//! - итерация идёт по snapshot списка (handler может подписываться/публиковать)
//! - ошибка handler'а логируется и не мешает остальным, publisher её не видит

use bevy::prelude::*;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use thiserror::Error;

use crate::registry::{ComponentKind, EntityRegistry, RegistryError};

pub mod topics;

#[cfg(test)]
mod bus_tests;

pub use topics::{DamageInfo, EventPayload, GameEvent, Topic};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum HandlerError {
    #[error("handler failed: {0}")]
    Failed(String),
    #[error("entity {entity:?} has no {kind} component")]
    MissingComponent { entity: Entity, kind: ComponentKind },
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Handler получает registry и сам bus (для re-entrant publish)
pub type EventHandler = dyn Fn(&GameEvent, &mut EntityRegistry, &EventBus) -> Result<(), HandlerError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct BusState {
    handlers: HashMap<Topic, Vec<(SubscriptionId, Rc<EventHandler>)>>,
    next_id: u64,
    failures: u64,
}

/// Handle на общий bus; clone разделяет тот же реестр handlers
#[derive(Clone, Default)]
pub struct EventBus {
    state: Rc<RefCell<BusState>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("EventBus")
            .field("topics", &state.handlers.len())
            .field("failures", &state.failures)
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, topic: Topic, handler: F) -> SubscriptionId
    where
        F: Fn(&GameEvent, &mut EntityRegistry, &EventBus) -> Result<(), HandlerError> + 'static,
    {
        let mut state = self.state.borrow_mut();
        let id = SubscriptionId(state.next_id);
        state.next_id += 1;
        crate::logger::log(&format!("Registering handler {:?} for topic: {}", id, topic));
        state.handlers.entry(topic).or_default().push((id, Rc::new(handler)));
        id
    }

    /// true если подписка существовала
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut state = self.state.borrow_mut();
        let mut removed = false;
        for handlers in state.handlers.values_mut() {
            let before = handlers.len();
            handlers.retain(|(handler_id, _)| *handler_id != id);
            removed |= handlers.len() != before;
        }
        state.handlers.retain(|_, handlers| !handlers.is_empty());
        removed
    }

    pub fn handler_count(&self, topic: &Topic) -> usize {
        self.state.borrow().handlers.get(topic).map_or(0, Vec::len)
    }

    /// Сколько handler'ов вернули ошибку за всю сессию
    pub fn failure_count(&self) -> u64 {
        self.state.borrow().failures
    }

    /// Синхронный dispatch. Возвращает число вызванных handlers (0 = no-op).
    pub fn publish(&self, registry: &mut EntityRegistry, event: GameEvent) -> usize {
        let snapshot: Vec<(SubscriptionId, Rc<EventHandler>)> = match self.state.borrow().handlers.get(event.topic()) {
            Some(handlers) => handlers.clone(),
            None => return 0,
        };

        for (id, handler) in &snapshot {
            if let Err(error) = handler(&event, registry, self) {
                self.state.borrow_mut().failures += 1;
                crate::logger::log_error(&format!(
                    "Error in event handler {:?} for {}: {}",
                    id,
                    event.topic(),
                    error
                ));
            }
        }

        snapshot.len()
    }
}
