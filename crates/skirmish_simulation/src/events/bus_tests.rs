//! Tests for the synchronous event bus.

#[cfg(test)]
mod tests {
    use super::super::{EventBus, EventPayload, GameEvent, HandlerError, Topic};
    use crate::registry::{EntityRegistry, EntityTransform};
    use bevy::prelude::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn setup() -> (EntityRegistry, EventBus, Entity) {
        let mut registry = EntityRegistry::new();
        let entity = registry.create_entity("Dummy", EntityTransform::default());
        (registry, EventBus::new(), entity)
    }

    fn ping(entity: Entity) -> GameEvent {
        GameEvent::new(Topic::new("test.ping"), EventPayload::Destroyed { entity })
    }

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let (mut registry, bus, entity) = setup();

        let invoked = bus.publish(
            &mut registry,
            GameEvent::new(Topic::DAMAGE_TAKEN, EventPayload::Destroyed { entity }),
        );

        assert_eq!(invoked, 0);
        assert_eq!(bus.failure_count(), 0);
    }

    #[test]
    fn test_handlers_run_in_registration_order() {
        let (mut registry, bus, entity) = setup();
        let order = Rc::new(RefCell::new(Vec::new()));

        for label in ["first", "second", "third"] {
            let order = order.clone();
            bus.subscribe(Topic::new("test.ping"), move |_, _, _| {
                order.borrow_mut().push(label);
                Ok(())
            });
        }

        assert_eq!(bus.publish(&mut registry, ping(entity)), 3);
        assert_eq!(*order.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_failing_handler_is_isolated() {
        let (mut registry, bus, entity) = setup();
        let reached = Rc::new(RefCell::new(false));

        bus.subscribe(Topic::new("test.ping"), |_, _, _| Err(HandlerError::Failed("boom".to_string())));
        let flag = reached.clone();
        bus.subscribe(Topic::new("test.ping"), move |_, _, _| {
            *flag.borrow_mut() = true;
            Ok(())
        });

        let invoked = bus.publish(&mut registry, ping(entity));

        assert_eq!(invoked, 2);
        assert!(*reached.borrow(), "второй handler должен отработать");
        assert_eq!(bus.failure_count(), 1);
    }

    #[test]
    fn test_subscribe_during_dispatch_uses_snapshot() {
        let (mut registry, bus, entity) = setup();
        let late_calls = Rc::new(RefCell::new(0));

        let counter = late_calls.clone();
        bus.subscribe(Topic::new("test.ping"), move |_, _, bus| {
            let counter = counter.clone();
            bus.subscribe(Topic::new("test.ping"), move |_, _, _| {
                *counter.borrow_mut() += 1;
                Ok(())
            });
            Ok(())
        });

        // Первый publish: новый handler не вызывается (snapshot)
        assert_eq!(bus.publish(&mut registry, ping(entity)), 1);
        assert_eq!(*late_calls.borrow(), 0);
        assert_eq!(bus.handler_count(&Topic::new("test.ping")), 2);

        // Второй publish: видит handler из первого
        assert_eq!(bus.publish(&mut registry, ping(entity)), 2);
        assert_eq!(*late_calls.borrow(), 1);
    }

    #[test]
    fn test_reentrant_publish() {
        let (mut registry, bus, entity) = setup();
        let received = Rc::new(RefCell::new(Vec::new()));

        bus.subscribe(Topic::new("test.ping"), |event, registry, bus| {
            bus.publish(registry, GameEvent::new(Topic::new("test.pong"), event.payload().clone()));
            Ok(())
        });
        let log = received.clone();
        bus.subscribe(Topic::new("test.pong"), move |event, _, _| {
            log.borrow_mut().push(event.entity());
            Ok(())
        });

        bus.publish(&mut registry, ping(entity));

        assert_eq!(*received.borrow(), vec![entity]);
    }

    #[test]
    fn test_handler_can_mutate_registry() {
        let (mut registry, bus, entity) = setup();

        bus.subscribe(Topic::new("test.ping"), |event, registry, _| {
            let mut meta = registry
                .meta_mut(event.entity())
                .ok_or_else(|| HandlerError::Failed("no meta".to_string()))?;
            meta.add_tag("pinged");
            Ok(())
        });

        bus.publish(&mut registry, ping(entity));

        assert!(registry.meta(entity).unwrap().has_tag("pinged"));
    }

    #[test]
    fn test_unsubscribe() {
        let (mut registry, bus, entity) = setup();
        let id = bus.subscribe(Topic::new("test.ping"), |_, _, _| Ok(()));

        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        assert_eq!(bus.handler_count(&Topic::new("test.ping")), 0);
        assert_eq!(bus.publish(&mut registry, ping(entity)), 0);
    }

    #[test]
    fn test_cloned_handle_shares_handlers() {
        let (mut registry, bus, entity) = setup();
        let handle = bus.clone();
        handle.subscribe(Topic::new("test.ping"), |_, _, _| Ok(()));

        assert_eq!(bus.publish(&mut registry, ping(entity)), 1);
    }

    #[test]
    fn test_topic_hierarchy() {
        assert!(Topic::DAMAGE_TAKEN.is_within("damage"));
        assert!(Topic::DAMAGE_TAKEN.is_within("damage.taken"));
        assert!(!Topic::DAMAGE_TAKEN.is_within("dam"));
        assert!(!Topic::COLLISION.is_within("collision.solid"));

        let segments: Vec<&str> = Topic::DEATH_ANIMATION_COMPLETE.segments().collect();
        assert_eq!(segments, vec!["entity", "death_animation_complete"]);

        // Borrowed и Owned варианты — один и тот же topic
        assert_eq!(Topic::new(String::from("health.zero")), Topic::HEALTH_ZERO);
    }
}
