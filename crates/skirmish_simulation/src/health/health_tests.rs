//! Tests for health, invulnerability and the zero signal.

#[cfg(test)]
mod tests {
    use super::super::{apply_damage, apply_heal, subscribe_handlers, update, DamageOutcome, Health};
    use crate::events::{DamageInfo, EventBus, EventPayload, GameEvent, Topic};
    use crate::registry::{EntityRegistry, EntityTransform};
    use bevy::prelude::*;
    use proptest::prelude::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn record(bus: &EventBus, topic: Topic) -> Rc<RefCell<Vec<GameEvent>>> {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        bus.subscribe(topic, move |event, _, _| {
            sink.borrow_mut().push(event.clone());
            Ok(())
        });
        events
    }

    fn hit(target: Entity, amount: u32) -> DamageInfo {
        DamageInfo {
            target,
            source: None,
            amount,
            direction: Vec3::ZERO,
            knockback: 0.0,
        }
    }

    fn setup(max: u32, invulnerability: f32) -> (EntityRegistry, EventBus, Entity) {
        let mut registry = EntityRegistry::new();
        let entity = registry.create_entity("Target", EntityTransform::default());
        registry.add_component(entity, Health::new(max, invulnerability)).unwrap();
        (registry, EventBus::new(), entity)
    }

    #[test]
    fn test_damage_reduces_health() {
        let mut health = Health::new(100, 0.0);

        assert_eq!(health.take_damage(30, None), DamageOutcome::Damaged { remaining: 70 });
        assert_eq!(health.current(), 70);
        assert!((health.percentage() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_invulnerability_window_blocks_damage() {
        let mut health = Health::new(100, 0.5);

        health.take_damage(30, None);
        assert!(health.is_invulnerable());
        assert_eq!(health.take_damage(30, None), DamageOutcome::Ignored);
        assert_eq!(health.current(), 70);

        health.tick(0.6);
        assert!(!health.is_invulnerable());
        health.take_damage(30, None);
        assert_eq!(health.current(), 40);
    }

    #[test]
    fn test_overkill_clamps_to_zero() {
        let mut health = Health::new(10, 0.0);

        assert_eq!(health.take_damage(15, None), DamageOutcome::Killed);
        assert_eq!(health.current(), 0);
        assert!(!health.is_alive());
        // Мёртвого больше не бьём
        assert_eq!(health.take_damage(15, None), DamageOutcome::Ignored);
    }

    #[test]
    fn test_heal_clamps_and_skips_dead() {
        let mut health = Health::new(100, 0.0);
        health.take_damage(40, None);

        assert_eq!(health.heal(25), 25);
        assert_eq!(health.heal(1000), 15);
        assert_eq!(health.current(), 100);

        health.take_damage(100, None);
        assert_eq!(health.heal(50), 0);
        assert_eq!(health.current(), 0);
    }

    #[test]
    fn test_last_source_is_remembered() {
        let mut registry = EntityRegistry::new();
        let attacker = registry.create_entity("Attacker", EntityTransform::default());
        let mut health = Health::new(100, 0.0);

        health.take_damage(10, Some(attacker));
        health.take_damage(10, None);

        assert_eq!(health.last_source(), Some(attacker));
    }

    #[test]
    fn test_apply_damage_publishes_damaged() {
        let (mut registry, bus, entity) = setup(100, 0.5);
        let damaged = record(&bus, Topic::HEALTH_DAMAGED);
        let zero = record(&bus, Topic::HEALTH_ZERO);

        let outcome = apply_damage(&mut registry, &bus, hit(entity, 30)).unwrap();

        assert_eq!(outcome, DamageOutcome::Damaged { remaining: 70 });
        assert_eq!(damaged.borrow().len(), 1);
        assert!(matches!(
            damaged.borrow()[0].payload(),
            EventPayload::Damaged { amount: 30, remaining: 70, .. }
        ));
        assert!(zero.borrow().is_empty());
    }

    #[test]
    fn test_health_zero_fires_exactly_once() {
        let (mut registry, bus, entity) = setup(10, 0.0);
        let damaged = record(&bus, Topic::HEALTH_DAMAGED);
        let zero = record(&bus, Topic::HEALTH_ZERO);

        assert_eq!(apply_damage(&mut registry, &bus, hit(entity, 15)).unwrap(), DamageOutcome::Killed);
        apply_damage(&mut registry, &bus, hit(entity, 15)).unwrap();
        apply_damage(&mut registry, &bus, hit(entity, 1)).unwrap();

        assert_eq!(zero.borrow().len(), 1);
        assert!(damaged.borrow().is_empty());
        assert_eq!(registry.get::<Health>(entity).unwrap().current(), 0);
    }

    #[test]
    fn test_apply_damage_without_health_fails() {
        let mut registry = EntityRegistry::new();
        let bus = EventBus::new();
        let rock = registry.create_entity("Rock", EntityTransform::default());

        assert!(apply_damage(&mut registry, &bus, hit(rock, 5)).is_err());
    }

    #[test]
    fn test_apply_heal_publishes_only_when_healed() {
        let (mut registry, bus, entity) = setup(100, 0.0);
        let healed = record(&bus, Topic::HEALTH_HEALED);

        assert_eq!(apply_heal(&mut registry, &bus, entity, 20), Some(0));
        assert!(healed.borrow().is_empty());

        registry.get_mut::<Health>(entity).unwrap().take_damage(50, None);
        assert_eq!(apply_heal(&mut registry, &bus, entity, 20), Some(20));
        assert_eq!(
            healed.borrow()[0].payload(),
            &EventPayload::Healed {
                entity,
                amount: 20,
                current: 70
            }
        );
    }

    #[test]
    fn test_damage_taken_handler_routes_to_health() {
        let (mut registry, bus, entity) = setup(100, 0.5);
        subscribe_handlers(&bus);

        bus.publish(&mut registry, GameEvent::damage_taken(hit(entity, 30)));
        bus.publish(&mut registry, GameEvent::damage_taken(hit(entity, 30)));
        assert_eq!(registry.get::<Health>(entity).unwrap().current(), 70);

        update(&mut registry, entity, 0.5);
        bus.publish(&mut registry, GameEvent::damage_taken(hit(entity, 30)));
        assert_eq!(registry.get::<Health>(entity).unwrap().current(), 40);
    }

    proptest! {
        #[test]
        fn prop_health_stays_within_bounds(
            max in 1u32..500,
            ops in prop::collection::vec((any::<bool>(), 0u32..200, 0.0f32..1.0), 0..64),
        ) {
            let mut health = Health::new(max, 0.25);
            let mut zero_count = 0;

            for (is_damage, amount, delta) in ops {
                if is_damage {
                    if health.take_damage(amount, None) == DamageOutcome::Killed {
                        zero_count += 1;
                    }
                } else {
                    health.heal(amount);
                }
                health.tick(delta);

                prop_assert!(health.current() <= health.max());
            }
            prop_assert!(zero_count <= 1);
        }
    }
}
