//! Tests for steering, knockback and collision reconcile.

#[cfg(test)]
mod tests {
    use super::super::systems::{stop_knockback, subscribe_handlers, update};
    use super::super::{
        apply_knockback, move_entity, steer, wrap_angle, CircleCollisionOracle, Collider, CollisionResponse, Knockback,
        Movement, NoCollision,
    };
    use crate::events::{EventBus, EventPayload, GameEvent, Topic};
    use crate::registry::{EntityRegistry, EntityTransform};
    use bevy::prelude::*;
    use std::cell::RefCell;
    use std::f32::consts::{FRAC_PI_2, PI};
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

    fn spawn_mover(registry: &mut EntityRegistry, position: Vec3) -> Entity {
        let entity = registry.create_entity("Mover", EntityTransform::from_translation(position));
        let mut movement = Movement::new(5.0, 10.0);
        movement.knockback_duration = 0.25;
        registry.add_component(entity, movement).unwrap();
        entity
    }

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn test_wrap_angle() {
        assert!((wrap_angle(0.5) - 0.5).abs() < 1e-6);
        assert!((wrap_angle(3.0 * PI / 2.0) + FRAC_PI_2).abs() < 1e-5);
        assert!((wrap_angle(-3.0 * PI / 2.0) - FRAC_PI_2).abs() < 1e-5);
        for angle in [-10.0f32, -4.0, 0.0, 4.0, 10.0] {
            let wrapped = wrap_angle(angle);
            assert!((-PI..=PI).contains(&wrapped));
        }
    }

    #[test]
    fn test_steer_zero_direction_is_noop() {
        let mut transform = EntityTransform::from_translation(Vec3::new(1.0, 0.0, 1.0));
        let before = transform;

        assert!(!steer(&mut transform, Vec3::ZERO, 5.0, 10.0, 0.1));
        assert_eq!(transform, before);
    }

    #[test]
    fn test_steer_moves_and_turns_towards_heading() {
        let mut transform = EntityTransform::default();

        assert!(steer(&mut transform, Vec3::new(2.0, 0.0, 0.0), 4.0, 5.0, 0.1));

        assert!(approx(transform.translation, Vec3::new(0.4, 0.0, 0.0)));
        // Половина пути до +X (factor = 0.5)
        assert!((transform.yaw - FRAC_PI_2 * 0.5).abs() < 1e-5);

        // Большой rotation_speed · delta не перекручивает
        steer(&mut transform, Vec3::X, 4.0, 1000.0, 0.1);
        assert!((transform.yaw - FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn test_steer_ignores_vertical_component() {
        let mut transform = EntityTransform::default();

        assert!(!steer(&mut transform, Vec3::Y, 5.0, 10.0, 0.1));
        assert!(steer(&mut transform, Vec3::new(0.0, 3.0, 1.0), 5.0, 10.0, 0.2));
        assert!(approx(transform.translation, Vec3::new(0.0, 0.0, 1.0)));
    }

    #[test]
    fn test_knockback_decays_to_zero() {
        let mut knockback = Knockback::new(Vec3::X * 4.0, 0.25);

        assert!(approx(knockback.current_velocity(), Vec3::X * 4.0));
        let first = knockback.advance(0.125);
        assert!(approx(knockback.current_velocity(), Vec3::X * 2.0));
        let second = knockback.advance(0.125);

        assert!(approx(first, Vec3::X * 0.375));
        assert!(approx(second, Vec3::X * 0.125));
        assert!(knockback.is_finished());
        assert_eq!(knockback.current_velocity(), Vec3::ZERO);
        assert_eq!(knockback.advance(0.125), Vec3::ZERO);
    }

    #[test]
    fn test_knockback_threshold_and_resistance() {
        let mut movement = Movement::new(5.0, 10.0).with_resistance(0.95);

        assert_eq!(movement.apply_knockback(Vec3::X, 1.0), None);
        assert!(!movement.is_knocked_back());

        let mut movement = Movement::new(5.0, 10.0).with_resistance(0.5);
        assert_eq!(movement.apply_knockback(Vec3::X, 4.0), Some(2.0));
        assert!(movement.is_knocked_back());
        // Нулевое направление не толкает
        assert_eq!(Movement::default().apply_knockback(Vec3::ZERO, 10.0), None);
    }

    #[test]
    fn test_knockback_overrides_movement_and_ends_with_event() {
        let mut registry = EntityRegistry::new();
        let bus = EventBus::new();
        let entity = spawn_mover(&mut registry, Vec3::ZERO);
        let started = record(&bus, Topic::KNOCKBACK_START);
        let ended = record(&bus, Topic::KNOCKBACK_END);

        assert!(apply_knockback(&mut registry, &bus, entity, Vec3::X, 4.0));
        assert_eq!(started.borrow().len(), 1);
        assert!(!move_entity(&mut registry, entity, Vec3::Z, 0.1));

        registry.get_mut::<Movement>(entity).unwrap().set_intent(Vec3::Z);
        update(&mut registry, &bus, &NoCollision, entity, 0.125);
        assert!(approx(registry.position(entity).unwrap(), Vec3::new(0.375, 0.0, 0.0)));
        assert!(ended.borrow().is_empty());

        update(&mut registry, &bus, &NoCollision, entity, 0.125);
        assert!(approx(registry.position(entity).unwrap(), Vec3::new(0.5, 0.0, 0.0)));
        assert_eq!(ended.borrow().len(), 1);
        assert!(!registry.get::<Movement>(entity).unwrap().is_knocked_back());

        // После knockback снова управляемый
        assert!(move_entity(&mut registry, entity, Vec3::Z, 0.1));
    }

    #[test]
    fn test_stopped_knockback_publishes_end_once() {
        let mut registry = EntityRegistry::new();
        let bus = EventBus::new();
        let entity = spawn_mover(&mut registry, Vec3::ZERO);
        let ended = record(&bus, Topic::KNOCKBACK_END);

        assert!(!stop_knockback(&mut registry, &bus, entity));
        assert!(apply_knockback(&mut registry, &bus, entity, Vec3::X, 4.0));
        assert!(stop_knockback(&mut registry, &bus, entity));
        assert!(!stop_knockback(&mut registry, &bus, entity));

        assert_eq!(ended.borrow().len(), 1);
        assert!(!registry.get::<Movement>(entity).unwrap().is_knocked_back());
    }

    #[test]
    fn test_disabling_movement_clears_knockback() {
        let mut registry = EntityRegistry::new();
        let bus = EventBus::new();
        let entity = spawn_mover(&mut registry, Vec3::ZERO);

        assert!(apply_knockback(&mut registry, &bus, entity, Vec3::X, 4.0));
        registry.set_enabled::<Movement>(entity, false).unwrap();

        assert!(!registry.get::<Movement>(entity).unwrap().is_knocked_back());
    }

    #[test]
    fn test_intent_is_consumed_each_frame() {
        let mut registry = EntityRegistry::new();
        let bus = EventBus::new();
        let entity = spawn_mover(&mut registry, Vec3::ZERO);

        registry.get_mut::<Movement>(entity).unwrap().set_intent(Vec3::Z);
        update(&mut registry, &bus, &NoCollision, entity, 0.2);
        let after_first = registry.position(entity).unwrap();
        update(&mut registry, &bus, &NoCollision, entity, 0.2);

        assert!(approx(after_first, Vec3::new(0.0, 0.0, 1.0)));
        assert_eq!(registry.position(entity).unwrap(), after_first);
    }

    #[test]
    fn test_disabled_movement_does_not_move() {
        let mut registry = EntityRegistry::new();
        let entity = spawn_mover(&mut registry, Vec3::ZERO);
        registry.set_enabled::<Movement>(entity, false).unwrap();

        assert!(!move_entity(&mut registry, entity, Vec3::X, 0.1));
        assert_eq!(registry.position(entity), Some(Vec3::ZERO));
    }

    #[test]
    fn test_solid_collision_reverts_move() {
        let mut registry = EntityRegistry::new();
        let bus = EventBus::new();
        let mover = spawn_mover(&mut registry, Vec3::ZERO);
        let wall = spawn_mover(&mut registry, Vec3::new(1.5, 0.0, 0.0));
        registry.add_component(mover, Collider::solid(0.5)).unwrap();
        registry.add_component(wall, Collider::solid(0.5)).unwrap();
        let collisions = record(&bus, Topic::COLLISION);

        registry.get_mut::<Movement>(mover).unwrap().set_intent(Vec3::X);
        update(&mut registry, &bus, &CircleCollisionOracle, mover, 0.2);

        assert_eq!(registry.position(mover), Some(Vec3::ZERO));
        assert_eq!(collisions.borrow().len(), 1);
        assert!(matches!(
            collisions.borrow()[0].payload(),
            EventPayload::Collision { other: Some(other), .. } if *other == wall
        ));
    }

    #[test]
    fn test_push_apart_collision_applies_correction() {
        let mut registry = EntityRegistry::new();
        let bus = EventBus::new();
        let mover = spawn_mover(&mut registry, Vec3::ZERO);
        let wall = spawn_mover(&mut registry, Vec3::new(1.5, 0.0, 0.0));
        registry.add_component(mover, Collider::push_apart(0.5)).unwrap();
        registry.add_component(wall, Collider::solid(0.5)).unwrap();

        registry.get_mut::<Movement>(mover).unwrap().set_intent(Vec3::X);
        update(&mut registry, &bus, &CircleCollisionOracle, mover, 0.2);

        assert!(approx(registry.position(mover).unwrap(), Vec3::new(0.5, 0.0, 0.0)));
    }

    #[test]
    fn test_oracle_reports_nothing_when_apart() {
        let mut registry = EntityRegistry::new();
        let a = spawn_mover(&mut registry, Vec3::ZERO);
        let b = spawn_mover(&mut registry, Vec3::new(3.0, 0.0, 0.0));
        registry.add_component(a, Collider::solid(0.5)).unwrap();
        registry.add_component(b, Collider::solid(0.5)).unwrap();

        assert_eq!(
            crate::movement::CollisionOracle::check_collision(&CircleCollisionOracle, &registry, a),
            None::<CollisionResponse>
        );
    }

    #[test]
    fn test_damage_with_knockback_pushes_target() {
        let mut registry = EntityRegistry::new();
        let bus = EventBus::new();
        let entity = spawn_mover(&mut registry, Vec3::ZERO);
        subscribe_handlers(&bus);

        bus.publish(
            &mut registry,
            GameEvent::new(
                Topic::HEALTH_DAMAGED,
                EventPayload::Damaged {
                    entity,
                    amount: 10,
                    remaining: 90,
                    source: None,
                    direction: Vec3::NEG_Z,
                    knockback: 3.0,
                },
            ),
        );

        let movement = registry.get::<Movement>(entity).unwrap();
        assert!(movement.is_knocked_back());
        assert!(approx(movement.knockback().unwrap().current_velocity(), Vec3::NEG_Z * 3.0));
    }
}
