//! Сценарии поведения ядра через публичный API `Simulation`

use bevy::prelude::*;
use skirmish_simulation::*;
use std::cell::RefCell;
use std::rc::Rc;

fn counter(sim: &Simulation, topic: Topic) -> Rc<RefCell<usize>> {
    let count = Rc::new(RefCell::new(0));
    let sink = count.clone();
    sim.bus().subscribe(topic, move |_, _, _| {
        *sink.borrow_mut() += 1;
        Ok(())
    });
    count
}

fn fragile_enemy_config() -> SimConfig {
    SimConfig::from_toml_str(
        r#"
        [enemy]
        max_health = 10
        "#,
    )
    .unwrap()
}

/// 100 hp, два удара по 30 подряд при окне неуязвимости 0.5s → 70
#[test]
fn test_rapid_hits_respect_invulnerability() {
    let mut sim = create_headless_simulation(0);
    let player = sim.spawn_player(Vec3::ZERO).unwrap();

    sim.take_damage(player, 30, None).unwrap();
    let second = sim.take_damage(player, 30, None).unwrap();

    assert_eq!(second, DamageOutcome::Ignored);
    assert_eq!(sim.health_of(player), Some(70));
}

/// Окно неуязвимости истекает через update
#[test]
fn test_invulnerability_expires_with_time() {
    let mut sim = create_headless_simulation(0);
    let player = sim.spawn_player(Vec3::ZERO).unwrap();

    sim.take_damage(player, 30, None).unwrap();
    for _ in 0..6 {
        sim.update(0.1, &FrameServices::headless());
    }
    sim.take_damage(player, 30, None).unwrap();

    assert_eq!(sim.health_of(player), Some(40));
}

/// 10 hp, take_damage(15) → 0, health.zero один раз, Death, set_state("idle") отклонён
#[test]
fn test_overkill_leads_to_terminal_death() {
    let mut sim = Simulation::new(fragile_enemy_config(), 0);
    let enemy = sim.spawn_enemy("Glass", Vec3::ZERO).unwrap();
    let zero = counter(&sim, Topic::HEALTH_ZERO);
    let died = counter(&sim, Topic::ENTITY_DIED);

    assert_eq!(sim.take_damage(enemy, 15, None).unwrap(), DamageOutcome::Killed);
    assert_eq!(sim.health_of(enemy), Some(0));
    assert_eq!(sim.state_of(enemy), Some(StateId::Death));

    assert!(!sim.set_state(enemy, "idle"));
    assert_eq!(sim.state_of(enemy), Some(StateId::Death));

    sim.take_damage(enemy, 15, None).unwrap();
    assert_eq!(*zero.borrow(), 1);
    assert_eq!(*died.borrow(), 1);
}

/// Смертельный удар из handler'а `entity.attack` всё равно доводит до Death
#[test]
fn test_lethal_hit_during_attack_enter_kills() {
    let mut sim = create_headless_simulation(0);
    let player = sim.spawn_player(Vec3::ZERO).unwrap();
    let died = counter(&sim, Topic::ENTITY_DIED);
    sim.bus().subscribe(Topic::ENTITY_ATTACK, |event, registry, bus| {
        if let EventPayload::Attack { attacker, .. } = event.payload() {
            health::apply_damage(
                registry,
                bus,
                DamageInfo {
                    target: *attacker,
                    source: None,
                    amount: 1000,
                    direction: Vec3::ZERO,
                    knockback: 0.0,
                },
            )?;
        }
        Ok(())
    });

    sim.set_state(player, "attack");
    assert_eq!(sim.health_of(player), Some(0));
    assert_eq!(sim.state_of(player), Some(StateId::Death));

    for _ in 0..60 {
        sim.update(0.05, &FrameServices::headless());
    }
    assert_eq!(sim.state_of(player), Some(StateId::Death));
    assert_eq!(*died.borrow(), 1);
}

/// Knockback, активный в момент смерти, закрывается `knockback.end`
#[test]
fn test_death_closes_active_knockback() {
    let mut sim = create_headless_simulation(0);
    let enemy = sim.spawn_enemy("Grunt", Vec3::ZERO).unwrap();
    let ended = counter(&sim, Topic::KNOCKBACK_END);

    assert!(sim.apply_knockback(enemy, Vec3::X, 10.0));
    sim.take_damage(enemy, 1000, None).unwrap();
    for _ in 0..120 {
        sim.update(0.05, &FrameServices::headless());
    }

    assert_eq!(sim.state_of(enemy), Some(StateId::Death));
    assert_eq!(*ended.borrow(), 1);
    assert!(!sim.registry().get::<Movement>(enemy).unwrap().is_knocked_back());
}

/// publish без подписчиков — чистый no-op
#[test]
fn test_publish_without_subscribers() {
    let mut registry = EntityRegistry::new();
    let bus = EventBus::new();
    let entity = registry.create_entity("Lonely", EntityTransform::default());

    let invoked = bus.publish(
        &mut registry,
        GameEvent::damage_taken(DamageInfo {
            target: entity,
            source: None,
            amount: 5,
            direction: Vec3::ZERO,
            knockback: 0.0,
        }),
    );

    assert_eq!(invoked, 0);
    assert_eq!(bus.failure_count(), 0);
    assert!(registry.contains(entity));
}

/// Неизвестное имя состояния → warning, состояние не меняется
#[test]
fn test_unknown_state_name_is_ignored() {
    let mut sim = create_headless_simulation(0);
    let player = sim.spawn_player(Vec3::ZERO).unwrap();

    assert!(!sim.set_state(player, "moonwalk"));
    assert!(sim.set_state(player, "walk"));
    assert!(!sim.set_state(player, "walk"));
    assert_eq!(sim.state_of(player), Some(StateId::Walk));
}

/// Лечение мёртвого — no-op, живого — clamp к max
#[test]
fn test_heal_rules() {
    let mut sim = Simulation::new(fragile_enemy_config(), 0);
    let player = sim.spawn_player(Vec3::ZERO).unwrap();
    let enemy = sim.spawn_enemy("Glass", Vec3::new(5.0, 0.0, 0.0)).unwrap();
    let healed = counter(&sim, Topic::HEALTH_HEALED);

    sim.take_damage(player, 40, None).unwrap();
    assert_eq!(sim.heal(player, 100), Some(40));
    assert_eq!(sim.health_of(player), Some(100));

    sim.take_damage(enemy, 50, None).unwrap();
    assert_eq!(sim.heal(enemy, 5), Some(0));
    assert_eq!(sim.health_of(enemy), Some(0));
    assert_eq!(*healed.borrow(), 1);
}

/// Модель грузится асинхронно: entity неактивна до готовности
#[test]
fn test_pending_model_activates_later() {
    struct DelayedLoader {
        polls: usize,
    }

    impl AssetLoader for DelayedLoader {
        fn poll(&mut self, _url: &str) -> LoadState {
            self.polls += 1;
            if self.polls < 3 {
                LoadState::Pending
            } else {
                LoadState::Ready(ModelAsset::default().with_clip("death", 0.2))
            }
        }
    }

    let mut sim = Simulation::with_loader(SimConfig::default(), 0, Box::new(DelayedLoader { polls: 0 }));
    let player = sim.spawn_player(Vec3::ZERO).unwrap();

    assert!(!sim.registry().is_active(player));
    sim.update(0.05, &FrameServices::headless());
    assert!(sim.poll_assets().is_empty());
    assert!(!sim.registry().is_active(player));

    assert!(sim.poll_assets().is_empty());
    assert!(sim.registry().is_active(player));
    assert_eq!(sim.state_of(player), Some(StateId::Idle));
}

/// Провал загрузки уничтожает entity
#[test]
fn test_failed_model_destroys_pending_entity() {
    struct FlakyLoader {
        polls: usize,
    }

    impl AssetLoader for FlakyLoader {
        fn poll(&mut self, url: &str) -> LoadState {
            self.polls += 1;
            if self.polls == 1 {
                LoadState::Pending
            } else {
                LoadState::Failed(AssetError::LoadFailed {
                    url: url.to_string(),
                    reason: "corrupted glb".to_string(),
                })
            }
        }
    }

    let mut sim = Simulation::with_loader(SimConfig::default(), 0, Box::new(FlakyLoader { polls: 0 }));
    let destroyed = counter(&sim, Topic::ENTITY_DESTROYED);
    let enemy = sim.spawn_enemy("Broken", Vec3::ZERO).unwrap();

    let failed = sim.poll_assets();

    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].0, enemy);
    assert!(!sim.registry().contains(enemy));
    assert_eq!(*destroyed.borrow(), 1);
}

/// Пустой model url → ошибка спавна, entity не создаётся
#[test]
fn test_missing_model_url_rejected() {
    let config = SimConfig::from_toml_str(
        r#"
        [player]
        model_url = ""
        "#,
    )
    .unwrap();
    let mut sim = Simulation::new(config, 0);

    assert!(matches!(sim.spawn_player(Vec3::ZERO), Err(SpawnError::MissingModel(_))));
    assert!(sim.registry_mut().entities().is_empty());
}

/// Render proxy получает transform и текущий клип каждой активной entity
#[test]
fn test_render_sync() {
    let mut sim = create_headless_simulation(0);
    let player = sim.spawn_player(Vec3::new(1.0, 0.0, 2.0)).unwrap();
    let mut renderer = animation::RecordingRenderer::default();

    sim.set_state(player, "walk");
    sim.sync_render(&mut renderer);

    assert_eq!(renderer.frames.len(), 1);
    let (entity, transform, clip) = &renderer.frames[0];
    assert_eq!(*entity, player);
    assert_eq!(transform.translation, Vec3::new(1.0, 0.0, 2.0));
    assert_eq!(clip, "walking");
}
