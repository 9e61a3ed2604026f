//! Готовые сцены для headless прогонов и тестов детерминизма

use bevy::prelude::*;
use rand::Rng;
use std::f32::consts::TAU;

use crate::actor::SpawnError;
use crate::simulation::Simulation;
use crate::DeterministicRng;

/// Игрок + враги, расставленные по кольцу
#[derive(Debug, Clone, PartialEq)]
pub struct Skirmish {
    pub player: Entity,
    pub enemies: Vec<Entity>,
}

/// Игрок в центре, `enemies` врагов на кольце радиуса `radius`
///
/// Угол и радиус каждого врага слегка рандомизированы через `DeterministicRng`,
/// поэтому один и тот же seed даёт одну и ту же расстановку.
pub fn spawn_skirmish(sim: &mut Simulation, enemies: usize, radius: f32) -> Result<Skirmish, SpawnError> {
    let positions: Vec<Vec3> = {
        let world = sim.registry_mut().world_mut();
        let mut fallback = DeterministicRng::new(0);
        let mut resource = world.get_resource_mut::<DeterministicRng>();
        let rng = match resource.as_mut() {
            Some(resource) => &mut resource.rng,
            None => &mut fallback.rng,
        };

        (0..enemies)
            .map(|i| {
                let base = i as f32 / enemies.max(1) as f32 * TAU;
                let angle = base + rng.gen_range(-0.25f32..0.25);
                let distance = radius * rng.gen_range(0.8f32..1.2);
                Vec3::new(angle.sin() * distance, 0.0, angle.cos() * distance)
            })
            .collect()
    };

    let player = sim.spawn_player(Vec3::ZERO)?;
    let mut spawned = Vec::with_capacity(enemies);
    for (i, position) in positions.into_iter().enumerate() {
        spawned.push(sim.spawn_enemy(format!("Enemy {}", i + 1), position)?);
    }

    crate::logger::log_info(&format!("Skirmish ready: player {:?} vs {} enemies", player, spawned.len()));
    Ok(Skirmish {
        player,
        enemies: spawned,
    })
}
