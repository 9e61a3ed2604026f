//! Movement domain
//!
//! Содержит:
//! - Movement (скорость, сглаживание поворота, knockback)
//! - Collider + CollisionOracle (граница с физикой хоста)
//! - systems: move / knockback / collision reconcile

pub mod collision;
pub mod components;
pub mod systems;

#[cfg(test)]
mod movement_tests;

pub use collision::{CircleCollisionOracle, Collider, ColliderKind, CollisionOracle, CollisionResponse, NoCollision};
pub use components::{steer, wrap_angle, Knockback, Movement};
pub use systems::{apply_knockback, move_entity, resolve_collision, stop_knockback};
