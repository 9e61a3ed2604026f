//! Combat domain
//!
//! - `Attacker`: damage/range/cooldown + strike таймер
//! - `resolver`: hit test (дистанция + конус) и публикация `damage.taken`
//!
//! Урон применяет health domain через подписку на `damage.taken`.

pub mod attacker;
pub mod resolver;


pub use attacker::Attacker;
pub use resolver::{collect_hits, is_hit, resolve_strike};
