//! AI decision-making module
//!
//! AI не двигает entity сам: выбирает состояние FSM и в Chase отдаёт
//! normalized направление на цель, которое применяет Movement.
//!
//! Порядок в кадре (Ai phase, до StateMachine):
//! 1. find_nearest_hostile — восприятие
//! 2. decide — закон перехода (attack раньше chase)
//! 3. fsm::set_state — запрос (FSM может отклонить через canEnter)

pub mod controller;
pub mod systems;


pub use controller::{decide, AiController};
pub use systems::{find_nearest_hostile, update};
