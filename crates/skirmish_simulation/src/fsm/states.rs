//! Поведение состояний FSM
//!
//! Каждое состояние — unit struct без данных; всё изменяемое живёт в
//! компонентах entity (StateMachine, Attacker, Movement, Animator).

use bevy::prelude::*;

use super::{StateId, StateMachine};
use crate::ai::AiController;
use crate::animation::Animator;
use crate::combat::Attacker;
use crate::events::{EventBus, EventPayload, GameEvent, Topic};
use crate::health::Health;
use crate::input::PlayerInput;
use crate::movement::Movement;
use crate::registry::{ComponentKind, EntityRegistry, SimComponent};
use crate::time::OneShot;

/// Всё, что состояние может трогать во время enter/update/exit
pub struct StateContext<'a> {
    pub entity: Entity,
    pub registry: &'a mut EntityRegistry,
    pub bus: &'a EventBus,
}

impl StateContext<'_> {
    pub fn set_state(&mut self, next: StateId) -> bool {
        super::set_state(self.registry, self.bus, self.entity, next)
    }

    pub fn publish(&mut self, event: GameEvent) -> usize {
        self.bus.publish(self.registry, event)
    }

    fn play(&mut self, clip: &str) {
        if let Some(mut animator) = self.registry.get_mut::<Animator>(self.entity) {
            animator.play(clip);
        }
    }

    fn play_one_shot(&mut self, clip: &str) {
        if let Some(mut animator) = self.registry.get_mut::<Animator>(self.entity) {
            animator.play_one_shot(clip);
        }
    }

    fn set_move_intent(&mut self, direction: Vec3) {
        if let Some(mut movement) = self.registry.get_mut::<Movement>(self.entity) {
            movement.set_intent(direction);
        }
    }

    fn combat_ready(&self) -> bool {
        self.registry.is_enabled(self.entity, ComponentKind::Combat)
            && self.registry.get::<Attacker>(self.entity).is_some_and(Attacker::can_attack)
    }

    fn is_alive(&self) -> bool {
        self.registry.get::<Health>(self.entity).is_some_and(Health::is_alive)
    }

    /// Intents игрока за этот кадр (None если Input нет или выключен)
    fn input(&self) -> Option<(Vec3, bool)> {
        if !self.registry.is_enabled(self.entity, ComponentKind::Input) {
            return None;
        }
        self.registry
            .get::<PlayerInput>(self.entity)
            .map(|input| (input.move_direction, input.attack_pressed))
    }

    /// Позиция текущей цели AI (None если цель пропала)
    fn ai_target_position(&self) -> Option<Vec3> {
        let target = self.registry.get::<AiController>(self.entity)?.target()?;
        self.registry.position(target)
    }

    fn disable<C: SimComponent>(&mut self) {
        if self.registry.has::<C>(self.entity) {
            let _ = self.registry.set_enabled::<C>(self.entity, false);
        }
    }
}

pub trait StateBehavior: Sync {
    fn id(&self) -> StateId;

    fn enter(&self, _ctx: &mut StateContext) {}

    fn update(&self, _ctx: &mut StateContext, _delta: f32) {}

    fn exit(&self, _ctx: &mut StateContext) {}

    fn can_enter(&self, _ctx: &StateContext) -> bool {
        true
    }

    fn can_exit(&self, _ctx: &StateContext) -> bool {
        true
    }

    /// One-shot клип завершился, пока это состояние текущее
    fn on_animation_complete(&self, _ctx: &mut StateContext, _clip: &str) {}
}

pub fn behavior(state: StateId) -> &'static dyn StateBehavior {
    match state {
        StateId::Idle => &IdleState,
        StateId::Walk => &WalkState,
        StateId::Chase => &ChaseState,
        StateId::Attack => &AttackState,
        StateId::Hit => &HitState,
        StateId::Death => &DeathState,
    }
}

pub struct IdleState;

impl StateBehavior for IdleState {
    fn id(&self) -> StateId {
        StateId::Idle
    }

    fn enter(&self, ctx: &mut StateContext) {
        ctx.play(StateId::Idle.clip());
        ctx.set_move_intent(Vec3::ZERO);
    }

    fn update(&self, ctx: &mut StateContext, _delta: f32) {
        // Враг в Idle управляется AI, тут только input игрока
        let Some((direction, attack)) = ctx.input() else {
            return;
        };

        if direction.length_squared() > 0.0 {
            ctx.set_state(StateId::Walk);
            return;
        }

        if attack && ctx.combat_ready() {
            ctx.set_state(StateId::Attack);
        }
    }
}

pub struct WalkState;

impl StateBehavior for WalkState {
    fn id(&self) -> StateId {
        StateId::Walk
    }

    fn enter(&self, ctx: &mut StateContext) {
        ctx.play(StateId::Walk.clip());
        // Intent с первого кадра: Movement phase идёт после StateMachine
        if let Some((direction, _)) = ctx.input() {
            ctx.set_move_intent(direction);
        }
    }

    fn update(&self, ctx: &mut StateContext, _delta: f32) {
        let Some((direction, attack)) = ctx.input() else {
            ctx.set_state(StateId::Idle);
            return;
        };

        if direction.length_squared() == 0.0 {
            ctx.set_state(StateId::Idle);
            return;
        }

        if attack && ctx.combat_ready() {
            ctx.set_state(StateId::Attack);
            return;
        }

        ctx.set_move_intent(direction);
    }

    fn exit(&self, ctx: &mut StateContext) {
        ctx.set_move_intent(Vec3::ZERO);
    }
}

/// Преследование цели AI (направление считает AiController)
pub struct ChaseState;

impl StateBehavior for ChaseState {
    fn id(&self) -> StateId {
        StateId::Chase
    }

    fn enter(&self, ctx: &mut StateContext) {
        ctx.play(StateId::Chase.clip());
    }

    fn update(&self, ctx: &mut StateContext, _delta: f32) {
        let Some(target_position) = ctx.ai_target_position() else {
            ctx.set_state(StateId::Idle);
            return;
        };

        let direction = ctx
            .registry
            .get::<AiController>(ctx.entity)
            .map_or(Vec3::ZERO, |ai| ai.chase_direction);
        ctx.set_move_intent(direction);

        if let Some(mut transform) = ctx.registry.transform_mut(ctx.entity) {
            transform.look_at(target_position);
        }
    }

    fn exit(&self, ctx: &mut StateContext) {
        ctx.set_move_intent(Vec3::ZERO);
    }
}

pub struct AttackState;

impl StateBehavior for AttackState {
    fn id(&self) -> StateId {
        StateId::Attack
    }

    fn can_enter(&self, ctx: &StateContext) -> bool {
        ctx.is_alive() && ctx.combat_ready()
    }

    fn enter(&self, ctx: &mut StateContext) {
        let entity = ctx.entity;

        if let Some(target_position) = ctx.ai_target_position() {
            if let Some(mut transform) = ctx.registry.transform_mut(entity) {
                transform.look_at(target_position);
            }
        }

        let Some((damage, range)) = ctx.registry.get_mut::<Attacker>(entity).and_then(|mut attacker| {
            attacker.start_attack().then_some((attacker.damage, attacker.range))
        }) else {
            return;
        };

        ctx.set_move_intent(Vec3::ZERO);
        ctx.play_one_shot(StateId::Attack.clip());

        let (position, yaw) = ctx
            .registry
            .transform(entity)
            .map_or((Vec3::ZERO, 0.0), |transform| (transform.translation, transform.yaw));
        ctx.publish(GameEvent::new(
            Topic::ENTITY_ATTACK,
            EventPayload::Attack {
                attacker: entity,
                position,
                yaw,
                damage,
                range,
            },
        ));
    }

    fn update(&self, ctx: &mut StateContext, _delta: f32) {
        // Без Animator атака заканчивается сразу после strike
        if ctx.registry.has::<Animator>(ctx.entity) {
            return;
        }
        let strike_pending = ctx
            .registry
            .get::<Attacker>(ctx.entity)
            .is_some_and(Attacker::strike_pending);
        if !strike_pending {
            ctx.set_state(StateId::Idle);
        }
    }

    fn exit(&self, ctx: &mut StateContext) {
        if let Some(mut attacker) = ctx.registry.get_mut::<Attacker>(ctx.entity) {
            attacker.end_attack();
        }
    }

    fn on_animation_complete(&self, ctx: &mut StateContext, clip: &str) {
        if clip == StateId::Attack.clip() {
            ctx.set_state(StateId::Idle);
        }
    }
}

/// Stagger после урона
pub struct HitState;

impl StateBehavior for HitState {
    fn id(&self) -> StateId {
        StateId::Hit
    }

    fn can_enter(&self, ctx: &StateContext) -> bool {
        ctx.is_alive()
    }

    fn enter(&self, ctx: &mut StateContext) {
        if let Some(mut machine) = ctx.registry.get_mut::<StateMachine>(ctx.entity) {
            machine.hit_timer = Some(OneShot::new(machine.hit_duration));
        }
        ctx.set_move_intent(Vec3::ZERO);
        // Stagger дольше клипа: после one-shot держим hit, а не прошлый looping
        ctx.play(StateId::Hit.clip());
        ctx.play_one_shot(StateId::Hit.clip());
    }

    fn update(&self, ctx: &mut StateContext, delta: f32) {
        let elapsed = match ctx.registry.get_mut::<StateMachine>(ctx.entity) {
            Some(mut machine) => machine.hit_timer.as_mut().is_none_or(|timer| timer.tick(delta)),
            None => return,
        };
        if elapsed {
            ctx.set_state(StateId::Idle);
        }
    }

    fn exit(&self, ctx: &mut StateContext) {
        if let Some(mut machine) = ctx.registry.get_mut::<StateMachine>(ctx.entity) {
            machine.hit_timer = None;
        }
    }
}

/// Терминальное состояние
pub struct DeathState;

impl StateBehavior for DeathState {
    fn id(&self) -> StateId {
        StateId::Death
    }

    fn can_exit(&self, _ctx: &StateContext) -> bool {
        false
    }

    fn enter(&self, ctx: &mut StateContext) {
        let entity = ctx.entity;

        if let Some(mut attacker) = ctx.registry.get_mut::<Attacker>(entity) {
            attacker.end_attack();
        }
        ctx.set_move_intent(Vec3::ZERO);
        // Толчок в момент смерти заканчивается сразу, а не висит в выключенном Movement
        crate::movement::stop_knockback(ctx.registry, ctx.bus, entity);

        ctx.disable::<Attacker>();
        ctx.disable::<Movement>();
        ctx.disable::<AiController>();
        ctx.disable::<PlayerInput>();

        // Looping тоже death: после one-shot тело остаётся в последней позе
        ctx.play(StateId::Death.clip());
        ctx.play_one_shot(StateId::Death.clip());

        let killer = ctx.registry.get::<Health>(entity).and_then(Health::last_source);
        let position = ctx.registry.position(entity).unwrap_or(Vec3::ZERO);
        let name = ctx.registry.meta(entity).map_or_else(String::new, |meta| meta.name.clone());
        crate::logger::log_info(&format!("💀 {} ({:?}) died, killer: {:?}", name, entity, killer));

        ctx.publish(GameEvent::new(
            Topic::ENTITY_DIED,
            EventPayload::Died {
                entity,
                killer,
                position,
            },
        ));
    }

    fn on_animation_complete(&self, ctx: &mut StateContext, clip: &str) {
        if clip == StateId::Death.clip() {
            let entity = ctx.entity;
            ctx.publish(GameEvent::new(
                Topic::DEATH_ANIMATION_COMPLETE,
                EventPayload::AnimationComplete {
                    entity,
                    clip: clip.to_string(),
                },
            ));
        }
    }
}
