//! Frame time: clamped delta + одноразовые таймеры
//!
//! Хост передаёт сырой delta (может быть 0.5s после hitch'а), симуляция
//! использует только clamped значение — это ограничивает ошибку интеграции knockback.

use bevy::prelude::*;

/// Default верхняя граница delta (секунды)
pub const DEFAULT_MAX_DELTA: f32 = 0.1;

/// Clamp delta в [0, max_delta]; NaN и отрицательные значения → 0
pub fn clamp_delta(raw_delta: f32, max_delta: f32) -> f32 {
    if !raw_delta.is_finite() || raw_delta <= 0.0 {
        return 0.0;
    }
    raw_delta.min(max_delta)
}

/// Resource: часы симуляции
#[derive(Resource, Debug, Clone)]
pub struct FrameClock {
    pub max_delta: f32,
    /// Последний clamped delta
    pub delta: f32,
    /// Суммарное simulated время (секунды)
    pub elapsed: f32,
    pub frame: u64,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DELTA)
    }
}

impl FrameClock {
    pub fn new(max_delta: f32) -> Self {
        Self {
            max_delta,
            delta: 0.0,
            elapsed: 0.0,
            frame: 0,
        }
    }

    /// Продвинуть часы на один кадр, вернуть clamped delta
    pub fn advance(&mut self, raw_delta: f32) -> f32 {
        self.delta = clamp_delta(raw_delta, self.max_delta);
        self.elapsed += self.delta;
        self.frame += 1;
        self.delta
    }
}

/// Таймер фиксированной длительности, срабатывает ровно один раз
///
/// Используется для strike frame атаки и one-shot анимаций.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OneShot {
    remaining: f32,
    fired: bool,
}

impl OneShot {
    pub fn new(duration: f32) -> Self {
        Self {
            remaining: duration.max(0.0),
            fired: false,
        }
    }

    /// true только на том тике, где таймер истёк
    pub fn tick(&mut self, delta: f32) -> bool {
        if self.fired {
            return false;
        }
        self.remaining -= delta;
        if self.remaining <= 0.0 {
            self.remaining = 0.0;
            self.fired = true;
            return true;
        }
        false
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    pub fn is_finished(&self) -> bool {
        self.fired
    }
}
