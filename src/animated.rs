// RustPixel
// copyright zipxing@hotmail.com 2022～2025

//! Linear per-frame interpolation of an effect intensity.
//!
//! The window-interaction collaborator sets a target and a step count when a
//! drag or resize starts and a target of zero when it ends; the active preset
//! advances the value exactly once per rendered frame and reads `current()`
//! to scale its drag blur.

use num_traits::Float;

/// A scalar that walks from `current` to `target` in `steps` equal deltas.
///
/// `delta` is fixed when the target is set, so a retarget mid-flight starts a
/// fresh linear ramp from wherever the value currently is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimatedValue<T: Float> {
    current: T,
    target: T,
    delta: T,
    steps: u32,
}

impl<T: Float> Default for AnimatedValue<T> {
    fn default() -> Self {
        Self::new(T::zero())
    }
}

impl<T: Float> AnimatedValue<T> {
    /// A value at rest: `current == target == value`.
    pub fn new(value: T) -> Self {
        Self {
            current: value,
            target: value,
            delta: T::zero(),
            steps: 0,
        }
    }

    pub fn current(&self) -> T {
        self.current
    }

    pub fn target(&self) -> T {
        self.target
    }

    pub fn delta(&self) -> T {
        self.delta
    }

    /// Remaining step budget.
    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn is_settled(&self) -> bool {
        self.current == self.target
    }

    /// Start a new ramp toward `target` over `steps` frames (at least one).
    pub fn set_target(&mut self, target: T, steps: u32) {
        let steps = steps.max(1);
        self.target = if target.is_nan() { self.current } else { target };
        self.steps = steps;
        self.delta = (self.target - self.current) / Self::cast(steps);
    }

    /// Keep the target but spread the remaining distance over `steps`.
    pub fn set_steps(&mut self, steps: u32) {
        let target = self.target;
        self.set_target(target, steps);
    }

    /// Jump to `value` and stop animating.
    pub fn snap(&mut self, value: T) {
        *self = Self::new(value);
    }

    /// Move one step toward the target. Never overshoots.
    pub fn advance(&mut self) -> T {
        if self.current == self.target {
            self.steps = 0;
            return self.current;
        }
        let remaining = self.target - self.current;
        if self.steps <= 1 || remaining.abs() <= self.delta.abs() {
            self.current = self.target;
            self.steps = 0;
        } else {
            self.current = self.current + self.delta;
            self.steps -= 1;
        }
        self.current
    }

    fn cast(steps: u32) -> T {
        T::from(steps).unwrap_or_else(T::one)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converges_in_exactly_steps() {
        let cases: [(f32, f32, u32); 6] = [
            (0.0, 1.0, 1),
            (0.0, 1.0, 7),
            (1.0, 0.0, 10),
            (-3.5, 12.25, 33),
            (0.1, 0.3, 3),
            (5.0, -5.0, 120),
        ];
        for (start, target, steps) in cases {
            let mut v = AnimatedValue::new(start);
            v.set_target(target, steps);
            for _ in 0..steps {
                v.advance();
            }
            assert_eq!(v.current(), target, "{} -> {} in {}", start, target, steps);
            for _ in 0..5 {
                v.advance();
            }
            assert_eq!(v.current(), target);
            assert!(v.is_settled());
        }
    }

    #[test]
    fn test_never_overshoots() {
        let mut v = AnimatedValue::new(0.0f64);
        v.set_target(1.0, 9);
        let mut last = v.current();
        while !v.is_settled() {
            let now = v.advance();
            assert!(now >= last);
            assert!(now <= 1.0);
            last = now;
        }

        let mut v = AnimatedValue::new(2.0f32);
        v.set_target(-1.0, 13);
        for _ in 0..13 {
            let now = v.advance();
            assert!(v.target() - now <= 0.0);
        }
    }

    #[test]
    fn test_delta_fixed_at_set_time() {
        let mut v = AnimatedValue::new(0.0f32);
        v.set_target(8.0, 4);
        assert_eq!(v.delta(), 2.0);
        v.advance();
        assert_eq!(v.current(), 2.0);
        // retarget mid-flight: new delta from the current value
        v.set_target(0.0, 2);
        assert_eq!(v.delta(), -1.0);
        v.advance();
        v.advance();
        assert_eq!(v.current(), 0.0);
    }

    #[test]
    fn test_zero_steps_treated_as_one() {
        let mut v = AnimatedValue::new(0.0f32);
        v.set_target(3.0, 0);
        assert_eq!(v.delta(), 3.0);
        assert_eq!(v.advance(), 3.0);
    }

    #[test]
    fn test_at_rest_by_default() {
        let mut v: AnimatedValue<f32> = AnimatedValue::default();
        assert!(v.is_settled());
        assert_eq!(v.advance(), 0.0);
        v.set_target(f32::NAN, 4);
        assert_eq!(v.advance(), 0.0);
    }
}
