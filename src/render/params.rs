// RustPixel
// copyright zipxing@hotmail.com 2022～2025

//! # Parameter Schema
//!
//! Every preset declares its settings once with [`param_block!`]: a `Copy`
//! struct of `f32` fields plus a static schema row per field (display name,
//! storage key, default, range, step, optional enable flag, optional choice
//! list). [`ParamTable`] holds the live block that preference panels write
//! through the object-safe [`ParamSurface`]; the preset takes a
//! [`ParamTable::snapshot`] once per frame and encodes from that copy.
//!
//! Values are sanitized on write: NaN falls back to the default, numbers are
//! clamped to the range and snapped to the step grid, choices are rounded
//! to a valid index.

use crate::error::{PipelineError, Result};

/// One row of a parameter schema.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec<F: 'static> {
    pub field: F,
    /// Display name
    pub name: &'static str,
    /// Stable key for settings persistence
    pub key: &'static str,
    pub default: f32,
    pub min: f32,
    pub max: f32,
    pub step: f32,
    /// Flag field that must be on for this row to apply
    pub enable: Option<F>,
    /// Non-empty for enumerated rows; the value is an index
    pub choices: &'static [&'static str],
}

impl<F: Copy> ParamSpec<F> {
    pub fn is_choice(&self) -> bool {
        !self.choices.is_empty()
    }

    /// A 0/1 row.
    pub fn is_flag(&self) -> bool {
        !self.is_choice() && self.min == 0.0 && self.max == 1.0 && self.step == 1.0
    }

    /// Clamp, snap and repair `value` for this row.
    pub fn sanitize(&self, value: f32) -> f32 {
        if value.is_nan() {
            return self.default;
        }
        if self.is_choice() {
            let last = (self.choices.len() - 1) as f32;
            return value.round().clamp(0.0, last);
        }
        let mut v = value.clamp(self.min, self.max);
        if self.step > 0.0 {
            v = self.min + ((v - self.min) / self.step).round() * self.step;
            v = v.clamp(self.min, self.max);
        }
        v
    }
}

/// Implemented by the structs generated with `param_block!`.
pub trait ParamBlock: Copy + Default + 'static {
    type Field: Copy + Eq + std::fmt::Debug + 'static;

    fn schema() -> &'static [ParamSpec<Self::Field>];

    fn get(&self, field: Self::Field) -> f32;

    /// Store without sanitizing; use [`ParamTable::set_field`] from outside.
    fn set_raw(&mut self, field: Self::Field, value: f32);

    fn spec(field: Self::Field) -> Option<&'static ParamSpec<Self::Field>> {
        Self::schema().iter().find(|s| s.field == field)
    }

    /// Look a row up by display name or storage key.
    fn find(name: &str) -> Option<&'static ParamSpec<Self::Field>> {
        Self::schema()
            .iter()
            .find(|s| s.name == name || s.key == name)
    }
}

/// Schema row without the field type, for preference panels.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamInfo {
    pub name: &'static str,
    pub key: &'static str,
    pub default: f32,
    pub min: f32,
    pub max: f32,
    pub step: f32,
    /// Storage key of the enable flag
    pub enable: Option<&'static str>,
    pub choices: &'static [&'static str],
}

/// Object-safe view of a preset's parameters.
pub trait ParamSurface {
    fn specs(&self) -> Vec<ParamInfo>;

    /// Current value by display name or storage key.
    fn get(&self, name: &str) -> Option<f32>;

    /// Sanitize and store; returns the value actually stored.
    fn set(&mut self, name: &str, value: f32) -> Result<f32>;

    /// False when the row's enable flag is off or the name is unknown.
    fn is_enabled(&self, name: &str) -> bool;

    fn revert_to_defaults(&mut self);
}

#[inline]
pub fn flag(value: f32) -> bool {
    value >= 0.5
}

#[inline]
pub fn choice(value: f32) -> usize {
    if value.is_finite() && value > 0.0 {
        value.round() as usize
    } else {
        0
    }
}

/// Live parameter block of one preset.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParamTable<B: ParamBlock> {
    live: B,
}

impl<B: ParamBlock> ParamTable<B> {
    pub fn new() -> Self {
        Self { live: B::default() }
    }

    /// Copy taken once at the start of a frame's encoding.
    pub fn snapshot(&self) -> B {
        self.live
    }

    pub fn block(&self) -> &B {
        &self.live
    }

    pub fn get_field(&self, field: B::Field) -> f32 {
        self.live.get(field)
    }

    pub fn set_field(&mut self, field: B::Field, value: f32) -> f32 {
        let v = match B::spec(field) {
            Some(spec) => spec.sanitize(value),
            None => value,
        };
        self.live.set_raw(field, v);
        v
    }

    fn enabled(&self, spec: &ParamSpec<B::Field>) -> bool {
        spec.enable.map_or(true, |f| flag(self.live.get(f)))
    }
}

impl<B: ParamBlock> ParamSurface for ParamTable<B> {
    fn specs(&self) -> Vec<ParamInfo> {
        B::schema()
            .iter()
            .map(|s| ParamInfo {
                name: s.name,
                key: s.key,
                default: s.default,
                min: s.min,
                max: s.max,
                step: s.step,
                enable: s.enable.and_then(|f| B::spec(f)).map(|f| f.key),
                choices: s.choices,
            })
            .collect()
    }

    fn get(&self, name: &str) -> Option<f32> {
        B::find(name).map(|s| self.live.get(s.field))
    }

    fn set(&mut self, name: &str, value: f32) -> Result<f32> {
        let spec = B::find(name).ok_or_else(|| PipelineError::UnknownParam(name.to_string()))?;
        Ok(self.set_field(spec.field, value))
    }

    fn is_enabled(&self, name: &str) -> bool {
        B::find(name).is_some_and(|s| self.enabled(s))
    }

    fn revert_to_defaults(&mut self) {
        self.live = B::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::param_block! {
        /// Block used by the tests below.
        pub struct DemoParams, enum DemoField {
            Gamma gamma: "Gamma", "gamma", default 2.2, range 1.0, 3.0, step 0.1;
            GlowEnabled glow_enabled: "Glow", "glowEnabled", default 0.0, range 0.0, 1.0, step 1.0;
            GlowRadius glow_radius: "Glow Radius", "glowRadius", default 4.0, range 0.0, 16.0, step 0.5,
                enable GlowEnabled;
            Mode mode: "Mode", "mode", default 1.0, range 0.0, 2.0, step 1.0,
                choices ["Fast", "Good", "Best"];
        }
    }

    #[test]
    fn test_defaults_match_schema() {
        let block = DemoParams::default();
        for spec in DemoParams::schema() {
            assert_eq!(block.get(spec.field), spec.default, "{}", spec.name);
        }
        assert_eq!(DemoParams::schema().len(), 4);
        assert!(DemoParams::spec(DemoField::GlowEnabled).unwrap().is_flag());
        assert!(DemoParams::spec(DemoField::Mode).unwrap().is_choice());
    }

    #[test]
    fn test_set_clamps_and_snaps() {
        let mut table = ParamTable::<DemoParams>::new();
        assert_eq!(table.set("Gamma", 9.0).unwrap(), 3.0);
        assert_eq!(table.set("gamma", 0.0).unwrap(), 1.0);
        let v = table.set("gamma", 2.04).unwrap();
        assert!((v - 2.0).abs() < 1e-5);
        assert_eq!(table.set("gamma", f32::NAN).unwrap(), 2.2);
        assert_eq!(table.set("glowRadius", 3.3).unwrap(), 3.5);
        assert_eq!(table.set("Mode", 7.0).unwrap(), 2.0);
        assert_eq!(table.set("mode", -1.0).unwrap(), 0.0);
        assert_eq!(table.snapshot().mode, 0.0);
    }

    #[test]
    fn test_unknown_name_is_an_error() {
        let mut table = ParamTable::<DemoParams>::new();
        assert!(matches!(
            table.set("nope", 1.0),
            Err(PipelineError::UnknownParam(_))
        ));
        assert_eq!(table.get("nope"), None);
        assert!(!table.is_enabled("nope"));
    }

    #[test]
    fn test_enable_flags() {
        let mut table = ParamTable::<DemoParams>::new();
        assert!(!table.is_enabled("Glow Radius"));
        assert!(table.is_enabled("Gamma"));
        table.set("Glow", 1.0).unwrap();
        assert!(table.is_enabled("glowRadius"));
        let infos = table.specs();
        assert_eq!(infos[2].enable, Some("glowEnabled"));
        assert_eq!(infos[3].choices, &["Fast", "Good", "Best"]);
    }

    #[test]
    fn test_snapshot_is_a_copy_and_revert() {
        let mut table = ParamTable::<DemoParams>::new();
        let before = table.snapshot();
        table.set("gamma", 1.5).unwrap();
        assert_eq!(before.gamma, 2.2);
        assert_eq!(table.block().gamma, 1.5);
        table.revert_to_defaults();
        assert_eq!(table.snapshot(), DemoParams::default());
    }

    #[test]
    fn test_flag_and_choice_helpers() {
        assert!(flag(1.0));
        assert!(!flag(0.0));
        assert_eq!(choice(2.4), 2);
        assert_eq!(choice(-3.0), 0);
        assert_eq!(choice(f32::NAN), 0);
    }
}
