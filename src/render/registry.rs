// RustPixel
// copyright zipxing@hotmail.com 2022～2025

//! # Effect Registry
//!
//! Ordered list of presets with exactly one active. Index 0 is always the
//! passthrough preset; when a preset fails to activate it is disabled for
//! the rest of the session and the registry falls back to index 0.

use crate::error::{PipelineError, Result};
use crate::render::device::RenderDevice;
use crate::render::effect::EffectPreset;
use crate::render::presets::Passthrough;
use log::{info, warn};

/// Fallback preset index.
pub const FALLBACK_PRESET: usize = 0;

/// A preset that failed to activate, reported once.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub preset: String,
    pub message: String,
}

struct Entry {
    preset: Box<dyn EffectPreset>,
    disabled: bool,
}

pub struct EffectRegistry {
    entries: Vec<Entry>,
    current: Option<usize>,
    diagnostics: Vec<Diagnostic>,
}

impl Default for EffectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EffectRegistry {
    /// A registry holding only the passthrough preset, nothing active yet.
    pub fn new() -> Self {
        Self {
            entries: vec![Entry {
                preset: Box::new(Passthrough::new()),
                disabled: false,
            }],
            current: None,
            diagnostics: vec![],
        }
    }

    /// Append a preset and return its index.
    pub fn register(&mut self, preset: Box<dyn EffectPreset>) -> usize {
        info!("EffectRegistry: register {:?}", preset.name());
        self.entries.push(Entry {
            preset,
            disabled: false,
        });
        self.entries.len() - 1
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.preset.name()).collect()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.preset.name() == name)
    }

    pub fn preset(&self, index: usize) -> Option<&dyn EffectPreset> {
        self.entries.get(index).map(|e| e.preset.as_ref())
    }

    pub fn preset_mut(&mut self, index: usize) -> Option<&mut (dyn EffectPreset + 'static)> {
        self.entries.get_mut(index).map(|e| e.preset.as_mut())
    }

    pub fn is_disabled(&self, index: usize) -> bool {
        self.entries.get(index).is_some_and(|e| e.disabled)
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current(&self) -> Option<&dyn EffectPreset> {
        self.current.and_then(|i| self.preset(i))
    }

    pub fn current_mut(&mut self) -> Option<&mut (dyn EffectPreset + 'static)> {
        match self.current {
            Some(i) => self.preset_mut(i),
            None => None,
        }
    }

    /// Drain the activation failures recorded since the last call.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Retire the active preset, leaving none active.
    pub fn deactivate(&mut self, device: &mut dyn RenderDevice) {
        if let Some(i) = self.current.take() {
            self.entries[i].preset.retire(device);
        }
    }

    /// Retire the active preset and activate `index`. Returns the index that
    /// ended up active, which is the fallback when `index` is out of range,
    /// disabled, or fails to activate. Fails with `Setup` once the fallback
    /// itself is disabled.
    pub fn select(&mut self, device: &mut dyn RenderDevice, index: usize) -> Result<usize> {
        self.deactivate(device);

        let target = if index >= self.entries.len() {
            warn!(
                "EffectRegistry: preset index {} out of range, using {}",
                index, FALLBACK_PRESET
            );
            FALLBACK_PRESET
        } else if self.entries[index].disabled {
            FALLBACK_PRESET
        } else {
            index
        };

        if self.entries[target].disabled {
            // only the fallback gets here; it failed before and was reported then
            return Err(self.fallback_unavailable());
        }

        match self.entries[target].preset.activate(device) {
            Ok(()) => {
                info!(
                    "EffectRegistry: active preset {} {:?}",
                    target,
                    self.entries[target].preset.name()
                );
                self.current = Some(target);
                return Ok(target);
            }
            Err(e) => self.disable(device, target, &e),
        }

        if target != FALLBACK_PRESET && !self.entries[FALLBACK_PRESET].disabled {
            match self.entries[FALLBACK_PRESET].preset.activate(device) {
                Ok(()) => {
                    self.current = Some(FALLBACK_PRESET);
                    return Ok(FALLBACK_PRESET);
                }
                Err(e) => self.disable(device, FALLBACK_PRESET, &e),
            }
        }
        Err(self.fallback_unavailable())
    }

    fn fallback_unavailable(&self) -> PipelineError {
        PipelineError::Setup(format!(
            "fallback preset {:?} failed to activate",
            self.entries[FALLBACK_PRESET].preset.name()
        ))
    }

    fn disable(&mut self, device: &mut dyn RenderDevice, index: usize, error: &PipelineError) {
        let entry = &mut self.entries[index];
        entry.preset.retire(device);
        entry.disabled = true;
        let name = entry.preset.name();
        warn!("EffectRegistry: preset {:?} disabled: {}", name, error);
        self.diagnostics.push(Diagnostic {
            preset: name.to_string(),
            message: error.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animated::AnimatedValue;
    use crate::render::device::CpuDevice;
    use crate::render::effect::FrameInput;
    use crate::render::params::ParamSurface;
    use crate::render::pass::{CommandList, PassKind};
    use crate::render::presets::CompositeCrt;
    use std::cell::RefCell;
    use std::rc::Rc;

    crate::param_block! {
        struct NoParams, enum NoField {
            Unused unused: "Unused", "unused", default 0.0, range 0.0, 1.0, step 1.0;
        }
    }

    struct Recorder {
        name: &'static str,
        log: Rc<RefCell<Vec<String>>>,
        fail: bool,
        params: crate::render::params::ParamTable<NoParams>,
        transition: AnimatedValue<f32>,
        active: bool,
    }

    impl Recorder {
        fn boxed(name: &'static str, log: &Rc<RefCell<Vec<String>>>, fail: bool) -> Box<Self> {
            Box::new(Self {
                name,
                log: log.clone(),
                fail,
                params: Default::default(),
                transition: AnimatedValue::default(),
                active: false,
            })
        }
    }

    impl EffectPreset for Recorder {
        fn name(&self) -> &'static str {
            self.name
        }
        fn params(&self) -> &dyn ParamSurface {
            &self.params
        }
        fn params_mut(&mut self) -> &mut dyn ParamSurface {
            &mut self.params
        }
        fn transition(&self) -> &AnimatedValue<f32> {
            &self.transition
        }
        fn transition_mut(&mut self) -> &mut AnimatedValue<f32> {
            &mut self.transition
        }
        fn is_active(&self) -> bool {
            self.active
        }
        fn activate(&mut self, _device: &mut dyn RenderDevice) -> Result<()> {
            self.log.borrow_mut().push(format!("activate {}", self.name));
            if self.fail {
                return Err(PipelineError::Setup("kernel".into()));
            }
            self.active = true;
            Ok(())
        }
        fn retire(&mut self, _device: &mut dyn RenderDevice) {
            self.log.borrow_mut().push(format!("retire {}", self.name));
            self.active = false;
        }
        fn encode(
            &mut self,
            _device: &mut dyn RenderDevice,
            _frame: &FrameInput,
            _commands: &mut CommandList,
        ) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_passthrough_is_index_zero() {
        let registry = EffectRegistry::new();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.names(), vec!["Passthrough"]);
        assert!(registry.current().is_none());
    }

    #[test]
    fn test_retire_before_activate() {
        let log = Rc::new(RefCell::new(vec![]));
        let mut device = CpuDevice::new();
        let mut registry = EffectRegistry::new();
        let a = registry.register(Recorder::boxed("a", &log, false));
        let b = registry.register(Recorder::boxed("b", &log, false));
        assert_eq!(registry.select(&mut device, a).unwrap(), a);
        assert_eq!(registry.select(&mut device, b).unwrap(), b);
        assert_eq!(*log.borrow(), vec!["activate a", "retire a", "activate b"]);
        assert_eq!(registry.current().unwrap().name(), "b");
        assert!(registry.preset(b).unwrap().is_active());
        assert!(!registry.preset(a).unwrap().is_active());
    }

    #[test]
    fn test_failed_activation_falls_back_once() {
        let log = Rc::new(RefCell::new(vec![]));
        let mut device = CpuDevice::new();
        let mut registry = EffectRegistry::new();
        let bad = registry.register(Recorder::boxed("bad", &log, true));

        assert_eq!(registry.select(&mut device, bad).unwrap(), FALLBACK_PRESET);
        assert_eq!(registry.current_index(), Some(FALLBACK_PRESET));
        assert!(registry.is_disabled(bad));
        let diags = registry.take_diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].preset, "bad");

        assert_eq!(registry.select(&mut device, bad).unwrap(), FALLBACK_PRESET);
        assert!(registry.take_diagnostics().is_empty());
        assert_eq!(
            log.borrow().iter().filter(|l| *l == "activate bad").count(),
            1
        );
    }

    #[test]
    fn test_kernel_failure_disables_crt() {
        let mut device = CpuDevice::new();
        device.fail_compile(PassKind::CrtComposite);
        let mut registry = EffectRegistry::new();
        let crt = registry.register(Box::new(CompositeCrt::new()));
        assert_eq!(registry.select(&mut device, crt).unwrap(), FALLBACK_PRESET);
        assert_eq!(registry.current().unwrap().name(), "Passthrough");
        assert_eq!(registry.take_diagnostics().len(), 1);
    }

    #[test]
    fn test_broken_fallback_reported_once() {
        let mut device = CpuDevice::new();
        device.fail_compile(PassKind::ResampleBilinear);
        let mut registry = EffectRegistry::new();
        let crt = registry.register(Box::new(CompositeCrt::new()));

        assert!(matches!(
            registry.select(&mut device, crt),
            Err(PipelineError::Setup(_))
        ));
        for _ in 0..3 {
            assert!(matches!(
                registry.select(&mut device, FALLBACK_PRESET),
                Err(PipelineError::Setup(_))
            ));
        }
        let diags = registry.take_diagnostics();
        let names: Vec<&str> = diags.iter().map(|d| d.preset.as_str()).collect();
        assert_eq!(names, vec!["Composite CRT", "Passthrough"]);
        assert!(registry.is_disabled(FALLBACK_PRESET));
        assert!(registry.current().is_none());
    }

    #[test]
    fn test_out_of_range_uses_fallback() {
        let mut device = CpuDevice::new();
        let mut registry = EffectRegistry::new();
        assert_eq!(registry.select(&mut device, 42).unwrap(), FALLBACK_PRESET);
        assert!(registry.take_diagnostics().is_empty());
        assert_eq!(registry.index_of("Passthrough"), Some(0));
    }
}
