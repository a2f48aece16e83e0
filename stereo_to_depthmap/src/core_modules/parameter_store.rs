// THEORY:
// The `ParameterStore` is the single piece of mutable configuration in a
// session. The command line fills it at startup, the preview window edits it
// while the user tunes the matcher, and a background export reads from it on
// every frame. It is therefore shared as an `Arc<ParameterStore>` and every
// operation takes one internal lock for its whole duration:
//
// 1.  **Atomic slots**: a `set` is never observed half-written; a `get` after a
//     `set` sees the new value.
// 2.  **Atomic passes**: `validate_all`, `reset` and `snapshot` hold the lock
//     across every slot, so no writer slips in between two rules.
// 3.  **No caching outside**: callers that need several values take a
//     `snapshot()` or `matcher_params()` instead of stitching together
//     separate reads.

use crate::core_modules::parameters::{Key, MatcherParams, Parameters};
use crate::core_modules::slot::{ParamValue, Slot, SlotKind};
use crate::core_modules::validation::Rule;
use crate::error::{DepthmapError, ParamError, Result};
use parking_lot::Mutex;
use tracing::{debug, error, warn};

/// How a configuration became valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Every rule held as given.
    Valid,
    /// Some values were auto-corrected.
    Corrected,
}

/// The thread-safe parameter store shared by the UI and the export task.
#[derive(Debug, Default)]
pub struct ParameterStore {
    params: Mutex<Parameters>,
}

impl ParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parameters(params: Parameters) -> Self {
        Self {
            params: Mutex::new(params),
        }
    }

    // --- Typed access ---

    pub fn read<T>(&self, key: Key<T>) -> T {
        key.read(&*self.params.lock())
    }

    pub fn write<T>(&self, key: Key<T>, value: T) {
        key.write(&mut *self.params.lock(), value);
        debug!(slot = %key.slot(), "parameter updated");
    }

    /// Applies several edits under one lock acquisition.
    pub fn update<R>(&self, edit: impl FnOnce(&mut Parameters) -> R) -> R {
        edit(&mut *self.params.lock())
    }

    /// A consistent copy of every slot.
    pub fn snapshot(&self) -> Parameters {
        self.params.lock().clone()
    }

    /// A consistent copy of the eleven values the stereo matcher needs.
    pub fn matcher_params(&self) -> MatcherParams {
        self.params.lock().matcher
    }

    // --- Dynamic access ---

    pub fn get(&self, slot: Slot) -> ParamValue {
        self.params.lock().get(slot)
    }

    pub fn set(&self, slot: Slot, value: impl Into<ParamValue>) -> std::result::Result<(), ParamError> {
        let value = value.into();
        debug!(%slot, %value, "setting parameter");
        self.params.lock().set(slot, value)
    }

    pub fn get_by_name(&self, name: &str) -> std::result::Result<ParamValue, ParamError> {
        Ok(self.get(name.parse()?))
    }

    pub fn set_by_name(
        &self,
        name: &str,
        value: impl Into<ParamValue>,
    ) -> std::result::Result<(), ParamError> {
        self.set(name.parse()?, value)
    }

    pub fn get_bool(&self, slot: Slot) -> std::result::Result<bool, ParamError> {
        let value = self.get(slot);
        value.as_bool().ok_or_else(|| mismatch(slot, SlotKind::Bool))
    }

    pub fn get_int(&self, slot: Slot) -> std::result::Result<i32, ParamError> {
        let value = self.get(slot);
        value.as_int().ok_or_else(|| mismatch(slot, SlotKind::Int))
    }

    pub fn get_text(&self, slot: Slot) -> std::result::Result<String, ParamError> {
        match self.get(slot) {
            ParamValue::Text(text) => Ok(text),
            _ => Err(mismatch(slot, SlotKind::Text)),
        }
    }

    /// Restores every slot to its default.
    pub fn reset(&self) {
        *self.params.lock() = Parameters::default();
        debug!("parameters reset to defaults");
    }

    // --- Validation ---

    /// Applies the rule guarding `slot`. Slots without a rule are always valid.
    pub fn validate(&self, slot: Slot, correct: bool) -> bool {
        match Rule::for_slot(slot) {
            Some(rule) => self.validate_rule(rule, correct),
            None => true,
        }
    }

    pub fn validate_rule(&self, rule: Rule, correct: bool) -> bool {
        rule.apply(&mut *self.params.lock(), correct)
    }

    /// Applies every rule in `Rule::ALL` order and returns the conjunction.
    ///
    /// All rules run even after a failure so that correction is complete.
    pub fn validate_all(&self, correct: bool) -> bool {
        let mut params = self.params.lock();
        Rule::ALL
            .iter()
            .fold(true, |valid, rule| rule.apply(&mut *params, correct) && valid)
    }

    /// The rules the current values break.
    pub fn violations(&self) -> Vec<Rule> {
        let params = self.params.lock();
        Rule::ALL
            .into_iter()
            .filter(|rule| !rule.is_satisfied(&params))
            .collect()
    }

    /// Validates, auto-corrects when needed, and rejects what cannot be fixed.
    pub fn ensure_valid(&self) -> Result<Readiness> {
        if self.validate_all(false) {
            return Ok(Readiness::Valid);
        }

        let broken = self.violations();
        warn!(rules = ?broken, "invalid parameter settings, attempting to correct them");

        if self.validate_all(true) {
            warn!("parameter settings corrected, continuing");
            return Ok(Readiness::Corrected);
        }

        let slots: Vec<Slot> = self
            .violations()
            .iter()
            .flat_map(|rule| rule.slots().iter().copied())
            .collect();
        error!(?slots, "parameter settings cannot be corrected");
        Err(DepthmapError::InvalidConfiguration { slots })
    }
}

fn mismatch(slot: Slot, requested: SlotKind) -> ParamError {
    ParamError::TypeMismatch {
        slot,
        expected: slot.kind(),
        found: requested,
    }
}
