// THEORY:
// Errors are split along the lines of who can fix them. `ParamError` covers
// programmer mistakes when addressing the parameter store (wrong slot name,
// wrong value kind, malformed codec code); those abort the operation at once.
// `DepthmapError` is what the pipeline and the runner surface to the user:
// a configuration that auto-correction could not repair, a source or sink
// that could not be opened, or a frame that could not be read.
//
// Validation itself never produces an error. Rules report `bool` and the
// caller decides whether the outcome is fatal.

use crate::core_modules::slot::{Slot, SlotKind};
use std::path::PathBuf;
use thiserror::Error;

/// Misuse of the parameter store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParamError {
    #[error("unknown parameter slot '{0}'")]
    UnknownSlot(String),

    #[error("slot '{slot}' holds {expected} values, got {found}")]
    TypeMismatch {
        slot: Slot,
        expected: SlotKind,
        found: SlotKind,
    },

    #[error("invalid four character code '{code}': {reason}")]
    InvalidCodec { code: String, reason: &'static str },
}

/// Everything that can stop a depth map run.
#[derive(Error, Debug)]
pub enum DepthmapError {
    #[error(transparent)]
    Param(#[from] ParamError),

    #[error("configuration is invalid and cannot be corrected (offending slots: {})", format_slots(.slots))]
    InvalidConfiguration { slots: Vec<Slot> },

    #[error("input '{}' cannot be opened for reading", .0.display())]
    SourceUnavailable(PathBuf),

    #[error("output '{}' cannot be opened for writing", .0.display())]
    SinkUnavailable(PathBuf),

    #[error("input contains no frames")]
    EmptySource,

    #[error("frame {0} could not be read from the input")]
    FrameUnavailable(u32),

    #[error("frame range {start}..={end} is empty or out of bounds")]
    InvalidRange { start: u32, end: u32 },

    #[error("stereo matcher failed: {0}")]
    Matcher(String),

    #[error("frame sink failed: {0}")]
    Sink(String),

    #[error("export task ended abnormally: {0}")]
    ExportAborted(String),
}

pub type Result<T> = std::result::Result<T, DepthmapError>;

fn format_slots(slots: &[Slot]) -> String {
    slots
        .iter()
        .map(|slot| slot.name())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_configuration_names_every_slot() {
        let err = DepthmapError::InvalidConfiguration {
            slots: vec![Slot::Headless, Slot::InputPath],
        };
        let message = err.to_string();
        assert!(message.contains("headless-mode"));
        assert!(message.contains("input-path"));
    }

    #[test]
    fn type_mismatch_reports_both_kinds() {
        let err = ParamError::TypeMismatch {
            slot: Slot::NumDisparities,
            expected: SlotKind::Int,
            found: SlotKind::Text,
        };
        assert_eq!(
            err.to_string(),
            "slot 'num-disparities' holds integer values, got text"
        );
    }
}
