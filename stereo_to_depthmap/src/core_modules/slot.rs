// THEORY:
// A `Slot` names one tunable value of the depth map generator. The set of slots
// is closed and every slot carries a fixed kind (boolean, integer or text) for
// the lifetime of the program. Values travel through the dynamic API as a
// `ParamValue`, a sum type over those three kinds, so any disagreement between
// a slot and the value offered for it is caught as a `TypeMismatch` instead of
// being coerced.
//
// Statically known accesses should go through the typed keys in
// `parameters::keys`, which cannot mismatch at all. The dynamic path exists for
// input that arrives by name: command lines, UI widgets, scripted sessions.

use crate::error::ParamError;
use std::fmt;
use std::str::FromStr;

/// The semantic type of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    Bool,
    Int,
    Text,
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SlotKind::Bool => "boolean",
            SlotKind::Int => "integer",
            SlotKind::Text => "text",
        };
        f.write_str(name)
    }
}

/// Every configurable value of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Verbose,
    Headless,
    OutputCodec,
    InputPath,
    OutputPath,
    StartFrame,
    EndFrame,
    NumDisparities,
    SadWindowSize,
    MinDisparity,
    PreFilterCap,
    UniquenessRatio,
    P1,
    P2,
    Disp12MaxDiff,
    SpeckleWindowSize,
    SpeckleRange,
    FullDp,
}

impl Slot {
    pub const ALL: [Slot; 18] = [
        Slot::Verbose,
        Slot::Headless,
        Slot::OutputCodec,
        Slot::InputPath,
        Slot::OutputPath,
        Slot::StartFrame,
        Slot::EndFrame,
        Slot::NumDisparities,
        Slot::SadWindowSize,
        Slot::MinDisparity,
        Slot::PreFilterCap,
        Slot::UniquenessRatio,
        Slot::P1,
        Slot::P2,
        Slot::Disp12MaxDiff,
        Slot::SpeckleWindowSize,
        Slot::SpeckleRange,
        Slot::FullDp,
    ];

    /// The stable, user-facing name of the slot.
    pub fn name(&self) -> &'static str {
        match self {
            Slot::Verbose => "verbose",
            Slot::Headless => "headless-mode",
            Slot::OutputCodec => "output-codec-code",
            Slot::InputPath => "input-path",
            Slot::OutputPath => "output-path",
            Slot::StartFrame => "start-frame",
            Slot::EndFrame => "end-frame",
            Slot::NumDisparities => "num-disparities",
            Slot::SadWindowSize => "sad-window-size",
            Slot::MinDisparity => "min-disparity",
            Slot::PreFilterCap => "pre-filter-cap",
            Slot::UniquenessRatio => "uniqueness-ratio",
            Slot::P1 => "p1",
            Slot::P2 => "p2",
            Slot::Disp12MaxDiff => "disp12-max-diff",
            Slot::SpeckleWindowSize => "speckle-window-size",
            Slot::SpeckleRange => "speckle-range",
            Slot::FullDp => "full-dynamic-programming",
        }
    }

    pub fn kind(&self) -> SlotKind {
        match self {
            Slot::Verbose | Slot::Headless | Slot::FullDp => SlotKind::Bool,
            Slot::OutputCodec | Slot::InputPath | Slot::OutputPath => SlotKind::Text,
            _ => SlotKind::Int,
        }
    }

    /// True for the eleven values handed to the stereo matcher.
    pub fn is_matcher_param(&self) -> bool {
        matches!(
            self,
            Slot::NumDisparities
                | Slot::SadWindowSize
                | Slot::MinDisparity
                | Slot::PreFilterCap
                | Slot::UniquenessRatio
                | Slot::P1
                | Slot::P2
                | Slot::Disp12MaxDiff
                | Slot::SpeckleWindowSize
                | Slot::SpeckleRange
                | Slot::FullDp
        )
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Slot {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Slot::ALL
            .into_iter()
            .find(|slot| slot.name() == wanted)
            .ok_or_else(|| ParamError::UnknownSlot(s.to_string()))
    }
}

/// A value as it crosses the dynamic store API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Bool(bool),
    Int(i32),
    Text(String),
}

impl ParamValue {
    pub fn kind(&self) -> SlotKind {
        match self {
            ParamValue::Bool(_) => SlotKind::Bool,
            ParamValue::Int(_) => SlotKind::Int,
            ParamValue::Text(_) => SlotKind::Text,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Text(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}
