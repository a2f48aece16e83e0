// THEORY:
// `Parameters` is the plain, unlocked record behind the parameter store. It is
// a regular struct with one typed field per slot, which keeps the matcher's
// eleven values together in `MatcherParams` and the coupled P1/P2 pair together
// in `Smoothness`. The store wraps this record in a mutex; everything in this
// file assumes the caller already holds exclusive access.
//
// Two ways in:
// 1.  **Typed keys** (`keys::NUM_DISPARITIES`, ...): a `Key<T>` is bound to
//     exactly one field at compile time, so a get or set through a key cannot
//     disagree on type.
// 2.  **Dynamic access** by `Slot` with a `ParamValue`: checked at runtime and
//     rejected with `TypeMismatch` when the value kind is wrong.

use crate::core_modules::codec::FourCc;
use crate::core_modules::slot::{ParamValue, Slot};
use crate::error::ParamError;
use std::marker::PhantomData;

pub const DEFAULT_OUTPUT_PATH: &str = "output.avi";
pub const DEFAULT_NUM_DISPARITIES: i32 = 16;
pub const DEFAULT_SAD_WINDOW_SIZE: i32 = 15;

/// The P1/P2 smoothness penalties of semi-global matching.
///
/// They are only meaningful together: either both are zero (the matcher picks
/// its own) or `0 < P1 < P2` with `P2 > 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Smoothness {
    pub p1: i32,
    pub p2: i32,
}

/// The values handed to the stereo matcher for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatcherParams {
    /// Width of the disparity search range in pixels. Multiple of 16.
    pub num_disparities: i32,
    /// Side length of the matched block. Odd.
    pub sad_window_size: i32,
    pub min_disparity: i32,
    /// Truncation value for the prefiltered pixels.
    pub pre_filter_cap: i32,
    pub uniqueness_ratio: i32,
    pub smoothness: Smoothness,
    /// Maximum allowed difference in the left-right consistency check.
    pub disp12_max_diff: i32,
    pub speckle_window_size: i32,
    pub speckle_range: i32,
    /// Run the full two-pass dynamic programming variant.
    pub full_dp: bool,
}

impl Default for MatcherParams {
    fn default() -> Self {
        Self {
            num_disparities: DEFAULT_NUM_DISPARITIES,
            sad_window_size: DEFAULT_SAD_WINDOW_SIZE,
            min_disparity: 0,
            pre_filter_cap: 0,
            uniqueness_ratio: 0,
            smoothness: Smoothness::default(),
            disp12_max_diff: 0,
            speckle_window_size: 0,
            speckle_range: 0,
            full_dp: false,
        }
    }
}

/// One value per slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameters {
    pub verbose: bool,
    /// Run without any window; requires both paths.
    pub headless: bool,
    pub codec: FourCc,
    pub input_path: String,
    pub output_path: String,
    /// First exported frame, 1-indexed. 0 means "from the first frame".
    pub start_frame: i32,
    /// Last exported frame, 1-indexed. 0 means "to the last frame".
    pub end_frame: i32,
    pub matcher: MatcherParams,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            verbose: false,
            headless: false,
            codec: FourCc::DEFAULT,
            input_path: String::new(),
            output_path: DEFAULT_OUTPUT_PATH.to_string(),
            start_frame: 0,
            end_frame: 0,
            matcher: MatcherParams::default(),
        }
    }
}

impl Parameters {
    pub fn get(&self, slot: Slot) -> ParamValue {
        let m = &self.matcher;
        match slot {
            Slot::Verbose => ParamValue::Bool(self.verbose),
            Slot::Headless => ParamValue::Bool(self.headless),
            Slot::OutputCodec => ParamValue::Text(self.codec.to_string()),
            Slot::InputPath => ParamValue::Text(self.input_path.clone()),
            Slot::OutputPath => ParamValue::Text(self.output_path.clone()),
            Slot::StartFrame => ParamValue::Int(self.start_frame),
            Slot::EndFrame => ParamValue::Int(self.end_frame),
            Slot::NumDisparities => ParamValue::Int(m.num_disparities),
            Slot::SadWindowSize => ParamValue::Int(m.sad_window_size),
            Slot::MinDisparity => ParamValue::Int(m.min_disparity),
            Slot::PreFilterCap => ParamValue::Int(m.pre_filter_cap),
            Slot::UniquenessRatio => ParamValue::Int(m.uniqueness_ratio),
            Slot::P1 => ParamValue::Int(m.smoothness.p1),
            Slot::P2 => ParamValue::Int(m.smoothness.p2),
            Slot::Disp12MaxDiff => ParamValue::Int(m.disp12_max_diff),
            Slot::SpeckleWindowSize => ParamValue::Int(m.speckle_window_size),
            Slot::SpeckleRange => ParamValue::Int(m.speckle_range),
            Slot::FullDp => ParamValue::Bool(m.full_dp),
        }
    }

    /// Stores `value` after checking it against the slot's kind.
    ///
    /// Nothing is modified when an error is returned.
    pub fn set(&mut self, slot: Slot, value: ParamValue) -> Result<(), ParamError> {
        if value.kind() != slot.kind() {
            return Err(ParamError::TypeMismatch {
                slot,
                expected: slot.kind(),
                found: value.kind(),
            });
        }

        match (slot, value) {
            (Slot::Verbose, ParamValue::Bool(v)) => self.verbose = v,
            (Slot::Headless, ParamValue::Bool(v)) => self.headless = v,
            (Slot::FullDp, ParamValue::Bool(v)) => self.matcher.full_dp = v,
            (Slot::OutputCodec, ParamValue::Text(v)) => self.codec = FourCc::parse(&v)?,
            (Slot::InputPath, ParamValue::Text(v)) => self.input_path = v,
            (Slot::OutputPath, ParamValue::Text(v)) => self.output_path = v,
            (slot, ParamValue::Int(v)) => *self.int_field_mut(slot) = v,
            // Unreachable after the kind check.
            (slot, value) => {
                return Err(ParamError::TypeMismatch {
                    slot,
                    expected: slot.kind(),
                    found: value.kind(),
                });
            }
        }
        Ok(())
    }

    fn int_field_mut(&mut self, slot: Slot) -> &mut i32 {
        let m = &mut self.matcher;
        match slot {
            Slot::StartFrame => &mut self.start_frame,
            Slot::EndFrame => &mut self.end_frame,
            Slot::NumDisparities => &mut m.num_disparities,
            Slot::SadWindowSize => &mut m.sad_window_size,
            Slot::MinDisparity => &mut m.min_disparity,
            Slot::PreFilterCap => &mut m.pre_filter_cap,
            Slot::UniquenessRatio => &mut m.uniqueness_ratio,
            Slot::P1 => &mut m.smoothness.p1,
            Slot::P2 => &mut m.smoothness.p2,
            Slot::Disp12MaxDiff => &mut m.disp12_max_diff,
            Slot::SpeckleWindowSize => &mut m.speckle_window_size,
            Slot::SpeckleRange => &mut m.speckle_range,
            other => unreachable!("{other} is not an integer slot"),
        }
    }
}

/// A compile-time binding between a slot and the Rust type of its field.
pub struct Key<T> {
    slot: Slot,
    read: fn(&Parameters) -> T,
    write: fn(&mut Parameters, T),
    _value: PhantomData<fn() -> T>,
}

impl<T> Clone for Key<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Key<T> {}

impl<T> Key<T> {
    pub fn slot(&self) -> Slot {
        self.slot
    }

    pub fn read(&self, params: &Parameters) -> T {
        (self.read)(params)
    }

    pub fn write(&self, params: &mut Parameters, value: T) {
        (self.write)(params, value)
    }
}

/// Typed keys, one per slot.
pub mod keys {
    use super::*;

    pub const VERBOSE: Key<bool> = Key {
        slot: Slot::Verbose,
        read: |p| p.verbose,
        write: |p, v| p.verbose = v,
        _value: PhantomData,
    };
    pub const HEADLESS: Key<bool> = Key {
        slot: Slot::Headless,
        read: |p| p.headless,
        write: |p, v| p.headless = v,
        _value: PhantomData,
    };
    pub const OUTPUT_CODEC: Key<FourCc> = Key {
        slot: Slot::OutputCodec,
        read: |p| p.codec,
        write: |p, v| p.codec = v,
        _value: PhantomData,
    };
    pub const INPUT_PATH: Key<String> = Key {
        slot: Slot::InputPath,
        read: |p| p.input_path.clone(),
        write: |p, v| p.input_path = v,
        _value: PhantomData,
    };
    pub const OUTPUT_PATH: Key<String> = Key {
        slot: Slot::OutputPath,
        read: |p| p.output_path.clone(),
        write: |p, v| p.output_path = v,
        _value: PhantomData,
    };
    pub const START_FRAME: Key<i32> = Key {
        slot: Slot::StartFrame,
        read: |p| p.start_frame,
        write: |p, v| p.start_frame = v,
        _value: PhantomData,
    };
    pub const END_FRAME: Key<i32> = Key {
        slot: Slot::EndFrame,
        read: |p| p.end_frame,
        write: |p, v| p.end_frame = v,
        _value: PhantomData,
    };
    pub const NUM_DISPARITIES: Key<i32> = Key {
        slot: Slot::NumDisparities,
        read: |p| p.matcher.num_disparities,
        write: |p, v| p.matcher.num_disparities = v,
        _value: PhantomData,
    };
    pub const SAD_WINDOW_SIZE: Key<i32> = Key {
        slot: Slot::SadWindowSize,
        read: |p| p.matcher.sad_window_size,
        write: |p, v| p.matcher.sad_window_size = v,
        _value: PhantomData,
    };
    pub const MIN_DISPARITY: Key<i32> = Key {
        slot: Slot::MinDisparity,
        read: |p| p.matcher.min_disparity,
        write: |p, v| p.matcher.min_disparity = v,
        _value: PhantomData,
    };
    pub const PRE_FILTER_CAP: Key<i32> = Key {
        slot: Slot::PreFilterCap,
        read: |p| p.matcher.pre_filter_cap,
        write: |p, v| p.matcher.pre_filter_cap = v,
        _value: PhantomData,
    };
    pub const UNIQUENESS_RATIO: Key<i32> = Key {
        slot: Slot::UniquenessRatio,
        read: |p| p.matcher.uniqueness_ratio,
        write: |p, v| p.matcher.uniqueness_ratio = v,
        _value: PhantomData,
    };
    pub const P1: Key<i32> = Key {
        slot: Slot::P1,
        read: |p| p.matcher.smoothness.p1,
        write: |p, v| p.matcher.smoothness.p1 = v,
        _value: PhantomData,
    };
    pub const P2: Key<i32> = Key {
        slot: Slot::P2,
        read: |p| p.matcher.smoothness.p2,
        write: |p, v| p.matcher.smoothness.p2 = v,
        _value: PhantomData,
    };
    pub const DISP12_MAX_DIFF: Key<i32> = Key {
        slot: Slot::Disp12MaxDiff,
        read: |p| p.matcher.disp12_max_diff,
        write: |p, v| p.matcher.disp12_max_diff = v,
        _value: PhantomData,
    };
    pub const SPECKLE_WINDOW_SIZE: Key<i32> = Key {
        slot: Slot::SpeckleWindowSize,
        read: |p| p.matcher.speckle_window_size,
        write: |p, v| p.matcher.speckle_window_size = v,
        _value: PhantomData,
    };
    pub const SPECKLE_RANGE: Key<i32> = Key {
        slot: Slot::SpeckleRange,
        read: |p| p.matcher.speckle_range,
        write: |p, v| p.matcher.speckle_range = v,
        _value: PhantomData,
    };
    pub const FULL_DP: Key<bool> = Key {
        slot: Slot::FullDp,
        read: |p| p.matcher.full_dp,
        write: |p, v| p.matcher.full_dp = v,
        _value: PhantomData,
    };
}
