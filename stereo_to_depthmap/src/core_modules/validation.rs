// THEORY:
// Each `Rule` is a pure predicate over `Parameters` plus a deterministic
// correction that moves the record toward compliance. Rules are the unit of
// validation rather than slots: P1 and P2 share one rule so that correcting
// either slot applies the same transformation, and the headless rule spans the
// headless flag and both file paths.
//
// Corrections are idempotent. Running `apply(true)` on an already corrected
// record changes nothing and reports the same outcome, which makes the order in
// which the UI or the command line trigger them irrelevant.

use crate::core_modules::parameters::{DEFAULT_OUTPUT_PATH, Parameters, Smoothness};
use crate::core_modules::slot::Slot;

/// One validation rule. `Rule::ALL` is the order `validate_all` uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    /// Headless runs need both an input and an output path.
    HeadlessPaths,
    NumDisparities,
    SadWindowSize,
    Smoothness,
    MinDisparity,
    PreFilterCap,
    UniquenessRatio,
    Disp12MaxDiff,
    SpeckleWindowSize,
    SpeckleRange,
    StartFrame,
    EndFrame,
}

impl Rule {
    pub const ALL: [Rule; 12] = [
        Rule::HeadlessPaths,
        Rule::NumDisparities,
        Rule::SadWindowSize,
        Rule::Smoothness,
        Rule::MinDisparity,
        Rule::PreFilterCap,
        Rule::UniquenessRatio,
        Rule::Disp12MaxDiff,
        Rule::SpeckleWindowSize,
        Rule::SpeckleRange,
        Rule::StartFrame,
        Rule::EndFrame,
    ];

    /// The rule guarding `slot`, if it has one.
    pub fn for_slot(slot: Slot) -> Option<Rule> {
        match slot {
            Slot::Headless | Slot::InputPath | Slot::OutputPath => Some(Rule::HeadlessPaths),
            Slot::NumDisparities => Some(Rule::NumDisparities),
            Slot::SadWindowSize => Some(Rule::SadWindowSize),
            Slot::P1 | Slot::P2 => Some(Rule::Smoothness),
            Slot::MinDisparity => Some(Rule::MinDisparity),
            Slot::PreFilterCap => Some(Rule::PreFilterCap),
            Slot::UniquenessRatio => Some(Rule::UniquenessRatio),
            Slot::Disp12MaxDiff => Some(Rule::Disp12MaxDiff),
            Slot::SpeckleWindowSize => Some(Rule::SpeckleWindowSize),
            Slot::SpeckleRange => Some(Rule::SpeckleRange),
            Slot::StartFrame => Some(Rule::StartFrame),
            Slot::EndFrame => Some(Rule::EndFrame),
            Slot::Verbose | Slot::FullDp | Slot::OutputCodec => None,
        }
    }

    /// The slots a diagnostic should name when this rule fails.
    pub fn slots(&self) -> &'static [Slot] {
        match self {
            Rule::HeadlessPaths => &[Slot::Headless, Slot::InputPath, Slot::OutputPath],
            Rule::NumDisparities => &[Slot::NumDisparities],
            Rule::SadWindowSize => &[Slot::SadWindowSize],
            Rule::Smoothness => &[Slot::P1, Slot::P2],
            Rule::MinDisparity => &[Slot::MinDisparity],
            Rule::PreFilterCap => &[Slot::PreFilterCap],
            Rule::UniquenessRatio => &[Slot::UniquenessRatio],
            Rule::Disp12MaxDiff => &[Slot::Disp12MaxDiff],
            Rule::SpeckleWindowSize => &[Slot::SpeckleWindowSize],
            Rule::SpeckleRange => &[Slot::SpeckleRange],
            Rule::StartFrame => &[Slot::StartFrame],
            Rule::EndFrame => &[Slot::EndFrame],
        }
    }

    pub fn is_satisfied(&self, p: &Parameters) -> bool {
        let m = &p.matcher;
        match self {
            Rule::HeadlessPaths => {
                !p.headless || (!p.input_path.is_empty() && !p.output_path.is_empty())
            }
            Rule::NumDisparities => m.num_disparities >= 0 && m.num_disparities % 16 == 0,
            Rule::SadWindowSize => m.sad_window_size >= 1 && m.sad_window_size % 2 == 1,
            Rule::Smoothness => smoothness_is_valid(m.smoothness),
            Rule::MinDisparity => m.min_disparity >= 0,
            Rule::PreFilterCap => m.pre_filter_cap >= 0,
            Rule::UniquenessRatio => m.uniqueness_ratio >= 0,
            Rule::Disp12MaxDiff => m.disp12_max_diff >= -1,
            Rule::SpeckleWindowSize => m.speckle_window_size >= 0,
            Rule::SpeckleRange => m.speckle_range >= 0,
            Rule::StartFrame => p.start_frame >= 0,
            Rule::EndFrame => p.end_frame >= 0,
        }
    }

    /// Checks the rule and, when `correct` is set, repairs the record first.
    ///
    /// Returns whether the record satisfies the rule afterwards.
    pub fn apply(&self, p: &mut Parameters, correct: bool) -> bool {
        if self.is_satisfied(p) {
            return true;
        }
        if !correct {
            return false;
        }

        let m = &mut p.matcher;
        match self {
            Rule::HeadlessPaths => {
                if p.output_path.is_empty() {
                    p.output_path = DEFAULT_OUTPUT_PATH.to_string();
                }
                // There is no stdin fallback, an empty input stays invalid.
            }
            Rule::NumDisparities => m.num_disparities = corrected_num_disparities(m.num_disparities),
            Rule::SadWindowSize => m.sad_window_size = corrected_sad_window_size(m.sad_window_size),
            Rule::Smoothness => m.smoothness = corrected_smoothness(m.smoothness),
            Rule::MinDisparity => m.min_disparity = 0,
            Rule::PreFilterCap => m.pre_filter_cap = 0,
            Rule::UniquenessRatio => m.uniqueness_ratio = 0,
            // The floor is -1 but the repaired value is 0.
            Rule::Disp12MaxDiff => m.disp12_max_diff = 0,
            Rule::SpeckleWindowSize => m.speckle_window_size = 0,
            Rule::SpeckleRange => m.speckle_range = 0,
            Rule::StartFrame => p.start_frame = 0,
            Rule::EndFrame => p.end_frame = 0,
        }
        self.is_satisfied(p)
    }
}

fn smoothness_is_valid(s: Smoothness) -> bool {
    (s.p1 == 0 && s.p2 == 0) || (s.p1 > 0 && s.p2 > 1 && s.p2 > s.p1)
}

/// Rounds down to a non-negative multiple of 16.
pub fn corrected_num_disparities(value: i32) -> i32 {
    (value.max(0) / 16) * 16
}

/// Smallest odd value >= 1 reachable by bumping even values up.
pub fn corrected_sad_window_size(value: i32) -> i32 {
    let odd = if value % 2 == 0 { value.saturating_add(1) } else { value };
    if odd < 1 { 1 } else { odd }
}

pub fn corrected_smoothness(s: Smoothness) -> Smoothness {
    let p1 = s.p1.max(0);
    let floor = if p1 > 0 { p1.saturating_add(1) } else { 0 };
    let p2 = s.p2.max(floor);
    Smoothness { p1, p2 }
}
