// THEORY:
// `stereo_to_depthmap` is the engine behind the depth map runner. It exposes
// three layers, leaves first:
//
// 1.  **Parameters** (`core_modules::parameter_store`): every tunable value
//     of a session behind one lock, with per-rule validation and
//     auto-correction.
// 2.  **Clip range** (`core_modules::clip_range`): the `(start, current, end)`
//     state machine a preview uses to pick the exported frames.
// 3.  **Pipeline** (`pipeline`, `export_pipeline`): frame-by-frame depth map
//     generation over pluggable source, sink and matcher collaborators, in the
//     foreground or as a cancellable background export.
//
// No video library is linked here. Frames are `image` buffers and the concrete
// OpenCV adapters live in the runner binary.

pub mod core_modules;
pub mod error;
pub mod export_pipeline;
pub mod pipeline;

pub use core_modules::clip_range::{ClipCoordinator, ClipRange};
pub use core_modules::codec::FourCc;
pub use core_modules::disparity::{DisparityMap, Frame};
pub use core_modules::parameter_store::{ParameterStore, Readiness};
pub use core_modules::parameters::{Key, MatcherParams, Parameters, Smoothness, keys};
pub use core_modules::slot::{ParamValue, Slot, SlotKind};
pub use core_modules::validation::Rule;
pub use error::{DepthmapError, ParamError, Result};
