// THEORY:
// The clip range is what the user exports: an inclusive interval of 1-indexed
// frames `[start, end]` inside `[1, total_frames]`. Alongside it the preview
// keeps a `current` frame, the scrubber position, which may wander outside the
// export interval on purpose.
//
// Key architectural principles:
// 1.  **Clamp, never reject**: every transition accepts any integer and clamps
//     it, so `1 <= start <= end <= total` and `1 <= current <= total` hold after
//     every call no matter what a widget sends.
// 2.  **Each edit moves one value**: `set_start` never drags `end` along and
//     vice versa. A start beyond the end is pinned to the end instead.
// 3.  **Explicit commit**: the live bounds only reach the parameter store when
//     the user confirms, so scrubbing never rewrites the export configuration.
//
// `current` is reset to the first frame whenever a new source is opened.

use crate::core_modules::parameter_store::ParameterStore;
use crate::core_modules::parameters::keys;
use crate::error::{DepthmapError, Result};
use std::sync::Arc;
use tracing::debug;

/// The `(start, current, end)` triple for one opened source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipRange {
    total_frames: u32,
    start: u32,
    current: u32,
    end: u32,
}

impl ClipRange {
    /// The full range of a source with `total_frames` frames.
    pub fn new(total_frames: u32) -> Result<Self> {
        if total_frames == 0 {
            return Err(DepthmapError::EmptySource);
        }
        Ok(Self {
            total_frames,
            start: 1,
            current: 1,
            end: total_frames,
        })
    }

    /// A range seeded from stored bounds, clamped into the source.
    ///
    /// A bound of 0 or less means "unset": the first frame for `start`, the
    /// last frame for `end`.
    pub fn with_bounds(total_frames: u32, start: i64, end: i64) -> Result<Self> {
        let mut range = Self::new(total_frames)?;
        if end > 0 {
            range.set_end(end);
        }
        if start > 0 {
            range.set_start(start);
        }
        Ok(range)
    }

    pub fn total_frames(&self) -> u32 {
        self.total_frames
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    /// Number of frames an export of this range writes, never 0.
    pub fn frame_count(&self) -> u32 {
        self.end - self.start + 1
    }

    pub fn contains(&self, frame: u32) -> bool {
        (self.start..=self.end).contains(&frame)
    }

    pub fn set_start(&mut self, value: i64) {
        self.start = clamp(value, 1, self.end);
    }

    pub fn set_end(&mut self, value: i64) {
        self.end = clamp(value, self.start, self.total_frames);
    }

    pub fn set_current(&mut self, value: i64) {
        self.current = clamp(value, 1, self.total_frames);
    }

    /// Moves the scrubber by a signed number of frames.
    pub fn step(&mut self, delta: i64) {
        self.set_current(i64::from(self.current).saturating_add(delta));
    }

    pub fn can_mark_start(&self) -> bool {
        self.current <= self.end
    }

    pub fn can_mark_end(&self) -> bool {
        self.current >= self.start
    }

    /// Makes the current frame the start of the range, if that is legal.
    pub fn mark_start(&mut self) -> bool {
        if !self.can_mark_start() {
            return false;
        }
        self.start = self.current;
        true
    }

    /// Makes the current frame the end of the range, if that is legal.
    pub fn mark_end(&mut self) -> bool {
        if !self.can_mark_end() {
            return false;
        }
        self.end = self.current;
        true
    }
}

fn clamp(value: i64, low: u32, high: u32) -> u32 {
    // `low <= high` holds for every call site.
    value.clamp(i64::from(low), i64::from(high)) as u32
}

/// Keeps a `ClipRange` in step with the sources a session opens and with the
/// start/end slots of the parameter store.
#[derive(Debug)]
pub struct ClipCoordinator {
    store: Arc<ParameterStore>,
    range: Option<ClipRange>,
    sources_opened: u32,
}

impl ClipCoordinator {
    pub fn new(store: Arc<ParameterStore>) -> Self {
        Self {
            store,
            range: None,
            sources_opened: 0,
        }
    }

    /// Resets the range for a newly opened source.
    ///
    /// Only the first source of a session honors the stored start/end frames;
    /// later sources start from the full range.
    pub fn open_source(&mut self, total_frames: u32) -> Result<&ClipRange> {
        let range = if self.sources_opened == 0 {
            let start = self.store.read(keys::START_FRAME);
            let end = self.store.read(keys::END_FRAME);
            ClipRange::with_bounds(total_frames, start.into(), end.into())?
        } else {
            ClipRange::new(total_frames)?
        };
        self.sources_opened += 1;
        debug!(
            total_frames,
            start = range.start,
            end = range.end,
            "clip range initialised"
        );
        Ok(self.range.insert(range))
    }

    pub fn range(&self) -> Option<&ClipRange> {
        self.range.as_ref()
    }

    pub fn range_mut(&mut self) -> Option<&mut ClipRange> {
        self.range.as_mut()
    }

    /// Writes the live bounds into the store's start/end slots.
    ///
    /// Bounds beyond `i32::MAX` are stored as `i32::MAX`.
    pub fn commit(&self) -> bool {
        let Some(range) = self.range else {
            return false;
        };
        let start = i32::try_from(range.start).unwrap_or(i32::MAX);
        let end = i32::try_from(range.end).unwrap_or(i32::MAX);
        self.store.update(|p| {
            p.start_frame = start;
            p.end_frame = end;
        });
        debug!(start = range.start, end = range.end, "clip range committed");
        true
    }

    /// True when the live bounds differ from what the store holds.
    pub fn is_dirty(&self) -> bool {
        let Some(range) = self.range else {
            return false;
        };
        let stored = ClipRange::with_bounds(
            range.total_frames,
            self.store.read(keys::START_FRAME).into(),
            self.store.read(keys::END_FRAME).into(),
        );
        match stored {
            Ok(stored) => (stored.start, stored.end) != (range.start, range.end),
            Err(_) => true,
        }
    }
}
