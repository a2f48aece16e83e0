// THEORY:
// The `pipeline` module turns stereo frames into depth map frames. It owns no
// vision algorithm itself: decoding, encoding and disparity matching are
// collaborators behind the `FrameSource`, `FrameSink` and `StereoMatcher`
// traits, implemented with OpenCV by the runner and with in-memory fakes in the
// tests.
//
// Key architectural principles:
// 1.  **1-indexed at the edge**: every public frame number counts from 1, the
//     way the preview and the command line show it. Only the `seek` call into
//     the source uses a 0-indexed position.
// 2.  **Fresh parameters per frame**: `process_one` reads the matcher values
//     from the shared store on every call. The preview may have changed them
//     since the last frame, and an export picks those changes up mid-run.
// 3.  **Prompt cancellation**: range processing checks a shared cancel flag
//     before each frame and stops as soon as the sink asks it to. Whatever the
//     sink received so far is a complete prefix of the range.

use crate::core_modules::clip_range::ClipRange;
use crate::core_modules::codec::FourCc;
use crate::core_modules::disparity::{DisparityMap, Frame, disparity_to_rgb, split_stereo};
use crate::core_modules::parameter_store::ParameterStore;
use crate::core_modules::parameters::{MatcherParams, keys};
use crate::error::{DepthmapError, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// A seekable supply of decoded video frames.
pub trait FrameSource: Send {
    fn open(&mut self, path: &Path) -> Result<()>;
    fn total_frame_count(&self) -> u32;
    fn frame_width(&self) -> u32;
    fn frame_height(&self) -> u32;
    fn fps(&self) -> f64;
    /// Positions the source so the next `read` returns frame `index` (0-indexed).
    fn seek(&mut self, index: u32) -> Result<()>;
    /// The next frame, or `None` once the source is exhausted.
    fn read(&mut self) -> Result<Option<Frame>>;
}

/// What a sink wants after accepting a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkControl {
    Continue,
    Cancel,
}

/// Where an encoded output goes and how it is shaped.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSpec {
    pub path: PathBuf,
    pub codec: FourCc,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
}

/// An encoder accepting processed frames in order.
pub trait FrameSink: Send {
    fn open(&mut self, spec: &OutputSpec) -> Result<()>;
    fn write(&mut self, frame: &Frame) -> Result<SinkControl>;
}

/// The external disparity algorithm.
pub trait StereoMatcher: Send {
    fn compute(&self, left: &Frame, right: &Frame, params: &MatcherParams) -> Result<DisparityMap>;
}

/// A flag shared between a running export and whoever may stop it.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// How a range run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeOutcome {
    /// Frames in the range that was asked for.
    pub requested: usize,
    pub written: usize,
    pub cancelled: bool,
}

/// Reads stereo frames, matches them and hands depth frames to a sink.
pub struct FrameProcessor<S, M> {
    store: Arc<ParameterStore>,
    source: S,
    matcher: M,
    cancel: CancelFlag,
}

impl<S: FrameSource, M: StereoMatcher> FrameProcessor<S, M> {
    /// Wraps an already opened source.
    pub fn new(store: Arc<ParameterStore>, source: S, matcher: M) -> Self {
        Self {
            store,
            source,
            matcher,
            cancel: CancelFlag::new(),
        }
    }

    /// Opens `path` on `source` and wraps it.
    pub fn open(store: Arc<ParameterStore>, mut source: S, matcher: M, path: &Path) -> Result<Self> {
        source.open(path)?;
        info!(
            path = %path.display(),
            frames = source.total_frame_count(),
            width = source.frame_width(),
            height = source.frame_height(),
            fps = source.fps(),
            "input opened"
        );
        Ok(Self::new(store, source, matcher))
    }

    pub fn store(&self) -> &Arc<ParameterStore> {
        &self.store
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn total_frames(&self) -> u32 {
        self.source.total_frame_count()
    }

    /// A handle that stops `process_range` before its next frame.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// The output shape: half the source width, same height and frame rate.
    pub fn output_spec(&self) -> OutputSpec {
        let params = self.store.snapshot();
        OutputSpec {
            path: PathBuf::from(params.output_path),
            codec: params.codec,
            fps: self.source.fps(),
            width: self.source.frame_width() / 2,
            height: self.source.frame_height(),
        }
    }

    /// Opens `sink` with `output_spec()`.
    pub fn open_sink<K: FrameSink>(&self, sink: &mut K) -> Result<OutputSpec> {
        let spec = self.output_spec();
        sink.open(&spec)?;
        info!(
            path = %spec.path.display(),
            codec = %spec.codec,
            width = spec.width,
            height = spec.height,
            "output opened"
        );
        Ok(spec)
    }

    /// Produces the depth frame for `frame_number` (1-indexed).
    pub fn process_one(&mut self, frame_number: u32) -> Result<Frame> {
        if frame_number == 0 || frame_number > self.total_frames() {
            return Err(DepthmapError::FrameUnavailable(frame_number));
        }
        self.source.seek(frame_number - 1)?;
        let frame = self
            .source
            .read()?
            .ok_or(DepthmapError::FrameUnavailable(frame_number))?;

        let (left, right) = split_stereo(&frame).ok_or_else(|| {
            DepthmapError::Matcher(format!(
                "frame {frame_number} is too small to split ({}x{})",
                frame.width(),
                frame.height()
            ))
        })?;

        // Re-read on every frame; the preview may have changed them.
        let params = self.store.matcher_params();
        let disparity = self.matcher.compute(&left, &right, &params)?;
        debug!(frame_number, "frame processed");
        Ok(disparity_to_rgb(&disparity))
    }

    /// Processes `[start, end]` (1-indexed, inclusive) into `sink`.
    ///
    /// Returns how many frames were written, which is less than the range
    /// length when the sink or the cancel flag stopped the run.
    pub fn process_range<K: FrameSink>(&mut self, start: u32, end: u32, sink: &mut K) -> Result<usize> {
        self.run_range(start, end, sink, |_| {}).map(|outcome| outcome.written)
    }

    /// Processes the range stored in the start/end slots.
    ///
    /// Unlike `process_range` the outcome keeps the `cancelled` bit, so a
    /// caller can tell an interrupted export from a complete one.
    pub fn process_clip<K: FrameSink>(&mut self, sink: &mut K) -> Result<RangeOutcome> {
        let range = ClipRange::with_bounds(
            self.total_frames(),
            self.store.read(keys::START_FRAME).into(),
            self.store.read(keys::END_FRAME).into(),
        )?;
        self.run_range(range.start(), range.end(), sink, |_| {})
    }

    /// `process_range` with a progress callback receiving the running count.
    pub fn run_range<K: FrameSink>(
        &mut self,
        start: u32,
        end: u32,
        sink: &mut K,
        mut on_progress: impl FnMut(usize),
    ) -> Result<RangeOutcome> {
        if start == 0 || start > end || end > self.total_frames() {
            return Err(DepthmapError::InvalidRange { start, end });
        }
        info!(start, end, "processing frame range");

        let requested = (end - start + 1) as usize;
        let mut written = 0;
        for frame_number in start..=end {
            if self.cancel.is_cancelled() {
                info!(written, requested, "range processing cancelled");
                return Ok(RangeOutcome { requested, written, cancelled: true });
            }

            let depth = self.process_one(frame_number)?;
            let control = sink.write(&depth)?;
            written += 1;
            on_progress(written);

            if control == SinkControl::Cancel {
                info!(written, requested, "sink requested stop");
                return Ok(RangeOutcome { requested, written, cancelled: true });
            }
        }

        info!(written, "range processing finished");
        Ok(RangeOutcome { requested, written, cancelled: false })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};

    /// Frames are filled with their 0-indexed position in the red channel.
    struct CountingSource {
        frames: u32,
        position: u32,
        seeks: Vec<u32>,
    }

    impl CountingSource {
        fn new(frames: u32) -> Self {
            Self {
                frames,
                position: 0,
                seeks: Vec::new(),
            }
        }
    }

    impl FrameSource for CountingSource {
        fn open(&mut self, _path: &Path) -> Result<()> {
            Ok(())
        }
        fn total_frame_count(&self) -> u32 {
            self.frames
        }
        fn frame_width(&self) -> u32 {
            8
        }
        fn frame_height(&self) -> u32 {
            2
        }
        fn fps(&self) -> f64 {
            25.0
        }
        fn seek(&mut self, index: u32) -> Result<()> {
            self.seeks.push(index);
            self.position = index;
            Ok(())
        }
        fn read(&mut self) -> Result<Option<Frame>> {
            if self.position >= self.frames {
                return Ok(None);
            }
            let value = self.position as u8;
            self.position += 1;
            Ok(Some(RgbImage::from_pixel(8, 2, Rgb([value, 0, 0]))))
        }
    }

    /// Reports the left view's red value plus num_disparities as the disparity.
    struct EchoMatcher;

    impl StereoMatcher for EchoMatcher {
        fn compute(&self, left: &Frame, right: &Frame, params: &MatcherParams) -> Result<DisparityMap> {
            assert_eq!(left.dimensions(), right.dimensions());
            let value = left.get_pixel(0, 0)[0] as i16 + params.num_disparities as i16;
            Ok(DisparityMap::from_pixel(left.width(), left.height(), Luma([value])))
        }
    }

    #[derive(Default)]
    struct VecSink {
        frames: Vec<Frame>,
        stop_after: Option<usize>,
    }

    impl FrameSink for VecSink {
        fn open(&mut self, _spec: &OutputSpec) -> Result<()> {
            Ok(())
        }
        fn write(&mut self, frame: &Frame) -> Result<SinkControl> {
            self.frames.push(frame.clone());
            match self.stop_after {
                Some(n) if self.frames.len() >= n => Ok(SinkControl::Cancel),
                _ => Ok(SinkControl::Continue),
            }
        }
    }

    fn processor(frames: u32) -> FrameProcessor<CountingSource, EchoMatcher> {
        FrameProcessor::new(Arc::new(ParameterStore::new()), CountingSource::new(frames), EchoMatcher)
    }

    fn grey(frame: &Frame) -> u8 {
        frame.get_pixel(0, 0)[0]
    }

    #[test]
    fn frame_numbers_are_translated_to_zero_indexed_seeks() {
        let mut p = processor(10);
        let out = p.process_one(1).unwrap();
        assert_eq!(p.source().seeks, vec![0]);
        assert_eq!(grey(&out), 16);
        assert_eq!(out.dimensions(), (4, 2));
    }

    #[test]
    fn out_of_range_frames_are_unavailable() {
        let mut p = processor(10);
        assert!(matches!(p.process_one(0), Err(DepthmapError::FrameUnavailable(0))));
        assert!(matches!(p.process_one(11), Err(DepthmapError::FrameUnavailable(11))));
    }

    #[test]
    fn parameters_are_reread_for_every_frame() {
        let mut p = processor(10);
        assert_eq!(grey(&p.process_one(3).unwrap()), 2 + 16);
        p.store().write(keys::NUM_DISPARITIES, 32);
        assert_eq!(grey(&p.process_one(3).unwrap()), 2 + 32);
    }

    #[test]
    fn range_is_processed_in_order() {
        let mut p = processor(10);
        let mut sink = VecSink::default();
        assert_eq!(p.process_range(4, 6, &mut sink).unwrap(), 3);
        let greys: Vec<u8> = sink.frames.iter().map(grey).collect();
        assert_eq!(greys, vec![3 + 16, 4 + 16, 5 + 16]);
        assert_eq!(p.source().seeks, vec![3, 4, 5]);
    }

    #[test]
    fn sink_cancellation_returns_completed_count() {
        let mut p = processor(10);
        let mut sink = VecSink {
            stop_after: Some(2),
            ..Default::default()
        };
        assert_eq!(p.process_range(1, 10, &mut sink).unwrap(), 2);
        assert_eq!(sink.frames.len(), 2);
    }

    #[test]
    fn raised_cancel_flag_stops_before_next_frame() {
        let mut p = processor(10);
        let flag = p.cancel_flag();
        let mut sink = VecSink::default();
        let outcome = p
            .run_range(1, 10, &mut sink, |written| {
                if written == 3 {
                    flag.cancel();
                }
            })
            .unwrap();
        assert_eq!(
            outcome,
            RangeOutcome {
                requested: 10,
                written: 3,
                cancelled: true
            }
        );
    }

    #[test]
    fn invalid_ranges_are_rejected() {
        let mut p = processor(10);
        let mut sink = VecSink::default();
        assert!(p.process_range(0, 3, &mut sink).is_err());
        assert!(p.process_range(5, 4, &mut sink).is_err());
        assert!(p.process_range(5, 11, &mut sink).is_err());
        assert!(sink.frames.is_empty());
    }

    #[test]
    fn clip_uses_stored_bounds() {
        let mut p = processor(10);
        p.store().write(keys::START_FRAME, 8);
        let mut sink = VecSink::default();
        let outcome = p.process_clip(&mut sink).unwrap();
        assert_eq!((outcome.requested, outcome.written), (3, 3));
        assert!(!outcome.cancelled);
    }

    #[test]
    fn cancelled_clip_reports_the_interruption() {
        let mut p = processor(10);
        p.cancel_flag().cancel();
        let mut sink = VecSink::default();
        let outcome = p.process_clip(&mut sink).unwrap();
        assert_eq!(
            outcome,
            RangeOutcome {
                requested: 10,
                written: 0,
                cancelled: true
            }
        );
        assert!(sink.frames.is_empty());
    }

    #[test]
    fn clip_stopped_by_the_sink_is_a_prefix() {
        let mut p = processor(10);
        p.store().write(keys::START_FRAME, 2);
        let mut sink = VecSink {
            stop_after: Some(4),
            ..Default::default()
        };
        let outcome = p.process_clip(&mut sink).unwrap();
        assert!(outcome.cancelled);
        assert_eq!((outcome.requested, outcome.written), (9, 4));
        let greys: Vec<u8> = sink.frames.iter().map(grey).collect();
        assert_eq!(greys, vec![1 + 16, 2 + 16, 3 + 16, 4 + 16]);
    }

    #[test]
    fn output_spec_halves_the_width() {
        let p = processor(10);
        p.store().write(keys::OUTPUT_PATH, "depth.avi".to_string());
        let spec = p.output_spec();
        assert_eq!(spec.path, PathBuf::from("depth.avi"));
        assert_eq!((spec.width, spec.height), (4, 2));
        assert_eq!(spec.fps, 25.0);
        assert_eq!(spec.codec, FourCc::DEFAULT);
    }
}
