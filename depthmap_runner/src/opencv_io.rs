// THEORY:
// OpenCV backs the three collaborators the pipeline needs. Frames cross the
// boundary as the library's RGB `Frame`: decoded `Mat`s are BGR, so every hop
// converts with `cvt_color` and copies the pixel bytes. The copies are small
// next to the cost of semi-global matching.
//
// The matcher is rebuilt for every frame from the parameters it is handed,
// which keeps it stateless and lets the preview retune it between frames.

use opencv::{
    calib3d::{self, StereoSGBM},
    core::{self, Mat, Scalar},
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture, VideoWriter},
};
use std::path::{Path, PathBuf};
use stereo_to_depthmap::pipeline::{FrameSink, FrameSource, OutputSpec, SinkControl, StereoMatcher};
use stereo_to_depthmap::{DepthmapError, DisparityMap, Frame, MatcherParams, Result};
use tracing::debug;

// --- Conversions ---

/// Copies a BGR `Mat` into an RGB frame.
pub fn mat_to_frame(bgr: &Mat) -> opencv::Result<Frame> {
    let mut rgb = Mat::default();
    imgproc::cvt_color(bgr, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;
    let (width, height) = (rgb.cols() as u32, rgb.rows() as u32);
    Frame::from_raw(width, height, rgb.data_bytes()?.to_vec()).ok_or_else(|| {
        opencv::Error::new(core::StsUnmatchedSizes, format!("unexpected frame layout {width}x{height}"))
    })
}

/// Copies an RGB frame into a BGR `Mat`.
pub fn frame_to_mat(frame: &Frame) -> opencv::Result<Mat> {
    let mut rgb = Mat::new_rows_cols_with_default(
        frame.height() as i32,
        frame.width() as i32,
        core::CV_8UC3,
        Scalar::all(0.0),
    )?;
    rgb.data_bytes_mut()?.copy_from_slice(frame.as_raw());
    let mut bgr = Mat::default();
    imgproc::cvt_color(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR, 0)?;
    Ok(bgr)
}

// --- Source ---

/// A seekable video file.
#[derive(Default)]
pub struct CaptureSource {
    capture: Option<VideoCapture>,
    path: PathBuf,
    total_frames: u32,
    width: u32,
    height: u32,
    fps: f64,
}

impl CaptureSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn capture(&mut self) -> Result<&mut VideoCapture> {
        let path = self.path.clone();
        self.capture
            .as_mut()
            .ok_or(DepthmapError::SourceUnavailable(path))
    }
}

impl FrameSource for CaptureSource {
    fn open(&mut self, path: &Path) -> Result<()> {
        let unavailable = || DepthmapError::SourceUnavailable(path.to_path_buf());
        let capture = VideoCapture::from_file(&path.to_string_lossy(), videoio::CAP_ANY)
            .map_err(|_| unavailable())?;
        if !capture.is_opened().unwrap_or(false) {
            return Err(unavailable());
        }

        let prop = |id| capture.get(id).unwrap_or(0.0);
        self.total_frames = prop(videoio::CAP_PROP_FRAME_COUNT).max(0.0) as u32;
        self.width = prop(videoio::CAP_PROP_FRAME_WIDTH) as u32;
        self.height = prop(videoio::CAP_PROP_FRAME_HEIGHT) as u32;
        self.fps = prop(videoio::CAP_PROP_FPS);
        if self.total_frames == 0 {
            return Err(DepthmapError::EmptySource);
        }

        self.path = path.to_path_buf();
        self.capture = Some(capture);
        Ok(())
    }

    fn total_frame_count(&self) -> u32 {
        self.total_frames
    }

    fn frame_width(&self) -> u32 {
        self.width
    }

    fn frame_height(&self) -> u32 {
        self.height
    }

    fn fps(&self) -> f64 {
        self.fps
    }

    fn seek(&mut self, index: u32) -> Result<()> {
        let capture = self.capture()?;
        let moved = capture
            .set(videoio::CAP_PROP_POS_FRAMES, f64::from(index))
            .unwrap_or(false);
        if !moved {
            return Err(DepthmapError::FrameUnavailable(index + 1));
        }
        Ok(())
    }

    fn read(&mut self) -> Result<Option<Frame>> {
        let capture = self.capture()?;
        let mut bgr = Mat::default();
        match capture.read(&mut bgr) {
            Ok(true) if !bgr.empty() => {}
            Ok(_) => return Ok(None),
            Err(e) => {
                debug!(error = %e, "capture read failed");
                return Ok(None);
            }
        }
        match mat_to_frame(&bgr) {
            Ok(frame) => Ok(Some(frame)),
            Err(e) => {
                debug!(error = %e, "frame conversion failed");
                Err(DepthmapError::SourceUnavailable(self.path.clone()))
            }
        }
    }
}

// --- Sink ---

/// An encoded video file.
#[derive(Default)]
pub struct WriterSink {
    writer: Option<VideoWriter>,
}

impl WriterSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameSink for WriterSink {
    fn open(&mut self, spec: &OutputSpec) -> Result<()> {
        let unavailable = || DepthmapError::SinkUnavailable(spec.path.clone());
        let writer = VideoWriter::new(
            &spec.path.to_string_lossy(),
            spec.codec.packed() as i32,
            spec.fps,
            core::Size::new(spec.width as i32, spec.height as i32),
            true,
        )
        .map_err(|_| unavailable())?;
        if !writer.is_opened().unwrap_or(false) {
            return Err(unavailable());
        }
        self.writer = Some(writer);
        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<SinkControl> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| DepthmapError::Sink("writer is not open".to_string()))?;
        let bgr = frame_to_mat(frame).map_err(|e| DepthmapError::Sink(e.to_string()))?;
        writer
            .write(&bgr)
            .map_err(|e| DepthmapError::Sink(e.to_string()))?;
        Ok(SinkControl::Continue)
    }
}

// --- Matcher ---

/// Semi-global block matching.
#[derive(Debug, Default, Clone, Copy)]
pub struct SgbmMatcher;

impl SgbmMatcher {
    fn disparity(left: &Frame, right: &Frame, params: &MatcherParams) -> opencv::Result<DisparityMap> {
        let mode = if params.full_dp {
            calib3d::StereoSGBM_MODE_HH
        } else {
            calib3d::StereoSGBM_MODE_SGBM
        };
        let mut sgbm = StereoSGBM::create(
            params.min_disparity,
            params.num_disparities,
            params.sad_window_size,
            params.smoothness.p1,
            params.smoothness.p2,
            params.disp12_max_diff,
            params.pre_filter_cap,
            params.uniqueness_ratio,
            params.speckle_window_size,
            params.speckle_range,
            mode,
        )?;

        let (left, right) = (frame_to_mat(left)?, frame_to_mat(right)?);
        let mut disparity = Mat::default();
        sgbm.compute(&left, &right, &mut disparity)?;

        let (width, height) = (disparity.cols() as u32, disparity.rows() as u32);
        let values = disparity.data_typed::<i16>()?.to_vec();
        DisparityMap::from_raw(width, height, values).ok_or_else(|| {
            opencv::Error::new(core::StsUnmatchedSizes, "disparity map layout mismatch".to_string())
        })
    }
}

impl StereoMatcher for SgbmMatcher {
    fn compute(&self, left: &Frame, right: &Frame, params: &MatcherParams) -> Result<DisparityMap> {
        Self::disparity(left, right, params).map_err(|e| DepthmapError::Matcher(e.to_string()))
    }
}
