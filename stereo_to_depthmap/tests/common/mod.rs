#![allow(dead_code)]

use image::{Luma, Rgb, RgbImage};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use stereo_to_depthmap::pipeline::{FrameSink, FrameSource, OutputSpec, SinkControl, StereoMatcher};
use stereo_to_depthmap::{DepthmapError, DisparityMap, Frame, MatcherParams, Result};

/// A side-by-side video whose frames carry their 0-indexed position.
pub struct SyntheticVideo {
    frames: u32,
    position: u32,
    opened: bool,
}

impl SyntheticVideo {
    pub fn new(frames: u32) -> Self {
        Self {
            frames,
            position: 0,
            opened: false,
        }
    }
}

impl FrameSource for SyntheticVideo {
    fn open(&mut self, path: &Path) -> Result<()> {
        if path.as_os_str().is_empty() {
            return Err(DepthmapError::SourceUnavailable(path.to_path_buf()));
        }
        self.opened = true;
        self.position = 0;
        Ok(())
    }

    fn total_frame_count(&self) -> u32 {
        self.frames
    }

    fn frame_width(&self) -> u32 {
        16
    }

    fn frame_height(&self) -> u32 {
        4
    }

    fn fps(&self) -> f64 {
        30.0
    }

    fn seek(&mut self, index: u32) -> Result<()> {
        self.position = index;
        Ok(())
    }

    fn read(&mut self) -> Result<Option<Frame>> {
        if !self.opened || self.position >= self.frames {
            return Ok(None);
        }
        let marker = (self.position % 256) as u8;
        self.position += 1;
        Ok(Some(RgbImage::from_pixel(16, 4, Rgb([marker, 0, 0]))))
    }
}

/// Encodes the frame marker and the smoothness pair into the disparity.
pub struct MarkerMatcher {
    pub delay: Option<Duration>,
}

impl StereoMatcher for MarkerMatcher {
    fn compute(&self, left: &Frame, _right: &Frame, params: &MatcherParams) -> Result<DisparityMap> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        let marker = left.get_pixel(0, 0)[0] as i16;
        let value = marker + params.smoothness.p1 as i16;
        Ok(DisparityMap::from_pixel(left.width(), left.height(), Luma([value])))
    }
}

/// Collects written frames where the test can still see them.
#[derive(Clone, Default)]
pub struct SharedSink {
    pub frames: Arc<Mutex<Vec<Frame>>>,
    pub spec: Arc<Mutex<Option<OutputSpec>>>,
}

impl SharedSink {
    pub fn markers(&self) -> Vec<u8> {
        self.frames.lock().iter().map(|f| f.get_pixel(0, 0)[0]).collect()
    }
}

impl FrameSink for SharedSink {
    fn open(&mut self, spec: &OutputSpec) -> Result<()> {
        *self.spec.lock() = Some(spec.clone());
        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<SinkControl> {
        self.frames.lock().push(frame.clone());
        Ok(SinkControl::Continue)
    }
}
