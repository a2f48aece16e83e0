// THEORY:
// The preview is a single OpenCV window driven by a `wait_key` loop on the main
// thread. It shows the depth map of the scrubber's current frame, recomputed
// whenever the frame or the matcher parameters change. Trackbars write straight
// into the shared parameter store and are corrected in place, so the next
// redraw and any running export see the new values.
//
// Exports run on tokio's blocking pool through `ExportTask`. Each one opens its
// own capture of the input so the preview keeps seeking independently.

use crate::opencv_io::{CaptureSource, SgbmMatcher, WriterSink, frame_to_mat};
use anyhow::{Context, Result};
use opencv::{
    core::{Mat, Point, Scalar},
    highgui, imgproc,
    prelude::*,
};
use std::path::Path;
use std::sync::Arc;
use stereo_to_depthmap::export_pipeline::{ExportHandle, ExportTask};
use stereo_to_depthmap::pipeline::FrameProcessor;
use stereo_to_depthmap::{ClipCoordinator, Key, MatcherParams, ParameterStore, keys};
use tokio::runtime::Runtime;
use tracing::{debug, error, info, warn};

const WINDOW: &str = "stereo_to_depthmap";
const KEY_WAIT_MS: i32 = 30;
const ESCAPE: i32 = 27;

/// A trackbar bound to one integer slot. The slot value is `position * scale`.
struct Trackbar {
    label: &'static str,
    key: Key<i32>,
    max: i32,
    scale: i32,
}

impl Trackbar {
    /// The position that shows `value`, pinned to the bar's range.
    fn position_for(&self, value: i32) -> i32 {
        (value / self.scale).clamp(0, self.max)
    }

    /// Stores a moved position and runs the slot's rule with correction.
    ///
    /// A position that already shows the stored value changes nothing, so
    /// moving a bar to mirror the store never feeds back into it.
    fn apply(&self, store: &ParameterStore, position: i32) -> bool {
        if self.position_for(store.read(self.key)) == position {
            return false;
        }
        let slot = self.key.slot();
        store.write(self.key, position * self.scale);
        if !store.validate(slot, true) {
            debug!(%slot, "trackbar value could not be corrected");
        }
        debug!(%slot, value = store.read(self.key), "parameter changed");
        true
    }
}

static TRACKBARS: [Trackbar; 6] = [
    Trackbar { label: "disparities x16", key: keys::NUM_DISPARITIES, max: 16, scale: 16 },
    Trackbar { label: "window", key: keys::SAD_WINDOW_SIZE, max: 51, scale: 1 },
    Trackbar { label: "uniqueness", key: keys::UNIQUENESS_RATIO, max: 100, scale: 1 },
    Trackbar { label: "P1", key: keys::P1, max: 3000, scale: 1 },
    Trackbar { label: "P2", key: keys::P2, max: 6000, scale: 1 },
    Trackbar { label: "speckle window", key: keys::SPECKLE_WINDOW_SIZE, max: 200, scale: 1 },
];

enum Command {
    Step(i64),
    MarkStart,
    MarkEnd,
    Commit,
    Export,
    CancelExport,
    Quit,
}

fn command_for(key: i32) -> Option<Command> {
    if key == ESCAPE {
        return Some(Command::Quit);
    }
    let key = u8::try_from(key & 0xFF).ok()? as char;
    Some(match key {
        'a' => Command::Step(-1),
        'd' => Command::Step(1),
        'A' => Command::Step(-10),
        'D' => Command::Step(10),
        '[' => Command::MarkStart,
        ']' => Command::MarkEnd,
        'c' => Command::Commit,
        'e' => Command::Export,
        'x' => Command::CancelExport,
        'q' => Command::Quit,
        _ => return None,
    })
}

pub fn run(store: Arc<ParameterStore>) -> Result<()> {
    let input = store.read(keys::INPUT_PATH);
    let input = Path::new(&input);
    let mut processor = FrameProcessor::open(Arc::clone(&store), CaptureSource::new(), SgbmMatcher, input)
        .with_context(|| format!("failed to open input {}", input.display()))?;

    let mut coordinator = ClipCoordinator::new(Arc::clone(&store));
    coordinator.open_source(processor.total_frames())?;

    let runtime = Runtime::new().context("failed to start the export runtime")?;
    let _runtime_guard = runtime.enter();

    highgui::named_window(WINDOW, highgui::WINDOW_AUTOSIZE)?;
    install_trackbars(&store)?;

    let mut export: Option<ExportHandle> = None;
    let mut shown: Option<(u32, MatcherParams)> = None;
    let mut canvas = Mat::default();

    loop {
        // --- 1. Redraw when the frame or the matcher settings moved ---
        let Some(range) = coordinator.range().copied() else {
            break;
        };
        let wanted = (range.current(), store.matcher_params());
        if shown != Some(wanted) {
            // Corrections may have moved slots other than the dragged one.
            sync_trackbars(&store)?;
            match processor.process_one(range.current()) {
                Ok(depth) => canvas = frame_to_mat(&depth)?,
                Err(e) => warn!(frame = range.current(), error = %e, "preview frame failed"),
            }
            shown = Some(wanted);
        }

        // --- 2. Status overlay ---
        let mut view = canvas.clone();
        if !view.empty() {
            let status = status_line(&coordinator, export.as_ref());
            imgproc::put_text(
                &mut view,
                &status,
                Point::new(8, 20),
                imgproc::FONT_HERSHEY_SIMPLEX,
                0.5,
                Scalar::new(0.0, 255.0, 255.0, 0.0),
                1,
                imgproc::LINE_AA,
                false,
            )?;
            highgui::imshow(WINDOW, &view)?;
        }

        // --- 3. Reap a finished export ---
        if export.as_ref().is_some_and(ExportHandle::is_finished) {
            if let Some(handle) = export.take() {
                match runtime.block_on(handle.join()) {
                    Ok(summary) => info!(
                        written = summary.written,
                        requested = summary.requested,
                        cancelled = summary.cancelled,
                        "export finished"
                    ),
                    Err(e) => error!(error = %e, "export failed"),
                }
            }
        }

        // --- 4. Keyboard ---
        let Some(command) = command_for(highgui::wait_key(KEY_WAIT_MS)?) else {
            continue;
        };
        let Some(range) = coordinator.range_mut() else {
            break;
        };
        match command {
            Command::Step(delta) => range.step(delta),
            Command::MarkStart => {
                if !range.mark_start() {
                    debug!(current = range.current(), "current frame is past the clip end");
                }
            }
            Command::MarkEnd => {
                if !range.mark_end() {
                    debug!(current = range.current(), "current frame is before the clip start");
                }
            }
            Command::Commit => {
                coordinator.commit();
            }
            Command::Export => {
                if export.is_some() {
                    warn!("an export is already running");
                    continue;
                }
                let (start, end) = (range.start(), range.end());
                coordinator.commit();
                match start_export(&store, input, start, end) {
                    Ok(handle) => export = Some(handle),
                    Err(e) => error!(error = %e, "could not start export"),
                }
            }
            Command::CancelExport => {
                if let Some(handle) = &export {
                    handle.cancel();
                }
            }
            Command::Quit => break,
        }
    }

    if let Some(handle) = export.take() {
        handle.cancel();
        let summary = runtime.block_on(handle.join())?;
        info!(written = summary.written, "export stopped on exit");
    }
    highgui::destroy_all_windows()?;
    Ok(())
}

fn install_trackbars(store: &Arc<ParameterStore>) -> Result<()> {
    for bar in &TRACKBARS {
        let target = Arc::clone(store);
        highgui::create_trackbar(
            bar.label,
            WINDOW,
            None,
            bar.max,
            Some(Box::new(move |position| {
                bar.apply(&target, position);
            })),
        )?;
        highgui::set_trackbar_pos(bar.label, WINDOW, bar.position_for(store.read(bar.key)))?;
    }
    Ok(())
}

/// Moves every bar that no longer shows its slot's stored value.
fn sync_trackbars(store: &ParameterStore) -> Result<()> {
    for bar in &TRACKBARS {
        let wanted = bar.position_for(store.read(bar.key));
        if highgui::get_trackbar_pos(bar.label, WINDOW)? != wanted {
            highgui::set_trackbar_pos(bar.label, WINDOW, wanted)?;
        }
    }
    Ok(())
}

fn start_export(store: &Arc<ParameterStore>, input: &Path, start: u32, end: u32) -> Result<ExportHandle> {
    let processor = FrameProcessor::open(Arc::clone(store), CaptureSource::new(), SgbmMatcher, input)?;
    let mut sink = WriterSink::new();
    processor.open_sink(&mut sink)?;
    info!(start, end, "export queued");
    Ok(ExportTask::spawn(processor, sink, start, end))
}

fn status_line(coordinator: &ClipCoordinator, export: Option<&ExportHandle>) -> String {
    let Some(range) = coordinator.range() else {
        return String::new();
    };
    let mut line = format!(
        "frame {}/{}  clip [{}, {}]",
        range.current(),
        range.total_frames(),
        range.start(),
        range.end()
    );
    if coordinator.is_dirty() {
        line.push_str(" *");
    }
    if let Some(handle) = export {
        line.push_str(&format!("  export {}/{}", handle.written(), handle.requested()));
    }
    line
}
