mod common;

use common::{MarkerMatcher, SharedSink, SyntheticVideo};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use stereo_to_depthmap::export_pipeline::ExportTask;
use stereo_to_depthmap::pipeline::FrameProcessor;
use stereo_to_depthmap::{
    ClipCoordinator, DepthmapError, ParamValue, ParameterStore, Readiness, Slot, keys,
};

fn open_processor(
    store: &Arc<ParameterStore>,
    frames: u32,
    delay: Option<Duration>,
) -> FrameProcessor<SyntheticVideo, MarkerMatcher> {
    FrameProcessor::open(
        Arc::clone(store),
        SyntheticVideo::new(frames),
        MarkerMatcher { delay },
        Path::new("sbs.avi"),
    )
    .expect("synthetic source opens")
}

#[test]
fn command_line_values_are_corrected_before_a_headless_run() {
    let store = ParameterStore::new();
    store.set(Slot::Headless, true).unwrap();
    store.set(Slot::InputPath, "sbs.avi").unwrap();
    store.set(Slot::OutputPath, "").unwrap();
    store.set(Slot::NumDisparities, 40).unwrap();
    store.set(Slot::SadWindowSize, 8).unwrap();
    store.set(Slot::P1, 5).unwrap();
    store.set(Slot::P2, 3).unwrap();
    store.set(Slot::Disp12MaxDiff, -1).unwrap();

    assert_eq!(store.ensure_valid().unwrap(), Readiness::Corrected);
    assert_eq!(store.get(Slot::OutputPath), ParamValue::Text("output.avi".into()));
    assert_eq!(store.read(keys::NUM_DISPARITIES), 32);
    assert_eq!(store.read(keys::SAD_WINDOW_SIZE), 9);
    assert_eq!((store.read(keys::P1), store.read(keys::P2)), (5, 6));
    // -1 is inside the documented floor and is left alone.
    assert_eq!(store.read(keys::DISP12_MAX_DIFF), -1);
}

#[test]
fn headless_run_without_input_is_refused() {
    let store = ParameterStore::new();
    store.set(Slot::Headless, true).unwrap();
    let err = store.ensure_valid().unwrap_err();
    assert!(matches!(err, DepthmapError::InvalidConfiguration { .. }));
    assert!(err.to_string().contains("input-path"));
}

#[test]
fn scrubbing_and_committing_a_range_on_a_hundred_frame_clip() {
    let store = Arc::new(ParameterStore::new());
    let processor = open_processor(&store, 100, None);
    let mut coordinator = ClipCoordinator::new(Arc::clone(&store));

    let range = coordinator.open_source(processor.total_frames()).unwrap();
    assert_eq!((range.start(), range.current(), range.end()), (1, 1, 100));

    let range = coordinator.range_mut().unwrap();
    range.set_end(50);
    range.set_start(60);
    assert_eq!((range.start(), range.end()), (50, 50));

    range.set_current(75);
    assert!(!range.can_mark_start());
    assert!(range.can_mark_end());

    range.set_start(10);
    range.set_current(20);
    assert!(range.mark_start());
    assert_eq!((range.start(), range.end()), (20, 50));

    // Nothing reaches the store until the user confirms.
    assert_eq!(store.read(keys::START_FRAME), 0);
    coordinator.commit();
    assert_eq!(store.read(keys::START_FRAME), 20);
    assert_eq!(store.read(keys::END_FRAME), 50);
}

#[test]
fn clip_export_writes_committed_frames_in_order() {
    let store = Arc::new(ParameterStore::new());
    store.write(keys::START_FRAME, 3);
    store.write(keys::END_FRAME, 7);
    let mut processor = open_processor(&store, 10, None);
    let mut sink = SharedSink::default();

    let spec = processor.open_sink(&mut sink).unwrap();
    assert_eq!((spec.width, spec.height), (8, 4));
    assert_eq!(spec.fps, 30.0);

    let outcome = processor.process_clip(&mut sink).unwrap();
    assert_eq!((outcome.requested, outcome.written), (5, 5));
    assert!(!outcome.cancelled);
    assert_eq!(sink.markers(), vec![2, 3, 4, 5, 6]);
}

#[test]
fn interrupted_clip_export_is_reported_as_cancelled() {
    let store = Arc::new(ParameterStore::new());
    let mut processor = open_processor(&store, 10, None);
    let mut sink = SharedSink::default();
    processor.open_sink(&mut sink).unwrap();

    // What the Ctrl-C handler of a headless run does.
    processor.cancel_flag().cancel();
    let outcome = processor.process_clip(&mut sink).unwrap();
    assert!(outcome.cancelled);
    assert_eq!((outcome.requested, outcome.written), (10, 0));
    assert!(sink.markers().is_empty());
}

#[tokio::test]
async fn background_export_sees_parameter_changes_and_finishes() {
    let store = Arc::new(ParameterStore::new());
    let processor = open_processor(&store, 6, Some(Duration::from_millis(20)));
    let sink = SharedSink::default();

    let handle = ExportTask::spawn(processor, sink.clone(), 1, 6);
    assert_eq!(handle.requested(), 6);

    let mut progress = handle.progress();
    while *progress.borrow_and_update() < 2 {
        progress.changed().await.expect("export still running");
    }
    store.write(keys::P1, 100);
    store.write(keys::P2, 200);

    let summary = handle.join().await.unwrap();
    assert_eq!(summary.written, 6);
    assert!(!summary.cancelled);

    let markers = sink.markers();
    assert_eq!(markers.len(), 6);
    assert!(markers[0] < 100, "first frame used the old P1");
    assert!(*markers.last().unwrap() >= 100, "last frame used the new P1");
}

#[tokio::test]
async fn cancelled_export_leaves_a_prefix_and_a_consistent_store() {
    let store = Arc::new(ParameterStore::new());
    let processor = open_processor(&store, 200, Some(Duration::from_millis(5)));
    let sink = SharedSink::default();

    let handle = ExportTask::spawn(processor, sink.clone(), 1, 200);
    let mut progress = handle.progress();
    while *progress.borrow_and_update() < 3 {
        progress.changed().await.expect("export still running");
    }
    handle.cancel();

    let summary = handle.join().await.unwrap();
    assert!(summary.cancelled);
    assert!(summary.written >= 3 && summary.written < 200);

    let markers = sink.markers();
    assert_eq!(markers.len(), summary.written);
    let expected: Vec<u8> = (0..summary.written as u8).collect();
    assert_eq!(markers, expected);
    assert!(store.validate_all(false));
}

#[tokio::test]
async fn export_of_an_invalid_range_fails() {
    let store = Arc::new(ParameterStore::new());
    let processor = open_processor(&store, 10, None);
    let handle = ExportTask::spawn(processor, SharedSink::default(), 4, 20);
    assert!(matches!(
        handle.join().await,
        Err(DepthmapError::InvalidRange { start: 4, end: 20 })
    ));
}
