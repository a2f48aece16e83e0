mod cli;
mod opencv_io;
mod preview;

use anyhow::{Context, Result, bail};
use clap::Parser;
use cli::Cli;
use opencv_io::{CaptureSource, SgbmMatcher, WriterSink};
use std::path::Path;
use std::sync::Arc;
use stereo_to_depthmap::pipeline::FrameProcessor;
use stereo_to_depthmap::{ParameterStore, Readiness, keys};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // --- 1. Argument Parsing & Logging ---
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // --- 2. Parameter Store ---
    let store = Arc::new(ParameterStore::new());
    cli.apply(&store);
    match store.ensure_valid().context("invalid command line")? {
        Readiness::Valid => {}
        Readiness::Corrected => warn!(settings = ?store.snapshot(), "running with corrected settings"),
    }

    // --- 3. Mode Dispatch ---
    if store.read(keys::HEADLESS) {
        run_headless(store)
    } else {
        preview::run(store)
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn run_headless(store: Arc<ParameterStore>) -> Result<()> {
    let input = store.read(keys::INPUT_PATH);
    let input = Path::new(&input);
    let mut processor = FrameProcessor::open(Arc::clone(&store), CaptureSource::new(), SgbmMatcher, input)
        .with_context(|| format!("failed to open input {}", input.display()))?;

    let mut sink = WriterSink::new();
    let spec = processor
        .open_sink(&mut sink)
        .context("failed to open the output video")?;

    let cancel = processor.cancel_flag();
    ctrlc::set_handler(move || {
        warn!("interrupt received, stopping after the current frame");
        cancel.cancel();
    })
    .context("failed to install the Ctrl-C handler")?;

    let outcome = processor.process_clip(&mut sink)?;
    if outcome.cancelled {
        warn!(
            written = outcome.written,
            requested = outcome.requested,
            output = %spec.path.display(),
            "processing interrupted, output holds a partial clip"
        );
        bail!(
            "interrupted after {} of {} frames",
            outcome.written,
            outcome.requested
        );
    }
    info!(written = outcome.written, output = %spec.path.display(), "processing complete");
    Ok(())
}
