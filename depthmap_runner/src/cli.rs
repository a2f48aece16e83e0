use clap::Parser;
use std::path::PathBuf;
use stereo_to_depthmap::{FourCc, ParameterStore, keys};

/// Turns side-by-side stereo video into a depth map video.
#[derive(Debug, Parser)]
#[command(name = "stereo_to_depthmap", version, about)]
pub struct Cli {
    /// Log every parameter change and processed frame
    #[arg(short, long)]
    pub verbose: bool,

    /// Run without the preview window; needs --infile and --outfile
    #[arg(short = 'c', long = "nogui")]
    pub headless: bool,

    /// Four character code of the output codec
    #[arg(short = 'f', long = "fourcc", value_name = "CODE")]
    pub fourcc: Option<FourCc>,

    /// Side-by-side input video
    #[arg(short = 'i', long = "infile", value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Depth map output video
    #[arg(short = 'o', long = "outfile", value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Number of disparities, a positive multiple of 16
    #[arg(short = 'd', long = "disparity", allow_negative_numbers = true)]
    pub num_disparities: Option<i32>,

    /// Matched block size, odd
    #[arg(short = 'w', long = "window", allow_negative_numbers = true)]
    pub sad_window_size: Option<i32>,

    #[arg(short = 'm', long = "min-disparity", allow_negative_numbers = true)]
    pub min_disparity: Option<i32>,

    /// Pre-filter cap
    #[arg(short = 't', long = "truncate", allow_negative_numbers = true)]
    pub pre_filter_cap: Option<i32>,

    /// Uniqueness ratio in percent
    #[arg(short = 'u', long = "uniqueness", allow_negative_numbers = true)]
    pub uniqueness_ratio: Option<i32>,

    /// Penalty for disparity changes of one pixel
    #[arg(long, allow_negative_numbers = true)]
    pub p1: Option<i32>,

    /// Penalty for larger disparity changes, greater than P1
    #[arg(long, allow_negative_numbers = true)]
    pub p2: Option<i32>,

    /// Maximum left-right check difference, -1 disables the check
    #[arg(long = "max-diff", allow_negative_numbers = true)]
    pub disp12_max_diff: Option<i32>,

    #[arg(long, allow_negative_numbers = true)]
    pub speckle_window_size: Option<i32>,

    #[arg(long, allow_negative_numbers = true)]
    pub speckle_range: Option<i32>,

    /// Use the full two-pass dynamic programming matcher
    #[arg(long)]
    pub full_dp: bool,

    /// First exported frame, 1-indexed
    #[arg(long, value_name = "FRAME", allow_negative_numbers = true)]
    pub start: Option<i32>,

    /// Last exported frame, 1-indexed
    #[arg(long, value_name = "FRAME", allow_negative_numbers = true)]
    pub end: Option<i32>,
}

impl Cli {
    /// Copies every given flag into the store. Unset flags keep the defaults.
    pub fn apply(&self, store: &ParameterStore) {
        store.write(keys::VERBOSE, self.verbose);
        store.write(keys::HEADLESS, self.headless);
        store.write(keys::FULL_DP, self.full_dp);

        if let Some(code) = self.fourcc {
            store.write(keys::OUTPUT_CODEC, code);
        }
        if let Some(path) = &self.input {
            store.write(keys::INPUT_PATH, path.to_string_lossy().into_owned());
        }
        if let Some(path) = &self.output {
            store.write(keys::OUTPUT_PATH, path.to_string_lossy().into_owned());
        }

        let ints = [
            (keys::NUM_DISPARITIES, self.num_disparities),
            (keys::SAD_WINDOW_SIZE, self.sad_window_size),
            (keys::MIN_DISPARITY, self.min_disparity),
            (keys::PRE_FILTER_CAP, self.pre_filter_cap),
            (keys::UNIQUENESS_RATIO, self.uniqueness_ratio),
            (keys::P1, self.p1),
            (keys::P2, self.p2),
            (keys::DISP12_MAX_DIFF, self.disp12_max_diff),
            (keys::SPECKLE_WINDOW_SIZE, self.speckle_window_size),
            (keys::SPECKLE_RANGE, self.speckle_range),
            (keys::START_FRAME, self.start),
            (keys::END_FRAME, self.end),
        ];
        for (key, value) in ints {
            if let Some(value) = value {
                store.write(key, value);
            }
        }
    }
}
