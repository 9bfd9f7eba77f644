//! Windowed batch driver
//!
//! Applies the estimate → normalize → describe pipeline across many
//! windows and assembles the results into an ordered table:
//!
//! - [`batch_windows`]: a fixed number of equal-width windows sliding
//!   across one buffer, evenly spaced from the first sample to the last.
//! - [`batch_intervals`]: windows centered on the midpoints of
//!   label-matched TextGrid intervals, cut from an audio file and
//!   optionally resampled first.
//! - [`batch_files`]: interval batching over a list of audio/annotation
//!   pairs on a rayon worker pool, concatenated in list order.
//!
//! A failing window never aborts a batch: its row carries the error and
//! processing continues. `strict` mode turns the first per-item failure
//! into a batch failure instead. Collaborator errors (decode, missing
//! tier) always surface unchanged from the path-based entry points.

use std::path::Path;

use log::{debug, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::descriptor::{describe, Descriptor, DescriptorRequest};
use crate::multitaper::{multitaper_spectrum, MultitaperParams};
use crate::periodogram::fft_spectrum;
use crate::spectrum::{Band, Spectrum};
use crate::textgrid::{read_intervals, Interval};
use crate::window::WindowShape;
use crate::{FricspecError, Result, Sound};

/// Which spectral estimator drives the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EstimatorMethod {
    /// Multitaper estimation (the production path)
    Multitaper(MultitaperParams),
    /// Single-window FFT periodogram (the comparison baseline)
    FftBaseline(WindowShape),
}

impl Default for EstimatorMethod {
    fn default() -> Self {
        Self::Multitaper(MultitaperParams::default())
    }
}

/// Everything the batch driver needs beyond the data itself
///
/// All knobs are explicit; there are no process-wide defaults hiding
/// behind these fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Spectral estimator and its parameters
    pub method: EstimatorMethod,
    /// Frequency band kept after normalization (e.g. 500 Hz..Nyquist for
    /// voiceless fricatives)
    pub band: Option<Band>,
    /// Which descriptors each row should carry
    pub request: DescriptorRequest,
    /// Width in seconds of the analysis window centered on each interval
    /// midpoint (interval mode only)
    pub window_duration: f64,
    /// Resample interval windows to this rate before analysis
    pub resample_rate: Option<f64>,
    /// Abort the batch on the first per-item failure instead of recording
    /// it in the row
    pub strict: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            method: EstimatorMethod::default(),
            band: None,
            request: DescriptorRequest::default(),
            window_duration: 0.04,
            resample_rate: None,
            strict: false,
        }
    }
}

/// One audio/annotation pair for file batching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileJob {
    pub audio_path: String,
    pub textgrid_path: String,
}

/// One window's or interval's entry in a [`ResultTable`]
#[derive(Debug)]
pub struct ResultRow {
    /// Position of the source window or interval in its input sequence
    pub index: usize,
    /// Source audio path (file batching only)
    pub file: Option<String>,
    /// Window or interval start time (seconds)
    pub start_time: f64,
    /// Window or interval end time (seconds)
    pub end_time: f64,
    /// Matched interval label (interval mode only)
    pub label: Option<String>,
    /// Label of the next interval in the tier, if any (interval mode only)
    pub following_label: Option<String>,
    /// The computed descriptors, or the error that stopped this item
    pub outcome: Result<Descriptor>,
}

/// Ordered, append-only batch output
#[derive(Debug, Default)]
pub struct ResultTable {
    rows: Vec<ResultRow>,
}

impl ResultTable {
    /// All rows, in input order
    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True if no rows were produced
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate over the successfully computed descriptors, in order
    pub fn descriptors(&self) -> impl Iterator<Item = (&ResultRow, &Descriptor)> {
        self.rows
            .iter()
            .filter_map(|row| row.outcome.as_ref().ok().map(|d| (row, d)))
    }

    /// Number of rows whose computation failed
    pub fn error_count(&self) -> usize {
        self.rows.iter().filter(|row| row.outcome.is_err()).count()
    }

    fn push(&mut self, row: ResultRow) {
        self.rows.push(row);
    }

    fn extend(&mut self, other: ResultTable) {
        self.rows.extend(other.rows);
    }
}

/// Estimate a raw spectrum with the configured method
pub fn estimate_spectrum(sound: &Sound, method: &EstimatorMethod) -> Result<Spectrum> {
    match method {
        EstimatorMethod::Multitaper(params) => multitaper_spectrum(sound, params),
        EstimatorMethod::FftBaseline(window) => fft_spectrum(sound, *window),
    }
}

/// Run one window through estimate → normalize → describe
fn analyze_window(sound: &Sound, config: &AnalysisConfig) -> Result<Descriptor> {
    let spectrum = estimate_spectrum(sound, &config.method)?;
    let normalized = spectrum.normalize(config.band)?;
    describe(&normalized, &config.request)
}

/// Analyze `steps` equal-width windows sliding across a buffer
///
/// The first window starts at the first sample, the last ends at the last
/// sample, and the start offsets in between are linearly interpolated.
/// One row per window, in window order.
///
/// # Errors
/// `InvalidParameter` for a zero `window_samples` or `steps`;
/// `InsufficientSamples` if the window is wider than the buffer. In
/// strict mode the first failing window also aborts the batch.
pub fn batch_windows(
    sound: &Sound,
    window_samples: usize,
    steps: usize,
    config: &AnalysisConfig,
) -> Result<ResultTable> {
    if window_samples == 0 || steps == 0 {
        return Err(FricspecError::InvalidParameter(
            "window_samples and steps must both be at least 1".to_string(),
        ));
    }
    let len = sound.num_samples();
    if window_samples > len {
        return Err(FricspecError::InsufficientSamples {
            needed: window_samples,
            got: len,
        });
    }

    let span = (len - window_samples) as f64;
    let mut table = ResultTable::default();

    for step in 0..steps {
        let fraction = if steps == 1 {
            0.0
        } else {
            step as f64 / (steps - 1) as f64
        };
        let start = (span * fraction).round() as usize;
        let window = Sound::from_samples(
            sound.samples()[start..start + window_samples].to_vec(),
            sound.sample_rate(),
        );

        let outcome = match analyze_window(&window, config) {
            Ok(descriptor) => Ok(descriptor),
            Err(err) if config.strict => return Err(err),
            Err(err) => {
                warn!("window {} of {} failed: {}", step + 1, steps, err);
                Err(err)
            }
        };

        table.push(ResultRow {
            index: step,
            file: None,
            start_time: sound.start_time() + start as f64 / sound.sample_rate(),
            end_time: sound.start_time()
                + (start + window_samples) as f64 / sound.sample_rate(),
            label: None,
            following_label: None,
            outcome,
        });
    }

    Ok(table)
}

/// Analyze windows centered on label-matched intervals of a decoded sound
///
/// The in-memory half of [`batch_intervals`]: callers who already hold
/// the audio and the tier can skip the file system. Intervals whose label
/// differs from `label` are passed over; matches keep their tier position
/// as the row index and record the label of the tier's next interval.
/// Zero matches yield an empty table.
pub fn batch_sound_intervals(
    sound: &Sound,
    intervals: &[Interval],
    label: &str,
    config: &AnalysisConfig,
) -> Result<ResultTable> {
    if config.window_duration <= 0.0 {
        return Err(FricspecError::InvalidParameter(format!(
            "window_duration must be positive, got {}",
            config.window_duration
        )));
    }

    let mut table = ResultTable::default();

    for (position, interval) in intervals.iter().enumerate() {
        if interval.label != label {
            continue;
        }

        let mid = interval.midpoint();
        let half = 0.5 * config.window_duration;
        let analyzed = sound
            .extract_segment(mid - half, mid + half)
            .and_then(|window| match config.resample_rate {
                Some(rate) => window.resample(rate),
                None => Ok(window),
            })
            .and_then(|window| analyze_window(&window, config));

        let outcome = match analyzed {
            Ok(descriptor) => Ok(descriptor),
            Err(err) if config.strict => return Err(err),
            Err(err) => {
                warn!(
                    "interval {} ({:?} at {:.3}s) failed: {}",
                    position, interval.label, mid, err
                );
                Err(err)
            }
        };

        table.push(ResultRow {
            index: position,
            file: None,
            start_time: interval.start_time,
            end_time: interval.end_time,
            label: Some(interval.label.clone()),
            following_label: intervals.get(position + 1).map(|next| next.label.clone()),
            outcome,
        });
    }

    Ok(table)
}

/// Analyze every `label`-matched interval of an annotated audio file
///
/// Reads the named tier from the TextGrid, decodes the audio once, and
/// runs [`batch_sound_intervals`]. Decode and annotation errors propagate
/// unchanged; per-interval analysis failures land in their rows.
pub fn batch_intervals<P: AsRef<Path>, Q: AsRef<Path>>(
    audio_path: P,
    textgrid_path: Q,
    tier: &str,
    label: &str,
    config: &AnalysisConfig,
) -> Result<ResultTable> {
    let intervals = read_intervals(textgrid_path, tier)?;
    let sound = Sound::from_file(audio_path)?;
    debug!(
        "interval batch: {} intervals on tier {:?}, {} samples at {} Hz",
        intervals.len(),
        tier,
        sound.num_samples(),
        sound.sample_rate()
    );
    batch_sound_intervals(&sound, &intervals, label, config)
}

/// Interval-batch a list of annotated files and concatenate the tables
///
/// Files fan out across the rayon thread pool; the concatenated output
/// preserves list order, and every row is tagged with its source audio
/// path. In non-strict mode a file whose decode or annotation read fails
/// contributes a single error row instead of aborting the run.
pub fn batch_files(jobs: &[FileJob], tier: &str, label: &str, config: &AnalysisConfig) -> Result<ResultTable> {
    let per_file: Vec<Result<ResultTable>> = jobs
        .par_iter()
        .map(|job| batch_intervals(&job.audio_path, &job.textgrid_path, tier, label, config))
        .collect();

    let mut table = ResultTable::default();
    for (job, outcome) in jobs.iter().zip(per_file) {
        match outcome {
            Ok(mut file_table) => {
                for row in &mut file_table.rows {
                    row.file = Some(job.audio_path.clone());
                }
                table.extend(file_table);
            }
            Err(err) if config.strict => return Err(err),
            Err(err) => {
                warn!("file {:?} failed: {}", job.audio_path, err);
                table.push(ResultRow {
                    index: 0,
                    file: Some(job.audio_path.clone()),
                    start_time: 0.0,
                    end_time: 0.0,
                    label: None,
                    following_label: None,
                    outcome: Err(err),
                });
            }
        }
    }

    Ok(table)
}
