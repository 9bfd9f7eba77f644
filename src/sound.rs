//! Sound type for audio data representation
//!
//! The Sound type is the sample buffer every analysis consumes: mono
//! samples normalized to [-1, 1] plus a sample rate. Decoding goes through
//! symphonia (WAV, MP3, FLAC, OGG) with a hound fallback for WAV files,
//! always downmixing to mono. Segment extraction and resampling produce
//! fresh buffers; nothing mutates a Sound after construction.

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::{FricspecError, Result};

/// Audio samples with associated sample rate and timing information
#[derive(Debug, Clone)]
pub struct Sound {
    /// Audio samples (mono, normalized to [-1, 1] range)
    samples: Vec<f64>,
    /// Sample rate in Hz
    sample_rate: f64,
    /// Start time of the first sample (0.0 unless extracted with times kept)
    start_time: f64,
}

impl Sound {
    /// Create a Sound from raw samples
    ///
    /// # Example
    /// ```
    /// use fricspec::Sound;
    ///
    /// let sound = Sound::from_samples(vec![0.0, 0.5, 0.0, -0.5], 16000.0);
    /// assert_eq!(sound.sample_rate(), 16000.0);
    /// ```
    pub fn from_samples(samples: Vec<f64>, sample_rate: f64) -> Self {
        Self {
            samples,
            sample_rate,
            start_time: 0.0,
        }
    }

    /// Load a Sound from an audio file (WAV, MP3, FLAC, OGG)
    ///
    /// Multi-channel files are downmixed to mono by averaging channels.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or decoded.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        match Self::decode_symphonia(path) {
            Ok(sound) => Ok(sound),
            Err(err) => {
                // hound handles some WAV encodings symphonia rejects
                let is_wav = path
                    .extension()
                    .map(|e| e.to_string_lossy().eq_ignore_ascii_case("wav"))
                    .unwrap_or(false);
                if is_wav {
                    Self::decode_wav(path)
                } else {
                    Err(err)
                }
            }
        }
    }

    /// Load only a time range of an audio file
    ///
    /// Decodes the whole file, then extracts `[start_time, end_time)`,
    /// clamped to the file's duration. This is the audio-side entry point
    /// used by interval batching.
    pub fn from_file_segment<P: AsRef<Path>>(
        path: P,
        start_time: f64,
        end_time: f64,
    ) -> Result<Self> {
        let full = Self::from_file(path)?;
        full.extract_segment(start_time, end_time)
    }

    fn decode_symphonia(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(FricspecError::Io)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension() {
            hint.with_extension(&ext.to_string_lossy());
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| FricspecError::Decode(format!("failed to probe audio format: {}", e)))?;

        let mut format = probed.format;
        let track = format
            .default_track()
            .ok_or_else(|| FricspecError::Decode("no audio track found".to_string()))?;

        let track_id = track.id;
        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| FricspecError::Decode("unknown sample rate".to_string()))?
            as f64;
        let channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(1);

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| FricspecError::Decode(format!("failed to create decoder: {}", e)))?;

        let mut samples: Vec<f64> = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(symphonia::core::errors::Error::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(e) => {
                    return Err(FricspecError::Decode(format!("error reading packet: {}", e)));
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                // A corrupt packet is recoverable; skip it
                Err(symphonia::core::errors::Error::DecodeError(_)) => continue,
                Err(e) => {
                    return Err(FricspecError::Decode(format!("decode error: {}", e)));
                }
            };

            let spec = *decoded.spec();
            let mut buf = SampleBuffer::<f32>::new(decoded.frames() as u64, spec);
            buf.copy_interleaved_ref(decoded);

            for frame in buf.samples().chunks(channels) {
                let sum: f64 = frame.iter().map(|&s| s as f64).sum();
                samples.push(sum / channels as f64);
            }
        }

        Ok(Self {
            samples,
            sample_rate,
            start_time: 0.0,
        })
    }

    fn decode_wav(path: &Path) -> Result<Self> {
        let reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        let sample_rate = spec.sample_rate as f64;
        let channels = spec.channels as usize;

        let interleaved: Vec<f64> = match spec.sample_format {
            hound::SampleFormat::Int => {
                let max_value = (1_i64 << (spec.bits_per_sample - 1)) as f64;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f64 / max_value))
                    .collect::<std::result::Result<_, _>>()?
            }
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .map(|s| s.map(|v| v as f64))
                .collect::<std::result::Result<_, _>>()?,
        };

        let samples = interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f64>() / channels as f64)
            .collect();

        Ok(Self {
            samples,
            sample_rate,
            start_time: 0.0,
        })
    }

    /// Get the sample rate in Hz
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Get a reference to the audio samples
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Get the number of samples
    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }

    /// Get the total duration in seconds
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate
    }

    /// Get the start time (time of first sample)
    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    /// Get the end time (time just after last sample)
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration()
    }

    /// Get the time at the center of a sample
    pub fn index_to_time(&self, index: usize) -> f64 {
        self.start_time + (index as f64 + 0.5) / self.sample_rate
    }

    /// Get the nearest sample index for a time (may fall outside the buffer)
    pub fn time_to_index(&self, time: f64) -> isize {
        ((time - self.start_time) * self.sample_rate - 0.5).round() as isize
    }

    /// Extract the samples in `[start_time, end_time)`, clamped to the buffer
    ///
    /// The extracted Sound keeps the clamped start time, so interval rows
    /// report where their window actually landed.
    ///
    /// # Errors
    /// `InvalidParameter` if `start_time >= end_time`; `InvalidInput` if
    /// the clamped range contains no samples.
    pub fn extract_segment(&self, start_time: f64, end_time: f64) -> Result<Sound> {
        if start_time >= end_time {
            return Err(FricspecError::InvalidParameter(
                "start_time must be less than end_time".to_string(),
            ));
        }

        let first = self.time_to_index(start_time).max(0) as usize;
        let last = (self.time_to_index(end_time).max(0) as usize).min(self.samples.len());

        if first >= last {
            return Err(FricspecError::InvalidInput(format!(
                "segment {:.4}..{:.4} s lies outside the sound ({:.4}..{:.4} s)",
                start_time,
                end_time,
                self.start_time,
                self.end_time()
            )));
        }

        Ok(Sound {
            samples: self.samples[first..last].to_vec(),
            sample_rate: self.sample_rate,
            start_time: self.index_to_time(first) - 0.5 / self.sample_rate,
        })
    }

    /// Resample to a new rate using windowed-sinc interpolation
    ///
    /// A Hann-windowed sinc kernel of 24 zero crossings per side is
    /// evaluated at each output sample position. For downsampling the
    /// kernel cutoff drops to the output Nyquist, which folds anti-alias
    /// filtering into the interpolation itself.
    pub fn resample(&self, new_rate: f64) -> Result<Sound> {
        if new_rate <= 0.0 {
            return Err(FricspecError::InvalidParameter(format!(
                "resample rate must be positive, got {}",
                new_rate
            )));
        }
        if self.samples.is_empty() || (new_rate - self.sample_rate).abs() < 1e-9 {
            return Ok(self.clone());
        }

        let ratio = new_rate / self.sample_rate;
        // Cutoff relative to the input rate: 0.5 when upsampling,
        // 0.5 * ratio when downsampling
        let cutoff = 0.5 * ratio.min(1.0);
        let half_width: isize = 24;
        let n = self.samples.len() as isize;

        let new_len = (self.duration() * new_rate).round() as usize;
        let mut out = Vec::with_capacity(new_len);

        for j in 0..new_len {
            // Position of output sample j on the input sample grid
            let x = (j as f64 + 0.5) / ratio - 0.5;
            let center = x.floor() as isize;

            let mut acc = 0.0;
            for i in (center - half_width + 1)..=(center + half_width) {
                // Constant extrapolation beyond the edges
                let s = self.samples[i.clamp(0, n - 1) as usize];
                let d = x - i as f64;
                acc += s * windowed_sinc(d, cutoff, half_width as f64);
            }
            out.push(acc);
        }

        Ok(Sound {
            samples: out,
            sample_rate: new_rate,
            start_time: self.start_time,
        })
    }

    /// Create a pure tone (sine wave)
    ///
    /// # Arguments
    /// * `frequency` - Frequency in Hz
    /// * `duration` - Duration in seconds
    /// * `sample_rate` - Sample rate in Hz
    /// * `amplitude` - Peak amplitude (0.0 to 1.0)
    pub fn create_tone(frequency: f64, duration: f64, sample_rate: f64, amplitude: f64) -> Sound {
        let n_samples = (duration * sample_rate).round() as usize;
        let omega = 2.0 * std::f64::consts::PI * frequency / sample_rate;

        let samples = (0..n_samples)
            .map(|i| amplitude * (omega * i as f64).sin())
            .collect();

        Sound {
            samples,
            sample_rate,
            start_time: 0.0,
        }
    }

    /// Create silence
    pub fn create_silence(duration: f64, sample_rate: f64) -> Sound {
        let n_samples = (duration * sample_rate).round() as usize;
        Sound {
            samples: vec![0.0; n_samples],
            sample_rate,
            start_time: 0.0,
        }
    }

    /// Create uniform white noise from a deterministic seed
    ///
    /// Uses an xorshift64* generator so tests get reproducible noise
    /// without a randomness dependency. Samples are uniform in [-1, 1).
    pub fn create_noise(duration: f64, sample_rate: f64, seed: u64) -> Sound {
        let n_samples = (duration * sample_rate).round() as usize;
        let mut state = seed.max(1);

        let samples = (0..n_samples)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                let bits = state.wrapping_mul(0x2545_F491_4F6C_DD1D);
                (bits >> 11) as f64 / (1u64 << 52) as f64 * 2.0 - 1.0
            })
            .collect();

        Sound {
            samples,
            sample_rate,
            start_time: 0.0,
        }
    }
}

/// Hann-windowed sinc kernel value at distance `d` from the kernel center
fn windowed_sinc(d: f64, cutoff: f64, half_width: f64) -> f64 {
    if d.abs() >= half_width {
        return 0.0;
    }
    let sinc = if d == 0.0 {
        2.0 * cutoff
    } else {
        (2.0 * std::f64::consts::PI * cutoff * d).sin() / (std::f64::consts::PI * d)
    };
    let hann = 0.5 + 0.5 * (std::f64::consts::PI * d / half_width).cos();
    sinc * hann
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_samples() {
        let sound = Sound::from_samples(vec![0.0, 0.5, 1.0, 0.5, 0.0], 44100.0);

        assert_eq!(sound.sample_rate(), 44100.0);
        assert_eq!(sound.num_samples(), 5);
        assert_relative_eq!(sound.duration(), 5.0 / 44100.0, epsilon = 1e-10);
    }

    #[test]
    fn test_pure_tone() {
        let sound = Sound::create_tone(440.0, 0.01, 44100.0, 1.0);

        assert_relative_eq!(sound.samples()[0], 0.0, epsilon = 1e-10);
        assert_eq!(sound.num_samples(), 441);
    }

    #[test]
    fn test_time_index_conversion() {
        let sound = Sound::from_samples(vec![0.0; 1000], 44100.0);

        let t0 = sound.index_to_time(0);
        assert_relative_eq!(t0, 0.5 / 44100.0, epsilon = 1e-10);
        assert_eq!(sound.time_to_index(t0), 0);
    }

    #[test]
    fn test_extract_segment() {
        let sound = Sound::create_tone(440.0, 1.0, 44100.0, 1.0);

        let extracted = sound.extract_segment(0.45, 0.55).unwrap();
        assert_relative_eq!(extracted.duration(), 0.1, epsilon = 1e-3);
        assert_relative_eq!(extracted.start_time(), 0.45, epsilon = 1e-3);

        // Clamped at the right edge
        let clamped = sound.extract_segment(0.95, 1.2).unwrap();
        assert!(clamped.duration() < 0.06);

        assert!(sound.extract_segment(0.5, 0.5).is_err());
        assert!(sound.extract_segment(2.0, 3.0).is_err());
    }

    #[test]
    fn test_resample_preserves_tone() {
        let sound = Sound::create_tone(1000.0, 0.1, 44100.0, 0.5);
        let resampled = sound.resample(22050.0).unwrap();

        assert_relative_eq!(resampled.sample_rate(), 22050.0);
        assert_relative_eq!(resampled.duration(), sound.duration(), epsilon = 1e-3);

        // Interior samples should still trace a 1 kHz sine at the new rate
        let omega = 2.0 * std::f64::consts::PI * 1000.0 / 22050.0;
        for i in 200..400 {
            // Output grid is offset half a sample from the input grid
            let t = (i as f64 + 0.5) * 2.0 - 0.5;
            let expected = 0.5 * (omega / 2.0 * t).sin();
            assert_relative_eq!(resampled.samples()[i], expected, epsilon = 0.01);
        }
    }

    #[test]
    fn test_resample_identity() {
        let sound = Sound::create_tone(440.0, 0.05, 16000.0, 1.0);
        let same = sound.resample(16000.0).unwrap();
        assert_eq!(same.num_samples(), sound.num_samples());
        assert_eq!(same.samples(), sound.samples());
    }

    #[test]
    fn test_resample_rejects_bad_rate() {
        let sound = Sound::create_silence(0.1, 16000.0);
        assert!(sound.resample(0.0).is_err());
        assert!(sound.resample(-8000.0).is_err());
    }

    #[test]
    fn test_noise_is_deterministic() {
        let a = Sound::create_noise(0.05, 16000.0, 7);
        let b = Sound::create_noise(0.05, 16000.0, 7);
        let c = Sound::create_noise(0.05, 16000.0, 8);

        assert_eq!(a.samples(), b.samples());
        assert_ne!(a.samples(), c.samples());
        assert!(a.samples().iter().all(|&s| (-1.0..1.0).contains(&s)));
    }
}
