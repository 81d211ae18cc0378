use std::{f32::consts::PI, fmt, sync::Arc};

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};
use serde::{Deserialize, Serialize};

use crate::{audio::CHANNELS, BridgeError, Result};

/// Level and pitch measured on one channel of a rendered block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelTone {
    pub rms: f32,
    pub dominant_hz: f32,
}

/// Result of probing an interleaved stereo block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ToneSummary {
    pub frames: usize,
    pub left: ChannelTone,
    pub right: ChannelTone,
}

/// Spectral probe for stream output. Keeps the FFT plan and scratch buffers
/// between calls so repeated blocks of the same size are cheap.
pub struct ToneAnalyser {
    sample_rate: u32,
    fft_planner: RealFftPlanner<f32>,
    fft: Option<FftResources>,
}

impl ToneAnalyser {
    pub fn with_sample_rate(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            fft_planner: RealFftPlanner::new(),
            fft: None,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Measures RMS and the strongest frequency of each channel of an
    /// interleaved stereo block.
    pub fn analyse(&mut self, interleaved: &[f32]) -> Result<ToneSummary> {
        let frames = interleaved.len() / CHANNELS;
        if frames < 2 {
            return Err(BridgeError::InvalidInput(
                "tone analysis requires at least two frames",
            ));
        }

        let mut channel = Vec::with_capacity(frames);
        let mut tones = [ChannelTone::default(); CHANNELS];
        for (index, tone) in tones.iter_mut().enumerate() {
            channel.clear();
            channel.extend(
                interleaved
                    .chunks_exact(CHANNELS)
                    .map(|frame| frame[index]),
            );
            *tone = ChannelTone {
                rms: compute_rms(&channel),
                dominant_hz: self.dominant_frequency(&channel)?,
            };
        }

        Ok(ToneSummary {
            frames,
            left: tones[0],
            right: tones[1],
        })
    }

    fn dominant_frequency(&mut self, samples: &[f32]) -> Result<f32> {
        let len = samples.len();
        let bin_hz = self.sample_rate as f32 / len as f32;
        let fft = self.prepare_fft(len);

        for (index, value) in samples.iter().enumerate() {
            fft.input[index] = *value * hann_value(index, len);
        }

        fft.plan
            .process_with_scratch(&mut fft.input, &mut fft.spectrum, &mut fft.scratch)?;

        let peak = fft
            .spectrum
            .iter()
            .enumerate()
            .skip(1)
            .map(|(bin, value)| (bin, value.norm()))
            .fold((0, 0.0_f32), |best, candidate| {
                if candidate.1 > best.1 {
                    candidate
                } else {
                    best
                }
            });

        if peak.1 <= f32::EPSILON {
            Ok(0.0)
        } else {
            Ok(peak.0 as f32 * bin_hz)
        }
    }

    fn prepare_fft(&mut self, size: usize) -> &mut FftResources {
        if let Some(fft) = self.fft.take().filter(|fft| fft.size == size) {
            return self.fft.insert(fft);
        }

        let plan = self.fft_planner.plan_fft_forward(size);
        let scratch = plan.make_scratch_vec();
        let spectrum = plan.make_output_vec();
        let input = plan.make_input_vec();
        self.fft.insert(FftResources {
            size,
            plan,
            scratch,
            spectrum,
            input,
        })
    }
}

struct FftResources {
    size: usize,
    plan: Arc<dyn RealToComplex<f32>>,
    scratch: Vec<Complex32>,
    spectrum: Vec<Complex32>,
    input: Vec<f32>,
}

impl fmt::Debug for ToneAnalyser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToneAnalyser")
            .field("sample_rate", &self.sample_rate)
            .field("fft_size", &self.fft.as_ref().map(|fft| fft.size))
            .finish()
    }
}

fn compute_rms(samples: &[f32]) -> f32 {
    let sum: f32 = samples.iter().map(|sample| sample * sample).sum();
    (sum / samples.len() as f32).sqrt()
}

fn hann_value(index: usize, len: usize) -> f32 {
    if len <= 1 {
        return 1.0;
    }

    0.5 - 0.5 * ((2.0 * PI * index as f32) / (len as f32 - 1.0)).cos()
}
