//! Deterministic stereo tone synthesis for one stream.
//!
//! Every track maps to a fixed pair of sine frequencies derived from a digest
//! of its identifier, so the same track always renders the same samples.

use std::f64::consts::TAU;

use sha2::{Digest, Sha256};

use crate::TrackRecord;

pub const SAMPLE_RATE: u32 = 44_100;
pub const CHANNELS: usize = 2;

const AMPLITUDE: f64 = 0.18;
const BASE_FREQUENCY_HZ: f64 = 180.0;
const FREQUENCY_SPREAD: u64 = 220;
const STEREO_DETUNE: f64 = 1.05;
const FADE_SECONDS: f64 = 0.02;
const FALLBACK_DURATION_SECONDS: u64 = 30;

/// Synthesiser state for a single stream session.
#[derive(Debug, Clone)]
pub struct SignalGenerator {
    id: u64,
    track: TrackRecord,
    total_frames: u64,
    frames_produced: u64,
    fade_frames: u64,
    frequency_left: f64,
    frequency_right: f64,
    phase_left: f64,
    phase_right: f64,
    step_left: f64,
    step_right: f64,
}

impl SignalGenerator {
    pub fn new(track: TrackRecord, id: u64) -> Self {
        let total_frames = total_frames_for(track.duration_seconds);
        let frequency_left = base_frequency(&track.id);
        let frequency_right = frequency_left * STEREO_DETUNE;
        let sample_rate = f64::from(SAMPLE_RATE);
        let fade_frames = ((sample_rate * FADE_SECONDS).round() as u64).min(total_frames / 4);

        Self {
            id,
            track,
            total_frames,
            frames_produced: 0,
            fade_frames,
            frequency_left,
            frequency_right,
            phase_left: 0.0,
            phase_right: 0.0,
            step_left: TAU * frequency_left / sample_rate,
            step_right: TAU * frequency_right / sample_rate,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn track(&self) -> &TrackRecord {
        &self.track
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    pub fn frames_produced(&self) -> u64 {
        self.frames_produced
    }

    pub fn frames_remaining(&self) -> u64 {
        self.total_frames.saturating_sub(self.frames_produced)
    }

    /// Left and right channel frequencies in Hz.
    pub fn frequencies(&self) -> (f64, f64) {
        (self.frequency_left, self.frequency_right)
    }

    /// Playback position in seconds.
    pub fn position_seconds(&self) -> f64 {
        self.frames_produced as f64 / f64::from(SAMPLE_RATE)
    }

    pub fn finished(&self) -> bool {
        self.frames_produced >= self.total_frames
    }

    /// Writes up to `frame_capacity` interleaved stereo frames into
    /// `destination` and returns how many were written. The capacity is also
    /// bounded by the length of `destination`. Returns 0 once the stream has
    /// been fully produced.
    pub fn read_frames(&mut self, destination: &mut [f32], frame_capacity: usize) -> usize {
        let capacity = frame_capacity.min(destination.len() / CHANNELS);
        if capacity == 0 || self.finished() {
            return 0;
        }

        let frames = self.frames_remaining().min(capacity as u64) as usize;
        for (offset, frame) in destination
            .chunks_exact_mut(CHANNELS)
            .take(frames)
            .enumerate()
        {
            let gain = AMPLITUDE * self.envelope(self.frames_produced + offset as u64);
            frame[0] = (self.phase_left.sin() * gain) as f32;
            frame[1] = (self.phase_right.sin() * gain) as f32;

            self.phase_left = wrap_phase(self.phase_left + self.step_left);
            self.phase_right = wrap_phase(self.phase_right + self.step_right);
        }

        self.frames_produced += frames as u64;
        frames
    }

    /// Linear fade-in over the first `fade_frames` and a matching fade-out
    /// over the last ones.
    fn envelope(&self, frame: u64) -> f64 {
        let fade = self.fade_frames;
        if fade == 0 {
            return 1.0;
        }

        let mut envelope = 1.0;
        if frame < fade {
            envelope *= frame as f64 / fade as f64;
        }
        if frame > self.total_frames - fade {
            envelope *= (self.total_frames - frame) as f64 / fade as f64;
        }
        envelope
    }
}

fn total_frames_for(duration_seconds: f64) -> u64 {
    let sample_rate = u64::from(SAMPLE_RATE);
    if !(duration_seconds > 0.0) || !duration_seconds.is_finite() {
        return FALLBACK_DURATION_SECONDS * sample_rate;
    }
    ((duration_seconds * sample_rate as f64).round() as u64).max(1)
}

fn base_frequency(track_id: &str) -> f64 {
    let digest = Sha256::digest(track_id.as_bytes());
    let mut seed = [0u8; 8];
    seed.copy_from_slice(&digest[..8]);
    BASE_FREQUENCY_HZ + (u64::from_be_bytes(seed) % FREQUENCY_SPREAD) as f64
}

fn wrap_phase(phase: f64) -> f64 {
    if phase >= TAU {
        phase - TAU
    } else {
        phase
    }
}
