use super::SoundContext;
use std::sync::atomic::Ordering;
use std::sync::{Arc, PoisonError};

pub const BUS_COUNT: usize = 4;

pub const FRONT_RIGHT: usize = 0;
pub const REAR_RIGHT: usize = 1;
pub const REAR_LEFT: usize = 2;
pub const FRONT_LEFT: usize = 3;

pub type Frame = [f32; BUS_COUNT];

const OUTPUT_GAIN: f32 = 0.05;

const DUTY: [[f32; 8]; 4] = [
    [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, -1.0],
    [-1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, -1.0],
    [-1.0, 1.0, 1.0, 1.0, 1.0, -1.0, -1.0, -1.0],
    [1.0, -1.0, -1.0, -1.0, -1.0, -1.0, -1.0, 1.0],
];

const WAVE_SAMPLES: usize = 32;

/// Audio thread handle turning channel snapshots into output frames.
pub struct Sampler {
    ctx: Arc<SoundContext>,
    phase: [f32; 4],
    pulse_step: [usize; 2],
    wave_step: usize,
    scratch: Vec<Frame>,
}

impl Sampler {
    pub(super) fn new(ctx: Arc<SoundContext>) -> Self {
        Self {
            ctx,
            phase: [0.0; 4],
            pulse_step: [0; 2],
            wave_step: 0,
            scratch: Vec::new(),
        }
    }

    /// Fills `frames` with four-bus frames (see [`FRONT_RIGHT`] and friends).
    pub fn sample(&mut self, frames: &mut [Frame], sample_rate: u32) {
        let rate = sample_rate.max(1) as f32;
        let snapshots = [
            self.ctx.channels[0].load(),
            self.ctx.channels[1].load(),
            self.ctx.channels[2].load(),
            self.ctx.channels[3].load(),
        ];

        let master = self.ctx.master.load(Ordering::Acquire);
        let left_gain = (((master >> 4) & 0x07) + 1) as f32 / 8.0 * OUTPUT_GAIN;
        let right_gain = ((master & 0x07) + 1) as f32 / 8.0 * OUTPUT_GAIN;

        let wave = *self.ctx.wave.lock().unwrap_or_else(PoisonError::into_inner);

        for frame in frames.iter_mut() {
            *frame = [0.0; BUS_COUNT];

            for (i, snapshot) in snapshots.iter().enumerate() {
                if !snapshot.enabled {
                    if i == 3 {
                        self.advance_noise(1);
                    }
                    continue;
                }

                let steps = self.advance_phase(i, snapshot.frequency / rate);
                let value = match i {
                    0 | 1 => {
                        let value = DUTY[snapshot.duty as usize][self.pulse_step[i]];
                        self.pulse_step[i] = (self.pulse_step[i] + steps) % 8;
                        value
                    }
                    2 => {
                        let value = wave[self.wave_step];
                        self.wave_step = (self.wave_step + steps) % WAVE_SAMPLES;
                        value
                    }
                    _ => self.advance_noise(steps),
                };

                let amp = if snapshot.left && snapshot.right { 1.0 } else { 2.0 };
                let level = value * snapshot.volume as f32 / 15.0 * amp;
                let (left, right) = if i < 2 {
                    (FRONT_LEFT, FRONT_RIGHT)
                } else {
                    (REAR_LEFT, REAR_RIGHT)
                };
                if snapshot.left {
                    frame[left] += level;
                }
                if snapshot.right {
                    frame[right] += level;
                }
            }

            frame[FRONT_LEFT] *= left_gain;
            frame[REAR_LEFT] *= left_gain;
            frame[FRONT_RIGHT] *= right_gain;
            frame[REAR_RIGHT] *= right_gain;
        }
    }

    /// Returns how many whole periods elapsed.
    fn advance_phase(&mut self, channel: usize, step: f32) -> usize {
        self.phase[channel] += step;
        let mut steps = 0;
        while self.phase[channel] >= 1.0 {
            self.phase[channel] -= 1.0;
            steps += 1;
        }
        steps
    }

    /// Current LFSR output, then moves `steps` samples ahead. Locks the ring
    /// for this frame only.
    fn advance_noise(&self, steps: usize) -> f32 {
        let mut noise = self.ctx.noise.lock().unwrap_or_else(PoisonError::into_inner);
        let value = noise.current();
        for _ in 0..steps {
            noise.advance();
        }
        value
    }

    /// Fills an interleaved device buffer with `channels` outputs per frame.
    pub fn sample_interleaved(&mut self, out: &mut [f32], channels: usize, sample_rate: u32) {
        if channels == 0 {
            return;
        }

        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.resize(out.len() / channels, [0.0; BUS_COUNT]);
        self.sample(&mut scratch, sample_rate);

        for (frame, chunk) in scratch.iter().zip(out.chunks_exact_mut(channels)) {
            let left = frame[FRONT_LEFT] + frame[REAR_LEFT];
            let right = frame[FRONT_RIGHT] + frame[REAR_RIGHT];
            let used = match channels {
                1 => {
                    chunk[0] = (left + right) * 0.5;
                    1
                }
                2 | 3 => {
                    chunk[0] = left;
                    chunk[1] = right;
                    2
                }
                _ => {
                    chunk[0] = frame[FRONT_LEFT];
                    chunk[1] = frame[FRONT_RIGHT];
                    chunk[2] = frame[REAR_LEFT];
                    chunk[3] = frame[REAR_RIGHT];
                    4
                }
            };
            chunk[used..].iter_mut().for_each(|s| *s = 0.0);
        }

        self.scratch = scratch;
    }
}
