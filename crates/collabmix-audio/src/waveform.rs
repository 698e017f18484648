//! Waveform peaks for track visualization.
//!
//! Reduces decoded samples to min/max pairs, one per display column.

use serde::{Deserialize, Serialize};

/// Amplitude range covered by one display column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WaveformSample {
    pub min: f32,
    pub max: f32,
}

impl WaveformSample {
    /// Largest absolute amplitude in the column.
    #[inline]
    pub fn peak(self) -> f32 {
        self.max.abs().max(self.min.abs())
    }
}

/// Min/max reduction of a mono buffer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Waveform {
    /// Source samples folded into each entry of `data`.
    pub samples_per_pixel: usize,
    pub data: Vec<WaveformSample>,
}

impl Waveform {
    /// Reduce `samples` in chunks of `samples_per_pixel`.
    pub fn compute(samples: &[f32], samples_per_pixel: usize) -> Self {
        let samples_per_pixel = samples_per_pixel.max(1);
        let data = samples
            .chunks(samples_per_pixel)
            .map(|chunk| {
                chunk.iter().fold(
                    WaveformSample {
                        min: f32::MAX,
                        max: f32::MIN,
                    },
                    |acc, &s| WaveformSample {
                        min: acc.min.min(s),
                        max: acc.max.max(s),
                    },
                )
            })
            .collect();
        Self {
            samples_per_pixel,
            data,
        }
    }

    /// Reduce `samples` to at most `columns` entries.
    pub fn fit(samples: &[f32], columns: usize) -> Self {
        if columns == 0 || samples.is_empty() {
            return Self {
                samples_per_pixel: 1,
                data: Vec::new(),
            };
        }
        Self::compute(samples, samples.len().div_ceil(columns))
    }
}

/// Render target handed to [`crate::AudioEngine::render_waveform`].
///
/// Stands in for the on-screen container: it has a width in columns and
/// receives whatever peaks the engine draws.
#[derive(Debug, Clone, Default)]
pub struct WaveformCanvas {
    width: usize,
    peaks: Vec<WaveformSample>,
}

impl WaveformCanvas {
    pub fn new(width: usize) -> Self {
        Self {
            width,
            peaks: Vec::new(),
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Peaks drawn by the last render, at most `width` of them.
    pub fn peaks(&self) -> &[WaveformSample] {
        &self.peaks
    }

    /// Replace the canvas contents with `samples` fitted to the width.
    pub fn draw(&mut self, samples: &[f32]) {
        self.peaks = Waveform::fit(samples, self.width).data;
    }

    pub fn clear(&mut self) {
        self.peaks.clear();
    }
}
