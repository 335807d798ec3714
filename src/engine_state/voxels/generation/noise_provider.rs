//! Layered Perlin noise used by the terrain generator.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use cgmath::{Vector2, Vector3};
use ::noise::{NoiseFn, Perlin};

/// Octave count of [`NoiseProvider::value3`].
pub const DENSITY_OCTAVES: u32 = 4;

/// Source of coherent noise in roughly `[-1, 1]`.
///
/// Implementations must be deterministic: the same seed and coordinate always
/// produce the same value, on every thread.
pub trait NoiseProvider: Send + Sync {
    /// Fractal 2D noise.
    ///
    /// # Arguments
    /// * `seed` - Field seed; distinct fields use distinct seeds
    /// * `point` - Sample position, already scaled by the caller
    /// * `normalized` - Divide the octave sum by the total amplitude so the
    ///   result stays within `[-1, 1]`
    /// * `octaves` - Number of layers, each at double frequency and half amplitude
    fn value2(&self, seed: u32, point: Vector2<f64>, normalized: bool, octaves: u32) -> f64;

    /// Normalized fractal 3D noise with [`DENSITY_OCTAVES`] layers.
    fn value3(&self, seed: u32, point: Vector3<f64>) -> f64;
}

/// Fractal Brownian motion over `noise::Perlin`, one generator per seed.
#[derive(Default)]
pub struct FbmNoiseProvider {
    generators: RwLock<HashMap<u32, Arc<Perlin>>>,
}

impl FbmNoiseProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn generator(&self, seed: u32) -> Arc<Perlin> {
        if let Some(perlin) = self
            .generators
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&seed)
        {
            return perlin.clone();
        }

        self.generators
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(seed)
            .or_insert_with(|| Arc::new(Perlin::new(seed)))
            .clone()
    }

    fn fbm<const D: usize>(perlin: &Perlin, point: [f64; D], normalized: bool, octaves: u32) -> f64
    where
        Perlin: NoiseFn<f64, D>,
    {
        let mut sum = 0.0;
        let mut amplitude = 1.0;
        let mut total_amplitude = 0.0;
        let mut frequency = 1.0;

        for _ in 0..octaves.max(1) {
            sum += amplitude * perlin.get(point.map(|c| c * frequency));
            total_amplitude += amplitude;
            amplitude *= 0.5;
            frequency *= 2.0;
        }

        if normalized {
            (sum / total_amplitude).clamp(-1.0, 1.0)
        } else {
            sum
        }
    }
}

impl NoiseProvider for FbmNoiseProvider {
    fn value2(&self, seed: u32, point: Vector2<f64>, normalized: bool, octaves: u32) -> f64 {
        let perlin = self.generator(seed);
        Self::fbm(&perlin, [point.x, point.y], normalized, octaves)
    }

    fn value3(&self, seed: u32, point: Vector3<f64>) -> f64 {
        let perlin = self.generator(seed);
        Self::fbm(&perlin, [point.x, point.y, point.z], true, DENSITY_OCTAVES)
    }
}
