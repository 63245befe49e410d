//! Per-worker random sampling.
//!
//! Every rendering worker owns its own `Sampler`; nothing here is shared
//! or locked. Workers seeded with `for_worker` draw from fresh entropy mixed
//! with their id, while `with_seed` reproduces a fixed stream.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use skwr_math::Vec3;
use std::f32::consts::PI;

/// Uniform random source for one worker.
#[derive(Debug, Clone)]
pub struct Sampler {
    rng: StdRng,
}

impl Sampler {
    /// Deterministic stream for a fixed seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Fresh stream for worker `worker_id`.
    ///
    /// Entropy comes from the thread-local OS-seeded generator and is mixed
    /// with the id, so two workers never start from the same state.
    pub fn for_worker(worker_id: u64) -> Self {
        let entropy: u64 = rand::random();
        Self::with_seed(mix_seed(entropy, worker_id))
    }

    /// Uniform value in [0, 1).
    #[inline]
    pub fn uniform_float(&mut self) -> f32 {
        self.rng.gen::<f32>()
    }

    /// Uniform value in [min, max).
    #[inline]
    pub fn uniform_range(&mut self, min: f32, max: f32) -> f32 {
        min + (max - min) * self.uniform_float()
    }
}

/// Combine two 64-bit values into a well-spread seed (SplitMix64 finalizer).
pub fn mix_seed(a: u64, b: u64) -> u64 {
    let mut z = a ^ b.wrapping_add(0x9E37_79B9_7F4A_7C15).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Rejection-sample a point strictly inside the unit sphere.
pub fn random_in_unit_sphere(sampler: &mut Sampler) -> Vec3 {
    loop {
        let p = Vec3::new(
            sampler.uniform_range(-1.0, 1.0),
            sampler.uniform_range(-1.0, 1.0),
            sampler.uniform_range(-1.0, 1.0),
        );
        if p.length_squared() < 1.0 {
            return p;
        }
    }
}

/// Uniform direction on the unit sphere.
pub fn random_unit_vector(sampler: &mut Sampler) -> Vec3 {
    loop {
        let p = random_in_unit_sphere(sampler);
        let len_sq = p.length_squared();
        // Avoid blowing up tiny vectors near the center
        if len_sq > 1e-12 {
            return p / len_sq.sqrt();
        }
    }
}

/// Cosine-weighted direction about +Z.
pub fn random_cosine_direction(sampler: &mut Sampler) -> Vec3 {
    let r1 = sampler.uniform_float();
    let r2 = sampler.uniform_float();

    let phi = 2.0 * PI * r1;
    let sqrt_r2 = r2.sqrt();
    Vec3::new(phi.cos() * sqrt_r2, phi.sin() * sqrt_r2, (1.0 - r2).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_float_range() {
        let mut sampler = Sampler::with_seed(7);
        for _ in 0..10_000 {
            let v = sampler.uniform_float();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn test_uniform_range_bounds() {
        let mut sampler = Sampler::with_seed(11);
        for _ in 0..10_000 {
            let v = sampler.uniform_range(-3.0, 5.0);
            assert!((-3.0..5.0).contains(&v));
        }
    }

    #[test]
    fn test_fixed_seed_reproduces_stream() {
        let mut a = Sampler::with_seed(1234);
        let mut b = Sampler::with_seed(1234);
        for _ in 0..100 {
            assert_eq!(a.uniform_float(), b.uniform_float());
        }
    }

    #[test]
    fn test_workers_get_distinct_streams() {
        let mut a = Sampler::for_worker(0);
        let mut b = Sampler::for_worker(1);
        let sa: Vec<f32> = (0..8).map(|_| a.uniform_float()).collect();
        let sb: Vec<f32> = (0..8).map(|_| b.uniform_float()).collect();
        assert_ne!(sa, sb);
    }

    #[test]
    fn test_mix_seed_spreads_neighbours() {
        assert_ne!(mix_seed(42, 0), mix_seed(42, 1));
        assert_ne!(mix_seed(0, 0), 0);
    }

    #[test]
    fn test_random_unit_vector_is_unit() {
        let mut sampler = Sampler::with_seed(3);
        for _ in 0..1000 {
            let v = random_unit_vector(&mut sampler);
            assert!((v.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_cosine_direction_upper_hemisphere() {
        let mut sampler = Sampler::with_seed(5);
        let mut mean_z = 0.0;
        let n = 20_000;
        for _ in 0..n {
            let d = random_cosine_direction(&mut sampler);
            assert!(d.z >= 0.0);
            assert!((d.length() - 1.0).abs() < 1e-4);
            mean_z += d.z;
        }
        // E[cos θ] under a cosine-weighted distribution is 2/3
        mean_z /= n as f32;
        assert!((mean_z - 2.0 / 3.0).abs() < 0.02, "mean z = {mean_z}");
    }
}
