// Random-engine capability injected into every stochastic routine, plus a
// small PCG-LCG generator that gives each track its own reproducible stream.

use rand::{RngCore, SeedableRng};
use rand_distr::{Distribution, Poisson, StandardNormal};

/// Uniform-deviate capability used by the samplers.
///
/// Blanket-implemented for every [`RngCore`], so any `rand` generator can be
/// passed to the kernel. Samplers only ever call the methods below.
pub trait RandomEngine: RngCore {
    /// Uniform deviate in `[0, 1)`.
    #[inline]
    fn flat(&mut self) -> f64 {
        // 53 random mantissa bits
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Fill `out` with uniform deviates in `[0, 1)`.
    #[inline]
    fn flat_array(&mut self, out: &mut [f64]) {
        for v in out.iter_mut() {
            *v = self.flat();
        }
    }

    /// Normal deviate with the given mean and standard deviation.
    #[inline]
    fn gauss(&mut self, mean: f64, sigma: f64) -> f64 {
        let z: f64 = StandardNormal.sample(self);
        mean + sigma * z
    }

    /// Poisson distributed integer count with the given mean.
    #[inline]
    fn poisson(&mut self, mean: f64) -> f64 {
        match Poisson::new(mean) {
            Ok(dist) => dist.sample(self),
            Err(_) => 0.0,
        }
    }
}

impl<R: RngCore + ?Sized> RandomEngine for R {}

/// LCG multiplier
const PRN_MULT: u64 = 6364136223846793005;
/// LCG additive constant
const PRN_ADD: u64 = 1442695040888963407;
/// Number of deviates reserved for each track stream
const PRN_STRIDE: u64 = 152917;

/// PCG-LCG generator with a single `u64` of state and O(log n) skip-ahead.
///
/// Cheap enough to create per track: `TrackRng::for_track(seed, id)` starts
/// the stream of track `id` `PRN_STRIDE * id` deviates after `seed`, so the
/// result of a simulation does not depend on how tracks are spread across
/// workers.
#[derive(Clone, Copy, Debug)]
pub struct TrackRng {
    state: u64,
}

impl TrackRng {
    #[inline]
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Independent stream for the track with the given id.
    pub fn for_track(seed: u64, track_id: u64) -> Self {
        Self::new(skip_ahead(track_id.wrapping_mul(PRN_STRIDE), seed))
    }

    /// Jump the stream forward by `n` deviates.
    pub fn advance(&mut self, n: u64) {
        self.state = skip_ahead(n, self.state);
    }

    #[inline]
    pub fn reseed(&mut self, seed: u64) {
        self.state = seed;
    }
}

/// State of the LCG after `n` steps from `seed`.
fn skip_ahead(mut n: u64, seed: u64) -> u64 {
    let mut g = PRN_MULT;
    let mut c = PRN_ADD;
    let mut g_new: u64 = 1;
    let mut c_new: u64 = 0;
    while n > 0 {
        if n & 1 == 1 {
            g_new = g_new.wrapping_mul(g);
            c_new = c_new.wrapping_mul(g).wrapping_add(c);
        }
        c = g.wrapping_add(1).wrapping_mul(c);
        g = g.wrapping_mul(g);
        n >>= 1;
    }
    g_new.wrapping_mul(seed).wrapping_add(c_new)
}

impl SeedableRng for TrackRng {
    type Seed = [u8; 8];

    fn from_seed(seed: Self::Seed) -> Self {
        Self {
            state: u64::from_le_bytes(seed),
        }
    }
}

impl RngCore for TrackRng {
    #[inline(always)]
    fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    #[inline(always)]
    fn next_u64(&mut self) -> u64 {
        self.state = PRN_MULT.wrapping_mul(self.state).wrapping_add(PRN_ADD);
        // RXS-M-XS output permutation
        let word = ((self.state >> ((self.state >> 59) + 5)) ^ self.state)
            .wrapping_mul(12605985483714917081);
        (word >> 43) ^ word
    }

    #[inline]
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        let mut left = dest;
        while left.len() >= 8 {
            let bytes = self.next_u64().to_le_bytes();
            left[..8].copy_from_slice(&bytes);
            left = &mut left[8..];
        }
        if !left.is_empty() {
            let bytes = self.next_u64().to_le_bytes();
            left.copy_from_slice(&bytes[..left.len()]);
        }
    }

    #[inline]
    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
