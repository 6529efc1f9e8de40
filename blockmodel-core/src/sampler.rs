//! Seedable randomness for the inference engine.
//!
//! Every stochastic decision in the library routes through a [`Sampler`]
//! owned by the network, so a fixed seed makes a whole run reproducible.
//! There is no process-wide generator state.

use rand::{Rng, SeedableRng, distributions::Standard, rngs::SmallRng, seq::SliceRandom};

use crate::error::SamplerError;

/// Deterministic source of randomness owned by a
/// [`Network`](crate::Network).
///
/// # Examples
/// ```
/// use blockmodel_core::Sampler;
///
/// let mut sampler = Sampler::new(42);
/// let draw = sampler.uniform();
/// assert!((0.0..1.0).contains(&draw));
/// ```
#[derive(Clone, Debug)]
pub struct Sampler {
    rng: SmallRng,
}

impl Sampler {
    /// Creates a sampler seeded with `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Draws a uniform value in `[0, 1)`.
    pub fn uniform(&mut self) -> f64 {
        self.rng.sample(Standard)
    }

    /// Draws a uniform integer in `[0, n)`.
    ///
    /// # Errors
    /// Returns [`SamplerError::EmptyRange`] when `n == 0`.
    pub fn int_in(&mut self, n: usize) -> Result<usize, SamplerError> {
        if n == 0 {
            return Err(SamplerError::EmptyRange);
        }
        Ok(self.rng.gen_range(0..n))
    }

    /// Picks a uniformly random element of `items`.
    ///
    /// # Errors
    /// Returns [`SamplerError::EmptyRange`] when `items` is empty.
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Result<&'a T, SamplerError> {
        let index = self.int_in(items.len())?;
        Ok(&items[index])
    }

    /// Shuffles `items` in place with a Fisher–Yates pass.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rng);
    }

    /// Picks an index with probability proportional to `weights`.
    ///
    /// # Errors
    /// Returns [`SamplerError::InvalidWeights`] when any weight is negative
    /// or non-finite, or when the weights sum to zero (including the empty
    /// slice).
    pub fn weighted_choice(&mut self, weights: &[f64]) -> Result<usize, SamplerError> {
        let mut total = 0.0_f64;
        for &weight in weights {
            if !weight.is_finite() || weight < 0.0 {
                return Err(SamplerError::InvalidWeights);
            }
            total += weight;
        }
        if total <= 0.0 {
            return Err(SamplerError::InvalidWeights);
        }

        let target = self.uniform() * total;
        let mut cumulative = 0.0_f64;
        for (index, &weight) in weights.iter().enumerate() {
            cumulative += weight;
            if target < cumulative {
                return Ok(index);
            }
        }
        // Rounding can leave `target` at the very top of the cumulative sum;
        // the last positively weighted index is the correct draw there.
        weights
            .iter()
            .rposition(|&weight| weight > 0.0)
            .ok_or(SamplerError::InvalidWeights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_replays_the_same_stream() {
        let mut left = Sampler::new(7);
        let mut right = Sampler::new(7);
        for _ in 0..32 {
            assert_eq!(left.uniform().to_bits(), right.uniform().to_bits());
        }
    }

    #[test]
    fn int_in_rejects_empty_range() {
        let mut sampler = Sampler::new(1);
        assert_eq!(sampler.int_in(0), Err(SamplerError::EmptyRange));
    }

    #[test]
    fn int_in_stays_in_bounds() {
        let mut sampler = Sampler::new(11);
        for _ in 0..256 {
            let draw = sampler.int_in(5).expect("non-empty range");
            assert!(draw < 5);
        }
    }

    #[test]
    fn choose_rejects_empty_slice() {
        let mut sampler = Sampler::new(3);
        let empty: [u8; 0] = [];
        assert_eq!(sampler.choose(&empty), Err(SamplerError::EmptyRange));
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut sampler = Sampler::new(5);
        let mut items: Vec<usize> = (0..16).collect();
        sampler.shuffle(&mut items);
        let mut sorted = items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..16).collect::<Vec<_>>());
    }

    #[test]
    fn weighted_choice_rejects_bad_weights() {
        let mut sampler = Sampler::new(9);
        assert_eq!(
            sampler.weighted_choice(&[]),
            Err(SamplerError::InvalidWeights)
        );
        assert_eq!(
            sampler.weighted_choice(&[0.0, 0.0]),
            Err(SamplerError::InvalidWeights)
        );
        assert_eq!(
            sampler.weighted_choice(&[1.0, -0.5]),
            Err(SamplerError::InvalidWeights)
        );
        assert_eq!(
            sampler.weighted_choice(&[f64::NAN]),
            Err(SamplerError::InvalidWeights)
        );
    }

    #[test]
    fn weighted_choice_never_picks_zero_weight() {
        let mut sampler = Sampler::new(13);
        for _ in 0..512 {
            let index = sampler
                .weighted_choice(&[0.0, 2.0, 0.0, 1.0])
                .expect("weights are valid");
            assert!(index == 1 || index == 3);
        }
    }

    #[test]
    fn weighted_choice_tracks_proportions() {
        let mut sampler = Sampler::new(17);
        let mut hits = [0_usize; 2];
        for _ in 0..4000 {
            let index = sampler
                .weighted_choice(&[3.0, 1.0])
                .expect("weights are valid");
            hits[index] += 1;
        }
        let fraction = hits[0] as f64 / 4000.0;
        assert!((fraction - 0.75).abs() < 0.05, "fraction was {fraction}");
    }
}
