// ============================================================
// Layer 4 — Train/Held-out Splitter
// ============================================================
// Shuffles samples with a SEEDED generator and splits them
// into a training set and a held-out set.
//
// The seed matters: re-running training on the same data
// with the same seed must put exactly the same rows on each
// side of the split, otherwise two runs of the same job
// produce two different models.
//
// Uses Fisher-Yates shuffle via rand::seq::SliceRandom on a
// StdRng seeded from a u64.
//
// Reference: rand crate documentation

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Shuffle `samples` with `seed` and split into (train, held_out).
///
/// `train_fraction` is clamped to [0, 1]; the split point is
/// rounded, so 2 samples at 0.8 gives 2 training samples.
pub fn split_train_holdout<T>(mut samples: Vec<T>, train_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total    = samples.len();
    let fraction = train_fraction.clamp(0.0, 1.0);
    let split_at = ((total as f64) * fraction).round() as usize;
    let split_at = split_at.min(total);

    let held_out = samples.split_off(split_at);

    tracing::debug!(
        "Dataset split (seed {}): {} training, {} held out",
        seed,
        samples.len(),
        held_out.len(),
    );

    (samples, held_out)
}
