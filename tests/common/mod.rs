//! Shared dataset generators and accuracy checks for the end-to-end tests.

use quantile_sketch::{DDSketch, KeyMapping, Store};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp, LogNormal, Normal};

/// The quantiles every accuracy check is evaluated at.
pub const TEST_QUANTILES: &[f64] = &[0.0, 0.1, 0.25, 0.5, 0.75, 0.9, 0.95, 0.99, 0.999, 1.0];

/// A reference dataset that computes exact quantiles and summary statistics.
pub struct Dataset {
    values: Vec<f64>,
}

impl Dataset {
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    pub fn from_values(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn add(&mut self, value: f64) {
        self.values.push(value);
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    pub fn avg(&self) -> f64 {
        self.sum() / self.len() as f64
    }

    /// The exact value at the given quantile: `sorted[floor(q * (len - 1))]`.
    pub fn quantile(&self, q: f64) -> f64 {
        let mut sorted = self.values.clone();
        sorted.sort_by(|left, right| left.partial_cmp(right).expect("dataset values are not NaN"));

        let rank = (q * (sorted.len() - 1) as f64) as usize;
        sorted[rank]
    }
}

/// Asserts that the sketch reproduces the dataset's quantiles within `eps` relative error, and
/// its summary statistics almost exactly.
pub fn evaluate_sketch_accuracy<M: KeyMapping, S: Store>(
    sketch: &DDSketch<M, S>,
    dataset: &Dataset,
    eps: f64,
) {
    for &quantile in TEST_QUANTILES {
        let sketch_q = sketch.get_quantile_value(quantile);
        let data_q = dataset.quantile(quantile);
        let err = (sketch_q - data_q).abs();

        assert!(
            err - eps * data_q.abs() <= 1.0e-15,
            "quantile {}: sketch {} vs dataset {} (err {})",
            quantile,
            sketch_q,
            data_q,
            err
        );
    }

    assert_eq!(sketch.num_values(), dataset.len() as f64);
    assert_almost_eq(sketch.sum(), dataset.sum());
    assert_almost_eq(sketch.avg(), dataset.avg());
}

/// Absolute comparison with a small allowance for accumulation-order differences.
pub fn assert_almost_eq(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() <= 1.0e-6 * expected.abs().max(1.0),
        "expected {}, got {}",
        expected,
        actual
    );
}

pub fn uniform_forward(size: usize) -> Dataset {
    Dataset::from_values((0..size).map(|n| n as f64).collect())
}

pub fn uniform_backward(size: usize) -> Dataset {
    Dataset::from_values((1..=size).rev().map(|n| n as f64).collect())
}

pub fn negative_uniform_forward(size: usize) -> Dataset {
    Dataset::from_values((1..=size).rev().map(|n| -(n as f64)).collect())
}

pub fn negative_uniform_backward(size: usize) -> Dataset {
    Dataset::from_values((0..size).map(|n| -(n as f64)).collect())
}

/// Integers straddling zero, descending: `size/2, size/2 - 1, ...`.
pub fn number_line(size: usize) -> Dataset {
    let start = size as i64 / 2;
    Dataset::from_values((0..size as i64).map(|n| (start - n) as f64).collect())
}

/// Alternates between the low and high ends of `0..size`.
pub fn uniform_zoom_in(size: usize) -> Dataset {
    let mut values = Vec::with_capacity(size);
    for item in 0..size / 2 {
        values.push(item as f64);
        values.push((size - item - 1) as f64);
    }
    if size % 2 == 1 {
        values.push((size / 2) as f64);
    }
    Dataset::from_values(values)
}

pub fn constant(size: usize) -> Dataset {
    Dataset::from_values(vec![42.0; size])
}

pub fn exponential(size: usize, seed: u64) -> Dataset {
    let mut rng = SmallRng::seed_from_u64(seed);
    let exponential = Exp::new(100.0).expect("valid rate");
    Dataset::from_values(exponential.sample_iter(&mut rng).take(size).collect())
}

pub fn lognormal(size: usize, seed: u64) -> Dataset {
    let mut rng = SmallRng::seed_from_u64(seed);
    let lognormal = LogNormal::new(0.0, 1.0).expect("valid parameters");
    Dataset::from_values(
        lognormal
            .sample_iter(&mut rng)
            .take(size)
            .map(|value| value / 100.0)
            .collect(),
    )
}

pub fn normal(size: usize, loc: f64, scale: f64, seed: u64) -> Dataset {
    let mut rng = SmallRng::seed_from_u64(seed);
    let normal = Normal::new(loc, scale).expect("valid parameters");
    Dataset::from_values(normal.sample_iter(&mut rng).take(size).collect())
}

/// Laplace samples by inverse CDF, centered far from zero like a duration in microseconds.
pub fn laplace(size: usize, seed: u64) -> Dataset {
    let mut rng = SmallRng::seed_from_u64(seed);
    let (loc, scale) = (11278.0, 100.0);

    let mut values = Vec::with_capacity(size);
    for _ in 0..size {
        let mut laplace_x = -(1.0 - rng.random::<f64>()).ln() * scale;
        if rng.random::<f64>() < 0.5 {
            laplace_x = -laplace_x;
        }
        values.push(laplace_x + loc);
    }
    Dataset::from_values(values)
}

/// A two-humped mixture of a Laplace mode on the right and a normal mode on the left.
pub fn bimodal(size: usize, seed: u64) -> Dataset {
    let mut rng = SmallRng::seed_from_u64(seed);
    let left = Normal::new(-2.0, 3.0).expect("valid parameters");

    let mut values = Vec::with_capacity(size);
    for _ in 0..size {
        if rng.random::<f64>() > 0.5 {
            let mut laplace_x = -(1.0 - rng.random::<f64>()).ln();
            if rng.random::<f64>() < 0.5 {
                laplace_x = -laplace_x;
            }
            values.push(laplace_x + 17.3);
        } else {
            values.push(left.sample(&mut rng));
        }
    }
    Dataset::from_values(values)
}

/// Integer-truncated samples from a narrow normal distribution straddling zero.
pub fn integers(size: usize, seed: u64) -> Dataset {
    let mut rng = SmallRng::seed_from_u64(seed);
    let distribution = Normal::new(4.3, 5.0).expect("valid parameters");
    Dataset::from_values(
        distribution
            .sample_iter(&mut rng)
            .take(size)
            .map(|value| value as i64 as f64)
            .collect(),
    )
}
