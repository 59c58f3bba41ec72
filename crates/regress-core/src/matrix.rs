//! Cartesian expansion of configuration axes into test cases.
//!
//! Order is lexicographic in axis declaration order: the first axis varies
//! slowest, the last fastest. Every iterator is produced fresh from
//! borrowed axes, so re-iterating yields the same tuples in the same order.
//! Nothing is pruned; [`Sampling::Stride`] is an explicit opt-in.

use sha2::{Digest, Sha256};

use crate::domain::error::{ConfigError, Result};
use crate::domain::{ExpectedOutcome, Instance, NamedConfig, Registry, TestCase};

/// Odometer over axis lengths, yielding one index per axis.
#[derive(Debug, Clone)]
pub struct IndexProduct {
    lengths: Vec<usize>,
    current: Option<Vec<usize>>,
    remaining: usize,
}

impl IndexProduct {
    pub fn new(lengths: &[usize]) -> Self {
        let total = lengths.iter().product::<usize>();
        let current = if total == 0 {
            None
        } else {
            Some(vec![0; lengths.len()])
        };
        Self {
            lengths: lengths.to_vec(),
            current,
            remaining: total,
        }
    }
}

impl Iterator for IndexProduct {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current.as_mut()?;
        let item = current.clone();
        self.remaining -= 1;

        // Advance the rightmost axis, carrying leftwards.
        let mut exhausted = true;
        for axis in (0..self.lengths.len()).rev() {
            current[axis] += 1;
            if current[axis] < self.lengths[axis] {
                exhausted = false;
                break;
            }
            current[axis] = 0;
        }
        if exhausted {
            self.current = None;
        }

        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for IndexProduct {}

/// Opt-in subsampling of an expanded matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sampling {
    /// Every tuple.
    #[default]
    Full,
    /// Tuples whose position `p` satisfies `p % every == offset`.
    Stride { every: usize, offset: usize },
}

impl Sampling {
    pub fn stride(every: usize, offset: usize) -> Result<Self> {
        if every == 0 {
            return Err(ConfigError::InvalidSampling(
                "stride must be at least 1".to_string(),
            ));
        }
        if offset >= every {
            return Err(ConfigError::InvalidSampling(format!(
                "offset {offset} must be smaller than stride {every}"
            )));
        }
        Ok(Sampling::Stride { every, offset })
    }

    pub fn keeps(&self, position: usize) -> bool {
        match *self {
            Sampling::Full => true,
            Sampling::Stride { every, offset } => position % every == offset,
        }
    }
}

/// A named axis of candidate values.
#[derive(Debug, Clone)]
pub struct Axis<T> {
    pub name: String,
    pub values: Vec<T>,
}

/// Homogeneous N-axis product.
#[derive(Debug, Clone)]
pub struct Matrix<T> {
    axes: Vec<Axis<T>>,
}

impl<T> Default for Matrix<T> {
    fn default() -> Self {
        Self { axes: Vec::new() }
    }
}

impl<T> Matrix<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an axis; it varies faster than every axis declared before it.
    pub fn axis(mut self, name: impl Into<String>, values: Vec<T>) -> Self {
        self.axes.push(Axis {
            name: name.into(),
            values,
        });
        self
    }

    pub fn axes(&self) -> &[Axis<T>] {
        &self.axes
    }

    /// Number of tuples: the product of the axis sizes.
    pub fn len(&self) -> usize {
        self.axes.iter().map(|a| a.values.len()).product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lazily enumerate every tuple.
    pub fn iter(&self) -> impl Iterator<Item = Vec<&T>> + '_ {
        let lengths: Vec<usize> = self.axes.iter().map(|a| a.values.len()).collect();
        IndexProduct::new(&lengths).map(move |indices| {
            indices
                .iter()
                .zip(&self.axes)
                .map(|(&i, axis)| &axis.values[i])
                .collect()
        })
    }
}

/// The driver's matrix: `policy x search x instance`, one expected outcome.
#[derive(Debug, Clone)]
pub struct CaseMatrix {
    pub policies: Vec<NamedConfig>,
    pub searches: Vec<NamedConfig>,
    pub instances: Vec<Instance>,
    pub expected: ExpectedOutcome,
    pub sampling: Sampling,
}

impl CaseMatrix {
    pub fn new(
        policies: Vec<NamedConfig>,
        searches: Vec<NamedConfig>,
        instances: Vec<Instance>,
        expected: ExpectedOutcome,
    ) -> Self {
        Self {
            policies,
            searches,
            instances,
            expected,
            sampling: Sampling::Full,
        }
    }

    pub fn with_sampling(mut self, sampling: Sampling) -> Self {
        self.sampling = sampling;
        self
    }

    /// Fail fast on empty axes and on nodes the registry does not accept.
    pub fn validate(&self, registry: &Registry) -> Result<()> {
        let axes = [
            ("policy", self.policies.len()),
            ("search", self.searches.len()),
            ("instance", self.instances.len()),
        ];
        for (axis, len) in axes {
            if len == 0 {
                return Err(ConfigError::EmptyAxis {
                    axis: axis.to_string(),
                });
            }
        }
        for config in self.policies.iter().chain(&self.searches) {
            registry.validate(&config.node)?;
        }
        Ok(())
    }

    /// Size of the full product, before sampling.
    pub fn full_len(&self) -> usize {
        self.policies.len() * self.searches.len() * self.instances.len()
    }

    /// Lazily materialize the test cases in expansion order.
    ///
    /// `TestCase::index` is the position in the full product, so sampled
    /// runs keep indices comparable with full runs.
    pub fn cases(&self) -> impl Iterator<Item = TestCase> + '_ {
        let lengths = [
            self.policies.len(),
            self.searches.len(),
            self.instances.len(),
        ];
        IndexProduct::new(&lengths)
            .enumerate()
            .filter(move |(position, _)| self.sampling.keeps(*position))
            .map(move |(position, idx)| TestCase {
                index: position,
                policy: self.policies[idx[0]].clone(),
                search: self.searches[idx[1]].clone(),
                instance: self.instances[idx[2]].clone(),
                expected: self.expected.clone(),
            })
    }

    /// SHA-256 over the ordered case identities and the exit-code contract.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.expected.exit_code.to_le_bytes());
        if let Some(pattern) = self.expected.pattern_str() {
            hasher.update(pattern.as_bytes());
        }
        hasher.update(b"\0");
        for case in self.cases() {
            hasher.update(case.identity().as_bytes());
            hasher.update(b"\0");
        }
        hex::encode(hasher.finalize())
    }
}
