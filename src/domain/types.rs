//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - built in-memory by callers (or deserialized from a config document)
//! - passed unchanged to both fitting procedures
//! - captured as a snapshot of a fitted model

use serde::{Deserialize, Serialize};

use crate::models::ShapeKind;

/// Opaque identifier of a registered basis family.
pub type FamilyId = String;

/// One `(amplitude, scale)` pair, i.e. the parameters of a single component.
pub type WeightPair = [f64; 2];

/// Closed interval constraint on one scalar of the flattened weight vector.
///
/// Infinite ends are written as `null` (or omitted) in serialized form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bound {
    #[serde(default = "neg_inf", with = "open_end")]
    pub low: f64,
    #[serde(default = "pos_inf", with = "open_end")]
    pub high: f64,
}

impl Bound {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// `(-inf, inf)`: the default for amplitudes.
    pub fn unbounded() -> Self {
        Self::new(f64::NEG_INFINITY, f64::INFINITY)
    }

    /// `[0, inf)`: the default for scales.
    pub fn non_negative() -> Self {
        Self::new(0.0, f64::INFINITY)
    }

    /// Project `value` into the interval.
    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.low).min(self.high)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.low && value <= self.high
    }

    pub fn is_valid(&self) -> bool {
        !self.low.is_nan() && !self.high.is_nan() && self.low <= self.high
    }
}

fn neg_inf() -> f64 {
    f64::NEG_INFINITY
}

fn pos_inf() -> f64 {
    f64::INFINITY
}

/// Serialize non-finite interval ends as `None`.
mod open_end {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_some(value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        // `null` decodes to NaN; `Bound::normalized` picks the infinity's sign.
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}

impl Bound {
    /// Replace `null` ends (decoded as NaN) with the matching infinity.
    pub fn normalized(self) -> Self {
        Self {
            low: if self.low.is_nan() { f64::NEG_INFINITY } else { self.low },
            high: if self.high.is_nan() { f64::INFINITY } else { self.high },
        }
    }
}

/// Default bounds for a model with `components` components.
///
/// Exactly two bounds per component, matching the flattened layout
/// `[a0, b0, a1, b1, ...]`: amplitudes are free, scales are non-negative.
pub fn default_bounds(components: usize) -> Vec<Bound> {
    let mut out = Vec::with_capacity(components * 2);
    for _ in 0..components {
        out.push(Bound::unbounded());
        out.push(Bound::non_negative());
    }
    out
}

/// Settings for the bundled bounded BFGS solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Iteration cap per solver call.
    pub max_iters: usize,
    /// Gradient-norm tolerance for convergence.
    pub tolerance: f64,
    /// Step of the central-difference gradient.
    pub gradient_step: f64,
    /// Distance from a bound at which a coordinate counts as active.
    pub bound_tolerance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iters: 200,
            tolerance: 1e-5,
            gradient_step: 1e-6,
            bound_tolerance: 1e-6,
        }
    }
}

/// Options shared by `fit_to_esf` and `fit_nonblind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Number of solver restarts, each seeded from the previous result.
    pub iters: usize,
    /// Log an `Iteration: i / n` line at info level for every restart.
    pub verbose: bool,
    /// Per-scalar bounds; `None` uses [`default_bounds`].
    pub constraints: Option<Vec<Bound>>,
    pub solver: SolverConfig,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            iters: 1,
            verbose: false,
            constraints: None,
            solver: SolverConfig::default(),
        }
    }
}

impl FitConfig {
    pub fn with_iters(mut self, iters: usize) -> Self {
        self.iters = iters;
        self
    }

    pub fn with_constraints(mut self, constraints: Vec<Bound>) -> Self {
        self.constraints = Some(constraints);
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Resolve the bound list for a weight vector describing `components` components.
    pub fn resolved_bounds(&self, components: usize) -> Vec<Bound> {
        match &self.constraints {
            Some(bounds) => bounds.iter().map(|b| b.normalized()).collect(),
            None => default_bounds(components),
        }
    }
}

/// One family as captured by [`WeightSnapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilySnapshot {
    pub id: FamilyId,
    pub kind: ShapeKind,
    pub count: i64,
    pub weights: Vec<WeightPair>,
}

/// Serializable capture of a mixture: registry, counts and structured weights,
/// in registration order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WeightSnapshot {
    pub families: Vec<FamilySnapshot>,
}
