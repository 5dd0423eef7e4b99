//! Parametric basis shapes.
//!
//! Each family maps an `(amplitude a, scale b)` pair to an edge response
//! `esf(x)` and a radial point response `psf(r)`:
//!
//! | kind        | esf(x)                          | psf(r)                          |
//! |-------------|---------------------------------|---------------------------------|
//! | `Erf`       | `a/2 · (erf(b x) + 1)`          | `a √π/√2 · exp(-b² r²)`         |
//! | `Arctan`    | `a · (atan(b x) + π/2) / π`     | `a b² / (2π (1 + (b r)²)^{3/2})`|
//! | `Algebraic` | `a/2 · (1 + b x / √((b x)²+1))` | `a b² / (b² + r²)`              |
//!
//! All three esf curves rise from 0 at `x → -∞` to `a` at `x → +∞` and pass
//! through `a/2` at the origin. Parameters are not range-checked here; fitting
//! code constrains them through bounds.

use std::f64::consts::{PI, SQRT_2};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PsfError;

/// The closed set of basis families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    /// Error-function smoothed step with a Gaussian point response.
    Erf,
    /// Arctangent step with an inverse-power point response.
    Arctan,
    /// Algebraic `x/√(x²+1)` step with a Lorentzian-like point response.
    #[serde(alias = "bennett")]
    Algebraic,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 3] = [ShapeKind::Erf, ShapeKind::Arctan, ShapeKind::Algebraic];

    pub fn name(self) -> &'static str {
        match self {
            ShapeKind::Erf => "erf",
            ShapeKind::Arctan => "arctan",
            ShapeKind::Algebraic => "algebraic",
        }
    }

    /// Build one component of this family.
    pub fn shape(self, amplitude: f64, scale: f64) -> BasisShape {
        BasisShape {
            kind: self,
            amplitude,
            scale,
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ShapeKind {
    type Err = PsfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "erf" => Ok(ShapeKind::Erf),
            "arctan" | "atan" => Ok(ShapeKind::Arctan),
            "algebraic" | "bennett" => Ok(ShapeKind::Algebraic),
            _ => Err(PsfError::InvalidInput(format!("Unknown basis shape: {s}"))),
        }
    }
}

/// One component: a family together with its `(amplitude, scale)` pair.
///
/// Instances are cheap values built fresh from the current weights on every
/// evaluation; they hold no other state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BasisShape {
    pub kind: ShapeKind,
    pub amplitude: f64,
    pub scale: f64,
}

impl BasisShape {
    pub fn from_pair(kind: ShapeKind, pair: [f64; 2]) -> Self {
        kind.shape(pair[0], pair[1])
    }

    /// Edge response at `x`.
    pub fn esf(&self, x: f64) -> f64 {
        let (a, b) = (self.amplitude, self.scale);
        match self.kind {
            ShapeKind::Erf => a * 0.5 * (libm::erf(b * x) + 1.0),
            ShapeKind::Arctan => a * ((b * x).atan() + PI / 2.0) / PI,
            ShapeKind::Algebraic => {
                let bx = b * x;
                a * 0.5 * (1.0 + bx / (bx * bx + 1.0).sqrt())
            }
        }
    }

    /// Radial point response at `r`.
    pub fn psf(&self, r: f64) -> f64 {
        let (a, b) = (self.amplitude, self.scale);
        match self.kind {
            ShapeKind::Erf => a * PI.sqrt() / SQRT_2 * (-(b * b) * (r * r)).exp(),
            ShapeKind::Arctan => {
                let br = b * r;
                a * b * b / (2.0 * PI * (1.0 + br * br).powf(1.5))
            }
            ShapeKind::Algebraic => a * (b * b / (b * b + r * r)),
        }
    }
}
