//! Weighted mixture of basis shapes.
//!
//! The model keeps two views of the same weight data:
//!
//! - a structured view: family id -> ordered `(amplitude, scale)` rows
//! - a flattened view: `[a0, b0, a1, b1, ...]` plus one family tag per row
//!
//! Fitting code works on the flattened view (it is what the solver sees);
//! callers usually inspect the structured one. The flattened view is always
//! derived from the structured one by concatenating rows in family
//! registration order, and every mutation validates its input before touching
//! either view. The fields are private so nothing outside this module can
//! update one view without the other.
//!
//! A family whose count is zero or negative is *inert*: its rows may still be
//! stored, but it contributes nothing to `esf`, `psf`, `kernel` or any fit.

use indexmap::IndexMap;
use nalgebra::{DMatrix, DVector};

use crate::domain::{FamilyId, FamilySnapshot, WeightPair, WeightSnapshot};
use crate::error::{PsfError, Result};
use crate::math::radius_squared_grid;
use crate::models::{BasisShape, ShapeKind};

/// Structured weights: family id -> component rows.
pub type StructuredWeights = IndexMap<FamilyId, Vec<WeightPair>>;

/// Registry entry: which shape a family builds and how many components it owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Family {
    pub kind: ShapeKind,
    pub count: i64,
}

impl Family {
    pub fn is_active(&self) -> bool {
        self.count > 0
    }

    /// Number of weight rows default initialization allocates.
    pub fn rows(&self) -> usize {
        self.count.max(0) as usize
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MixtureModel {
    families: IndexMap<FamilyId, Family>,
    weights: StructuredWeights,
    weights_vec: Vec<f64>,
    weights_vec_id: Vec<FamilyId>,
}

impl MixtureModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `family_id` as `kind` and add `count` components to it.
    ///
    /// Counts accumulate across calls; the kind is rebound every time.
    /// Weights are not touched, call [`MixtureModel::initialize`] afterwards.
    pub fn add(&mut self, count: i64, kind: ShapeKind, family_id: impl Into<FamilyId>) -> &mut Self {
        let id = family_id.into();
        let family = self.families.entry(id.clone()).or_insert(Family { kind, count: 0 });
        family.kind = kind;
        family.count += count;
        log::trace!("registered family '{id}' as {kind} (count={})", family.count);
        self
    }

    /// (Re)build the weight store from scratch.
    ///
    /// With `None`, every component of every registered family gets
    /// `(1 / total_components, 1)`. With `Some(weights)`, the mapping is adopted
    /// as the structured view; each active family must supply exactly `count` rows.
    pub fn initialize(&mut self, weights: Option<StructuredWeights>) -> Result<()> {
        let structured = match weights {
            Some(weights) => self.checked_structured(weights)?,
            None => {
                let total = self.total_components();
                let amplitude = if total > 0 { 1.0 / total as f64 } else { 0.0 };
                self.families
                    .iter()
                    .map(|(id, f)| (id.clone(), vec![[amplitude, 1.0]; f.rows()]))
                    .collect()
            }
        };
        self.store(structured);
        log::trace!("initialized {} components", self.weights_vec_id.len());
        Ok(())
    }

    /// Replace the structured weights wholesale and re-derive the flattened view.
    pub fn update_weights(&mut self, weights: StructuredWeights) -> Result<()> {
        let structured = self.checked_structured(weights)?;
        self.store(structured);
        Ok(())
    }

    /// Regroup a flat `[a0, b0, a1, b1, ...]` vector into per-family rows.
    ///
    /// `ids` tags each pair with its family and defaults to the stored tag
    /// sequence. Rows keep their relative order within a family; the stored
    /// flattened view is re-derived in registration order, so grouped inputs
    /// round-trip exactly.
    ///
    /// Explicit tags must give every active family exactly `count` rows. With
    /// the stored tags the per-family rows stay what they already are.
    pub fn update_weights_from_vec(&mut self, weights: &[f64], ids: Option<&[FamilyId]>) -> Result<()> {
        let explicit = ids.is_some();
        let ids = ids.unwrap_or(&self.weights_vec_id);
        if weights.len() % 2 != 0 {
            return Err(PsfError::shape(format!(
                "flattened weight vector has odd length {}",
                weights.len()
            )));
        }
        if ids.len() * 2 != weights.len() {
            return Err(PsfError::shape(format!(
                "{} family tags cannot describe {} scalars (expected {} tags)",
                ids.len(),
                weights.len(),
                weights.len() / 2
            )));
        }

        let mut grouped: StructuredWeights = IndexMap::new();
        for (pair, id) in weights.chunks_exact(2).zip(ids) {
            if !self.families.contains_key(id) {
                return Err(PsfError::UnknownFamily(id.clone()));
            }
            grouped.entry(id.clone()).or_default().push([pair[0], pair[1]]);
        }

        let structured = if explicit {
            self.checked_structured(grouped)?
        } else {
            self.in_registration_order(grouped)
        };
        self.store(structured);
        Ok(())
    }

    /// Register/augment a family and append its weights in one step.
    ///
    /// Rows already stored for this or any other family are kept; the new
    /// rows go after the family's existing rows.
    pub fn add_initialize(
        &mut self,
        count: i64,
        weights: Vec<WeightPair>,
        kind: ShapeKind,
        family_id: impl Into<FamilyId>,
    ) -> Result<()> {
        let id = family_id.into();
        let expected = count.max(0) as usize;
        if weights.len() != expected {
            return Err(PsfError::shape(format!(
                "family '{id}': {} weight rows supplied for count {count}",
                weights.len()
            )));
        }

        self.add(count, kind, id.clone());
        let mut structured = self.weights.clone();
        structured.entry(id).or_default().extend(weights);
        let structured = self.in_registration_order(structured);
        self.store(structured);
        Ok(())
    }

    /// Mixture edge response at `x`.
    pub fn esf(&self, x: f64) -> f64 {
        self.components().map(|c| c.esf(x)).sum()
    }

    /// Mixture point response at `r`.
    pub fn psf(&self, r: f64) -> f64 {
        self.components().map(|c| c.psf(r)).sum()
    }

    /// Mixture edge response at every point of `domain`.
    pub fn esf_domain(&self, domain: &[f64]) -> DVector<f64> {
        let mut out = DVector::zeros(domain.len());
        for c in self.components() {
            for (o, &x) in out.iter_mut().zip(domain) {
                *o += c.esf(x);
            }
        }
        out
    }

    /// Mixture point response applied element-wise to `grid`.
    pub fn psf_grid(&self, grid: &DMatrix<f64>) -> DMatrix<f64> {
        let mut out = DMatrix::zeros(grid.nrows(), grid.ncols());
        for c in self.components() {
            for (o, &r) in out.iter_mut().zip(grid.iter()) {
                *o += c.psf(r);
            }
        }
        out
    }

    /// Sample the PSF on the `(h_domain.len(), w_domain.len())` grid.
    ///
    /// Cells hold `psf(w² + h²)`: the response is evaluated at the squared radius.
    pub fn kernel(&self, w_domain: &[f64], h_domain: &[f64]) -> DMatrix<f64> {
        self.psf_grid(&radius_squared_grid(w_domain, h_domain))
    }

    /// Active components in flattened order.
    pub fn components(&self) -> impl Iterator<Item = BasisShape> + '_ {
        self.weights_vec
            .chunks_exact(2)
            .zip(&self.weights_vec_id)
            .filter_map(|(pair, id)| {
                let family = self.families.get(id)?;
                family
                    .is_active()
                    .then(|| BasisShape::from_pair(family.kind, [pair[0], pair[1]]))
            })
    }

    /// Per stored component: its shape kind, or `None` when the family is inert.
    pub fn component_kinds(&self) -> Vec<Option<ShapeKind>> {
        self.weights_vec_id
            .iter()
            .map(|id| {
                self.families
                    .get(id)
                    .filter(|f| f.is_active())
                    .map(|f| f.kind)
            })
            .collect()
    }

    pub fn weights(&self) -> &StructuredWeights {
        &self.weights
    }

    pub fn weights_vec(&self) -> &[f64] {
        &self.weights_vec
    }

    pub fn weights_vec_id(&self) -> &[FamilyId] {
        &self.weights_vec_id
    }

    pub fn families(&self) -> &IndexMap<FamilyId, Family> {
        &self.families
    }

    pub fn component_count(&self, family_id: &str) -> Option<i64> {
        self.families.get(family_id).map(|f| f.count)
    }

    pub fn shape_kind(&self, family_id: &str) -> Option<ShapeKind> {
        self.families.get(family_id).map(|f| f.kind)
    }

    /// Sum of positive family counts.
    pub fn total_components(&self) -> usize {
        self.families.values().map(Family::rows).sum()
    }

    /// Whether every active family has exactly `count` stored rows.
    ///
    /// False after `add` until the store is rebuilt.
    pub fn is_synchronized(&self) -> bool {
        self.families.iter().all(|(id, f)| {
            !f.is_active() || self.weights.get(id).map_or(0, Vec::len) == f.rows()
        })
    }

    pub fn snapshot(&self) -> WeightSnapshot {
        WeightSnapshot {
            families: self
                .families
                .iter()
                .map(|(id, f)| FamilySnapshot {
                    id: id.clone(),
                    kind: f.kind,
                    count: f.count,
                    weights: self.weights.get(id).cloned().unwrap_or_default(),
                })
                .collect(),
        }
    }

    /// Rebuild a model from a snapshot, preserving registration order.
    pub fn from_snapshot(snapshot: &WeightSnapshot) -> Self {
        let mut model = Self::new();
        let mut structured = StructuredWeights::new();
        for f in &snapshot.families {
            model.add(f.count, f.kind, f.id.clone());
            structured
                .entry(f.id.clone())
                .or_default()
                .extend(f.weights.iter().copied());
        }
        let structured = model.in_registration_order(structured);
        model.store(structured);
        model
    }

    /// Validate a caller-supplied structured mapping against the registry.
    fn checked_structured(&self, weights: StructuredWeights) -> Result<StructuredWeights> {
        for id in weights.keys() {
            if !self.families.contains_key(id) {
                return Err(PsfError::UnknownFamily(id.clone()));
            }
        }
        for (id, family) in &self.families {
            let rows = weights.get(id).map_or(0, Vec::len);
            if family.is_active() && rows != family.rows() {
                return Err(PsfError::shape(format!(
                    "family '{id}' has {} components but {rows} weight rows",
                    family.count
                )));
            }
        }
        Ok(self.in_registration_order(weights))
    }

    /// Re-key `weights` so iteration follows family registration order.
    fn in_registration_order(&self, mut weights: StructuredWeights) -> StructuredWeights {
        self.families
            .keys()
            .filter_map(|id| weights.swap_remove(id).map(|rows| (id.clone(), rows)))
            .collect()
    }

    /// Install `structured` and derive the flattened view from it.
    fn store(&mut self, structured: StructuredWeights) {
        let rows: usize = structured.values().map(Vec::len).sum();
        let mut flat = Vec::with_capacity(rows * 2);
        let mut tags = Vec::with_capacity(rows);
        for (id, pairs) in &structured {
            for pair in pairs {
                flat.extend_from_slice(pair);
                tags.push(id.clone());
            }
        }
        self.weights = structured;
        self.weights_vec = flat;
        self.weights_vec_id = tags;
    }
}
