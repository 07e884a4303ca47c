//! Content-based technology-area similarity.
//!
//! Every area is described by a 7-dimensional feature vector of patent
//! aggregates. Columns are standardized across areas and compared pairwise
//! with cosine similarity into a dense, symmetric [`SimilarityMatrix`].

use rayon::prelude::*;
use serde::Serialize;

use crate::dataset::Dataset;
use crate::model::TechArea;

/// Number of features per area.
pub const FEATURE_DIM: usize = 7;

/// Default denominator guard for standardizing constant columns.
pub const DEFAULT_EPSILON: f64 = 1e-8;

/// Raw feature vector: mean quality, mean market potential, mean commercial
/// viability, mean citations, mean industry impact, mean investment
/// attractiveness, patent count.
pub type FeatureVector = [f64; FEATURE_DIM];

/// Feature vector of one area. All zeros for an area with no patents.
pub fn feature_vector(dataset: &Dataset, area: &str) -> FeatureVector {
    let mut sums = [0.0; FEATURE_DIM - 1];
    let mut count = 0usize;
    for p in dataset.patents_in(area) {
        sums[0] += p.quality;
        sums[1] += p.market_potential;
        sums[2] += p.commercial_viability;
        sums[3] += f64::from(p.citations);
        sums[4] += p.industry_impact;
        sums[5] += p.investment_attractiveness;
        count += 1;
    }
    let mut features = [0.0; FEATURE_DIM];
    if count > 0 {
        for (slot, sum) in features.iter_mut().zip(sums) {
            *slot = sum / count as f64;
        }
    }
    features[FEATURE_DIM - 1] = count as f64;
    features
}

/// Standardize each column in place: `(x - mean) / (std + epsilon)`.
///
/// Uses the population standard deviation.
pub fn standardize(rows: &mut [FeatureVector], epsilon: f64) {
    if rows.is_empty() {
        return;
    }
    let n = rows.len() as f64;
    for col in 0..FEATURE_DIM {
        let mean = rows.iter().map(|r| r[col]).sum::<f64>() / n;
        let var = rows.iter().map(|r| (r[col] - mean).powi(2)).sum::<f64>() / n;
        let denom = var.sqrt() + epsilon;
        for row in rows.iter_mut() {
            row[col] = (row[col] - mean) / denom;
        }
    }
}

/// Cosine similarity of two vectors; 0.0 when either has zero norm.
pub fn cosine(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    (dot / (na * nb)).clamp(-1.0, 1.0)
}

/// Square, symmetric area × area cosine similarity with a unit diagonal.
#[derive(Debug, Clone, Serialize)]
pub struct SimilarityMatrix {
    areas: Vec<TechArea>,
    /// Row-major `areas.len()²` values.
    values: Vec<f64>,
}

impl SimilarityMatrix {
    /// Build the matrix over all areas of `dataset`, in area order.
    pub fn build(dataset: &Dataset, epsilon: f64) -> Self {
        let areas = dataset.areas().to_vec();
        let mut features: Vec<FeatureVector> = areas
            .par_iter()
            .map(|a| feature_vector(dataset, a.as_str()))
            .collect();
        standardize(&mut features, epsilon);
        Self::from_features(areas, &features)
    }

    /// Build from already standardized feature rows.
    pub fn from_features(areas: Vec<TechArea>, features: &[FeatureVector]) -> Self {
        let n = areas.len();
        let rows: Vec<Vec<f64>> = (0..n)
            .into_par_iter()
            .map(|i| {
                (0..n)
                    .map(|j| {
                        if i == j {
                            1.0
                        } else {
                            cosine(&features[i], &features[j])
                        }
                    })
                    .collect()
            })
            .collect();
        Self {
            areas,
            values: rows.into_iter().flatten().collect(),
        }
    }

    pub fn areas(&self) -> &[TechArea] {
        &self.areas
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    pub fn index_of(&self, area: &str) -> Option<usize> {
        self.areas.iter().position(|a| a.as_str() == area)
    }

    /// Similarity by index.
    pub fn at(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.areas.len() + j]
    }

    /// Similarity by label. `None` when either area is unknown.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        Some(self.at(self.index_of(a)?, self.index_of(b)?))
    }

    /// The `k` most similar other areas, descending; ties keep area order.
    ///
    /// Empty for an unknown area.
    pub fn find_similar(&self, area: &str, k: usize) -> Vec<(TechArea, f64)> {
        let Some(i) = self.index_of(area) else {
            return Vec::new();
        };
        let mut others: Vec<(TechArea, f64)> = (0..self.len())
            .filter(|&j| j != i)
            .map(|j| (self.areas[j].clone(), self.at(i, j)))
            .collect();
        others.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        others.truncate(k);
        others
    }
}
