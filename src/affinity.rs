//! Collaborative filtering over investor focus areas.
//!
//! The [`AffinityMatrix`] is a binary investor × technology-area matrix. An
//! investor's recommendations come from the areas its most similar peers
//! (cosine similarity of matrix rows) already focus on.

use serde::Serialize;

use crate::model::{InvestorProfile, TechArea};
use crate::similarity::cosine;

/// Default number of peer investors consulted per recommendation.
pub const DEFAULT_NEIGHBOURS: usize = 3;

/// Binary investor × area matrix: 1 when the area is in the investor's focus set.
#[derive(Debug, Clone, Serialize)]
pub struct AffinityMatrix {
    investors: Vec<String>,
    areas: Vec<TechArea>,
    /// Row-major `investors.len() × areas.len()` cells.
    cells: Vec<f64>,
}

impl AffinityMatrix {
    /// Build from investor focus sets. Focus areas outside `areas` are ignored.
    pub fn build(investors: &[InvestorProfile], areas: &[TechArea]) -> Self {
        let mut cells = vec![0.0; investors.len() * areas.len()];
        for (row, investor) in investors.iter().enumerate() {
            for (col, area) in areas.iter().enumerate() {
                if investor.focus_areas.contains(area) {
                    cells[row * areas.len() + col] = 1.0;
                }
            }
        }
        Self {
            investors: investors.iter().map(|i| i.id.clone()).collect(),
            areas: areas.to_vec(),
            cells,
        }
    }

    pub fn investors(&self) -> &[String] {
        &self.investors
    }

    pub fn areas(&self) -> &[TechArea] {
        &self.areas
    }

    pub fn row(&self, investor: usize) -> &[f64] {
        let width = self.areas.len();
        &self.cells[investor * width..(investor + 1) * width]
    }

    pub fn index_of(&self, investor_id: &str) -> Option<usize> {
        self.investors.iter().position(|id| id == investor_id)
    }

    /// Whether `investor_id` focuses on `area`. `None` for unknown ids.
    pub fn contains(&self, investor_id: &str, area: &str) -> Option<bool> {
        let row = self.index_of(investor_id)?;
        let col = self.areas.iter().position(|a| a.as_str() == area)?;
        Some(self.row(row)[col] > 0.0)
    }

    /// Cosine similarity of `investor`'s row against every other row, most
    /// similar first (ties keep input order), excluding the investor itself.
    pub fn peers(&self, investor: usize) -> Vec<(usize, f64)> {
        let target = self.row(investor);
        let mut peers: Vec<(usize, f64)> = (0..self.investors.len())
            .filter(|&other| other != investor)
            .map(|other| (other, cosine(target, self.row(other))))
            .collect();
        peers.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        peers
    }

    /// Recommend up to `k` areas the investor does not yet focus on.
    ///
    /// Each of the `neighbours` most similar peers adds its similarity to
    /// every area it focuses on that the target does not, so areas brought
    /// only by zero-overlap peers come back with weight 0. Empty for an
    /// unknown investor or when the peers bring nothing new.
    pub fn collaborative_recommend(
        &self,
        investor_id: &str,
        k: usize,
        neighbours: usize,
    ) -> Vec<(TechArea, f64)> {
        let Some(target) = self.index_of(investor_id) else {
            return Vec::new();
        };
        let own = self.row(target);
        let mut weights: Vec<Option<f64>> = vec![None; self.areas.len()];

        for (peer, similarity) in self.peers(target).into_iter().take(neighbours) {
            for (col, &cell) in self.row(peer).iter().enumerate() {
                if cell > 0.0 && own[col] == 0.0 {
                    *weights[col].get_or_insert(0.0) += similarity;
                }
            }
        }

        let mut recs: Vec<(TechArea, f64)> = weights
            .into_iter()
            .enumerate()
            .filter_map(|(col, w)| w.map(|w| (self.areas[col].clone(), w)))
            .collect();
        recs.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        recs.truncate(k);
        recs
    }
}
