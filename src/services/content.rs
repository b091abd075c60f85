use std::sync::Arc;

use crate::{
    db::CatalogDataset,
    error::{AppError, AppResult},
};

/// A catalogue track near the query point
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub track_id: String,
    pub distance: f64,
}

impl Neighbor {
    /// `1 - distance`. Not clamped, so far-away tracks can go negative.
    pub fn similarity(&self) -> f64 {
        1.0 - self.distance
    }
}

/// Nearest-neighbour lookup over standardized feature vectors
///
/// Implementations return at most `k` neighbours in ascending distance.
pub trait NearestNeighbors: Send + Sync {
    fn nearest(&self, query: &[f64], k: usize) -> Vec<Neighbor>;

    /// Length of the vectors the index was built over
    fn dimensions(&self) -> usize;
}

/// Exact Euclidean index scanning every point
///
/// Distance ties are broken by insertion order, which keeps results
/// deterministic across calls.
#[derive(Debug)]
pub struct BruteForceIndex {
    ids: Vec<String>,
    points: Vec<Vec<f64>>,
    dimensions: usize,
}

impl BruteForceIndex {
    pub fn build(points: impl IntoIterator<Item = (String, Vec<f64>)>) -> AppResult<Self> {
        let mut ids = Vec::new();
        let mut vectors = Vec::new();
        let mut dimensions = None;

        for (id, vector) in points {
            match dimensions {
                None => dimensions = Some(vector.len()),
                Some(d) if d != vector.len() => {
                    return Err(AppError::ModelUnavailable(format!(
                        "Track {} has {} features, expected {}",
                        id,
                        vector.len(),
                        d
                    )));
                }
                Some(_) => {}
            }
            ids.push(id);
            vectors.push(vector);
        }

        let dimensions = match dimensions {
            Some(d) if d > 0 => d,
            _ => {
                return Err(AppError::ModelUnavailable(
                    "Content index has no tracks to search".to_string(),
                ))
            }
        };

        Ok(Self {
            ids,
            points: vectors,
            dimensions,
        })
    }

    /// Indexes the catalogue's standardized feature matrix
    pub fn from_catalog(catalog: &CatalogDataset) -> AppResult<Self> {
        let index = Self::build(
            catalog
                .scaled_rows()
                .map(|(id, vector)| (id.to_string(), vector.to_vec())),
        )?;
        tracing::info!(
            tracks = index.ids.len(),
            dimensions = index.dimensions,
            "Built content index"
        );
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

impl NearestNeighbors for BruteForceIndex {
    fn nearest(&self, query: &[f64], k: usize) -> Vec<Neighbor> {
        let mut scored: Vec<(usize, f64)> = self
            .points
            .iter()
            .enumerate()
            .map(|(i, point)| (i, euclidean(query, point)))
            .collect();

        // Stable: equal distances keep insertion order
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(i, distance)| Neighbor {
                track_id: self.ids[i].clone(),
                distance,
            })
            .collect()
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Content-based candidate generation on top of a nearest-neighbour index
#[derive(Clone)]
pub struct ContentScorer {
    index: Arc<dyn NearestNeighbors>,
}

impl ContentScorer {
    pub fn new(index: Arc<dyn NearestNeighbors>) -> Self {
        Self { index }
    }

    /// Up to `k` neighbours of `query`, nearest first
    pub fn nearest(&self, query: &[f64], k: usize) -> AppResult<Vec<Neighbor>> {
        if query.len() != self.index.dimensions() {
            return Err(AppError::Internal(format!(
                "Query vector has {} dimensions, content index expects {}",
                query.len(),
                self.index.dimensions()
            )));
        }
        Ok(self.index.nearest(query, k))
    }

    /// Up to `top_n` tracks similar to the seed, never the seed itself
    ///
    /// Asks the index for one extra neighbour so that dropping the seed
    /// (its own nearest neighbour when it is a catalogue member) still
    /// leaves `top_n` results.
    pub fn similar_tracks(
        &self,
        seed_track_id: &str,
        seed_vector: &[f64],
        top_n: usize,
    ) -> AppResult<Vec<Neighbor>> {
        let mut neighbors = self.nearest(seed_vector, top_n + 1)?;
        neighbors.retain(|n| n.track_id != seed_track_id);
        neighbors.truncate(top_n);
        Ok(neighbors)
    }
}
