use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::instrument;

use crate::{
    db::CatalogDataset,
    error::{AppError, AppResult},
    models::{CollaborativeCandidate, ContentRecommendation, Recommendation},
    services::{
        collaborative::CollaborativeScorer,
        content::ContentScorer,
        track_lookup::{SeedVector, TrackResolver},
    },
};

/// Relative weight of each signal in the final score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionWeights {
    pub content: f64,
    pub collaborative: f64,
}

impl FusionWeights {
    pub const HYBRID: Self = Self {
        content: 0.6,
        collaborative: 0.4,
    };

    pub const CONTENT_ONLY: Self = Self {
        content: 1.0,
        collaborative: 0.0,
    };

    /// Hybrid weights when there is any collaborative signal, otherwise
    /// all weight goes to content
    pub fn select(has_collaborative: bool) -> Self {
        if has_collaborative {
            Self::HYBRID
        } else {
            Self::CONTENT_ONLY
        }
    }
}

/// Raw per-track scores of one signal, in discovery order
#[derive(Debug, Clone, Default)]
pub struct SignalScores {
    order: Vec<String>,
    scores: HashMap<String, f64>,
}

impl SignalScores {
    /// Collects scores, keeping the first value seen for a repeated id
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, f64)>) -> Self {
        let mut signal = Self::default();
        for (track_id, score) in pairs {
            if !signal.scores.contains_key(&track_id) {
                signal.order.push(track_id.clone());
                signal.scores.insert(track_id, score);
            }
        }
        signal
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn get(&self, track_id: &str) -> Option<f64> {
        self.scores.get(track_id).copied()
    }

    pub fn ids(&self) -> impl Iterator<Item = &String> {
        self.order.iter()
    }

    /// Divisor that maps the best score of this call to 1
    ///
    /// Falls back to 1 when there is nothing to scale by (no scores, or a
    /// best score that is not positive), so absent signals contribute 0 and
    /// all-negative similarities pass through unscaled.
    pub fn normalizer(&self) -> f64 {
        let max = self
            .scores
            .values()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        if max.is_finite() && max > 0.0 {
            max
        } else {
            1.0
        }
    }
}

/// A candidate after normalization and weighting, before metadata
#[derive(Debug, Clone, PartialEq)]
pub struct FusedScore {
    pub track_id: String,
    pub content_score: f64,
    pub collaborative_score: f64,
    pub final_score: f64,
}

/// Normalizes both signals by their in-call maximum and combines them
///
/// The result covers the union of candidate ids, content candidates first,
/// and is sorted by final score with ties left in discovery order. Each id
/// appears once.
pub fn fuse(
    content: &SignalScores,
    collaborative: &SignalScores,
    weights: FusionWeights,
) -> Vec<FusedScore> {
    let max_content = content.normalizer();
    let max_collaborative = collaborative.normalizer();

    let mut seen = HashSet::new();
    let mut fused: Vec<FusedScore> = content
        .ids()
        .chain(collaborative.ids())
        .filter(|id| seen.insert(id.as_str()))
        .map(|id| {
            let content_score = content.get(id).unwrap_or(0.0) / max_content;
            let collaborative_score = collaborative.get(id).unwrap_or(0.0) / max_collaborative;
            FusedScore {
                track_id: id.clone(),
                content_score,
                collaborative_score,
                final_score: weights.content * content_score
                    + weights.collaborative * collaborative_score,
            }
        })
        .collect();

    // Stable sort: equal scores keep discovery order
    fused.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));
    fused
}

/// Blends content similarity and collaborative filtering into one ranking
///
/// The catalogue, both scorers and the resolver are built once and shared.
/// Without a collaborative scorer every call runs content-only.
#[derive(Clone)]
pub struct HybridRecommender {
    resolver: TrackResolver,
    content: Arc<ContentScorer>,
    collaborative: Option<Arc<CollaborativeScorer>>,
}

impl HybridRecommender {
    pub fn new(
        resolver: TrackResolver,
        content: Arc<ContentScorer>,
        collaborative: Option<Arc<CollaborativeScorer>>,
    ) -> Self {
        if collaborative.is_none() {
            tracing::warn!("Collaborative model unavailable, recommendations will be content-only");
        }
        Self {
            resolver,
            content,
            collaborative,
        }
    }

    pub fn collaborative_enabled(&self) -> bool {
        self.collaborative.is_some()
    }

    pub fn resolver(&self) -> &TrackResolver {
        &self.resolver
    }

    fn catalog(&self) -> &CatalogDataset {
        self.resolver.catalog()
    }

    /// Ranked hybrid recommendations for a user and seed track
    ///
    /// Fails only when the seed cannot be resolved. Candidates whose
    /// metadata cannot be resolved are skipped.
    #[instrument(skip(self))]
    pub async fn recommend(
        &self,
        user_id: &str,
        seed_track_id: &str,
        top_n: usize,
    ) -> AppResult<Vec<Recommendation>> {
        if top_n == 0 {
            return Ok(Vec::new());
        }

        let seed = self.resolver.seed_vector(seed_track_id).await?;
        let (content, collaborative) = self.gather_candidates(user_id, seed, top_n).await?;

        let weights = FusionWeights::select(!collaborative.is_empty());
        if weights == FusionWeights::CONTENT_ONLY {
            tracing::info!("Using content-based recommendations only");
        }

        let fused = fuse(&content, &collaborative, weights);
        tracing::debug!(
            content_candidates = content.len(),
            collaborative_candidates = collaborative.len(),
            fused = fused.len(),
            "Fused candidate scores"
        );

        let mut recommendations = Vec::with_capacity(top_n);
        for candidate in fused {
            if recommendations.len() >= top_n {
                break;
            }
            match self.resolver.resolve(&candidate.track_id).await {
                Ok(track) => recommendations.push(Recommendation {
                    track_id: candidate.track_id,
                    name: track.name,
                    artists: track.artists,
                    genre: track.genre,
                    content_score: candidate.content_score,
                    collaborative_score: candidate.collaborative_score,
                    final_score: candidate.final_score,
                }),
                Err(e) => {
                    tracing::warn!(
                        track_id = %candidate.track_id,
                        error = %e,
                        "Skipping candidate with unresolvable metadata"
                    );
                }
            }
        }

        tracing::info!(returned = recommendations.len(), "Hybrid recommendations ready");
        Ok(recommendations)
    }

    /// Tracks similar to the seed by audio features, with raw similarity
    #[instrument(skip(self))]
    pub async fn recommend_by_content(
        &self,
        seed_track_id: &str,
        top_n: usize,
    ) -> AppResult<Vec<ContentRecommendation>> {
        let seed = self.resolver.seed_vector(seed_track_id).await?;
        let neighbors = self
            .content
            .similar_tracks(&seed.track_id, &seed.vector, top_n)?;

        let catalog = self.catalog();
        Ok(neighbors
            .into_iter()
            .filter_map(|n| {
                let similarity_score = n.similarity();
                catalog.track_by_id(&n.track_id).map(|t| ContentRecommendation {
                    track_id: n.track_id,
                    name: t.name.clone(),
                    artists: t.artists.clone(),
                    genre: t.genre.clone(),
                    similarity_score,
                })
            })
            .collect())
    }

    /// Highest predicted ratings among tracks the user has not rated
    ///
    /// Empty when collaborative scoring is disabled.
    pub async fn recommend_by_rating(
        &self,
        user_id: &str,
        top_n: usize,
    ) -> AppResult<Vec<CollaborativeCandidate>> {
        let Some(scorer) = self.collaborative.clone() else {
            tracing::warn!("Collaborative model not available, returning no candidates");
            return Ok(Vec::new());
        };

        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || scorer.candidate_ratings(&user_id, top_n))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))
    }

    /// Queries both scorers concurrently and joins before fusion
    async fn gather_candidates(
        &self,
        user_id: &str,
        seed: SeedVector,
        top_n: usize,
    ) -> AppResult<(SignalScores, SignalScores)> {
        let seed_id = seed.track_id.clone();
        let content = self.content.clone();
        let content_task = tokio::task::spawn_blocking(move || {
            content.similar_tracks(&seed.track_id, &seed.vector, top_n)
        });

        let collaborative_task = self.collaborative.clone().map(|scorer| {
            let user_id = user_id.to_string();
            tokio::task::spawn_blocking(move || scorer.candidate_ratings(&user_id, top_n * 2))
        });

        let neighbors = content_task
            .await
            .map_err(|e| AppError::Internal(format!("Content scoring task failed: {}", e)))??;
        let content_scores = SignalScores::from_pairs(
            neighbors
                .into_iter()
                .map(|n| {
                    let similarity = n.similarity();
                    (n.track_id, similarity)
                }),
        );

        let collaborative_scores = match collaborative_task {
            Some(task) => match task.await {
                // The seed is never its own recommendation
                Ok(candidates) => SignalScores::from_pairs(
                    candidates
                        .into_iter()
                        .filter(|c| c.track_id != seed_id)
                        .map(|c| (c.track_id, c.estimated_rating)),
                ),
                Err(e) => {
                    tracing::error!(error = %e, "Collaborative scoring task failed");
                    SignalScores::default()
                }
            },
            None => SignalScores::default(),
        };

        Ok((content_scores, collaborative_scores))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{FeatureCache, MemoryStore};
    use crate::error::ResolutionError;
    use crate::models::{AudioFeatures, RatingRecord, TrackRecord};
    use crate::services::collaborative::{MockRatingPredictor, RatingPredictor};
    use crate::services::content::{NearestNeighbors, Neighbor};
    use crate::services::providers::MockTrackMetadataProvider;

    const EPS: f64 = 1e-9;

    /// Index that answers every query with a fixed neighbour list
    struct FixedIndex {
        neighbors: Vec<Neighbor>,
    }

    impl FixedIndex {
        fn new(neighbors: &[(&str, f64)]) -> Self {
            Self {
                neighbors: neighbors
                    .iter()
                    .map(|(id, distance)| Neighbor {
                        track_id: id.to_string(),
                        distance: *distance,
                    })
                    .collect(),
            }
        }
    }

    impl NearestNeighbors for FixedIndex {
        fn nearest(&self, _query: &[f64], k: usize) -> Vec<Neighbor> {
            self.neighbors.iter().take(k).cloned().collect()
        }

        fn dimensions(&self) -> usize {
            8
        }
    }

    /// Predictor backed by a fixed table; unknown tracks score 1.0
    struct TablePredictor(HashMap<String, f64>);

    impl RatingPredictor for TablePredictor {
        fn predict(
            &self,
            _user_id: &str,
            track_id: &str,
        ) -> Result<f64, crate::services::collaborative::PredictionError> {
            Ok(self.0.get(track_id).copied().unwrap_or(1.0))
        }
    }

    fn track(id: &str) -> TrackRecord {
        TrackRecord {
            id: id.to_string(),
            name: format!("Song {}", id),
            artists: format!("Artist {}", id),
            genre: "pop".to_string(),
            features: AudioFeatures::complete([id.len() as f64; 8]),
        }
    }

    fn rating(user: &str, track: &str) -> RatingRecord {
        RatingRecord {
            user_id: user.to_string(),
            track_id: track.to_string(),
            rating: 4.0,
        }
    }

    fn catalog(ids: &[&str], ratings: Vec<RatingRecord>) -> Arc<CatalogDataset> {
        Arc::new(
            CatalogDataset::from_records(ids.iter().map(|id| track(id)).collect(), ratings)
                .unwrap(),
        )
    }

    fn offline_provider() -> MockTrackMetadataProvider {
        let mut provider = MockTrackMetadataProvider::new();
        provider
            .expect_fetch_track()
            .returning(|id| Err(ResolutionError::NotFound(id.to_string())));
        provider.expect_name().return_const("mock");
        provider
    }

    fn recommender(
        catalog: Arc<CatalogDataset>,
        index: FixedIndex,
        predictor: Option<Arc<dyn RatingPredictor>>,
        provider: MockTrackMetadataProvider,
    ) -> HybridRecommender {
        let resolver = TrackResolver::new(
            catalog.clone(),
            FeatureCache::new(Arc::new(MemoryStore::new())),
            Arc::new(provider),
        );
        let collaborative =
            predictor.map(|p| Arc::new(CollaborativeScorer::new(p, catalog.clone())));
        HybridRecommender::new(
            resolver,
            Arc::new(ContentScorer::new(Arc::new(index))),
            collaborative,
        )
    }

    #[test]
    fn test_weights_fall_back_to_content_only() {
        assert_eq!(FusionWeights::select(true), FusionWeights::HYBRID);
        assert_eq!(FusionWeights::select(false), FusionWeights::CONTENT_ONLY);
    }

    #[test]
    fn test_normalizer_guards_empty_and_non_positive() {
        assert_eq!(SignalScores::default().normalizer(), 1.0);
        let negative = SignalScores::from_pairs(vec![("a".to_string(), -0.5)]);
        assert_eq!(negative.normalizer(), 1.0);
        let positive = SignalScores::from_pairs(vec![("a".to_string(), 0.5), ("b".to_string(), 2.0)]);
        assert_eq!(positive.normalizer(), 2.0);
    }

    #[test]
    fn test_fuse_unions_and_weights_signals() {
        let content = SignalScores::from_pairs(vec![("a".to_string(), 0.8), ("b".to_string(), 0.4)]);
        let collaborative =
            SignalScores::from_pairs(vec![("b".to_string(), 5.0), ("c".to_string(), 2.5)]);

        let fused = fuse(&content, &collaborative, FusionWeights::HYBRID);
        let by_id: HashMap<_, _> = fused.iter().map(|f| (f.track_id.as_str(), f)).collect();

        assert_eq!(fused.len(), 3);
        assert!((by_id["a"].final_score - 0.6).abs() < EPS);
        assert!((by_id["b"].content_score - 0.5).abs() < EPS);
        assert!((by_id["b"].collaborative_score - 1.0).abs() < EPS);
        assert!((by_id["b"].final_score - 0.7).abs() < EPS);
        assert!((by_id["c"].final_score - 0.2).abs() < EPS);
        assert_eq!(
            fused.iter().map(|f| f.track_id.as_str()).collect::<Vec<_>>(),
            vec!["b", "a", "c"]
        );
    }

    #[test]
    fn test_fuse_ties_keep_discovery_order() {
        let content = SignalScores::from_pairs(vec![("x".to_string(), 1.0), ("y".to_string(), 1.0)]);
        let collaborative = SignalScores::from_pairs(vec![("z".to_string(), 1.0)]);

        let fused = fuse(&content, &collaborative, FusionWeights::CONTENT_ONLY);
        let ids: Vec<_> = fused.iter().map(|f| f.track_id.as_str()).collect();
        assert_eq!(ids, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_signal_scores_keep_first_duplicate() {
        let scores = SignalScores::from_pairs(vec![("a".to_string(), 0.1), ("a".to_string(), 0.9)]);
        assert_eq!(scores.len(), 1);
        assert_eq!(scores.get("a"), Some(0.1));
    }

    #[tokio::test]
    async fn test_content_only_scenario_normalizes_by_best_similarity() {
        let catalog = catalog(&["T1", "Ta", "Tb", "Tc"], vec![]);
        let index = FixedIndex::new(&[("T1", 0.0), ("Ta", 0.1), ("Tb", 0.2), ("Tc", 0.5)]);
        let recommender = recommender(catalog, index, None, offline_provider());

        let recs = recommender.recommend("user", "T1", 3).await.unwrap();

        let ids: Vec<_> = recs.iter().map(|r| r.track_id.as_str()).collect();
        assert_eq!(ids, vec!["Ta", "Tb", "Tc"]);

        let expected = [1.0, 0.8 / 0.9, 0.5 / 0.9];
        for (rec, want) in recs.iter().zip(expected) {
            assert!((rec.content_score - want).abs() < EPS);
            assert_eq!(rec.collaborative_score, 0.0);
            assert!((rec.final_score - rec.content_score).abs() < EPS);
        }
        assert_eq!(recs[0].name, "Song Ta");
        assert_eq!(recs[0].genre, "pop");
    }

    #[tokio::test]
    async fn test_results_are_unique_sorted_and_bounded() {
        let ids = ["s", "a", "b", "c", "d", "e", "f"];
        let catalog = catalog(
            &ids,
            ids.iter().map(|id| rating("someone", id)).collect(),
        );
        let index = FixedIndex::new(&[
            ("s", 0.0),
            ("a", 0.3),
            ("b", 0.4),
            ("c", 0.6),
            ("d", 0.9),
        ]);
        let predictor = TablePredictor(HashMap::from([
            ("a".to_string(), 5.0),
            ("e".to_string(), 4.0),
            ("f".to_string(), 4.5),
        ]));
        let recommender = recommender(catalog, index, Some(Arc::new(predictor)), offline_provider());

        for top_n in 1..=6 {
            let recs = recommender.recommend("u1", "s", top_n).await.unwrap();
            assert!(recs.len() <= top_n);

            let unique: HashSet<_> = recs.iter().map(|r| r.track_id.as_str()).collect();
            assert_eq!(unique.len(), recs.len());
            assert!(!unique.contains("s"));

            for pair in recs.windows(2) {
                assert!(pair[0].final_score >= pair[1].final_score);
            }
        }
    }

    #[tokio::test]
    async fn test_rated_content_candidates_get_no_collaborative_score() {
        let ids = ["seed", "a", "b", "c", "x", "y"];
        let catalog = catalog(
            &ids,
            vec![
                rating("u1", "a"),
                rating("u1", "b"),
                rating("u1", "c"),
                rating("other", "x"),
                rating("other", "y"),
            ],
        );
        let index = FixedIndex::new(&[("seed", 0.0), ("a", 0.1), ("b", 0.2), ("c", 0.5)]);
        let predictor = TablePredictor(HashMap::from([
            ("x".to_string(), 4.0),
            ("y".to_string(), 2.0),
        ]));
        let recommender = recommender(catalog, index, Some(Arc::new(predictor)), offline_provider());

        let recs = recommender.recommend("u1", "seed", 5).await.unwrap();
        let by_id: HashMap<_, _> = recs.iter().map(|r| (r.track_id.as_str(), r)).collect();

        for (id, content) in [("a", 1.0), ("b", 0.8 / 0.9), ("c", 0.5 / 0.9)] {
            let rec = by_id[id];
            assert_eq!(rec.collaborative_score, 0.0);
            assert!((rec.content_score - content).abs() < EPS);
            assert!((rec.final_score - 0.6 * content).abs() < EPS);
        }

        let content_order: Vec<_> = recs
            .iter()
            .filter(|r| r.content_score > 0.0)
            .map(|r| r.track_id.as_str())
            .collect();
        assert_eq!(content_order, vec!["a", "b", "c"]);

        assert!((by_id["x"].collaborative_score - 1.0).abs() < EPS);
        assert!((by_id["x"].final_score - 0.4).abs() < EPS);
    }

    #[tokio::test]
    async fn test_repeated_calls_are_identical() {
        let ids = ["s", "a", "b", "c", "x"];
        let catalog = catalog(&ids, ids.iter().map(|id| rating("other", id)).collect());
        let index = FixedIndex::new(&[("s", 0.0), ("a", 0.2), ("b", 0.2), ("c", 0.4)]);
        let predictor = TablePredictor(HashMap::from([("x".to_string(), 3.0)]));
        let recommender = recommender(catalog, index, Some(Arc::new(predictor)), offline_provider());

        let first = recommender.recommend("u1", "s", 4).await.unwrap();
        let second = recommender.recommend("u1", "s", 4).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_forbidden_seed_aborts_with_specific_error() {
        let catalog = catalog(&["a"], vec![]);
        let index = FixedIndex::new(&[("a", 0.1)]);

        let mut provider = MockTrackMetadataProvider::new();
        provider
            .expect_fetch_track()
            .returning(|id| Err(ResolutionError::AccessForbidden(id.to_string())));
        provider.expect_name().return_const("mock");

        let recommender = recommender(catalog, index, None, provider);
        let err = recommender.recommend("u1", "locked", 5).await.unwrap_err();

        match err {
            AppError::Resolution(ResolutionError::AccessForbidden(id)) => assert_eq!(id, "locked"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unresolvable_candidate_is_skipped() {
        // "ghost" is rated in the matrix but missing from the catalogue
        let catalog = catalog(&["s", "a"], vec![rating("other", "ghost"), rating("other", "a")]);
        let index = FixedIndex::new(&[("s", 0.0), ("a", 0.5)]);

        let mut predictor = MockRatingPredictor::new();
        predictor.expect_predict().returning(|_, track| match track {
            "ghost" => Ok(5.0),
            _ => Ok(2.0),
        });

        let recommender = recommender(catalog, index, Some(Arc::new(predictor)), offline_provider());
        let recs = recommender.recommend("u1", "s", 5).await.unwrap();

        let ids: Vec<_> = recs.iter().map(|r| r.track_id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[tokio::test]
    async fn test_upstream_only_candidate_gets_upstream_metadata() {
        let catalog = catalog(&["s", "a"], vec![rating("other", "remote")]);
        let index = FixedIndex::new(&[("s", 0.0), ("a", 0.5)]);
        let predictor = TablePredictor(HashMap::from([("remote".to_string(), 4.0)]));

        let mut provider = MockTrackMetadataProvider::new();
        provider.expect_fetch_track().returning(|id| {
            Ok(TrackRecord {
                id: id.to_string(),
                name: "Remote Song".to_string(),
                artists: "Remote Artist".to_string(),
                genre: "Unknown".to_string(),
                features: AudioFeatures::default(),
            })
        });
        provider.expect_name().return_const("mock");

        let recommender = recommender(catalog, index, Some(Arc::new(predictor)), provider);
        let recs = recommender.recommend("u1", "s", 5).await.unwrap();

        let remote = recs.iter().find(|r| r.track_id == "remote").unwrap();
        assert_eq!(remote.name, "Remote Song");
        assert_eq!(remote.genre, "Unknown");
    }

    #[tokio::test]
    async fn test_distant_neighbours_keep_negative_content_scores() {
        let catalog = catalog(&["s", "a", "b"], vec![]);
        let index = FixedIndex::new(&[("a", 1.5), ("b", 2.0)]);
        let recommender = recommender(catalog, index, None, offline_provider());

        let recs = recommender.recommend("u1", "s", 2).await.unwrap();

        let ids: Vec<_> = recs.iter().map(|r| r.track_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!((recs[0].content_score + 0.5).abs() < EPS);
        assert!((recs[1].content_score + 1.0).abs() < EPS);
        for rec in &recs {
            assert!((rec.final_score - rec.content_score).abs() < EPS);
        }
    }

    #[tokio::test]
    async fn test_unrated_seed_is_not_a_collaborative_candidate() {
        let ids = ["s", "a", "x"];
        let catalog = catalog(&ids, ids.iter().map(|id| rating("other", id)).collect());
        let index = FixedIndex::new(&[("s", 0.0), ("a", 0.5)]);
        let predictor = TablePredictor(HashMap::from([
            ("s".to_string(), 5.0),
            ("x".to_string(), 2.0),
        ]));
        let recommender = recommender(catalog, index, Some(Arc::new(predictor)), offline_provider());

        let recs = recommender.recommend("u1", "s", 5).await.unwrap();

        assert!(recs.iter().all(|r| r.track_id != "s"));
        let x = recs.iter().find(|r| r.track_id == "x").unwrap();
        assert!((x.collaborative_score - 1.0).abs() < EPS);
    }

    #[tokio::test]
    async fn test_empty_candidates_yield_empty_list() {
        let catalog = catalog(&["s"], vec![]);
        let index = FixedIndex::new(&[("s", 0.0)]);
        let recommender = recommender(catalog, index, None, offline_provider());

        assert!(recommender.recommend("u1", "s", 5).await.unwrap().is_empty());
        assert!(recommender.recommend("u1", "s", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_content_endpoint_reports_raw_similarity() {
        let catalog = catalog(&["s", "a", "b"], vec![]);
        let index = FixedIndex::new(&[("s", 0.0), ("a", 0.25), ("b", 1.5)]);
        let recommender = recommender(catalog, index, None, offline_provider());

        let recs = recommender.recommend_by_content("s", 5).await.unwrap();
        assert_eq!(recs.len(), 2);
        assert!((recs[0].similarity_score - 0.75).abs() < EPS);
        assert!((recs[1].similarity_score + 0.5).abs() < EPS);
    }

    #[tokio::test]
    async fn test_rating_endpoint_without_model_is_empty() {
        let catalog = catalog(&["s"], vec![rating("u1", "s")]);
        let recommender = recommender(catalog, FixedIndex::new(&[]), None, offline_provider());

        assert!(!recommender.collaborative_enabled());
        assert!(recommender.recommend_by_rating("u1", 5).await.unwrap().is_empty());
    }
}
