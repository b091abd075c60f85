use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use serde::Deserialize;

use crate::db::scaler::FeatureScaler;
use crate::error::{AppError, AppResult};
use crate::models::{
    AudioFeatures, RatingRecord, RatingStats, TrackRecord, DEFAULT_GENRE, FEATURE_COLUMNS,
    FEATURE_COUNT, UNKNOWN,
};

const CATALOG_ID_COLUMNS: [&str; 1] = ["track_id"];
const RATING_COLUMNS: [&str; 3] = ["user_id", "track_id", "rating"];

/// Raw row of the cleaned track catalogue
#[derive(Debug, Deserialize)]
struct CatalogRow {
    track_id: String,
    #[serde(default)]
    track_name: Option<String>,
    #[serde(default)]
    artists: Option<String>,
    #[serde(default)]
    track_genre: Option<String>,
    popularity: f64,
    danceability: f64,
    energy: f64,
    acousticness: f64,
    instrumentalness: f64,
    liveness: f64,
    valence: f64,
    tempo: f64,
}

impl From<CatalogRow> for TrackRecord {
    fn from(row: CatalogRow) -> Self {
        TrackRecord {
            id: row.track_id,
            name: row.track_name.unwrap_or_else(|| UNKNOWN.to_string()),
            artists: row.artists.unwrap_or_else(|| UNKNOWN.to_string()),
            genre: row
                .track_genre
                .filter(|g| !g.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_GENRE.to_string()),
            features: AudioFeatures::complete([
                row.popularity,
                row.danceability,
                row.energy,
                row.acousticness,
                row.instrumentalness,
                row.liveness,
                row.valence,
                row.tempo,
            ]),
        }
    }
}

/// Read-only view of the track catalogue and the rating matrix
///
/// Loaded once at startup and shared behind an `Arc`; nothing here mutates
/// after construction.
#[derive(Debug)]
pub struct CatalogDataset {
    /// Tracks in file order, first occurrence of each id
    tracks: Vec<TrackRecord>,
    /// Standardized feature vectors, parallel to `tracks`
    scaled: Vec<Vec<f64>>,
    index: HashMap<String, usize>,
    ratings: Vec<RatingRecord>,
    rated_by_user: HashMap<String, BTreeSet<String>>,
    rated_track_ids: BTreeSet<String>,
    scaler: FeatureScaler,
}

impl CatalogDataset {
    /// Loads the catalogue and rating CSV files
    ///
    /// Either file missing, lacking a required column or containing an
    /// unparsable row is a fatal error.
    pub fn load(catalog_path: &Path, ratings_path: &Path) -> AppResult<Self> {
        let required_catalog: Vec<&str> = CATALOG_ID_COLUMNS
            .iter()
            .chain(FEATURE_COLUMNS.iter())
            .copied()
            .collect();
        let tracks: Vec<TrackRecord> = read_csv::<CatalogRow>(catalog_path, &required_catalog)?
            .into_iter()
            .map(TrackRecord::from)
            .collect();

        #[derive(Deserialize)]
        struct RatingRow {
            user_id: String,
            track_id: String,
            rating: f64,
        }

        let ratings = read_csv::<RatingRow>(ratings_path, &RATING_COLUMNS)?
            .into_iter()
            .map(|row| RatingRecord {
                user_id: row.user_id,
                track_id: row.track_id,
                rating: row.rating,
            })
            .collect();

        let dataset = Self::from_records(tracks, ratings)?;

        tracing::info!(
            catalog = %catalog_path.display(),
            ratings = %ratings_path.display(),
            tracks = dataset.tracks.len(),
            rating_rows = dataset.ratings.len(),
            users = dataset.rated_by_user.len(),
            "Loaded catalogue dataset"
        );
        for (column, mean, scale) in dataset.scaler.describe() {
            tracing::debug!(column, mean, scale, "Fitted feature scaler");
        }

        Ok(dataset)
    }

    /// Builds the dataset from already-parsed records
    ///
    /// Every catalogue track must carry all eight features. Duplicate track
    /// ids keep their first row.
    pub fn from_records(tracks: Vec<TrackRecord>, ratings: Vec<RatingRecord>) -> AppResult<Self> {
        let mut kept = Vec::with_capacity(tracks.len());
        let mut rows = Vec::with_capacity(tracks.len());
        let mut index = HashMap::with_capacity(tracks.len());
        let mut duplicates = 0usize;

        for track in tracks {
            if index.contains_key(&track.id) {
                duplicates += 1;
                continue;
            }
            let values = track.features.to_complete().ok_or_else(|| {
                AppError::Dataset(format!(
                    "Catalogue track {} is missing features: {:?}",
                    track.id,
                    track.features.missing()
                ))
            })?;
            if let Some(column) = FEATURE_COLUMNS
                .iter()
                .zip(values)
                .find_map(|(column, value)| (!value.is_finite()).then_some(*column))
            {
                return Err(AppError::Dataset(format!(
                    "Catalogue track {} has a non-finite {}",
                    track.id, column
                )));
            }
            index.insert(track.id.clone(), kept.len());
            rows.push(values);
            kept.push(track);
        }

        if duplicates > 0 {
            tracing::warn!(duplicates, "Skipped duplicate track ids in catalogue");
        }

        let scaler = FeatureScaler::fit(&rows);
        let scaled = rows.iter().map(|row| scaler.transform(row)).collect();

        let mut rated_by_user: HashMap<String, BTreeSet<String>> = HashMap::new();
        let mut rated_track_ids = BTreeSet::new();
        for rating in &ratings {
            if !rating.rating.is_finite() {
                return Err(AppError::Dataset(format!(
                    "Rating by user {} for track {} is not finite",
                    rating.user_id, rating.track_id
                )));
            }
            rated_by_user
                .entry(rating.user_id.clone())
                .or_default()
                .insert(rating.track_id.clone());
            rated_track_ids.insert(rating.track_id.clone());
        }

        Ok(Self {
            tracks: kept,
            scaled,
            index,
            ratings,
            rated_by_user,
            rated_track_ids,
            scaler,
        })
    }

    pub fn track_by_id(&self, id: &str) -> Option<&TrackRecord> {
        self.index.get(id).map(|&i| &self.tracks[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Standardized feature vector, on the same basis as the content index
    pub fn scaled_feature_vector(&self, id: &str) -> Option<&[f64]> {
        self.index.get(id).map(|&i| self.scaled[i].as_slice())
    }

    /// Tracks the user has already rated
    pub fn ratings_for_user(&self, user_id: &str) -> BTreeSet<String> {
        self.rated_by_user.get(user_id).cloned().unwrap_or_default()
    }

    /// Every track id present in the rating matrix, in sorted order
    pub fn all_track_ids(&self) -> &BTreeSet<String> {
        &self.rated_track_ids
    }

    /// Rating rows of a single user, in file order
    pub fn user_ratings(&self, user_id: &str) -> Vec<&RatingRecord> {
        self.ratings
            .iter()
            .filter(|r| r.user_id == user_id)
            .collect()
    }

    pub fn scaler(&self) -> &FeatureScaler {
        &self.scaler
    }

    /// Catalogue ids paired with their standardized vectors, in file order
    pub fn scaled_rows(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.tracks
            .iter()
            .zip(self.scaled.iter())
            .map(|(t, v)| (t.id.as_str(), v.as_slice()))
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn rating_stats(&self) -> RatingStats {
        let total_ratings = self.ratings.len();
        let total_users = self.rated_by_user.len();
        let total_tracks = self.rated_track_ids.len();

        let average_rating = if total_ratings > 0 {
            self.ratings.iter().map(|r| r.rating).sum::<f64>() / total_ratings as f64
        } else {
            0.0
        };

        // Sample standard deviation
        let rating_std_dev = if total_ratings > 1 {
            let variance = self
                .ratings
                .iter()
                .map(|r| (r.rating - average_rating).powi(2))
                .sum::<f64>()
                / (total_ratings - 1) as f64;
            variance.sqrt()
        } else {
            0.0
        };

        let cells = total_users * total_tracks;
        let density_percent = if cells > 0 {
            total_ratings as f64 / cells as f64 * 100.0
        } else {
            0.0
        };

        RatingStats {
            total_users,
            total_tracks,
            total_ratings,
            average_rating,
            rating_std_dev,
            density_percent,
        }
    }
}

/// Reads a CSV file into typed rows after checking the header
fn read_csv<T: serde::de::DeserializeOwned>(path: &Path, required: &[&str]) -> AppResult<Vec<T>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| {
        AppError::Dataset(format!("Failed to open {}: {}", path.display(), e))
    })?;

    let headers = reader
        .headers()
        .map_err(|e| {
            AppError::Dataset(format!(
                "Failed to read headers of {}: {}",
                path.display(),
                e
            ))
        })?
        .clone();

    let missing: Vec<&str> = required
        .iter()
        .filter(|col| !headers.iter().any(|h| h == **col))
        .copied()
        .collect();
    if !missing.is_empty() {
        return Err(AppError::Dataset(format!(
            "{} is missing columns {:?} (found {:?})",
            path.display(),
            missing,
            headers.iter().collect::<Vec<_>>()
        )));
    }

    let mut rows = Vec::new();
    for (line, result) in reader.deserialize::<T>().enumerate() {
        let row = result.map_err(|e| {
            AppError::Dataset(format!(
                "Malformed row {} in {}: {}",
                line + 2,
                path.display(),
                e
            ))
        })?;
        rows.push(row);
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CATALOG_CSV: &str = "\
track_id,track_name,artists,track_genre,popularity,danceability,energy,acousticness,instrumentalness,liveness,valence,tempo,duration_ms
t1,First,Artist A,pop,0.8,0.7,0.9,0.1,0.0,0.1,0.6,0.5,1000
t2,Second,Artist B;Artist C,,0.2,0.3,0.4,0.8,0.5,0.2,0.3,0.4,2000
t3,Third,Artist D,rock,0.5,0.5,0.5,0.5,0.5,0.5,0.5,0.5,3000
";

    const RATINGS_CSV: &str = "\
user_id,track_id,rating
1,t1,5
1,t2,3
2,t3,4
2,t9,2
";

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn load_fixture() -> CatalogDataset {
        let catalog = write_temp(CATALOG_CSV);
        let ratings = write_temp(RATINGS_CSV);
        CatalogDataset::load(catalog.path(), ratings.path()).unwrap()
    }

    #[test]
    fn test_load_catalogue_and_ratings() {
        let dataset = load_fixture();

        assert_eq!(dataset.track_count(), 3);
        let track = dataset.track_by_id("t1").unwrap();
        assert_eq!(track.name, "First");
        assert_eq!(track.genre, "pop");
        assert_eq!(track.features.tempo, Some(0.5));
        assert!(dataset.track_by_id("missing").is_none());
    }

    #[test]
    fn test_empty_genre_defaults_to_unknown() {
        let dataset = load_fixture();
        assert_eq!(dataset.track_by_id("t2").unwrap().genre, DEFAULT_GENRE);
    }

    #[test]
    fn test_scaled_vectors_are_standardized() {
        let dataset = load_fixture();
        let vector = dataset.scaled_feature_vector("t3").unwrap();
        assert_eq!(vector.len(), FEATURE_COUNT);

        // Each column sums to zero across the catalogue after standardization
        for col in 0..FEATURE_COUNT {
            let sum: f64 = dataset.scaled_rows().map(|(_, v)| v[col]).sum();
            assert!(sum.abs() < 1e-9);
        }
    }

    #[test]
    fn test_ratings_for_user() {
        let dataset = load_fixture();
        let rated = dataset.ratings_for_user("1");
        assert_eq!(rated.into_iter().collect::<Vec<_>>(), vec!["t1", "t2"]);
        assert!(dataset.ratings_for_user("unknown").is_empty());
        assert_eq!(dataset.user_ratings("2").len(), 2);
    }

    #[test]
    fn test_all_track_ids_come_from_rating_matrix() {
        let dataset = load_fixture();
        let ids: Vec<&str> = dataset.all_track_ids().iter().map(String::as_str).collect();
        assert_eq!(ids, vec!["t1", "t2", "t3", "t9"]);
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let ratings = write_temp(RATINGS_CSV);
        let err = CatalogDataset::load(Path::new("/nonexistent/catalog.csv"), ratings.path())
            .unwrap_err();
        assert!(matches!(err, AppError::Dataset(_)));
    }

    #[test]
    fn test_missing_column_is_fatal() {
        let catalog = write_temp("track_id,track_name,popularity\nt1,First,0.5\n");
        let ratings = write_temp(RATINGS_CSV);
        let err = CatalogDataset::load(catalog.path(), ratings.path()).unwrap_err();
        match err {
            AppError::Dataset(msg) => assert!(msg.contains("danceability")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_malformed_rating_row_is_fatal() {
        let catalog = write_temp(CATALOG_CSV);
        let ratings = write_temp("user_id,track_id,rating\n1,t1,not-a-number\n");
        let err = CatalogDataset::load(catalog.path(), ratings.path()).unwrap_err();
        match err {
            AppError::Dataset(msg) => assert!(msg.contains("row 2")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_non_finite_feature_is_fatal() {
        let catalog = write_temp(
            "track_id,popularity,danceability,energy,acousticness,instrumentalness,liveness,valence,tempo\n\
             t1,1,1,1,1,1,1,1,1\n\
             t2,2,2,2,2,2,2,2,NaN\n\
             t3,3,3,3,3,3,3,3,3\n",
        );
        let ratings = write_temp(RATINGS_CSV);
        match CatalogDataset::load(catalog.path(), ratings.path()).unwrap_err() {
            AppError::Dataset(msg) => {
                assert!(msg.contains("t2"));
                assert!(msg.contains("tempo"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let infinite = TrackRecord {
            id: "inf".to_string(),
            name: UNKNOWN.to_string(),
            artists: UNKNOWN.to_string(),
            genre: DEFAULT_GENRE.to_string(),
            features: AudioFeatures::complete([f64::INFINITY; FEATURE_COUNT]),
        };
        assert!(matches!(
            CatalogDataset::from_records(vec![infinite], vec![]),
            Err(AppError::Dataset(_))
        ));
    }

    #[test]
    fn test_non_finite_rating_is_fatal() {
        let catalog = write_temp(CATALOG_CSV);
        let ratings = write_temp("user_id,track_id,rating\n1,t1,inf\n");
        assert!(matches!(
            CatalogDataset::load(catalog.path(), ratings.path()),
            Err(AppError::Dataset(_))
        ));
    }

    #[test]
    fn test_duplicate_track_keeps_first_row() {
        let first = TrackRecord {
            id: "dup".to_string(),
            name: "First".to_string(),
            artists: "A".to_string(),
            genre: "pop".to_string(),
            features: AudioFeatures::complete([1.0; FEATURE_COUNT]),
        };
        let second = TrackRecord {
            name: "Second".to_string(),
            ..first.clone()
        };

        let dataset = CatalogDataset::from_records(vec![first, second], vec![]).unwrap();
        assert_eq!(dataset.track_count(), 1);
        assert_eq!(dataset.track_by_id("dup").unwrap().name, "First");
    }

    #[test]
    fn test_incomplete_catalogue_track_is_rejected() {
        let track = TrackRecord {
            id: "partial".to_string(),
            name: "Partial".to_string(),
            artists: "A".to_string(),
            genre: "pop".to_string(),
            features: AudioFeatures::default(),
        };
        assert!(matches!(
            CatalogDataset::from_records(vec![track], vec![]),
            Err(AppError::Dataset(_))
        ));
    }

    #[test]
    fn test_rating_stats() {
        let dataset = load_fixture();
        let stats = dataset.rating_stats();

        assert_eq!(stats.total_users, 2);
        assert_eq!(stats.total_tracks, 4);
        assert_eq!(stats.total_ratings, 4);
        assert!((stats.average_rating - 3.5).abs() < 1e-12);
        // sample variance of [5, 3, 4, 2] = 5 / 3
        assert!((stats.rating_std_dev - (5.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert!((stats.density_percent - 50.0).abs() < 1e-12);
    }
}
