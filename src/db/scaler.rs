use crate::models::{AudioFeatures, FEATURE_COLUMNS, FEATURE_COUNT};

/// Per-column standardization fitted on the catalogue
///
/// Uses the population standard deviation. Columns with zero variance keep a
/// scale of 1 so they map to 0 instead of dividing by zero.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureScaler {
    means: [f64; FEATURE_COUNT],
    scales: [f64; FEATURE_COUNT],
}

impl FeatureScaler {
    /// Fits means and scales on the given rows. An empty input yields the
    /// identity transform.
    pub fn fit(rows: &[[f64; FEATURE_COUNT]]) -> Self {
        let mut means = [0.0; FEATURE_COUNT];
        let mut scales = [1.0; FEATURE_COUNT];

        if rows.is_empty() {
            return Self { means, scales };
        }

        let n = rows.len() as f64;
        for row in rows {
            for (mean, value) in means.iter_mut().zip(row) {
                *mean += value / n;
            }
        }

        for (col, scale) in scales.iter_mut().enumerate() {
            let variance = rows
                .iter()
                .map(|row| (row[col] - means[col]).powi(2))
                .sum::<f64>()
                / n;
            let std = variance.sqrt();
            *scale = if std > f64::EPSILON { std } else { 1.0 };
        }

        Self { means, scales }
    }

    pub fn transform(&self, values: &[f64; FEATURE_COUNT]) -> Vec<f64> {
        values
            .iter()
            .zip(self.means.iter().zip(self.scales.iter()))
            .map(|(value, (mean, scale))| (value - mean) / scale)
            .collect()
    }

    /// Scales a possibly incomplete feature set.
    ///
    /// Missing features are imputed with the catalogue mean, which places
    /// them at 0 in the standardized space.
    pub fn transform_features(&self, features: &AudioFeatures) -> Vec<f64> {
        let missing = features.missing();
        if !missing.is_empty() {
            tracing::debug!(missing = ?missing, "Imputing missing audio features with catalogue means");
        }

        let mut values = self.means;
        for (slot, value) in values.iter_mut().zip(features.as_array()) {
            if let Some(v) = value {
                *slot = v;
            }
        }
        self.transform(&values)
    }

    pub fn means(&self) -> &[f64; FEATURE_COUNT] {
        &self.means
    }

    /// Column names paired with their fitted mean and scale
    pub fn describe(&self) -> impl Iterator<Item = (&'static str, f64, f64)> + '_ {
        FEATURE_COLUMNS
            .iter()
            .zip(self.means.iter().zip(self.scales.iter()))
            .map(|(name, (mean, scale))| (*name, *mean, *scale))
    }
}
