//! Pre-trained consumption model
//!
//! The forecast engine only sees the `Regressor` trait. The production
//! implementation is a LightGBM booster read from its text dump.

pub mod lightgbm;

use crate::error::{DashboardError, Result};
use crate::features::FeatureVector;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub use lightgbm::Booster;

/// A trained model mapping one feature vector to a consumption estimate
pub trait Regressor: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> f64;
}

impl<F> Regressor for F
where
    F: Fn(&FeatureVector) -> f64 + Send + Sync,
{
    fn predict(&self, features: &FeatureVector) -> f64 {
        self(features)
    }
}

/// Read a LightGBM text model from disk
pub fn load_model(path: &Path) -> Result<Arc<dyn Regressor>> {
    let text = std::fs::read_to_string(path).map_err(|e| DashboardError::ModelLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let booster = Booster::from_text(&text).map_err(|reason| DashboardError::ModelLoad {
        path: path.to_path_buf(),
        reason,
    })?;

    info!(
        path = %path.display(),
        trees = booster.num_trees(),
        "Loaded consumption model"
    );
    Ok(Arc::new(booster))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserContext;
    use chrono::NaiveDate;
    use std::path::PathBuf;

    #[test]
    fn test_missing_file_is_model_load_error() {
        let err = load_model(Path::new("models/does_not_exist.txt")).err().unwrap();
        assert!(matches!(err, DashboardError::ModelLoad { .. }));
    }

    #[test]
    fn test_bundled_model_loads_and_predicts() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("models/consumption_model.txt");
        let model = load_model(&path).unwrap();

        let context = UserContext {
            role: "Vendedor".into(),
            department: "Vendas".into(),
            event: "Nenhum".into(),
            device: "Smartphone".into(),
            status: "Ativo".into(),
        };
        let buffer = vec![5.0; 30];
        let date = NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();
        let prediction = model.predict(&crate::features::build_feature_vector(&buffer, date, &context));
        assert!(prediction.is_finite());
        assert!(prediction > 0.0);
    }

    #[test]
    fn test_closures_are_regressors() {
        let constant = |_: &FeatureVector| 5.0;
        let model: &dyn Regressor = &constant;
        let context = UserContext {
            role: "r".into(),
            department: "d".into(),
            event: "e".into(),
            device: "v".into(),
            status: "s".into(),
        };
        let fv = crate::features::build_feature_vector(&[1.0], NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(), &context);
        assert_eq!(model.predict(&fv), 5.0);
    }
}
