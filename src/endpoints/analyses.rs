use crate::{ApiClient, ApiError, Payload, RequestOptions};
use reqwest::Method;
use serde_derive::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const ANALYSES_PATH: &str = "/hive_analyses/";

/// A request to record the outcome of inspecting one hive for varroa mites.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewHiveAnalysis {
    pub hive_id: u64,
    pub user_id: u64,
    pub image_path: String,
    pub varroa_detected: bool,
    /// How sure the detector was, between `0.0` and `1.0`.
    pub detection_confidence: f64,
}

/// A recorded hive inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HiveAnalysis {
    pub id: u64,
    pub hive_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    #[serde(default)]
    pub varroa_detected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detection_confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HiveAnalysis {
    /// The detection confidence as a whole percentage, treating a missing
    /// value as zero.
    pub fn confidence_percent(&self) -> u32 {
        let confidence = self.detection_confidence.unwrap_or(0.0);
        (confidence * 100.0).round().max(0.0) as u32
    }
}

/// Record an analysis. The backend's reply is returned undecoded; it is
/// usually the stored [`HiveAnalysis`].
pub async fn create_hive_analysis(
    client: &ApiClient,
    analysis: &NewHiveAnalysis,
) -> Result<Payload, ApiError> {
    let options = RequestOptions::new().method(Method::POST).json(analysis)?;

    client.request(ANALYSES_PATH, options).await
}

/// Every analysis visible to the current user, as ordered by the backend.
pub async fn list_hive_analyses(
    client: &ApiClient,
) -> Result<Vec<HiveAnalysis>, ApiError> {
    client
        .request(ANALYSES_PATH, RequestOptions::new())
        .await?
        .into_json()
}
