//! JSON API used by live search, the map page and the heart buttons.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use delicious_core::{GeoPoint, StoreId};

use crate::error::{ApiError, AppError, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::{NearbyStore, SearchResult};
use crate::services::StoreService;
use crate::state::AppState;

/// `GET /api/search` query.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// `GET /api/stores/near` query. Kept as strings so bad input is a 400
/// with a useful message rather than a generic rejection.
#[derive(Debug, Deserialize)]
pub struct NearQuery {
    pub lat: Option<String>,
    pub lng: Option<String>,
}

impl NearQuery {
    /// Parse the query into a point.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for missing or out-of-range coordinates.
    pub fn point(&self) -> Result<GeoPoint, AppError> {
        let (Some(lat), Some(lng)) = (self.lat.as_deref(), self.lng.as_deref()) else {
            return Err(AppError::BadRequest(
                "lat and lng query parameters are required".to_owned(),
            ));
        };
        GeoPoint::parse(lng, lat).map_err(|e| AppError::BadRequest(e.to_string()))
    }
}

/// Body of a heart toggle response.
#[derive(Debug, Serialize)]
pub struct HeartsResponse {
    pub hearts: Vec<StoreId>,
}

/// Full-text store search, best match first.
#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<SearchResult>>, ApiError> {
    let results = StoreService::new(state.pool()).search(&query.q).await?;
    Ok(Json(results))
}

/// Stores near a coordinate, nearest first.
#[instrument(skip(state))]
pub async fn near(
    State(state): State<AppState>,
    Query(query): Query<NearQuery>,
) -> Result<Json<Vec<NearbyStore>>, ApiError> {
    let point = query.point()?;
    let stores = StoreService::new(state.pool()).near(point).await?;
    Ok(Json(stores))
}

/// Toggle a heart for the signed-in user.
#[instrument(skip(user, state), fields(user_id = %user.id))]
pub async fn heart(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<HeartsResponse>, ApiError> {
    let hearts = StoreService::new(state.pool())
        .toggle_heart(user.id, StoreId::new(id))
        .await?;

    add_breadcrumb("hearts", "Toggled heart", Some(&[("store_id", &id.to_string())]));
    Ok(Json(HeartsResponse { hearts }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn query(lat: Option<&str>, lng: Option<&str>) -> NearQuery {
        NearQuery {
            lat: lat.map(str::to_owned),
            lng: lng.map(str::to_owned),
        }
    }

    #[test]
    fn test_near_query_parses_point() {
        let point = query(Some("43.2"), Some("-79.8")).point().unwrap();
        assert!((point.lat() - 43.2).abs() < f64::EPSILON);
        assert!((point.lng() + 79.8).abs() < f64::EPSILON);
    }

    #[test]
    fn test_near_query_rejects_missing_and_out_of_range() {
        assert!(matches!(
            query(None, Some("1")).point(),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            query(Some("91"), Some("0")).point(),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            query(Some("abc"), Some("0")).point(),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_hearts_response_shape() {
        let body = serde_json::to_value(HeartsResponse {
            hearts: vec![StoreId::new(1), StoreId::new(4)],
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "hearts": [1, 4] }));
    }
}
