use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::controllers::{is_fk_violation, is_unique_violation};
use crate::models::Venue;
use crate::validation;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/venues", get(list_venues))
        .route("/venues", post(create_venue))
        .route("/venues/{id}", get(get_venue))
        .route("/venues/{id}", put(update_venue))
        .route("/venues/{id}", delete(delete_venue))
        .route("/venues/{id}/image", post(upload_venue_image))
}

const DUPLICATE_NAME: &str = "A venue with this name already exists.";
const HAS_EVENTS: &str = "Cannot delete venue because it has associated events.";

/* ---------- helpers ---------- */

async fn venue_exists(pool: &sqlx::PgPool, venue_id: i64) -> sqlx::Result<bool> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM venues WHERE id = $1)")
        .bind(venue_id)
        .fetch_one(pool)
        .await
}

/* ---------- VENUES ---------- */

#[derive(Debug, Deserialize, Validate)]
struct VenuePayload {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    #[validate(length(min = 1, message = "location must not be empty"))]
    pub location: String,
    #[validate(range(min = 0, message = "capacity must not be negative"))]
    pub capacity: i32,
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreatedResponse {
    pub id: i64,
}

// GET /api/venues
async fn list_venues(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let venues = sqlx::query_as::<_, Venue>(
        "SELECT id, name, location, capacity, image_url FROM venues ORDER BY id",
    )
    .fetch_all(&state.db.pool)
    .await
    .map_err(|e| {
        tracing::error!("list_venues sql error: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to list venues".to_string())
    })?;

    Ok((StatusCode::OK, Json(venues)))
}

// GET /api/venues/{id}
async fn get_venue(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let venue = sqlx::query_as::<_, Venue>(
        "SELECT id, name, location, capacity, image_url FROM venues WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&state.db.pool)
    .await
    .map_err(|e| {
        tracing::error!("get_venue sql error: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to load venue".to_string())
    })?;

    match venue {
        Some(v) => Ok((StatusCode::OK, Json(v))),
        None => Err((StatusCode::NOT_FOUND, "Venue not found".to_string())),
    }
}

// POST /api/venues
async fn create_venue(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VenuePayload>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    req.validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let name_free = validation::validate_venue_name(&state.db, &req.name, None)
        .await
        .map_err(|e| {
            tracing::error!("create_venue name check error: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to check venue name".to_string())
        })?;
    if !name_free {
        return Err((StatusCode::CONFLICT, DUPLICATE_NAME.to_string()));
    }

    let res = sqlx::query_scalar::<_, i64>(
        "INSERT INTO venues (name, location, capacity, image_url)
         VALUES ($1, $2, $3, $4)
         RETURNING id",
    )
    .bind(&req.name)
    .bind(&req.location)
    .bind(req.capacity)
    .bind(&req.image_url)
    .fetch_one(&state.db.pool)
    .await;

    match res {
        Ok(id) => Ok((StatusCode::CREATED, Json(CreatedResponse { id }))),
        // the pre-check and the insert are separate statements; the unique
        // constraint on the name decides the loser of a concurrent pair
        Err(ref e) if is_unique_violation(e) => {
            Err((StatusCode::CONFLICT, DUPLICATE_NAME.to_string()))
        }
        Err(e) => {
            tracing::error!("create_venue sql error: {:?}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Failed to create venue".to_string()))
        }
    }
}

// PUT /api/venues/{id}
async fn update_venue(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<VenuePayload>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    req.validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let name_free = validation::validate_venue_name(&state.db, &req.name, Some(id))
        .await
        .map_err(|e| {
            tracing::error!("update_venue name check error: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to check venue name".to_string())
        })?;
    if !name_free {
        return Err((StatusCode::CONFLICT, DUPLICATE_NAME.to_string()));
    }

    let res = sqlx::query(
        "UPDATE venues SET name = $1, location = $2, capacity = $3, image_url = $4
         WHERE id = $5",
    )
    .bind(&req.name)
    .bind(&req.location)
    .bind(req.capacity)
    .bind(&req.image_url)
    .bind(id)
    .execute(&state.db.pool)
    .await;

    match res {
        Ok(r) if r.rows_affected() > 0 => {
            Ok((StatusCode::OK, Json(serde_json::json!({"message": "Venue updated"}))))
        }
        Ok(_) => Err((StatusCode::NOT_FOUND, "Venue not found".to_string())),
        Err(ref e) if is_unique_violation(e) => {
            Err((StatusCode::CONFLICT, DUPLICATE_NAME.to_string()))
        }
        Err(e) => {
            // a row that vanished mid-update is a plain not-found; anything
            // else propagates as a storage failure
            match venue_exists(&state.db.pool, id).await {
                Ok(false) => Err((StatusCode::NOT_FOUND, "Venue not found".to_string())),
                _ => {
                    tracing::error!("update_venue sql error: {:?}", e);
                    Err((StatusCode::INTERNAL_SERVER_ERROR, "Failed to update venue".to_string()))
                }
            }
        }
    }
}

// DELETE /api/venues/{id}
async fn delete_venue(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let deletable = validation::can_delete_venue(&state.db, id).await.map_err(|e| {
        tracing::error!("delete_venue dependency check error: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to check venue dependencies".to_string())
    })?;
    if !deletable {
        return Err((StatusCode::CONFLICT, HAS_EVENTS.to_string()));
    }

    let res = sqlx::query("DELETE FROM venues WHERE id = $1")
        .bind(id)
        .execute(&state.db.pool)
        .await;

    match res {
        Ok(r) if r.rows_affected() > 0 => {
            Ok((StatusCode::OK, Json(serde_json::json!({"message": "Venue deleted"}))))
        }
        Ok(_) => Err((StatusCode::NOT_FOUND, "Venue not found".to_string())),
        // a dependent row inserted after the pre-check trips the FK instead
        Err(ref e) if is_fk_violation(e) => Err((StatusCode::CONFLICT, HAS_EVENTS.to_string())),
        Err(e) => {
            tracing::error!("delete_venue sql error: {:?}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete venue".to_string()))
        }
    }
}

// POST /api/venues/{id}/image
async fn upload_venue_image(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let exists = venue_exists(&state.db.pool, id).await.map_err(|e| {
        tracing::error!("upload_venue_image venue check error: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to load venue".to_string())
    })?;
    if !exists {
        return Err((StatusCode::NOT_FOUND, "Venue not found".to_string()));
    }
    if body.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Image body must not be empty".to_string()));
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    let url = state
        .images
        .upload(body.to_vec(), &content_type)
        .await
        .map_err(|e| {
            tracing::error!("upload_venue_image store error: {:?}", e);
            (StatusCode::BAD_GATEWAY, "Could not upload image.".to_string())
        })?;

    sqlx::query("UPDATE venues SET image_url = $1 WHERE id = $2")
        .bind(&url)
        .bind(id)
        .execute(&state.db.pool)
        .await
        .map_err(|e| {
            tracing::error!("upload_venue_image sql error: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to save image URL".to_string())
        })?;

    Ok((StatusCode::OK, Json(serde_json::json!({"image_url": url}))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(name: &str, location: &str, capacity: i32) -> VenuePayload {
        VenuePayload {
            name: name.to_string(),
            location: location.to_string(),
            capacity,
            image_url: None,
        }
    }

    #[test]
    fn well_formed_payload_passes() {
        assert!(payload("Hall A", "12 Main St", 250).validate().is_ok());
        assert!(payload("Hall A", "12 Main St", 0).validate().is_ok());
    }

    #[test]
    fn empty_name_or_location_is_rejected() {
        assert!(payload("", "12 Main St", 250).validate().is_err());
        assert!(payload("Hall A", "", 250).validate().is_err());
    }

    #[test]
    fn negative_capacity_is_rejected() {
        assert!(payload("Hall A", "12 Main St", -1).validate().is_err());
    }
}
