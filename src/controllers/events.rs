use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::controllers::is_fk_violation;
use crate::validation;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events", get(list_events))
        .route("/events", post(create_event))
        .route("/events/{id}", get(get_event))
        .route("/events/{id}", put(update_event))
        .route("/events/{id}", delete(delete_event))
}

const HAS_BOOKINGS: &str = "Cannot delete event because it has associated bookings.";

/* ---------- helpers ---------- */

async fn venue_exists(pool: &sqlx::PgPool, venue_id: i64) -> sqlx::Result<bool> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM venues WHERE id = $1)")
        .bind(venue_id)
        .fetch_one(pool)
        .await
}

async fn event_exists(pool: &sqlx::PgPool, event_id: i64) -> sqlx::Result<bool> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM events WHERE id = $1)")
        .bind(event_id)
        .fetch_one(pool)
        .await
}

/* ---------- EVENTS ---------- */

#[derive(Debug, Deserialize, Validate)]
struct EventPayload {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    pub date: NaiveDateTime,
    pub description: Option<String>,
    pub venue_id: i64,
}

// Event row joined with the name of its venue
#[derive(Debug, Serialize, sqlx::FromRow)]
struct EventResponse {
    pub id: i64,
    pub name: String,
    pub date: NaiveDateTime,
    pub description: Option<String>,
    pub venue_id: i64,
    pub venue_name: String,
}

#[derive(Debug, Serialize)]
struct CreatedResponse {
    pub id: i64,
}

// GET /api/events
async fn list_events(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let events = sqlx::query_as::<_, EventResponse>(
        r#"
        SELECT e.id, e.name, e.date, e.description, e.venue_id, v.name AS venue_name
        FROM events e
        JOIN venues v ON v.id = e.venue_id
        ORDER BY e.date, e.id
        "#,
    )
    .fetch_all(&state.db.pool)
    .await
    .map_err(|e| {
        tracing::error!("list_events sql error: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to list events".to_string())
    })?;

    Ok((StatusCode::OK, Json(events)))
}

// GET /api/events/{id}
async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let event = sqlx::query_as::<_, EventResponse>(
        r#"
        SELECT e.id, e.name, e.date, e.description, e.venue_id, v.name AS venue_name
        FROM events e
        JOIN venues v ON v.id = e.venue_id
        WHERE e.id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&state.db.pool)
    .await
    .map_err(|e| {
        tracing::error!("get_event sql error: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to load event".to_string())
    })?;

    match event {
        Some(e) => Ok((StatusCode::OK, Json(e))),
        None => Err((StatusCode::NOT_FOUND, "Event not found".to_string())),
    }
}

// POST /api/events
async fn create_event(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EventPayload>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    req.validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    if req.venue_id <= 0 {
        return Err((StatusCode::BAD_REQUEST, "venue_id must be > 0".to_string()));
    }

    let venue_ok = venue_exists(&state.db.pool, req.venue_id).await.map_err(|e| {
        tracing::error!("create_event venue check error: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to check venue".to_string())
    })?;
    if !venue_ok {
        return Err((StatusCode::BAD_REQUEST, "Referenced venue does not exist".to_string()));
    }

    let res = sqlx::query_scalar::<_, i64>(
        "INSERT INTO events (name, date, description, venue_id)
         VALUES ($1, $2, $3, $4)
         RETURNING id",
    )
    .bind(&req.name)
    .bind(req.date)
    .bind(&req.description)
    .bind(req.venue_id)
    .fetch_one(&state.db.pool)
    .await;

    match res {
        Ok(id) => Ok((StatusCode::CREATED, Json(CreatedResponse { id }))),
        Err(ref e) if is_fk_violation(e) => {
            Err((StatusCode::BAD_REQUEST, "Referenced venue does not exist".to_string()))
        }
        Err(e) => {
            tracing::error!("create_event sql error: {:?}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Failed to create event".to_string()))
        }
    }
}

// PUT /api/events/{id}
async fn update_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<EventPayload>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    req.validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    if req.venue_id <= 0 {
        return Err((StatusCode::BAD_REQUEST, "venue_id must be > 0".to_string()));
    }

    let venue_ok = venue_exists(&state.db.pool, req.venue_id).await.map_err(|e| {
        tracing::error!("update_event venue check error: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to check venue".to_string())
    })?;
    if !venue_ok {
        return Err((StatusCode::BAD_REQUEST, "Referenced venue does not exist".to_string()));
    }

    let res = sqlx::query(
        "UPDATE events SET name = $1, date = $2, description = $3, venue_id = $4
         WHERE id = $5",
    )
    .bind(&req.name)
    .bind(req.date)
    .bind(&req.description)
    .bind(req.venue_id)
    .bind(id)
    .execute(&state.db.pool)
    .await;

    match res {
        Ok(r) if r.rows_affected() > 0 => {
            Ok((StatusCode::OK, Json(serde_json::json!({"message": "Event updated"}))))
        }
        Ok(_) => Err((StatusCode::NOT_FOUND, "Event not found".to_string())),
        Err(e) => {
            // vanished mid-update is a plain not-found; anything else propagates
            match event_exists(&state.db.pool, id).await {
                Ok(false) => Err((StatusCode::NOT_FOUND, "Event not found".to_string())),
                _ => {
                    tracing::error!("update_event sql error: {:?}", e);
                    Err((StatusCode::INTERNAL_SERVER_ERROR, "Failed to update event".to_string()))
                }
            }
        }
    }
}

// DELETE /api/events/{id}
async fn delete_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let deletable = validation::can_delete_event(&state.db, id).await.map_err(|e| {
        tracing::error!("delete_event dependency check error: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to check event dependencies".to_string())
    })?;
    if !deletable {
        return Err((StatusCode::CONFLICT, HAS_BOOKINGS.to_string()));
    }

    let res = sqlx::query("DELETE FROM events WHERE id = $1")
        .bind(id)
        .execute(&state.db.pool)
        .await;

    match res {
        Ok(r) if r.rows_affected() > 0 => {
            Ok((StatusCode::OK, Json(serde_json::json!({"message": "Event deleted"}))))
        }
        Ok(_) => Err((StatusCode::NOT_FOUND, "Event not found".to_string())),
        // a booking inserted after the pre-check trips the FK instead
        Err(ref e) if is_fk_violation(e) => Err((StatusCode::CONFLICT, HAS_BOOKINGS.to_string())),
        Err(e) => {
            tracing::error!("delete_event sql error: {:?}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete event".to_string()))
        }
    }
}
