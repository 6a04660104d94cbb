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

use crate::controllers::{is_fk_violation, is_unique_violation};
use crate::validation;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookings", get(list_bookings))
        .route("/bookings", post(create_booking))
        .route("/bookings/{id}", get(get_booking))
        .route("/bookings/{id}", put(update_booking))
        .route("/bookings/{id}", delete(delete_booking))
}

const VENUE_TAKEN: &str = "This venue is already booked on the selected date.";

/* ---------- helpers ---------- */

async fn event_exists(pool: &sqlx::PgPool, event_id: i64) -> sqlx::Result<bool> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM events WHERE id = $1)")
        .bind(event_id)
        .fetch_one(pool)
        .await
}

async fn venue_exists(pool: &sqlx::PgPool, venue_id: i64) -> sqlx::Result<bool> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM venues WHERE id = $1)")
        .bind(venue_id)
        .fetch_one(pool)
        .await
}

async fn booking_exists(pool: &sqlx::PgPool, booking_id: i64) -> sqlx::Result<bool> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM bookings WHERE id = $1)")
        .bind(booking_id)
        .fetch_one(pool)
        .await
}

// referenced event and venue must both exist before a booking touches them
async fn check_references(
    pool: &sqlx::PgPool,
    event_id: i64,
    venue_id: i64,
) -> Result<(), (StatusCode, String)> {
    if event_id <= 0 || venue_id <= 0 {
        return Err((StatusCode::BAD_REQUEST, "event_id and venue_id must be > 0".to_string()));
    }

    let event_ok = event_exists(pool, event_id).await.map_err(|e| {
        tracing::error!("booking event check error: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to check event".to_string())
    })?;
    if !event_ok {
        return Err((StatusCode::BAD_REQUEST, "Referenced event does not exist".to_string()));
    }

    let venue_ok = venue_exists(pool, venue_id).await.map_err(|e| {
        tracing::error!("booking venue check error: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to check venue".to_string())
    })?;
    if !venue_ok {
        return Err((StatusCode::BAD_REQUEST, "Referenced venue does not exist".to_string()));
    }

    Ok(())
}

/* ---------- BOOKINGS ---------- */

#[derive(Debug, Deserialize)]
struct BookingPayload {
    pub event_id: i64,
    pub venue_id: i64,
    pub booking_date: NaiveDateTime,
}

// Booking row joined with its event and venue for the list/detail views
#[derive(Debug, Serialize, sqlx::FromRow)]
struct BookingResponse {
    pub id: i64,
    pub event_id: i64,
    pub event_name: String,
    pub event_date: NaiveDateTime,
    pub venue_id: i64,
    pub venue_name: String,
    pub location: String,
    pub booking_date: NaiveDateTime,
}

#[derive(Debug, Serialize)]
struct CreatedResponse {
    pub id: i64,
}

// GET /api/bookings
async fn list_bookings(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let bookings = sqlx::query_as::<_, BookingResponse>(
        r#"
        SELECT b.id, b.event_id, e.name AS event_name, e.date AS event_date,
               b.venue_id, v.name AS venue_name, v.location, b.booking_date
        FROM bookings b
        JOIN events e ON e.id = b.event_id
        JOIN venues v ON v.id = b.venue_id
        ORDER BY b.booking_date DESC, b.id
        "#,
    )
    .fetch_all(&state.db.pool)
    .await
    .map_err(|e| {
        tracing::error!("list_bookings sql error: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to list bookings".to_string())
    })?;

    Ok((StatusCode::OK, Json(bookings)))
}

// GET /api/bookings/{id}
async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let booking = sqlx::query_as::<_, BookingResponse>(
        r#"
        SELECT b.id, b.event_id, e.name AS event_name, e.date AS event_date,
               b.venue_id, v.name AS venue_name, v.location, b.booking_date
        FROM bookings b
        JOIN events e ON e.id = b.event_id
        JOIN venues v ON v.id = b.venue_id
        WHERE b.id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&state.db.pool)
    .await
    .map_err(|e| {
        tracing::error!("get_booking sql error: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to load booking".to_string())
    })?;

    match booking {
        Some(b) => Ok((StatusCode::OK, Json(b))),
        None => Err((StatusCode::NOT_FOUND, "Booking not found".to_string())),
    }
}

// POST /api/bookings
async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BookingPayload>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    check_references(&state.db.pool, req.event_id, req.venue_id).await?;

    let conflict = validation::check_conflict(&state.db, req.venue_id, req.booking_date, None)
        .await
        .map_err(|e| {
            tracing::error!("create_booking conflict check error: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to check booking conflicts".to_string())
        })?;
    if conflict {
        return Err((StatusCode::CONFLICT, VENUE_TAKEN.to_string()));
    }

    // The conflict check and the insert are separate statements, so two
    // concurrent creates for the same venue and day can both pass the check.
    // The unique index on (venue_id, booking day) rejects the loser here.
    let res = sqlx::query_scalar::<_, i64>(
        "INSERT INTO bookings (event_id, venue_id, booking_date)
         VALUES ($1, $2, $3)
         RETURNING id",
    )
    .bind(req.event_id)
    .bind(req.venue_id)
    .bind(req.booking_date)
    .fetch_one(&state.db.pool)
    .await;

    match res {
        Ok(id) => Ok((StatusCode::CREATED, Json(CreatedResponse { id }))),
        Err(ref e) if is_unique_violation(e) => {
            Err((StatusCode::CONFLICT, VENUE_TAKEN.to_string()))
        }
        Err(ref e) if is_fk_violation(e) => {
            Err((StatusCode::BAD_REQUEST, "Referenced event or venue does not exist".to_string()))
        }
        Err(e) => {
            tracing::error!("create_booking sql error: {:?}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Failed to create booking".to_string()))
        }
    }
}

// PUT /api/bookings/{id}
async fn update_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<BookingPayload>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    check_references(&state.db.pool, req.event_id, req.venue_id).await?;

    // the booking being edited must not count as its own conflict
    let conflict = validation::check_conflict(&state.db, req.venue_id, req.booking_date, Some(id))
        .await
        .map_err(|e| {
            tracing::error!("update_booking conflict check error: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to check booking conflicts".to_string())
        })?;
    if conflict {
        return Err((StatusCode::CONFLICT, VENUE_TAKEN.to_string()));
    }

    let res = sqlx::query(
        "UPDATE bookings SET event_id = $1, venue_id = $2, booking_date = $3
         WHERE id = $4",
    )
    .bind(req.event_id)
    .bind(req.venue_id)
    .bind(req.booking_date)
    .bind(id)
    .execute(&state.db.pool)
    .await;

    match res {
        Ok(r) if r.rows_affected() > 0 => {
            Ok((StatusCode::OK, Json(serde_json::json!({"message": "Booking updated"}))))
        }
        Ok(_) => Err((StatusCode::NOT_FOUND, "Booking not found".to_string())),
        Err(ref e) if is_unique_violation(e) => {
            Err((StatusCode::CONFLICT, VENUE_TAKEN.to_string()))
        }
        Err(e) => {
            // vanished mid-update is a plain not-found; anything else propagates
            match booking_exists(&state.db.pool, id).await {
                Ok(false) => Err((StatusCode::NOT_FOUND, "Booking not found".to_string())),
                _ => {
                    tracing::error!("update_booking sql error: {:?}", e);
                    Err((StatusCode::INTERNAL_SERVER_ERROR, "Failed to update booking".to_string()))
                }
            }
        }
    }
}

// DELETE /api/bookings/{id}
//
// Bookings are the bottom of the dependency chain and delete freely.
async fn delete_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let res = sqlx::query("DELETE FROM bookings WHERE id = $1")
        .bind(id)
        .execute(&state.db.pool)
        .await;

    match res {
        Ok(r) if r.rows_affected() > 0 => {
            Ok((StatusCode::OK, Json(serde_json::json!({"message": "Booking deleted"}))))
        }
        Ok(_) => Err((StatusCode::NOT_FOUND, "Booking not found".to_string())),
        Err(e) => {
            tracing::error!("delete_booking sql error: {:?}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete booking".to_string()))
        }
    }
}
