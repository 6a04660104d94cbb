use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use std::time::Duration;
use tracing::info;

use crate::models::{Booking, Event, Venue};
use crate::validation::CatalogReads;

#[derive(Clone)]
pub struct Database {
    pub pool: Pool<Postgres>,
}

impl Database {
    pub async fn new(database_url: &str, pool_size: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        Ok(Database { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("./src/migrations")
            .run(&self.pool)
            .await?;
        info!("Migrations completed");
        Ok(())
    }
}

// Read capability consumed by the validation checks. Every query is
// parameter-scoped so the checks never scan more rows than they decide over.
#[async_trait]
impl CatalogReads for Database {
    async fn bookings_for_venue_on(
        &self,
        venue_id: i64,
        day: NaiveDate,
    ) -> sqlx::Result<Vec<Booking>> {
        sqlx::query_as::<_, Booking>(
            "SELECT id, event_id, venue_id, booking_date
             FROM bookings
             WHERE venue_id = $1 AND booking_date::date = $2",
        )
        .bind(venue_id)
        .bind(day)
        .fetch_all(&self.pool)
        .await
    }

    async fn bookings_for_event(&self, event_id: i64) -> sqlx::Result<Vec<Booking>> {
        sqlx::query_as::<_, Booking>(
            "SELECT id, event_id, venue_id, booking_date FROM bookings WHERE event_id = $1",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn events_for_venue(&self, venue_id: i64) -> sqlx::Result<Vec<Event>> {
        sqlx::query_as::<_, Event>(
            "SELECT id, name, date, description, venue_id FROM events WHERE venue_id = $1",
        )
        .bind(venue_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn venues_named(&self, name: &str) -> sqlx::Result<Vec<Venue>> {
        sqlx::query_as::<_, Venue>(
            "SELECT id, name, location, capacity, image_url FROM venues WHERE name = $1",
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await
    }
}
