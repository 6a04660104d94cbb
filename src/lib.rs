pub mod config;
pub mod database;
pub mod models;
pub mod validation;
pub mod controllers;
pub mod services;

// Shared state for the whole application
#[derive(Clone)]
pub struct AppState {
    pub db: database::Database,
    pub config: config::Config,
    pub images: services::images::ImageStoreClient,
}
