pub mod features;
pub mod inference;
pub mod models;
pub mod routes;
pub mod scaler;
pub mod schema;
pub mod service;
