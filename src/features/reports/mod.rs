//! Citizen issue reports.
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | POST | `/api/reports` | Analyze a photo and store the report |
//!
//! Listing and resolution live in the admin feature.

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use routes::routes;
pub use services::{PgReportRepository, ReportRepository, ReportService};
