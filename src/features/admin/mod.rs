//! Administrative view over issue reports.
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/api/admin/reports` | List reports, optionally by resolution state |
//! | PATCH | `/api/admin/reports/{id}` | Mark a report resolved or unresolved |

pub mod dtos;
pub mod handlers;
pub mod routes;
pub mod services;

pub use routes::routes;
pub use services::AdminService;
