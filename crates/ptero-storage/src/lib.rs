//! Postgres storage layer: one `Database` handle over a `PgPool`, schema
//! in `migrations/`, applied via `sqlx::migrate!`.

pub mod load;
pub mod models;
pub mod repositories;

pub use load::*;
pub use models::*;
pub use repositories::*;
