//! HTTP handlers for the mediastem API surface

pub mod acquire;
pub mod files;
pub mod health;
pub mod limits;
pub mod separate;

pub use acquire::{acquire, probe};
pub use files::{download_result, download_stem};
pub use health::health_routes;
pub use limits::limits;
pub use separate::separate;
