//! Users service library modules.
//!
//! Layout follows a hexagonal split: [`domain`] holds entities, ports, and
//! use-cases; [`inbound`] adapts HTTP onto them; [`outbound`] implements the
//! repository port for PostgreSQL and for process memory.

pub mod config;
pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod server;
pub mod telemetry;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use middleware::Correlation;
