//! HTTP adapter - the REST shell over the negotiation core.

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod routes;

pub use handlers::AppState;
pub use middleware::AdminKey;
pub use routes::router;
