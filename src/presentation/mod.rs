// Presentation layer - HTTP routes over the read-side service
pub mod app_state;
pub mod handlers;
pub mod router;
