// Application layer - Use cases, editor state and the storage seam
pub mod canvas;
pub mod dashboard_repository;
pub mod dashboard_service;
pub mod persistence;
pub mod properties;
pub mod session;
