// Dashboard builder - document model, canvas editor and sharing service
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
