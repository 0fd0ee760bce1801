// Domain layer - Dashboard document model, widget registry and rendering
pub mod dashboard;
pub mod data_source;
pub mod filter;
pub mod ids;
pub mod page;
pub mod registry;
pub mod render;
pub mod share;
pub mod widget;
