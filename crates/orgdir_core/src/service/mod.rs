//! Directory use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Own hierarchy validation and search composition so callers never touch
//!   storage details directly.

mod activity_forest;
pub mod activity_service;
pub mod building_service;
pub mod organization_service;
