//! Classroom use-case services.
//!
//! # Responsibility
//! - Build commands from current state and hand them to the history manager.
//! - Keep UI callers away from snapshot capture and ID allocation details.
//!
//! # See also
//! - `crate::history` for execution and persistence.

pub mod classroom_service;
pub mod layout;

pub use classroom_service::{ClassroomService, NewFurnitureRequest, NewStudentRequest};
pub use layout::{collision_shifts, LAYOUT_COLLISION_OFFSET};
