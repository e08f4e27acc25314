//! HTTP route handlers, grouped by resource.

pub mod attendance;
pub mod classes;
pub mod grades;
pub mod status;
pub mod students;
