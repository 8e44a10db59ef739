//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - GC Reporter: Surfaces errors from file cache garbage collection

mod gc_reporter;

pub use gc_reporter::spawn_gc_reporter;
