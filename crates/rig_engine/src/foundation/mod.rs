//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - Math types and operations
//! - Logging utilities and the injectable diagnostic sink

pub mod math;
pub mod logging;
