//! Utility types and functions for vimkit.
//!
//! This module contains fundamental types used throughout the library:
//! - [`ScalarType`] - Enum of fixed-size scalar types
//! - [`DataType`] - Scalar + arity
//! - [`Error`] / [`Result`] - Error handling
//! - [`Bounds3f`] - Axis-aligned bounding box on top of glam

mod pod;
mod data_type;
mod error;
mod math;

pub use pod::*;
pub use data_type::*;
pub use error::*;
pub use math::*;
