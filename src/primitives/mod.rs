//! Core compute primitives (Matrix, distances).
//!
//! These types provide the foundation for all clustering algorithms.

mod distance;
mod matrix;

pub use distance::{euclidean, squared_euclidean, DistanceMatrix};
pub use matrix::Matrix;
