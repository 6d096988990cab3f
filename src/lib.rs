//! Klynge: clustering of municipalities by cultural participation.
//!
//! Takes a table of activity-participation percentages (one row per
//! municipality) to a labelled partition, exposing every intermediate
//! artifact along the way.
//!
//! # Quick Start
//!
//! ```
//! use klynge::prelude::*;
//!
//! let data = Matrix::from_vec(6, 2, vec![
//!     0.0, 0.0,
//!     0.2, 0.1,
//!     0.1, 0.3,
//!     10.0, 10.0,
//!     10.2, 9.9,
//!     9.8, 10.1,
//! ]).expect("valid matrix dimensions");
//!
//! let fit = KMeans::new(2).with_random_state(7).fit(&data).expect("k-means fits");
//! assert_eq!(fit.labels()[0], fit.labels()[1]);
//! assert_ne!(fit.labels()[0], fit.labels()[3]);
//!
//! let tree = AgglomerativeClustering::new(Linkage::Average).fit(&data).expect("tree builds");
//! assert_eq!(tree.cut(2).expect("valid cut"), vec![0, 0, 0, 1, 1, 1]);
//! ```
//!
//! # Modules
//!
//! - [`primitives`]: row-major matrix and Euclidean distances
//! - [`data`]: keyed datasets and the CSV loader/cleaner
//! - [`preprocessing`]: z-score standardization
//! - [`cluster`]: k-means, agglomerative clustering, dendrograms, assignments
//! - [`metrics`]: WSS, silhouette, internal indices, contingency tables
//! - [`selection`]: elbow and silhouette curves, multi-index vote
//! - [`report`]: per-cluster summaries and label alignment
//! - [`config`]: serde-backed analysis configuration
//! - [`pipeline`]: the whole workflow from a config to a report

pub mod cluster;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod prelude;
pub mod preprocessing;
pub mod primitives;
pub mod report;
pub mod selection;
pub mod traits;

pub use error::{KlyngeError, Result};
pub use primitives::Matrix;
pub use traits::{Transformer, UnsupervisedEstimator};
