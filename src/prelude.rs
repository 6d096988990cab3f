//! Convenience re-exports for common usage.
//!
//! # Usage
//!
//! ```
//! use klynge::prelude::*;
//! ```

pub use crate::cluster::{
    AgglomerativeClustering, Assignment, Dendrogram, KMeans, KMeansFit, KMeansInit, Linkage,
};
pub use crate::data::{Dataset, DatasetLoader};
pub use crate::metrics::contingency::Contingency;
pub use crate::metrics::{inertia, silhouette_samples, silhouette_score};
pub use crate::preprocessing::{standardize, StandardScaler, StdKind, ZeroVariancePolicy};
pub use crate::primitives::Matrix;
pub use crate::report::ClusterSummary;
pub use crate::selection::ClusterCountSelector;
pub use crate::traits::{Transformer, UnsupervisedEstimator};
