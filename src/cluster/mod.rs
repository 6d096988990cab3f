//! Partition engines.
//!
//! Includes K-Means with seeded random restarts and agglomerative
//! hierarchical clustering producing a full [`Dendrogram`]. Both yield
//! immutable results; a keyed [`Assignment`] with labels `1..=K` is the
//! common currency for reports and comparisons.

mod agglomerative;
mod assignment;
mod kmeans;

pub use agglomerative::{AgglomerativeClustering, Dendrogram, Linkage, Merge};
pub use assignment::Assignment;
pub use kmeans::{KMeans, KMeansFit, KMeansInit};

#[cfg(test)]
#[path = "tests_kmeans_contract.rs"]
mod tests_kmeans_contract;

#[cfg(test)]
#[path = "tests_agglomerative_contract.rs"]
mod tests_agglomerative_contract;
