//! Clustering algorithms used by the segmentation demos.
//!
//! This module provides:
//! - `KMeans`: partitional clustering with k-means++ seeding and restarts
//! - `WardLinkage`: agglomerative clustering with Ward's minimum-variance
//!   criterion, cut into a fixed number of flat clusters
//!
//! # Examples
//!
//! ## K-Means Clustering
//! ```rust
//! use customer_segments::KMeans;
//! use ndarray::array;
//!
//! let x = array![
//!     [1.0, 1.0],
//!     [1.5, 2.0],
//!     [3.0, 4.0],
//!     [5.0, 7.0],
//!     [3.5, 5.0],
//!     [4.5, 5.0]
//! ];
//!
//! let mut kmeans = KMeans::new(2).n_init(10).random_state(42);
//! let labels = kmeans.fit_predict(&x).unwrap();
//! assert_eq!(labels.len(), 6);
//!
//! // Within-cluster sum of squares
//! let inertia = kmeans.inertia.unwrap();
//! println!("Inertia: {:.4}", inertia);
//! ```
//!
//! ## Ward Hierarchical Clustering
//! ```rust
//! use customer_segments::WardLinkage;
//! use ndarray::array;
//!
//! let x = array![[0.0, 0.0], [1.0, 0.0], [5.0, 0.0], [6.0, 0.0]];
//!
//! let mut ward = WardLinkage::new(2);
//! let labels = ward.fit_predict(&x).unwrap();
//! assert_eq!(labels.to_vec(), vec![0, 0, 1, 1]);
//!
//! let tree = ward.tree.as_ref().unwrap();
//! assert_eq!(tree.merges().len(), 3);
//! ```

mod hierarchy;
mod kmeans;

pub use hierarchy::{Dendrogram, DendrogramLeaf, DendrogramLink, LinkageTree, Merge, WardLinkage};
pub use kmeans::KMeans;

use crate::Matrix;
use crate::error::{Error, Result};
use ndarray::{ArrayView1, Axis};

fn validate_input(x: &Matrix) -> Result<()> {
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(Error::EmptyInput);
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(Error::NonFiniteInput);
    }
    Ok(())
}

fn squared_euclidean(a: &ArrayView1<f64>, b: &ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Closest center index and its squared distance. Ties go to the lower index.
fn nearest_center(point: &ArrayView1<f64>, centers: &Matrix) -> (usize, f64) {
    let mut closest = 0;
    let mut min_distance = f64::INFINITY;

    for (k, center) in centers.axis_iter(Axis(0)).enumerate() {
        let distance = squared_euclidean(point, &center);
        if distance < min_distance {
            min_distance = distance;
            closest = k;
        }
    }

    (closest, min_distance)
}
