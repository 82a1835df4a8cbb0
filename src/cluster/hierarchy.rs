use super::{squared_euclidean, validate_input};
use crate::error::{Error, Result};
use crate::{Labels, Matrix};
use tracing::{debug, info};

/// One agglomeration step. Leaves are ids `0..n`; merge `i` creates id `n + i`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Merge {
    pub left: usize,
    pub right: usize,
    pub height: f64,
    pub size: usize,
}

/// Binary merge tree over `n` samples, ordered by merge step.
#[derive(Clone, Debug)]
pub struct LinkageTree {
    merges: Vec<Merge>,
    n_leaves: usize,
}

impl LinkageTree {
    /// Builds the tree with Ward's criterion on Euclidean distances.
    ///
    /// At every step the closest pair of active clusters merges and the
    /// distances to the new cluster follow the Lance-Williams update
    /// `d(ij,k)^2 = ((n_i+n_k) d(i,k)^2 + (n_j+n_k) d(j,k)^2 - n_k d(i,j)^2) / (n_i+n_j+n_k)`.
    /// Ties resolve to the lowest `(i, j)` pair.
    pub fn ward(x: &Matrix) -> Result<Self> {
        validate_input(x)?;
        let n = x.nrows();
        if n < 2 {
            return Err(Error::TooFewSamples {
                n_samples: n,
                n_clusters: 2,
            });
        }

        let mut dist = Matrix::from_elem((n, n), f64::INFINITY);
        for i in 0..n {
            for j in (i + 1)..n {
                let d = squared_euclidean(&x.row(i), &x.row(j)).sqrt();
                dist[[i, j]] = d;
                dist[[j, i]] = d;
            }
        }

        let mut active = vec![true; n];
        let mut sizes = vec![1usize; n];
        let mut ids: Vec<usize> = (0..n).collect();
        let mut merges = Vec::with_capacity(n - 1);

        for step in 0..(n - 1) {
            let (i, j, d_ij) = closest_pair(&dist, &active);
            let (n_i, n_j) = (sizes[i], sizes[j]);

            merges.push(Merge {
                left: ids[i].min(ids[j]),
                right: ids[i].max(ids[j]),
                height: d_ij,
                size: n_i + n_j,
            });

            for k in 0..n {
                if !active[k] || k == i || k == j {
                    continue;
                }
                let n_k = sizes[k] as f64;
                let (d_ik, d_jk) = (dist[[i, k]], dist[[j, k]]);
                let numer = (n_i as f64 + n_k) * d_ik * d_ik + (n_j as f64 + n_k) * d_jk * d_jk
                    - n_k * d_ij * d_ij;
                let total = (n_i + n_j) as f64 + n_k;
                let d = (numer / total).max(0.0).sqrt();
                dist[[i, k]] = d;
                dist[[k, i]] = d;
            }

            active[j] = false;
            sizes[i] = n_i + n_j;
            ids[i] = n + step;

            if (step + 1) % 100 == 0 {
                debug!(step = step + 1, height = d_ij, "ward linkage progress");
            }
        }

        info!(n_leaves = n, top_height = merges[n - 2].height, "ward linkage built");
        Ok(Self { merges, n_leaves: n })
    }

    pub fn merges(&self) -> &[Merge] {
        &self.merges
    }

    pub fn n_leaves(&self) -> usize {
        self.n_leaves
    }

    pub fn heights(&self) -> Vec<f64> {
        self.merges.iter().map(|m| m.height).collect()
    }

    /// scipy-style `[n-1, 4]` matrix: `[left, right, height, size]` per row.
    pub fn to_matrix(&self) -> Matrix {
        let mut z = Matrix::zeros((self.merges.len(), 4));
        for (row, merge) in self.merges.iter().enumerate() {
            z[[row, 0]] = merge.left as f64;
            z[[row, 1]] = merge.right as f64;
            z[[row, 2]] = merge.height;
            z[[row, 3]] = merge.size as f64;
        }
        z
    }

    /// Height halfway between the last merge kept below the cut and the
    /// first one above it, for a cut into `n_clusters` groups.
    pub fn cut_height(&self, n_clusters: usize) -> Result<f64> {
        if n_clusters == 0 {
            return Err(Error::InvalidClusterCount(n_clusters));
        }
        let n = self.n_leaves;
        if n_clusters >= n {
            return Ok(0.0);
        }

        let below = n - n_clusters;
        let lower = self.merges[below - 1].height;
        Ok(match self.merges.get(below) {
            Some(upper) => (lower + upper.height) / 2.0,
            None => lower,
        })
    }

    /// Flat clustering into at most `n_clusters` groups (exactly that many
    /// when `n_clusters <= n`).
    ///
    /// The first `n - n_clusters` merges are kept. Ids are handed out by a
    /// left-first walk from the root, so 0 is the leftmost group in the
    /// dendrogram.
    pub fn fcluster_maxclust(&self, n_clusters: usize) -> Result<Labels> {
        if n_clusters == 0 {
            return Err(Error::InvalidClusterCount(n_clusters));
        }

        let n = self.n_leaves;
        let kept = n - n_clusters.min(n);
        let mut labels = Labels::zeros(n);
        let mut next_id = 0;
        let mut stack = vec![self.root()];

        while let Some(node) = stack.pop() {
            if node >= n && node - n >= kept {
                let merge = self.merges[node - n];
                stack.push(merge.right);
                stack.push(merge.left);
            } else {
                for leaf in self.leaves_of(node) {
                    labels[leaf] = next_id;
                }
                next_id += 1;
            }
        }

        Ok(labels)
    }

    /// Leaf-ordered drawing layout, scipy's `truncate_mode='level'`:
    /// subtrees more than `truncate_level` merges below the root are drawn
    /// as a single leaf labelled with their size. Links below the
    /// `n_clusters` cut carry the flat cluster id they belong to.
    pub fn dendrogram(&self, truncate_level: usize, n_clusters: usize) -> Result<Dendrogram> {
        let labels = self.fcluster_maxclust(n_clusters)?;
        let kept = self.n_leaves - n_clusters.min(self.n_leaves);

        let mut layout = Dendrogram {
            links: Vec::new(),
            leaves: Vec::new(),
            max_height: self.merges.last().map(|m| m.height).unwrap_or(0.0),
        };
        self.place(self.root(), 0, truncate_level, kept, &labels, &mut layout);

        Ok(layout)
    }

    fn root(&self) -> usize {
        if self.merges.is_empty() {
            0
        } else {
            self.n_leaves + self.merges.len() - 1
        }
    }

    fn leaves_of(&self, node: usize) -> Vec<usize> {
        let mut leaves = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if current < self.n_leaves {
                leaves.push(current);
            } else {
                let merge = self.merges[current - self.n_leaves];
                stack.push(merge.right);
                stack.push(merge.left);
            }
        }
        leaves
    }

    /// Returns the node's x position and height.
    fn place(
        &self,
        node: usize,
        depth: usize,
        truncate_level: usize,
        kept: usize,
        labels: &Labels,
        layout: &mut Dendrogram,
    ) -> (f64, f64) {
        let n = self.n_leaves;
        let x = 5.0 + 10.0 * layout.leaves.len() as f64;

        if node < n {
            layout.leaves.push(DendrogramLeaf {
                x,
                label: node.to_string(),
                size: 1,
            });
            return (x, 0.0);
        }

        let merge = self.merges[node - n];
        if depth > truncate_level {
            layout.leaves.push(DendrogramLeaf {
                x,
                label: format!("({})", merge.size),
                size: merge.size,
            });
            return (x, 0.0);
        }

        let (x_left, h_left) = self.place(merge.left, depth + 1, truncate_level, kept, labels, layout);
        let (x_right, h_right) = self.place(merge.right, depth + 1, truncate_level, kept, labels, layout);

        let cluster = if node - n < kept {
            self.leaves_of(node).first().map(|&leaf| labels[leaf])
        } else {
            None
        };

        layout.links.push(DendrogramLink {
            xs: [x_left, x_left, x_right, x_right],
            ys: [h_left, merge.height, merge.height, h_right],
            cluster,
        });

        ((x_left + x_right) / 2.0, merge.height)
    }
}

fn closest_pair(dist: &Matrix, active: &[bool]) -> (usize, usize, f64) {
    let n = active.len();
    let mut best = (0, 1, f64::INFINITY);
    for i in 0..n {
        if !active[i] {
            continue;
        }
        for j in (i + 1)..n {
            if active[j] && dist[[i, j]] < best.2 {
                best = (i, j, dist[[i, j]]);
            }
        }
    }
    best
}

#[derive(Clone, Debug, PartialEq)]
pub struct DendrogramLink {
    /// Polyline x coordinates: left foot, left shoulder, right shoulder, right foot.
    pub xs: [f64; 4],
    pub ys: [f64; 4],
    /// Flat cluster id for links below the cut.
    pub cluster: Option<usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DendrogramLeaf {
    pub x: f64,
    pub label: String,
    pub size: usize,
}

#[derive(Clone, Debug)]
pub struct Dendrogram {
    pub links: Vec<DendrogramLink>,
    pub leaves: Vec<DendrogramLeaf>,
    pub max_height: f64,
}

/// Agglomerative clustering estimator: Ward tree plus a max-cluster cut.
#[derive(Clone, Debug)]
pub struct WardLinkage {
    pub tree: Option<LinkageTree>,
    pub labels: Option<Labels>,
    n_clusters: usize,
}

impl WardLinkage {
    pub fn new(n_clusters: usize) -> Self {
        if n_clusters == 0 {
            panic!("n_clusters must be > 0, got {}", n_clusters);
        }

        Self {
            tree: None,
            labels: None,
            n_clusters,
        }
    }

    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    pub fn fit(&mut self, x: &Matrix) -> Result<()> {
        if x.nrows() < self.n_clusters {
            return Err(Error::TooFewSamples {
                n_samples: x.nrows(),
                n_clusters: self.n_clusters,
            });
        }

        let tree = LinkageTree::ward(x)?;
        let labels = tree.fcluster_maxclust(self.n_clusters)?;

        self.tree = Some(tree);
        self.labels = Some(labels);
        Ok(())
    }

    pub fn fit_predict(&mut self, x: &Matrix) -> Result<Labels> {
        self.fit(x)?;
        self.labels.clone().ok_or(Error::NotFitted("WardLinkage"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::collections::HashSet;

    fn four_points() -> Matrix {
        array![[0.0, 0.0], [1.0, 0.0], [5.0, 0.0], [6.0, 0.0]]
    }

    #[test]
    fn test_ward_merge_order_and_heights() {
        let tree = LinkageTree::ward(&four_points()).unwrap();
        let merges = tree.merges();

        assert_eq!(merges.len(), 3);
        assert_eq!((merges[0].left, merges[0].right, merges[0].size), (0, 1, 2));
        assert_eq!((merges[1].left, merges[1].right, merges[1].size), (2, 3, 2));
        assert_eq!((merges[2].left, merges[2].right, merges[2].size), (4, 5, 4));

        assert!((merges[0].height - 1.0).abs() < 1e-12);
        assert!((merges[1].height - 1.0).abs() < 1e-12);
        // sqrt(2 * n_a * n_b / (n_a + n_b)) * |c_a - c_b| = sqrt(2) * 5
        assert!((merges[2].height - 50f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_ward_matches_centroid_formula() {
        // Merging a pair with a singleton: sqrt(2 * 2 * 1 / 3) * |0.5 - 5|.
        let x = array![[0.0, 0.0], [1.0, 0.0], [5.0, 0.0]];
        let tree = LinkageTree::ward(&x).unwrap();

        let expected = (4.0f64 / 3.0).sqrt() * 4.5;
        assert!((tree.merges()[1].height - expected).abs() < 1e-12);
    }

    #[test]
    fn test_heights_are_monotonic() {
        let x = array![
            [0.1, 0.2],
            [0.15, 0.22],
            [0.5, 0.4],
            [0.52, 0.45],
            [0.9, 0.95],
            [0.88, 0.9],
            [0.3, 0.8]
        ];
        let tree = LinkageTree::ward(&x).unwrap();
        let heights = tree.heights();

        for pair in heights.windows(2) {
            assert!(pair[0] <= pair[1] + 1e-12);
        }
        assert_eq!(tree.merges().last().unwrap().size, 7);
    }

    #[test]
    fn test_fcluster_maxclust() {
        let tree = LinkageTree::ward(&four_points()).unwrap();

        assert_eq!(tree.fcluster_maxclust(1).unwrap().to_vec(), vec![0, 0, 0, 0]);
        assert_eq!(tree.fcluster_maxclust(2).unwrap().to_vec(), vec![0, 0, 1, 1]);

        let three = tree.fcluster_maxclust(3).unwrap();
        let unique: HashSet<usize> = three.iter().copied().collect();
        assert_eq!(unique.len(), 3);
        assert_eq!(three[0], three[1]);

        assert_eq!(tree.fcluster_maxclust(10).unwrap().to_vec(), vec![0, 1, 2, 3]);
        assert!(tree.fcluster_maxclust(0).is_err());
    }

    #[test]
    fn test_cut_height() {
        let tree = LinkageTree::ward(&four_points()).unwrap();

        assert!((tree.cut_height(2).unwrap() - (1.0 + 50f64.sqrt()) / 2.0).abs() < 1e-12);
        assert!((tree.cut_height(1).unwrap() - 50f64.sqrt()).abs() < 1e-12);
        assert_eq!(tree.cut_height(4).unwrap(), 0.0);
    }

    #[test]
    fn test_to_matrix() {
        let tree = LinkageTree::ward(&four_points()).unwrap();
        let z = tree.to_matrix();

        assert_eq!(z.shape(), &[3, 4]);
        assert_eq!(z[[2, 0]], 4.0);
        assert_eq!(z[[2, 1]], 5.0);
        assert_eq!(z[[2, 3]], 4.0);
    }

    #[test]
    fn test_dendrogram_layout() {
        let tree = LinkageTree::ward(&four_points()).unwrap();
        let layout = tree.dendrogram(10, 2).unwrap();

        let labels: Vec<&str> = layout.leaves.iter().map(|l| l.label.as_str()).collect();
        assert_eq!(labels, vec!["0", "1", "2", "3"]);
        assert_eq!(layout.leaves[0].x, 5.0);
        assert_eq!(layout.leaves[3].x, 35.0);
        assert_eq!(layout.links.len(), 3);

        let root = layout.links.last().unwrap();
        assert_eq!(root.xs, [10.0, 10.0, 30.0, 30.0]);
        assert_eq!(root.cluster, None);
        assert_eq!(layout.links[0].cluster, Some(0));
        assert_eq!(layout.links[1].cluster, Some(1));
    }

    #[test]
    fn test_dendrogram_truncation() {
        let tree = LinkageTree::ward(&four_points()).unwrap();
        let layout = tree.dendrogram(0, 2).unwrap();

        let labels: Vec<&str> = layout.leaves.iter().map(|l| l.label.as_str()).collect();
        assert_eq!(labels, vec!["(2)", "(2)"]);
        assert_eq!(layout.links.len(), 1);
    }

    #[test]
    fn test_ward_estimator() {
        let mut ward = WardLinkage::new(2);
        let labels = ward.fit_predict(&four_points()).unwrap();

        assert_eq!(labels.to_vec(), vec![0, 0, 1, 1]);
        assert!(ward.tree.is_some());
    }

    #[test]
    fn test_ward_too_few_samples() {
        assert!(LinkageTree::ward(&array![[1.0, 2.0]]).is_err());

        let mut ward = WardLinkage::new(3);
        assert!(matches!(
            ward.fit(&array![[1.0, 2.0], [3.0, 4.0]]),
            Err(Error::TooFewSamples { .. })
        ));
    }

    #[test]
    fn test_ward_rejects_non_finite() {
        let x = array![[1.0, f64::INFINITY], [3.0, 4.0]];
        assert!(matches!(LinkageTree::ward(&x), Err(Error::NonFiniteInput)));
    }

    #[test]
    fn test_ward_invalid_clusters() {
        std::panic::catch_unwind(|| {
            WardLinkage::new(0);
        })
        .expect_err("Should panic on zero clusters");
    }
}
