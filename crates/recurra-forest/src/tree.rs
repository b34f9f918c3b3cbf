use tracing::trace;

use crate::{
    ForestError,
    node::{FeatureIndex, Node, NodeIndex},
};

/// Child-id sentinel marking a leaf in the exported arrays.
pub const TREE_LEAF: i64 = -1;

/// A survival tree as exported by the training script: parallel arrays
/// indexed by node id, node `0` being the root.
///
/// This is the wire form only. It is converted into a [`SurvivalTree`] with
/// [`SurvivalTree::from_arrays`], which checks every structural invariant.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TreeArrays {
    /// Left child id per node, or [`TREE_LEAF`] for leaves.
    pub children_left: Vec<i64>,
    /// Right child id per node, or [`TREE_LEAF`] for leaves.
    pub children_right: Vec<i64>,
    /// Split feature per node. Undefined (`-2`) at leaves.
    pub feature: Vec<i64>,
    /// Split threshold per node. Undefined (`-2.0`) at leaves.
    pub threshold: Vec<f64>,
    /// Training samples that reached each node.
    pub n_node_samples: Vec<i64>,
}

/// A validated survival tree stored as a node arena.
#[derive(Debug, Clone, PartialEq)]
pub struct SurvivalTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) position: usize,
}

impl SurvivalTree {
    /// Convert exported arrays into a tree arena.
    ///
    /// `position` is the tree's place in the ensemble and is only used to
    /// label errors. `n_features` bounds the split feature indices.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::MalformedTree`] when the arrays are empty or of
    /// unequal length, a split node has a missing or out-of-bounds child, a
    /// split feature is outside `[0, n_features)`, a threshold is non-finite,
    /// or a sample count is negative.
    pub fn from_arrays(
        arrays: &TreeArrays,
        n_features: usize,
        position: usize,
    ) -> Result<Self, ForestError> {
        let n_nodes = arrays.children_left.len();
        if n_nodes == 0 {
            return Err(ForestError::malformed(position, 0, "tree has no nodes"));
        }

        let lengths = [
            ("children_right", arrays.children_right.len()),
            ("feature", arrays.feature.len()),
            ("threshold", arrays.threshold.len()),
            ("n_node_samples", arrays.n_node_samples.len()),
        ];
        for (field, len) in lengths {
            if len != n_nodes {
                return Err(ForestError::malformed(
                    position,
                    0,
                    format!("{field} has {len} entries, children_left has {n_nodes}"),
                ));
            }
        }

        let child = |id: usize, raw: i64, side: &str| -> Result<NodeIndex, ForestError> {
            usize::try_from(raw)
                .ok()
                .filter(|&c| c < n_nodes)
                .map(NodeIndex::new)
                .ok_or_else(|| {
                    ForestError::malformed(
                        position,
                        id,
                        format!("{side} child {raw} is outside [0, {n_nodes})"),
                    )
                })
        };

        let mut nodes = Vec::with_capacity(n_nodes);
        for id in 0..n_nodes {
            let n_samples = usize::try_from(arrays.n_node_samples[id]).map_err(|_| {
                ForestError::malformed(
                    position,
                    id,
                    format!("negative sample count {}", arrays.n_node_samples[id]),
                )
            })?;

            if arrays.children_left[id] == TREE_LEAF {
                nodes.push(Node::Leaf { n_samples });
                continue;
            }

            let left = child(id, arrays.children_left[id], "left")?;
            let right = child(id, arrays.children_right[id], "right")?;

            let raw_feature = arrays.feature[id];
            let feature = usize::try_from(raw_feature)
                .ok()
                .filter(|&f| f < n_features)
                .map(FeatureIndex::new)
                .ok_or_else(|| {
                    ForestError::malformed(
                        position,
                        id,
                        format!("split feature {raw_feature} is outside [0, {n_features})"),
                    )
                })?;

            let threshold = arrays.threshold[id];
            if !threshold.is_finite() {
                return Err(ForestError::malformed(
                    position,
                    id,
                    format!("non-finite threshold {threshold}"),
                ));
            }

            nodes.push(Node::Split {
                feature,
                threshold,
                left,
                right,
                n_samples,
            });
        }

        Ok(Self { nodes, position })
    }

    /// Walk from the root to a leaf and return the leaf's sample count.
    ///
    /// A value equal to a node's threshold routes left, matching the trained
    /// split semantics.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::MalformedTree`] if the walk visits more nodes
    /// than the tree holds (a cycle) or a split references a feature beyond
    /// the end of `features`.
    pub fn evaluate(&self, features: &[f64]) -> Result<usize, ForestError> {
        let mut idx = NodeIndex::ROOT.index();
        for _ in 0..self.nodes.len() {
            match &self.nodes[idx] {
                Node::Leaf { n_samples } => {
                    trace!(tree = self.position, leaf = idx, n_samples, "reached leaf");
                    return Ok(*n_samples);
                }
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    let value = features.get(feature.index()).ok_or_else(|| {
                        ForestError::malformed(
                            self.position,
                            idx,
                            format!(
                                "feature {feature} is outside a vector of length {}",
                                features.len()
                            ),
                        )
                    })?;
                    idx = if *value <= *threshold {
                        left.index()
                    } else {
                        right.index()
                    };
                }
            }
        }
        Err(ForestError::malformed(
            self.position,
            idx,
            format!("no leaf reached within {} steps", self.nodes.len()),
        ))
    }

    /// Return the node arena.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Return the total number of nodes.
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the tree's position in its ensemble.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Return the depth of the deepest leaf reachable from the root
    /// (a lone root leaf has depth 0).
    ///
    /// Exploration stops at `n_nodes` levels, so a cyclic tree reports a
    /// bounded depth instead of looping.
    #[must_use]
    pub fn depth(&self) -> usize {
        let limit = self.nodes.len();
        let mut max_depth = 0;
        let mut stack = vec![(NodeIndex::ROOT, 0usize)];
        while let Some((idx, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            if depth >= limit {
                continue;
            }
            if let Node::Split { left, right, .. } = &self.nodes[idx.index()] {
                stack.push((*left, depth + 1));
                stack.push((*right, depth + 1));
            }
        }
        max_depth
    }
}
