//! Frame driver for a hierarchy of animator nodes.
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. A node can only
//! be added under a parent that already exists, so arena order is always a
//! valid parent-before-child order and the hierarchy cannot contain cycles.
//!
//! [`TransformTree::update_tree`] walks the arena once per frame:
//!
//! 1. Each node folds its own channel changes into `has_local_updates`.
//! 2. A node with either flag set rebuilds its outputs against its parent's
//!    global transform, which was resolved earlier in the same pass.
//! 3. A node that rebuilt marks every child upstream-dirty before the child
//!    is visited.
//!
//! Once every node has been visited all flags are cleared.

use std::collections::HashMap;
use std::fmt;

use glam::Mat4;
use lottie_data::model::{Layer, LottieJson};
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::error::{AnimatorError, Result};
use crate::node::{AnimatorNode, LayerTransformNode};
use crate::property::PropertyValue;
use crate::transform::TransformDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What one [`TransformTree::update_tree`] pass did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateReport {
    pub frame: f32,
    /// Nodes whose outputs were rebuilt, in evaluation order.
    pub rebuilt: Vec<NodeId>,
}

/// Per-node outputs for the consumer side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeOutput {
    pub node: NodeId,
    pub opacity: f32,
    /// Column-major 4x4 matrix.
    pub global_transform: [f32; 16],
}

#[derive(Debug, Default)]
pub struct TransformTree {
    nodes: Vec<AnimatorNode>,
    children: Vec<Vec<NodeId>>,
}

impl TransformTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn add_node(
        &mut self,
        transform: &TransformDescriptor,
        parent: Option<NodeId>,
    ) -> Result<NodeId> {
        if let Some(parent) = parent {
            self.check(parent)?;
        }

        let id = NodeId(self.nodes.len() as u32);
        self.nodes
            .push(AnimatorNode::Transform(LayerTransformNode::new(transform, parent)));
        self.children.push(Vec::new());
        if let Some(parent) = parent {
            self.children[parent.index()].push(id);
        }
        Ok(id)
    }

    /// Builds one node per layer. Returns the tree plus the node for each
    /// input layer, in input order.
    ///
    /// Layers may appear before their parents. A parent index that matches
    /// no layer leaves the layer at the root.
    pub fn from_layers(layers: &[Layer]) -> Result<(Self, Vec<NodeId>)> {
        let mut by_index = HashMap::new();
        for (pos, layer) in layers.iter().enumerate() {
            if let Some(ind) = layer.ind {
                if by_index.insert(ind, pos).is_some() {
                    return Err(AnimatorError::DuplicateLayerIndex(ind));
                }
            }
        }

        let mut builder = LayerTreeBuilder {
            layers,
            by_index,
            state: vec![Visit::Pending; layers.len()],
            tree: TransformTree::new(),
        };
        let mut nodes = Vec::with_capacity(layers.len());
        for pos in 0..layers.len() {
            nodes.push(builder.insert(pos)?);
        }

        debug!(layers = layers.len(), "built transform tree");
        Ok((builder.tree, nodes))
    }

    /// Parses a document and builds the tree for its top-level layers.
    pub fn from_json(json: &str) -> Result<(Self, Vec<NodeId>)> {
        let composition: LottieJson = serde_json::from_str(json)?;
        Self::from_layers(&composition.layers)
    }

    /// Evaluates every node for `frame`. `force` rebuilds all nodes even when
    /// nothing changed.
    pub fn update_tree(&mut self, frame: f32, force: bool) -> UpdateReport {
        let mut rebuilt = Vec::new();

        for idx in 0..self.nodes.len() {
            let parent_global = self.nodes[idx]
                .parent()
                .map(|parent| self.nodes[parent.index()].global_transform());

            let node = &mut self.nodes[idx];
            if !node.update_contents(frame, force) {
                continue;
            }
            node.rebuild_outputs(frame, parent_global);
            rebuilt.push(NodeId(idx as u32));
            trace!(node = idx, frame, "rebuilt node outputs");

            for child in &self.children[idx] {
                self.nodes[child.index()].mark_upstream_updates();
            }
        }

        for node in &mut self.nodes {
            node.clear_updates();
        }

        debug!(frame, rebuilt = rebuilt.len(), "updated transform tree");
        UpdateReport { frame, rebuilt }
    }

    /// Flags a node whose channels were changed from outside; the next
    /// [`update_tree`](Self::update_tree) rebuilds it and its descendants.
    pub fn mark_local_dirty(&mut self, id: NodeId) -> Result<()> {
        self.check(id)?;
        self.nodes[id.index()].mark_local_updates();
        Ok(())
    }

    pub fn set_enabled(&mut self, id: NodeId, enabled: bool) -> Result<()> {
        self.transform_node_mut(id)?.set_enabled(enabled);
        Ok(())
    }

    /// Pins the channel at `keypath` on node `id` to a fixed value.
    pub fn override_property(
        &mut self,
        id: NodeId,
        keypath: &str,
        value: PropertyValue,
    ) -> Result<()> {
        let node = self.transform_node_mut(id)?;
        node.properties_mut().set_value(keypath, value)?;
        node.mark_local_updates();
        debug!(node = %id, keypath, "overrode transform property");
        Ok(())
    }

    pub fn node(&self, id: NodeId) -> Option<&AnimatorNode> {
        self.nodes.get(id.index())
    }

    pub fn transform_node(&self, id: NodeId) -> Result<&LayerTransformNode> {
        self.node(id)
            .and_then(AnimatorNode::as_transform)
            .ok_or(AnimatorError::UnknownNode(id))
    }

    fn transform_node_mut(&mut self, id: NodeId) -> Result<&mut LayerTransformNode> {
        self.nodes
            .get_mut(id.index())
            .and_then(AnimatorNode::as_transform_mut)
            .ok_or(AnimatorError::UnknownNode(id))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(AnimatorNode::parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.children
            .get(id.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn opacity(&self, id: NodeId) -> Result<f32> {
        Ok(self.transform_node(id)?.opacity())
    }

    pub fn local_transform(&self, id: NodeId) -> Result<Mat4> {
        Ok(self.transform_node(id)?.local_transform())
    }

    pub fn global_transform(&self, id: NodeId) -> Result<Mat4> {
        Ok(self.transform_node(id)?.global_transform())
    }

    /// Current outputs of every node, in arena order.
    pub fn outputs(&self) -> Vec<NodeOutput> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(idx, node)| {
                let node = node.as_transform()?;
                Some(NodeOutput {
                    node: NodeId(idx as u32),
                    opacity: node.opacity(),
                    global_transform: node.global_transform().to_cols_array(),
                })
            })
            .collect()
    }

    fn check(&self, id: NodeId) -> Result<()> {
        if id.index() < self.nodes.len() {
            Ok(())
        } else {
            Err(AnimatorError::UnknownNode(id))
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Visit {
    Pending,
    InProgress,
    Done(NodeId),
}

struct LayerTreeBuilder<'a> {
    layers: &'a [Layer],
    by_index: HashMap<u32, usize>,
    state: Vec<Visit>,
    tree: TransformTree,
}

impl LayerTreeBuilder<'_> {
    fn insert(&mut self, pos: usize) -> Result<NodeId> {
        match self.state[pos] {
            Visit::Done(id) => return Ok(id),
            Visit::InProgress => {
                return Err(AnimatorError::ParentCycle(
                    self.layers[pos].ind.unwrap_or_default(),
                ))
            }
            Visit::Pending => {}
        }
        self.state[pos] = Visit::InProgress;

        let layers = self.layers;
        let layer = &layers[pos];
        let parent = match layer.parent {
            Some(parent_ind) => match self.by_index.get(&parent_ind).copied() {
                Some(parent_pos) => Some(self.insert(parent_pos)?),
                None => {
                    warn!(
                        layer = layer.nm.as_deref().unwrap_or("unnamed"),
                        parent = parent_ind,
                        "parent layer not found, treating layer as root"
                    );
                    None
                }
            },
            None => None,
        };

        let id = self
            .tree
            .add_node(&TransformDescriptor::from(&layer.ks), parent)?;
        self.state[pos] = Visit::Done(id);
        Ok(id)
    }
}
