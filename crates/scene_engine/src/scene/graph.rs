//! Hierarchical scene graph with cached world transforms
//!
//! Nodes live in a slotmap arena and refer to each other by handle:
//! parents own their children logically, children keep a non-owning
//! back-handle for upward walks, and no reference cycles can form at the
//! ownership level. Structural mistakes (attaching a node under its own
//! descendant, re-attaching without detaching) are rejected before the
//! graph is touched.
//!
//! World transforms are cached per node behind a dirty flag. Mutations
//! mark the whole affected subtree dirty; reads recompute only the dirty
//! chain between the nearest clean ancestor and the queried node. A clean
//! flag therefore always implies clean ancestors.

use thiserror::Error;

use crate::foundation::collections::{HandleMap, TypedHandle};
use crate::foundation::math::{Quat, Transform, Vec3};
use crate::render::DrawableToken;

/// Stable handle to a node in a [`SceneGraph`]
pub type NodeId = TypedHandle<SceneNode>;

/// Structural scene graph errors
///
/// These indicate programmer errors in scene construction; the graph is
/// left unchanged when they are returned.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SceneError {
    /// Attaching here would make the graph cyclic
    #[error("cannot attach '{0}': it is an ancestor of the requested parent")]
    Cycle(String),

    /// The child already has a parent
    #[error("node '{0}' is already attached; detach it first")]
    AlreadyAttached(String),

    /// The node has no parent to detach from
    #[error("node '{0}' is not attached to a parent")]
    NotAttached(String),
}

/// A positioned entity in the scene hierarchy, optionally renderable
#[derive(Debug)]
pub struct SceneNode {
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    local: Transform,
    world: Transform,
    dirty: bool,
    drawable: Option<DrawableToken>,
    casts_shadows: bool,
}

impl SceneNode {
    fn new(name: String, local: Transform) -> Self {
        Self {
            name,
            parent: None,
            children: Vec::new(),
            local,
            world: Transform::identity(),
            dirty: true,
            drawable: None,
            casts_shadows: true,
        }
    }

    /// Node name (for diagnostics)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent handle, if attached
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Ordered child handles
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Local transform relative to the parent
    pub fn local_transform(&self) -> &Transform {
        &self.local
    }

    /// Bound render resource, if the node is renderable
    pub fn drawable(&self) -> Option<DrawableToken> {
        self.drawable
    }

    /// Whether this node casts shadows
    pub fn casts_shadows(&self) -> bool {
        self.casts_shadows
    }
}

/// Arena-backed tree of scene nodes
///
/// All lookups index the arena directly: passing a stale or foreign
/// [`NodeId`] is a programmer error and panics.
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: HandleMap<SceneNode>,
}

impl SceneGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detached node with an identity local transform
    pub fn spawn(&mut self, name: impl Into<String>) -> NodeId {
        self.spawn_with(name, Transform::identity())
    }

    /// Create a detached node with the given local transform
    pub fn spawn_with(&mut self, name: impl Into<String>, local: Transform) -> NodeId {
        let name = name.into();
        log::trace!("spawning node '{name}'");
        NodeId::new(self.nodes.insert(SceneNode::new(name, local)))
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether `id` refers to a live node
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id.key())
    }

    /// Borrow a node
    pub fn node(&self, id: NodeId) -> &SceneNode {
        &self.nodes[id.key()]
    }

    /// Whether `ancestor` appears on `node`'s parent chain (or is `node`)
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(id) = cursor {
            if id == ancestor {
                return true;
            }
            cursor = self.nodes[id.key()].parent;
        }
        false
    }

    /// Make `child` the last child of `parent`
    ///
    /// Fails with [`SceneError::AlreadyAttached`] if `child` has a parent
    /// and with [`SceneError::Cycle`] if `child` is an ancestor of
    /// `parent` (or `parent` itself). The subtree under `child` is marked
    /// dirty on success.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        if self.nodes[child.key()].parent.is_some() {
            return Err(SceneError::AlreadyAttached(
                self.nodes[child.key()].name.clone(),
            ));
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(SceneError::Cycle(self.nodes[child.key()].name.clone()));
        }

        self.nodes[parent.key()].children.push(child);
        self.nodes[child.key()].parent = Some(parent);
        self.mark_subtree_dirty(child);
        Ok(())
    }

    /// Detach `node` from its parent, making it a root
    pub fn detach(&mut self, node: NodeId) -> Result<(), SceneError> {
        let Some(parent) = self.nodes[node.key()].parent.take() else {
            return Err(SceneError::NotAttached(self.nodes[node.key()].name.clone()));
        };
        self.nodes[parent.key()].children.retain(|&c| c != node);
        self.mark_subtree_dirty(node);
        Ok(())
    }

    /// Remove `node` and its whole subtree from the graph
    pub fn remove(&mut self, node: NodeId) {
        let _ = self.detach(node);
        let doomed: Vec<NodeId> = self.traverse(node).collect();
        for id in doomed {
            log::trace!("removing node '{}'", self.nodes[id.key()].name);
            self.nodes.remove(id.key());
        }
    }

    /// Partially update a node's local transform
    ///
    /// Components passed as `None` keep their prior value. The node and
    /// its subtree are marked dirty.
    pub fn set_local_transform(
        &mut self,
        id: NodeId,
        position: Option<Vec3>,
        rotation: Option<Quat>,
        scale: Option<Vec3>,
    ) {
        let node = &mut self.nodes[id.key()];
        if let Some(position) = position {
            node.local.position = position;
        }
        if let Some(rotation) = rotation {
            node.local.rotation = rotation;
        }
        if let Some(scale) = scale {
            node.local.scale = scale;
        }
        self.mark_subtree_dirty(id);
    }

    /// Attach a bound render resource to the node
    pub fn set_drawable(&mut self, id: NodeId, drawable: DrawableToken) {
        self.nodes[id.key()].drawable = Some(drawable);
    }

    /// Set whether the node casts shadows
    pub fn set_casts_shadows(&mut self, id: NodeId, casts_shadows: bool) {
        self.nodes[id.key()].casts_shadows = casts_shadows;
    }

    /// Resolve the node's world transform, recomputing it if stale
    ///
    /// Walks up to the nearest clean ancestor, then composes downward,
    /// caching and cleaning every node on the way. Worst case O(depth)
    /// after a mutation, O(1) while nothing changed.
    pub fn world_transform(&mut self, id: NodeId) -> Transform {
        if !self.nodes[id.key()].dirty {
            return self.nodes[id.key()].world.clone();
        }

        let mut chain = vec![id];
        let mut cursor = self.nodes[id.key()].parent;
        while let Some(parent) = cursor {
            let node = &self.nodes[parent.key()];
            if !node.dirty {
                break;
            }
            chain.push(parent);
            cursor = node.parent;
        }

        let mut parent_world = match cursor {
            Some(clean) => self.nodes[clean.key()].world.clone(),
            None => Transform::identity(),
        };
        for link in chain.into_iter().rev() {
            let node = &mut self.nodes[link.key()];
            node.world = parent_world.combine(&node.local);
            node.dirty = false;
            parent_world = node.world.clone();
        }
        parent_world
    }

    /// Lazy pre-order traversal starting at `root`
    ///
    /// Parents are yielded before their children, siblings in attach
    /// order. Each call starts a fresh traversal. The graph must not be
    /// mutated while the iterator is alive (the borrow checker enforces
    /// this).
    pub fn traverse(&self, root: NodeId) -> Traversal<'_> {
        Traversal {
            graph: self,
            stack: vec![root],
        }
    }

    fn mark_subtree_dirty(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let node = &mut self.nodes[current.key()];
            node.dirty = true;
            stack.extend_from_slice(&node.children);
        }
    }
}

/// Pre-order iterator over a subtree, produced by [`SceneGraph::traverse`]
pub struct Traversal<'a> {
    graph: &'a SceneGraph,
    stack: Vec<NodeId>,
}

impl Iterator for Traversal<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        let node = &self.graph.nodes[id.key()];
        self.stack.extend(node.children.iter().rev().copied());
        Some(id)
    }
}
