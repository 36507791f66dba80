//! Scene graph kept in memory (no GPU surface).

use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use crate::domain::{NodeId, Scene, SceneNode};

/// In-memory scene graph
#[derive(Debug, Default)]
pub struct HeadlessScene {
    nodes: Mutex<BTreeMap<NodeId, SceneNode>>,
}

impl HeadlessScene {
    pub fn new() -> Self {
        Self::default()
    }

    fn nodes(&self) -> MutexGuard<'_, BTreeMap<NodeId, SceneNode>> {
        self.nodes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn node(&self, id: NodeId) -> Option<SceneNode> {
        self.nodes().get(&id).cloned()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes().is_empty()
    }
}

impl Scene for HeadlessScene {
    fn attach(&self, node: SceneNode) {
        self.nodes().insert(node.id(), node);
    }

    fn detach(&self, id: NodeId) {
        self.nodes().remove(&id);
    }
}
