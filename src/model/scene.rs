use crate::utils::Mesh;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub mesh: Mesh,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
    /// Drawn after opaque nodes with alpha blending.
    pub transparent: bool,
    pub visible: bool,
}

impl SceneNode {
    pub fn new(name: impl Into<String>, mesh: Mesh) -> Self {
        Self {
            name: name.into(),
            mesh,
            cast_shadow: false,
            receive_shadow: false,
            transparent: false,
            visible: true,
        }
    }

    pub fn with_shadows(mut self, cast: bool, receive: bool) -> Self {
        self.cast_shadow = cast;
        self.receive_shadow = receive;
        self
    }

    pub fn transparent(mut self) -> Self {
        self.transparent = true;
        self
    }
}

/// Flat, insertion-ordered scene graph. Ids are never reused, so the
/// renderer can cache GPU buffers per id and notice removals.
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: Vec<(NodeId, SceneNode)>,
    next_id: u64,
    generation: u64,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: SceneNode) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.generation += 1;
        tracing::debug!(id = id.0, name = %node.name, "scene node added");
        self.nodes.push((id, node));
        id
    }

    pub fn remove(&mut self, id: NodeId) -> Option<SceneNode> {
        let idx = self.nodes.iter().position(|(nid, _)| *nid == id)?;
        self.generation += 1;
        let (_, node) = self.nodes.remove(idx);
        tracing::debug!(id = id.0, name = %node.name, "scene node removed");
        Some(node)
    }

    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.iter().find(|(nid, _)| *nid == id).map(|(_, n)| n)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.iter_mut().find(|(nid, _)| *nid == id).map(|(_, n)| n)
    }

    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().find(|(_, n)| n.name == name).map(|(id, _)| *id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        self.nodes.iter().map(|(id, n)| (*id, n))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Bumped on every add or remove.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::create_water_mesh;

    #[test]
    fn add_assigns_fresh_ids() {
        let mut scene = SceneGraph::new();
        let a = scene.add(SceneNode::new("a", Mesh::empty()));
        let b = scene.add(SceneNode::new("b", Mesh::empty()));
        assert_ne!(a, b);
        assert_eq!(scene.len(), 2);
        assert_eq!(scene.get(a).map(|n| n.name.as_str()), Some("a"));
    }

    #[test]
    fn remove_returns_node_and_ids_are_not_reused() {
        let mut scene = SceneGraph::new();
        let a = scene.add(SceneNode::new("a", Mesh::empty()));
        assert!(scene.remove(a).is_some());
        assert!(scene.remove(a).is_none());
        let b = scene.add(SceneNode::new("b", Mesh::empty()));
        assert_ne!(a, b);
        assert!(scene.get(a).is_none());
    }

    #[test]
    fn generation_tracks_structure_changes() {
        let mut scene = SceneGraph::new();
        let g0 = scene.generation();
        let id = scene.add(SceneNode::new("water", create_water_mesh(1.0, 0.0, [1.0; 4])));
        assert!(scene.generation() > g0);
        let g1 = scene.generation();
        scene.get_mut(id).unwrap().visible = false;
        assert_eq!(scene.generation(), g1);
        scene.remove(id);
        assert!(scene.generation() > g1);
    }

    #[test]
    fn iteration_keeps_insertion_order() {
        let mut scene = SceneGraph::new();
        for name in ["sky", "land", "water"] {
            scene.add(SceneNode::new(name, Mesh::empty()));
        }
        let names: Vec<_> = scene.iter().map(|(_, n)| n.name.clone()).collect();
        assert_eq!(names, ["sky", "land", "water"]);
        assert_eq!(scene.find_by_name("land"), Some(NodeId(1)));
    }

    #[test]
    fn builders_set_flags() {
        let node = SceneNode::new("n", Mesh::empty()).with_shadows(true, false).transparent();
        assert!(node.cast_shadow);
        assert!(!node.receive_shadow);
        assert!(node.transparent);
        assert!(node.visible);
    }
}
