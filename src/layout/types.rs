use std::fmt;

use serde::Serialize;

use crate::ir::RoleStatus;

pub type NodeIndex = usize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeKind {
    RealCircle,
    RolesGroup,
    /// `owner_depth` is the tree depth of the circle owning the role, not of
    /// the roles group in between.
    RoleLeaf {
        owner_depth: usize,
        status: RoleStatus,
    },
    PhantomLeaf {
        weight: f64,
    },
    SyntheticRoot,
}

impl NodeKind {
    pub fn is_circle(self) -> bool {
        matches!(self, Self::RealCircle)
    }

    pub fn is_role(self) -> bool {
        matches!(self, Self::RoleLeaf { .. })
    }

    pub fn is_phantom(self) -> bool {
        matches!(self, Self::PhantomLeaf { .. })
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: String,
    pub name: String,
    pub kind: NodeKind,
    pub parent: Option<NodeIndex>,
    pub children: Vec<NodeIndex>,
    pub depth: usize,
    pub member_count: u32,
    pub role_count: u32,
    /// Own weight, written by `Tree::annotate`.
    pub value: f64,
    /// `value` plus the sums of all children.
    pub sum: f64,
}

impl Node {
    pub(crate) fn new(id: &str, name: &str, kind: NodeKind, parent: Option<NodeIndex>, depth: usize) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            parent,
            children: Vec::new(),
            depth,
            member_count: 0,
            role_count: 0,
            value: 0.0,
            sum: 0.0,
        }
    }
}

/// Arena holding the whole hierarchy. Node 0 is always the root.
#[derive(Debug, Clone)]
pub struct Tree {
    pub(crate) nodes: Vec<Node>,
}

impl Tree {
    pub const ROOT: NodeIndex = 0;

    pub(crate) fn with_root(root: Node) -> Self {
        Self { nodes: vec![root] }
    }

    pub(crate) fn push(&mut self, node: Node) -> NodeIndex {
        let index = self.nodes.len();
        if let Some(parent) = node.parent {
            self.nodes[parent].children.push(index);
        }
        self.nodes.push(node);
        index
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, index: NodeIndex) -> &Node {
        &self.nodes[index]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn has_synthetic_root(&self) -> bool {
        matches!(self.nodes[Self::ROOT].kind, NodeKind::SyntheticRoot)
    }

    /// Nearest `RealCircle` strictly above `index`.
    pub fn owning_circle(&self, index: NodeIndex) -> Option<NodeIndex> {
        let mut current = self.nodes[index].parent;
        while let Some(candidate) = current {
            if self.nodes[candidate].kind.is_circle() {
                return Some(candidate);
            }
            current = self.nodes[candidate].parent;
        }
        None
    }

    /// Parents before children; siblings in child-list order.
    pub fn pre_order(&self) -> Vec<NodeIndex> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![Self::ROOT];
        while let Some(index) = stack.pop() {
            order.push(index);
            for &child in self.nodes[index].children.iter().rev() {
                stack.push(child);
            }
        }
        order
    }

    /// Children before parents. Matches the classic stack-based traversal
    /// where the last child of a node is visited first.
    pub fn post_order(&self) -> Vec<NodeIndex> {
        let mut visit = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![Self::ROOT];
        while let Some(index) = stack.pop() {
            visit.push(index);
            stack.extend(self.nodes[index].children.iter().copied());
        }
        visit.reverse();
        visit
    }

    pub fn breadth_first(&self) -> Vec<NodeIndex> {
        let mut order = Vec::with_capacity(self.nodes.len());
        order.push(Self::ROOT);
        let mut cursor = 0;
        while cursor < order.len() {
            let index = order[cursor];
            order.extend(self.nodes[index].children.iter().copied());
            cursor += 1;
        }
        order
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Circle {
    pub x: f64,
    pub y: f64,
    pub r: f64,
}

impl Circle {
    pub fn new(x: f64, y: f64, r: f64) -> Self {
        Self { x, y, r }
    }

    pub fn distance_to(&self, other: &Circle) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Circle,
    Role,
}

/// A circle or role ready for rendering. Bookkeeping nodes never appear here.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionedNode {
    pub id: String,
    pub kind: OutputKind,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub r: f64,
    pub depth: usize,
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub role_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RoleStatus>,
}

impl PositionedNode {
    pub fn is_circle(&self) -> bool {
        self.kind == OutputKind::Circle
    }

    pub fn is_role(&self) -> bool {
        self.kind == OutputKind::Role
    }

    pub fn circle(&self) -> Circle {
        Circle::new(self.x, self.y, self.r)
    }
}

/// Role geometry relative to the center of its owning circle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleOffset {
    pub id: String,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub r: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LayoutWarning {
    UnresolvedParent { circle_id: String, parent_id: String },
    DuplicateCircle { circle_id: String },
    ParentCycle { circle_id: String },
    EmptyInput,
}

impl fmt::Display for LayoutWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnresolvedParent {
                circle_id,
                parent_id,
            } => write!(
                f,
                "circle `{circle_id}` references unknown parent `{parent_id}`; placed at top level"
            ),
            Self::DuplicateCircle { circle_id } => {
                write!(f, "duplicate circle id `{circle_id}`; later record ignored")
            }
            Self::ParentCycle { circle_id } => write!(
                f,
                "circle `{circle_id}` is part of a parent cycle; placed at top level"
            ),
            Self::EmptyInput => write!(f, "no circles supplied; using placeholder root"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> Tree {
        // root -> (a -> (c), b)
        let mut tree = Tree::with_root(Node::new("root", "Root", NodeKind::RealCircle, None, 0));
        let a = tree.push(Node::new("a", "A", NodeKind::RealCircle, Some(Tree::ROOT), 1));
        tree.push(Node::new("b", "B", NodeKind::RealCircle, Some(Tree::ROOT), 1));
        tree.push(Node::new("c", "C", NodeKind::RealCircle, Some(a), 2));
        tree
    }

    fn ids(tree: &Tree, order: &[NodeIndex]) -> Vec<String> {
        order.iter().map(|&i| tree.node(i).id.clone()).collect()
    }

    #[test]
    fn traversal_orders() {
        let tree = sample_tree();
        assert_eq!(ids(&tree, &tree.pre_order()), ["root", "a", "c", "b"]);
        assert_eq!(ids(&tree, &tree.breadth_first()), ["root", "a", "b", "c"]);
        let post = ids(&tree, &tree.post_order());
        assert_eq!(post.last().map(String::as_str), Some("root"));
        let pos = |id: &str| post.iter().position(|p| p == id).unwrap();
        assert!(pos("c") < pos("a"));
    }

    #[test]
    fn owning_circle_skips_groups() {
        let mut tree = sample_tree();
        let group = tree.push(Node::new("b", "Roles", NodeKind::RolesGroup, Some(1), 2));
        let role = tree.push(Node::new(
            "r1",
            "Lead",
            NodeKind::RoleLeaf {
                owner_depth: 1,
                status: RoleStatus::Active,
            },
            Some(group),
            3,
        ));
        assert_eq!(tree.owning_circle(role), Some(1));
        assert_eq!(tree.owning_circle(Tree::ROOT), None);
    }

    #[test]
    fn warning_messages() {
        let warning = LayoutWarning::UnresolvedParent {
            circle_id: "x".to_string(),
            parent_id: "ghost".to_string(),
        };
        assert!(warning.to_string().contains("ghost"));
    }
}
