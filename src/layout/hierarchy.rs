use std::collections::{HashMap, HashSet};

use tracing::warn;

use super::types::{LayoutWarning, Node, NodeIndex, NodeKind, Tree};
use crate::ir::CircleRecord;

pub const PLACEHOLDER_ID: &str = "organization";
pub const PLACEHOLDER_NAME: &str = "Organization";
/// Never a valid record id, so it cannot shadow a real circle.
const SYNTHETIC_ROOT_ID: &str = "__root__";

/// Rebuilds the circle hierarchy from a flat record list.
///
/// Roles never sit directly under their circle: each circle with roles gets
/// one `RolesGroup` child, appended after its child circles, so the roles
/// pack together instead of scattering among sub-circles.
pub fn build_tree(records: &[CircleRecord]) -> (Tree, Vec<LayoutWarning>) {
    let mut warnings = Vec::new();
    if records.is_empty() {
        warnings.push(LayoutWarning::EmptyInput);
        let root = Node::new(PLACEHOLDER_ID, PLACEHOLDER_NAME, NodeKind::RealCircle, None, 0);
        return (Tree::with_root(root), warnings);
    }

    let mut by_id: HashMap<&str, usize> = HashMap::new();
    let mut unique: Vec<usize> = Vec::with_capacity(records.len());
    for (idx, record) in records.iter().enumerate() {
        if by_id.contains_key(record.id.as_str()) {
            warnings.push(LayoutWarning::DuplicateCircle {
                circle_id: record.id.clone(),
            });
            continue;
        }
        by_id.insert(record.id.as_str(), idx);
        unique.push(idx);
    }

    let mut roots: Vec<usize> = Vec::new();
    let mut children: HashMap<&str, Vec<usize>> = HashMap::new();
    for &idx in &unique {
        let record = &records[idx];
        match record.parent_id.as_deref() {
            None => roots.push(idx),
            Some(parent) if !by_id.contains_key(parent) => {
                warnings.push(LayoutWarning::UnresolvedParent {
                    circle_id: record.id.clone(),
                    parent_id: parent.to_string(),
                });
                roots.push(idx);
            }
            Some(parent) => children.entry(parent).or_default().push(idx),
        }
    }

    // Records never reached from a root sit on a parent cycle. Promote the
    // first of each cycle; descending from it claims the rest.
    let mut reached: HashSet<usize> = HashSet::new();
    for &root in &roots {
        mark_reachable(root, records, &children, &mut reached);
    }
    for &idx in &unique {
        if reached.contains(&idx) {
            continue;
        }
        warnings.push(LayoutWarning::ParentCycle {
            circle_id: records[idx].id.clone(),
        });
        roots.push(idx);
        mark_reachable(idx, records, &children, &mut reached);
    }

    for warning in &warnings {
        warn!(%warning, "circle hierarchy");
    }

    let mut visited: HashSet<usize> = HashSet::new();
    let tree = if roots.len() == 1 {
        let record = &records[roots[0]];
        let mut tree = Tree::with_root(circle_node(record, None, 0));
        visited.insert(roots[0]);
        descend(&mut tree, Tree::ROOT, roots[0], 0, records, &children, &mut visited);
        tree
    } else {
        let mut root = Node::new(
            SYNTHETIC_ROOT_ID,
            PLACEHOLDER_NAME,
            NodeKind::SyntheticRoot,
            None,
            0,
        );
        root.member_count = roots
            .iter()
            .map(|&idx| records[idx].member_count)
            .fold(0u32, u32::saturating_add);
        let mut tree = Tree::with_root(root);
        for &idx in &roots {
            visited.insert(idx);
            let node = tree.push(circle_node(&records[idx], Some(Tree::ROOT), 1));
            descend(&mut tree, node, idx, 1, records, &children, &mut visited);
        }
        tree
    };

    (tree, warnings)
}

fn circle_node(record: &CircleRecord, parent: Option<NodeIndex>, depth: usize) -> Node {
    let mut node = Node::new(&record.id, &record.name, NodeKind::RealCircle, parent, depth);
    node.member_count = record.member_count;
    node.role_count = record.role_count;
    node
}

fn descend(
    tree: &mut Tree,
    node: NodeIndex,
    record_idx: usize,
    depth: usize,
    records: &[CircleRecord],
    children: &HashMap<&str, Vec<usize>>,
    visited: &mut HashSet<usize>,
) {
    let record = &records[record_idx];
    if let Some(child_ids) = children.get(record.id.as_str()) {
        for &child_idx in child_ids {
            if !visited.insert(child_idx) {
                continue;
            }
            let child = tree.push(circle_node(&records[child_idx], Some(node), depth + 1));
            descend(tree, child, child_idx, depth + 1, records, children, visited);
        }
    }

    if record.roles.is_empty() {
        return;
    }
    let group = tree.push(Node::new(
        &record.id,
        "Roles",
        NodeKind::RolesGroup,
        Some(node),
        depth + 1,
    ));
    for role in &record.roles {
        tree.push(Node::new(
            &role.id,
            &role.name,
            NodeKind::RoleLeaf {
                owner_depth: depth,
                status: role.status,
            },
            Some(group),
            depth + 2,
        ));
    }
}

fn mark_reachable(
    start: usize,
    records: &[CircleRecord],
    children: &HashMap<&str, Vec<usize>>,
    reached: &mut HashSet<usize>,
) {
    let mut stack = vec![start];
    while let Some(idx) = stack.pop() {
        if !reached.insert(idx) {
            continue;
        }
        if let Some(child_ids) = children.get(records[idx].id.as_str()) {
            stack.extend(child_ids.iter().copied());
        }
    }
}
