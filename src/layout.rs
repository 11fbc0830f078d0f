pub mod bounds;
mod error;
pub mod hierarchy;
pub mod labels;
pub mod memo;
pub mod pack;
pub mod size;
pub mod solver;
pub(crate) mod types;
pub mod visibility;

pub use bounds::{BoundsItem, ViewTarget, Viewport, calculate_bounds, zoom_to_node};
pub use error::LayoutError;
pub use memo::{LayoutMemo, fingerprint};
pub use types::*;

use serde::Serialize;

use crate::config::{LabelConfig, LayoutConfig};
use crate::ir::CircleRecord;
use hierarchy::build_tree;
use solver::solve;

/// Positioned output of one engine run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackedLayout {
    pub width: f64,
    pub height: f64,
    /// Circles and roles in breadth-first order.
    pub nodes: Vec<PositionedNode>,
    pub warnings: Vec<LayoutWarning>,
    pub passes: usize,
    pub converged: bool,
    pub phantom_count: usize,
}

/// Runs the whole pipeline: hierarchy, weights, packing and phantom
/// refinement. Only an invalid configuration is an error; malformed records
/// are repaired and reported through `warnings`.
pub fn compute_layout(
    records: &[CircleRecord],
    config: &LayoutConfig,
) -> Result<PackedLayout, LayoutError> {
    config.validate()?;
    let (base, warnings) = build_tree(records);
    let solution = solve(&base, config);
    let nodes = positioned_nodes(&solution.tree, &solution.circles);

    Ok(PackedLayout {
        width: config.width,
        height: config.height,
        nodes,
        warnings,
        passes: solution.passes,
        converged: solution.converged,
        phantom_count: solution.phantom_count,
    })
}

fn positioned_nodes(tree: &Tree, circles: &[Circle]) -> Vec<PositionedNode> {
    let depth_offset = usize::from(tree.has_synthetic_root());
    let mut nodes = Vec::new();

    for index in tree.breadth_first() {
        let node = tree.node(index);
        let circle = circles[index];
        match node.kind {
            NodeKind::RealCircle => {
                let parent_id = node
                    .parent
                    .filter(|&parent| tree.node(parent).kind.is_circle())
                    .map(|parent| tree.node(parent).id.clone());
                let role_ids = node
                    .children
                    .iter()
                    .filter(|&&child| tree.node(child).kind == NodeKind::RolesGroup)
                    .flat_map(|&group| tree.node(group).children.iter())
                    .map(|&role| tree.node(role).id.clone())
                    .collect();
                nodes.push(PositionedNode {
                    id: node.id.clone(),
                    kind: OutputKind::Circle,
                    name: node.name.clone(),
                    x: circle.x,
                    y: circle.y,
                    r: circle.r,
                    depth: node.depth.saturating_sub(depth_offset),
                    parent_id,
                    role_ids,
                    status: None,
                });
            }
            NodeKind::RoleLeaf {
                owner_depth,
                status,
            } => {
                let owner = tree
                    .owning_circle(index)
                    .map(|owner| tree.node(owner).id.clone());
                nodes.push(PositionedNode {
                    id: node.id.clone(),
                    kind: OutputKind::Role,
                    name: node.name.clone(),
                    x: circle.x,
                    y: circle.y,
                    r: circle.r,
                    depth: owner_depth.saturating_sub(depth_offset) + 1,
                    parent_id: owner,
                    role_ids: Vec::new(),
                    status: Some(status),
                });
            }
            NodeKind::RolesGroup | NodeKind::PhantomLeaf { .. } | NodeKind::SyntheticRoot => {}
        }
    }
    nodes
}

impl PackedLayout {
    pub fn circles(&self) -> impl Iterator<Item = &PositionedNode> {
        self.nodes.iter().filter(|node| node.is_circle())
    }

    pub fn roles(&self) -> impl Iterator<Item = &PositionedNode> {
        self.nodes.iter().filter(|node| node.is_role())
    }

    pub fn circle(&self, id: &str) -> Option<&PositionedNode> {
        self.circles().find(|node| node.id == id)
    }

    pub fn child_circles<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a PositionedNode> {
        self.circles()
            .filter(move |node| node.parent_id.as_deref() == Some(id))
    }

    /// Roles of `circle_id`, positioned relative to the circle center.
    pub fn packed_roles(&self, circle_id: &str) -> Vec<RoleOffset> {
        let Some(circle) = self.circle(circle_id) else {
            return Vec::new();
        };
        self.roles()
            .filter(|role| role.parent_id.as_deref() == Some(circle_id))
            .map(|role| RoleOffset {
                id: role.id.clone(),
                name: role.name.clone(),
                x: role.x - circle.x,
                y: role.y - circle.y,
                r: role.r,
            })
            .collect()
    }

    /// Name visibility for circle `id` at `zoom`, with `focus` the id of the
    /// focused circle if any. Unknown ids are never visible.
    pub fn circle_name_visible(
        &self,
        id: &str,
        focus: Option<&str>,
        zoom: f64,
        config: &LabelConfig,
    ) -> bool {
        let Some(circle) = self.circle(id) else {
            return false;
        };
        let child_radii: Vec<f64> = self.child_circles(id).map(|child| child.r).collect();
        visibility::circle_name_visible(circle.r, &child_radii, focus == Some(id), zoom, config)
    }

    /// View that fits every circle and role.
    pub fn bounds(&self, viewport: &Viewport, padding: f64) -> ViewTarget {
        let roles: Vec<(Circle, Vec<RoleOffset>)> = self
            .circles()
            .map(|circle| (circle.circle(), self.packed_roles(&circle.id)))
            .collect();
        let items: Vec<BoundsItem<'_>> = roles
            .iter()
            .map(|(circle, roles)| BoundsItem {
                circle: *circle,
                roles,
            })
            .collect();
        calculate_bounds(&items, viewport, padding)
    }

    pub fn zoom_to(&self, id: &str, viewport: &Viewport, zoom_padding: f64) -> Option<ViewTarget> {
        self.circle(id)
            .map(|circle| zoom_to_node(circle.circle(), viewport, zoom_padding))
    }
}
