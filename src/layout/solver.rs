use std::collections::BTreeMap;

use tracing::debug;

use super::pack::pack_tree;
use super::types::{Circle, Node, NodeIndex, NodeKind, Tree};
use crate::config::{LayoutConfig, PackConfig};

/// Phantom weight per circle, keyed by the circle's arena index in the base
/// tree. Phantoms are appended after every base node, so base indices hold
/// across passes.
pub type PhantomPlan = BTreeMap<NodeIndex, f64>;

#[derive(Debug, Clone)]
pub struct Solution {
    /// Annotated tree of the last pass, phantoms included.
    pub tree: Tree,
    /// Packed geometry, indexed like `tree`.
    pub circles: Vec<Circle>,
    pub passes: usize,
    pub converged: bool,
    pub phantom_count: usize,
}

/// Packs `base` and grows undersized circles with phantom leaves until the
/// phantom plan reaches a fixed point or `max_passes` re-packs have run.
///
/// `base` must come straight from `build_tree`; it is cloned and annotated
/// for every pass.
pub fn solve(base: &Tree, config: &LayoutConfig) -> Solution {
    let pack = &config.pack;
    let mut tree = with_phantoms(base, &PhantomPlan::new());
    tree.annotate(&config.size);
    let mut circles = pack_tree(&tree, config.width, config.height, pack.padding);

    let mut plan = PhantomPlan::new();
    let mut refinements = 0;
    let converged = loop {
        let Some(scale) = estimate_scale(&tree, &circles) else {
            debug!(pass = refinements + 1, "no role leaves to estimate scale; skipping phantoms");
            break true;
        };
        let next = plan_phantoms(base, &tree, &circles, &plan, scale, pack);
        debug!(
            pass = refinements + 1,
            scale,
            planned = next.len(),
            "phantom pass"
        );
        if next == plan {
            break true;
        }
        if refinements >= pack.max_passes {
            break false;
        }

        plan = next;
        tree = with_phantoms(base, &plan);
        tree.annotate(&config.size);
        circles = pack_tree(&tree, config.width, config.height, pack.padding);
        refinements += 1;
    };

    Solution {
        tree,
        circles,
        passes: refinements + 1,
        converged,
        phantom_count: plan.len(),
    }
}

/// Median of `r / sqrt(sum)` over role leaves. Every leaf is scaled by the
/// same factor, so any role gives the exact value; the median guards
/// against degenerate samples.
pub fn estimate_scale(tree: &Tree, circles: &[Circle]) -> Option<f64> {
    let mut samples: Vec<f64> = tree
        .nodes()
        .iter()
        .zip(circles)
        .filter(|(node, circle)| {
            node.kind.is_role()
                && node.sum.is_finite()
                && node.sum > 0.0
                && circle.r.is_finite()
                && circle.r > 0.0
        })
        .map(|(node, circle)| circle.r / node.sum.sqrt())
        .collect();
    if samples.is_empty() {
        return None;
    }
    samples.sort_by(f64::total_cmp);
    let mid = samples.len() / 2;
    Some(if samples.len() % 2 == 0 {
        (samples[mid - 1] + samples[mid]) / 2.0
    } else {
        samples[mid]
    })
}

/// Largest packed role radius per circle: roles in the circle's own group,
/// and roles anywhere below it. Indexed like `tree`; zero where none.
pub fn role_maxima(tree: &Tree, circles: &[Circle]) -> (Vec<f64>, Vec<f64>) {
    let mut own = vec![0.0_f64; tree.len()];
    let mut subtree = vec![0.0_f64; tree.len()];
    for (index, node) in tree.nodes().iter().enumerate() {
        if !node.kind.is_role() {
            continue;
        }
        let r = circles[index].r;
        if let Some(owner) = tree.owning_circle(index) {
            own[owner] = own[owner].max(r);
        }
        let mut current = node.parent;
        while let Some(ancestor) = current {
            if tree.node(ancestor).kind.is_circle() {
                subtree[ancestor] = subtree[ancestor].max(r);
            }
            current = tree.node(ancestor).parent;
        }
    }
    (own, subtree)
}

/// Computes the next phantom plan from a packed pass.
///
/// A circle must reach `ratio` times the largest role it contains or sits
/// beside. Plans only grow: a circle keeps its previous phantom once it meets
/// its target, and a new phantom never drops below the previous one.
pub fn plan_phantoms(
    base: &Tree,
    tree: &Tree,
    circles: &[Circle],
    previous: &PhantomPlan,
    scale: f64,
    config: &PackConfig,
) -> PhantomPlan {
    let (own, subtree) = role_maxima(tree, circles);
    let mut plan = PhantomPlan::new();

    for index in 0..base.len() {
        let node = tree.node(index);
        if !node.kind.is_circle() {
            continue;
        }
        let beside = node
            .parent
            .filter(|&parent| tree.node(parent).kind.is_circle())
            .map_or(0.0, |parent| own[parent]);
        let target = beside.max(subtree[index]) * config.circle_to_role_radius_ratio;
        let carried = previous.get(&index).copied();

        if target > 0.0 && circles[index].r < target {
            let radius = (target - config.phantom_margin_px).max(1.0);
            let mut weight = (radius / scale).powi(2);
            if base.node(index).children.is_empty() {
                weight = weight.max(node.value);
            }
            plan.insert(index, carried.map_or(weight, |prev| prev.max(weight)));
        } else if let Some(prev) = carried {
            plan.insert(index, prev);
        }
    }
    plan
}

/// Clones `base` with one phantom leaf appended under every planned circle.
pub fn with_phantoms(base: &Tree, plan: &PhantomPlan) -> Tree {
    let mut tree = base.clone();
    for (&circle, &weight) in plan {
        let owner = tree.node(circle);
        let phantom = Node::new(
            &owner.id,
            "",
            NodeKind::PhantomLeaf { weight },
            Some(circle),
            owner.depth + 1,
        );
        tree.push(phantom);
    }
    tree
}
