use super::types::{NodeIndex, NodeKind, Tree};
use crate::config::SizeConfig;

/// Pre-pack weight of a single node. Only leaves turn weight into radius;
/// for containers the value influences sibling ordering alone.
pub fn node_value(tree: &Tree, index: NodeIndex, config: &SizeConfig) -> f64 {
    let node = tree.node(index);
    let raw = match node.kind {
        NodeKind::RolesGroup | NodeKind::SyntheticRoot => return 0.0,
        NodeKind::PhantomLeaf { weight } => weight.max(0.0),
        NodeKind::RoleLeaf { owner_depth, .. } => {
            let depth = if tree.has_synthetic_root() {
                owner_depth.saturating_sub(1)
            } else {
                owner_depth
            };
            role_value(depth, config)
        }
        NodeKind::RealCircle => {
            // Phantoms are padding, not content.
            let encloses = node.role_count > 0
                || node
                    .children
                    .iter()
                    .any(|&child| !tree.node(child).kind.is_phantom());
            circle_value(node.depth, node.member_count, node.role_count, encloses, config)
        }
    };
    clamp_weight(raw, config)
}

pub fn role_value(owner_depth: usize, config: &SizeConfig) -> f64 {
    match config.role_values.len() {
        0 => config.min_value,
        len => config.role_values[owner_depth.min(len - 1)],
    }
}

pub fn circle_value(
    depth: usize,
    member_count: u32,
    role_count: u32,
    encloses: bool,
    config: &SizeConfig,
) -> f64 {
    let member_size = (f64::from(member_count) + 1.0).log2() * config.member_weight;
    let role_size = (f64::from(role_count) + 1.0).log2() * config.role_count_weight;
    let base = config.circle_base + member_size + role_size;
    let mut value = base * config.depth_decay.powi(depth.min(i32::MAX as usize) as i32);

    if encloses {
        // Compare against the roles the circle sits beside, one level up.
        let parent_role = role_value(depth.saturating_sub(1), config);
        value = value.max(parent_role * config.enclosure_ratio);
    }
    value.max(config.min_value)
}

fn clamp_weight(value: f64, config: &SizeConfig) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        config.min_value
    }
}

impl Tree {
    /// Writes `value` and `sum` for every node and orders each child list by
    /// descending `sum`. Equal sums keep insertion order.
    pub fn annotate(&mut self, config: &SizeConfig) {
        for index in 0..self.nodes.len() {
            let value = node_value(self, index, config);
            self.nodes[index].value = value;
        }
        for index in self.post_order() {
            let children_sum: f64 = self.nodes[index]
                .children
                .iter()
                .map(|&child| self.nodes[child].sum)
                .sum();
            let node = &mut self.nodes[index];
            node.sum = node.value + children_sum;
        }
        for index in 0..self.nodes.len() {
            let mut children = std::mem::take(&mut self.nodes[index].children);
            children.sort_by(|&a, &b| self.nodes[b].sum.total_cmp(&self.nodes[a].sum));
            self.nodes[index].children = children;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::CircleRecord;
    use crate::layout::hierarchy::build_tree;
    use crate::layout::types::Node;

    fn find(tree: &Tree, id: &str, role: bool) -> NodeIndex {
        tree.nodes()
            .iter()
            .position(|n| n.id == id && n.kind.is_role() == role)
            .expect("node present")
    }

    #[test]
    fn roles_group_has_no_weight_of_its_own() {
        let records = vec![CircleRecord::new("a", "A").with_role("r", "Lead")];
        let (mut tree, _) = build_tree(&records);
        tree.annotate(&SizeConfig::default());
        let group = tree.node(Tree::ROOT).children[0];
        assert_eq!(tree.node(group).value, 0.0);
        assert_eq!(tree.node(group).sum, 2250.0);
    }

    #[test]
    fn role_values_decay_with_owner_depth() {
        let config = SizeConfig::default();
        let values: Vec<f64> = (0..6).map(|d| role_value(d, &config)).collect();
        assert_eq!(values, vec![2250.0, 500.0, 100.0, 35.0, 35.0, 35.0]);
        for pair in values.windows(2) {
            assert!(pair[0] >= pair[1]);
        }
    }

    #[test]
    fn synthetic_root_does_not_shift_role_sizes() {
        let records = vec![
            CircleRecord::new("a", "A").with_role("ra", "Lead"),
            CircleRecord::new("b", "B").with_role("rb", "Lead"),
        ];
        let (tree, _) = build_tree(&records);
        let config = SizeConfig::default();
        assert!(tree.has_synthetic_root());
        assert_eq!(node_value(&tree, find(&tree, "ra", true), &config), 2250.0);
    }

    #[test]
    fn circle_value_halves_per_level() {
        let config = SizeConfig {
            min_value: 1.0,
            ..SizeConfig::default()
        };
        let top = circle_value(0, 0, 0, false, &config);
        let child = circle_value(1, 0, 0, false, &config);
        let grandchild = circle_value(2, 0, 0, false, &config);
        assert_eq!(top, 100.0);
        assert_eq!(child, 50.0);
        assert_eq!(grandchild, 25.0);
    }

    #[test]
    fn member_and_role_counts_grow_logarithmically() {
        let config = SizeConfig::default();
        // 100 + log2(4) * 20 + log2(2) * 15
        let value = circle_value(0, 3, 1, false, &config);
        assert!((value - 155.0).abs() < 1e-9);
    }

    #[test]
    fn enclosure_boost_uses_parent_level_roles() {
        let config = SizeConfig::default();
        assert_eq!(circle_value(0, 0, 0, true, &config), 2250.0 * 5.0);
        assert_eq!(circle_value(1, 0, 0, true, &config), 2250.0 * 5.0);
        assert_eq!(circle_value(2, 0, 0, true, &config), 500.0 * 5.0);
    }

    #[test]
    fn floor_applies_to_deep_leaf_circles() {
        let config = SizeConfig::default();
        assert_eq!(circle_value(6, 0, 0, false, &config), 20.0);
    }

    #[test]
    fn phantom_weight_is_clamped() {
        let config = SizeConfig::default();
        let mut tree = Tree::with_root(Node::new("a", "A", NodeKind::RealCircle, None, 0));
        let neg = tree.push(Node::new("a", "", NodeKind::PhantomLeaf { weight: -4.0 }, Some(0), 1));
        let nan = tree.push(Node::new("a", "", NodeKind::PhantomLeaf { weight: f64::NAN }, Some(0), 1));
        let ok = tree.push(Node::new("a", "", NodeKind::PhantomLeaf { weight: 900.0 }, Some(0), 1));
        assert_eq!(node_value(&tree, neg, &config), 20.0);
        assert_eq!(node_value(&tree, nan, &config), 20.0);
        assert_eq!(node_value(&tree, ok, &config), 900.0);
    }

    #[test]
    fn phantom_child_does_not_trigger_enclosure_boost() {
        let config = SizeConfig::default();
        let mut tree = Tree::with_root(Node::new("a", "A", NodeKind::RealCircle, None, 0));
        let bare = node_value(&tree, Tree::ROOT, &config);
        tree.push(Node::new("a", "", NodeKind::PhantomLeaf { weight: 50.0 }, Some(0), 1));
        assert_eq!(node_value(&tree, Tree::ROOT, &config), bare);
        assert_eq!(bare, 100.0);
    }

    #[test]
    fn annotate_sorts_children_by_sum() {
        let records = vec![
            CircleRecord::new("a", "A"),
            CircleRecord::new("small", "Small").with_parent("a"),
            CircleRecord::new("big", "Big")
                .with_parent("a")
                .with_role("r1", "One")
                .with_role("r2", "Two"),
        ];
        let (mut tree, _) = build_tree(&records);
        tree.annotate(&SizeConfig::default());
        let first = tree.node(Tree::ROOT).children[0];
        assert_eq!(tree.node(first).id, "big");
        let root = tree.node(Tree::ROOT);
        let expected: f64 = root.value + root.children.iter().map(|&c| tree.node(c).sum).sum::<f64>();
        assert!((root.sum - expected).abs() < 1e-9);
    }
}
