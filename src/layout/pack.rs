//! Hierarchical circle packing.
//!
//! Siblings are packed with a front-chain placement: every new circle is
//! placed tangent to a pair of circles on the chain, the chain is walked in
//! both directions for intersections, and the pair closest to the centroid is
//! chosen for the next placement. Each parent then takes the smallest circle
//! enclosing its children, found with an incremental basis of at most three
//! circles.

use tracing::warn;

use super::types::{Circle, NodeIndex, Tree};

/// Linear congruential generator with the constants of Numerical Recipes.
/// The seed is fixed so that packing is reproducible.
#[derive(Debug, Clone)]
pub struct Lcg {
    state: u64,
}

impl Lcg {
    const A: u64 = 1_664_525;
    const C: u64 = 1_013_904_223;
    const M: u64 = 1 << 32;

    pub fn new() -> Self {
        Self { state: 1 }
    }

    /// Uniform in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.state = (Self::A * self.state + Self::C) % Self::M;
        self.state as f64 / Self::M as f64
    }
}

impl Default for Lcg {
    fn default() -> Self {
        Self::new()
    }
}

fn shuffle(circles: &mut [Circle], random: &mut Lcg) {
    let mut m = circles.len();
    while m > 0 {
        let i = (random.next_f64() * m as f64) as usize;
        m -= 1;
        circles.swap(m, i.min(m));
    }
}

/// Packs `circles` in place around the origin, keeping their radii, and
/// returns the radius of the enclosing circle. The enclosing circle is
/// centered on the origin afterwards.
pub fn pack_siblings(circles: &mut [Circle], random: &mut Lcg) -> f64 {
    let n = circles.len();
    if n == 0 {
        return 0.0;
    }

    circles[0].x = 0.0;
    circles[0].y = 0.0;
    if n == 1 {
        return circles[0].r;
    }

    circles[0].x = -circles[1].r;
    circles[1].x = circles[0].r;
    circles[1].y = 0.0;
    if n == 2 {
        return circles[0].r + circles[1].r;
    }

    circles[2] = place(circles[1], circles[0], circles[2]);

    // Front chain as a doubly linked ring over circle indices.
    let mut next = vec![0usize; n];
    let mut prev = vec![0usize; n];
    next[0] = 1;
    prev[2] = 1;
    next[1] = 2;
    prev[0] = 2;
    next[2] = 0;
    prev[1] = 0;

    let mut a = 0usize;
    let mut b = 1usize;
    let mut i = 3usize;
    'pack: while i < n {
        circles[i] = place(circles[a], circles[b], circles[i]);
        let c = i;

        let mut j = next[b];
        let mut k = prev[a];
        let mut sj = circles[b].r;
        let mut sk = circles[a].r;
        loop {
            if sj <= sk {
                if intersects(&circles[j], &circles[c]) {
                    b = j;
                    next[a] = b;
                    prev[b] = a;
                    continue 'pack;
                }
                sj += circles[j].r;
                j = next[j];
            } else {
                if intersects(&circles[k], &circles[c]) {
                    a = k;
                    next[a] = b;
                    prev[b] = a;
                    continue 'pack;
                }
                sk += circles[k].r;
                k = prev[k];
            }
            if j == next[k] {
                break;
            }
        }

        prev[c] = a;
        next[c] = b;
        next[a] = c;
        prev[b] = c;
        b = c;

        let mut best = score(circles, &next, a);
        let mut cursor = next[c];
        while cursor != b {
            let candidate = score(circles, &next, cursor);
            if candidate < best {
                a = cursor;
                best = candidate;
            }
            cursor = next[cursor];
        }
        b = next[a];
        i += 1;
    }

    let mut chain = vec![circles[b]];
    let mut cursor = next[b];
    while cursor != b {
        chain.push(circles[cursor]);
        cursor = next[cursor];
    }
    let enclosing = enclose(&chain, random).unwrap_or_else(|| {
        warn!(circles = n, "enclosing circle did not converge; using centroid bound");
        enclose_fallback(circles)
    });

    for circle in circles.iter_mut() {
        circle.x -= enclosing.x;
        circle.y -= enclosing.y;
    }
    enclosing.r
}

/// Positions `c` tangent to both `a` and `b`.
fn place(b: Circle, a: Circle, mut c: Circle) -> Circle {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let d2 = dx * dx + dy * dy;
    if d2 > 0.0 {
        let a2 = (a.r + c.r) * (a.r + c.r);
        let b2 = (b.r + c.r) * (b.r + c.r);
        if a2 > b2 {
            let x = (d2 + b2 - a2) / (2.0 * d2);
            let y = (b2 / d2 - x * x).max(0.0).sqrt();
            c.x = b.x - x * dx - y * dy;
            c.y = b.y - x * dy + y * dx;
        } else {
            let x = (d2 + a2 - b2) / (2.0 * d2);
            let y = (a2 / d2 - x * x).max(0.0).sqrt();
            c.x = a.x + x * dx - y * dy;
            c.y = a.y + x * dy + y * dx;
        }
    } else {
        c.x = a.x + c.r;
        c.y = a.y;
    }
    c
}

fn intersects(a: &Circle, b: &Circle) -> bool {
    let dr = a.r + b.r - 1e-6;
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    dr > 0.0 && dr * dr > dx * dx + dy * dy
}

/// Squared distance from the origin to the weighted midpoint of a chain link.
fn score(circles: &[Circle], next: &[usize], node: usize) -> f64 {
    let a = circles[node];
    let b = circles[next[node]];
    let ab = a.r + b.r;
    let dx = (a.x * b.r + b.x * a.r) / ab;
    let dy = (a.y * b.r + b.y * a.r) / ab;
    dx * dx + dy * dy
}

/// Smallest circle enclosing every circle in `circles`. Returns `None` for an
/// empty slice or when floating point error defeats the basis search.
pub fn enclose(circles: &[Circle], random: &mut Lcg) -> Option<Circle> {
    let mut order = circles.to_vec();
    shuffle(&mut order, random);

    let mut basis: Vec<Circle> = Vec::new();
    let mut enclosing: Option<Circle> = None;
    let mut i = 0;
    while i < order.len() {
        let p = order[i];
        match enclosing {
            Some(e) if encloses_weak(&e, &p) => i += 1,
            _ => {
                basis = extend_basis(&basis, p)?;
                enclosing = Some(enclose_basis(&basis));
                i = 0;
            }
        }
    }
    enclosing
}

fn enclose_fallback(circles: &[Circle]) -> Circle {
    let n = circles.len().max(1) as f64;
    let cx = circles.iter().map(|c| c.x).sum::<f64>() / n;
    let cy = circles.iter().map(|c| c.y).sum::<f64>() / n;
    let center = Circle::new(cx, cy, 0.0);
    let r = circles
        .iter()
        .map(|c| center.distance_to(c) + c.r)
        .fold(0.0, f64::max);
    Circle::new(cx, cy, r)
}

fn extend_basis(basis: &[Circle], p: Circle) -> Option<Vec<Circle>> {
    if encloses_weak_all(&p, basis) {
        return Some(vec![p]);
    }

    for &b in basis {
        if encloses_not(&p, &b) && encloses_weak_all(&enclose_basis2(&b, &p), basis) {
            return Some(vec![b, p]);
        }
    }

    for i in 0..basis.len().saturating_sub(1) {
        for j in (i + 1)..basis.len() {
            let (bi, bj) = (basis[i], basis[j]);
            if encloses_not(&enclose_basis2(&bi, &bj), &p)
                && encloses_not(&enclose_basis2(&bi, &p), &bj)
                && encloses_not(&enclose_basis2(&bj, &p), &bi)
                && encloses_weak_all(&enclose_basis3(&bi, &bj, &p), basis)
            {
                return Some(vec![bi, bj, p]);
            }
        }
    }

    None
}

fn encloses_not(a: &Circle, b: &Circle) -> bool {
    let dr = a.r - b.r;
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    dr < 0.0 || dr * dr < dx * dx + dy * dy
}

fn encloses_weak(a: &Circle, b: &Circle) -> bool {
    let dr = a.r - b.r + a.r.max(b.r).max(1.0) * 1e-9;
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    dr > 0.0 && dr * dr > dx * dx + dy * dy
}

fn encloses_weak_all(a: &Circle, basis: &[Circle]) -> bool {
    basis.iter().all(|b| encloses_weak(a, b))
}

fn enclose_basis(basis: &[Circle]) -> Circle {
    match basis {
        [a] => *a,
        [a, b] => enclose_basis2(a, b),
        [a, b, c] => enclose_basis3(a, b, c),
        _ => enclose_fallback(basis),
    }
}

fn enclose_basis2(a: &Circle, b: &Circle) -> Circle {
    let x21 = b.x - a.x;
    let y21 = b.y - a.y;
    let r21 = b.r - a.r;
    let l = (x21 * x21 + y21 * y21).sqrt();
    Circle::new(
        (a.x + b.x + x21 / l * r21) / 2.0,
        (a.y + b.y + y21 / l * r21) / 2.0,
        (l + a.r + b.r) / 2.0,
    )
}

fn enclose_basis3(a: &Circle, b: &Circle, c: &Circle) -> Circle {
    let (x1, y1, r1) = (a.x, a.y, a.r);
    let (x2, y2, r2) = (b.x, b.y, b.r);
    let (x3, y3, r3) = (c.x, c.y, c.r);
    let a2 = x1 - x2;
    let a3 = x1 - x3;
    let b2 = y1 - y2;
    let b3 = y1 - y3;
    let c2 = r2 - r1;
    let c3 = r3 - r1;
    let d1 = x1 * x1 + y1 * y1 - r1 * r1;
    let d2 = d1 - x2 * x2 - y2 * y2 + r2 * r2;
    let d3 = d1 - x3 * x3 - y3 * y3 + r3 * r3;
    let ab = a3 * b2 - a2 * b3;
    let xa = (b2 * d3 - b3 * d2) / (ab * 2.0) - x1;
    let xb = (b3 * c2 - b2 * c3) / ab;
    let ya = (a3 * d2 - a2 * d3) / (ab * 2.0) - y1;
    let yb = (a2 * c3 - a3 * c2) / ab;
    let qa = xb * xb + yb * yb - 1.0;
    let qb = 2.0 * (r1 + xa * xb + ya * yb);
    let qc = xa * xa + ya * ya - r1 * r1;
    let r = -(if qa.abs() > 1e-6 {
        (qb + (qb * qb - 4.0 * qa * qc).sqrt()) / (2.0 * qa)
    } else {
        qc / qb
    });
    Circle::new(x1 + xa + xb * r, y1 + ya + yb * r, r)
}

/// Rounds allowed for the padding inflation to settle.
const PADDING_ROUNDS: usize = 16;

/// Packs an annotated tree into a `width` x `height` box. Returns one circle
/// per arena slot, in absolute coordinates.
///
/// Padding is reserved by inflating every child by `inflate` before packing
/// its siblings and growing the parent by the same amount. Once scaled to the
/// viewport the gap around each child is `inflate * min_side / root_r`, and
/// the root itself grows with `inflate`, so the inflation is raised until
/// that gap reaches `padding` at the final root radius.
pub fn pack_tree(tree: &Tree, width: f64, height: f64, padding: f64) -> Vec<Circle> {
    if tree.is_empty() {
        return Vec::new();
    }
    let mut circles = vec![Circle::default(); tree.len()];
    let mut random = Lcg::new();

    for (index, node) in tree.nodes().iter().enumerate() {
        if node.children.is_empty() {
            circles[index].r = node.sum.max(0.0).sqrt();
        }
    }

    let post_order = tree.post_order();
    for &index in &post_order {
        pack_children(tree, index, &mut circles, 0.0, &mut random);
    }

    let min_side = width.min(height);
    let mut sample = (0.0, padding * circles[Tree::ROOT].r / min_side);
    let mut inflate = sample.1;
    if inflate.is_finite() && inflate > 0.0 {
        let mut rounds = 0;
        loop {
            for &index in &post_order {
                pack_children(tree, index, &mut circles, inflate, &mut random);
            }
            rounds += 1;

            let needed = padding * circles[Tree::ROOT].r / min_side;
            if inflate >= needed || !needed.is_finite() {
                break;
            }
            if rounds == PADDING_ROUNDS {
                warn!(padding, inflate, needed, "padding could not be fully reserved");
                break;
            }
            // Root radius grows roughly linearly with the inflation; aim at
            // the fixed point of the line through the last two rounds.
            let slope = (needed - sample.1) / (inflate - sample.0);
            let next = if slope.is_finite() && (0.0..0.9).contains(&slope) {
                (needed - slope * inflate) / (1.0 - slope) * 1.001
            } else {
                2.0 * needed - inflate
            };
            sample = (inflate, needed);
            inflate = next.max(needed);
        }
    }

    let root_r = circles[Tree::ROOT].r;
    let scale = if root_r > 0.0 && root_r.is_finite() {
        min_side / (2.0 * root_r)
    } else {
        0.0
    };

    circles[Tree::ROOT].x = width / 2.0;
    circles[Tree::ROOT].y = height / 2.0;
    for index in tree.pre_order() {
        circles[index].r *= scale;
        if let Some(parent) = tree.node(index).parent {
            let origin = circles[parent];
            circles[index].x = origin.x + scale * circles[index].x;
            circles[index].y = origin.y + scale * circles[index].y;
        }
    }
    circles
}

fn pack_children(
    tree: &Tree,
    index: NodeIndex,
    circles: &mut [Circle],
    inflate: f64,
    random: &mut Lcg,
) {
    let children = &tree.node(index).children;
    if children.is_empty() {
        return;
    }
    let inflate = if inflate.is_finite() { inflate } else { 0.0 };

    let mut siblings: Vec<Circle> = children
        .iter()
        .map(|&child| {
            let mut circle = circles[child];
            circle.r += inflate;
            circle
        })
        .collect();
    let enclosing = pack_siblings(&mut siblings, random);
    for (&child, packed) in children.iter().zip(&siblings) {
        circles[child] = Circle::new(packed.x, packed.y, packed.r - inflate);
    }
    circles[index].r = enclosing + inflate;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SizeConfig;
    use crate::ir::CircleRecord;
    use crate::layout::hierarchy::build_tree;

    fn circles(radii: &[f64]) -> Vec<Circle> {
        radii.iter().map(|&r| Circle::new(0.0, 0.0, r)).collect()
    }

    fn assert_disjoint(packed: &[Circle]) {
        for i in 0..packed.len() {
            for j in (i + 1)..packed.len() {
                let gap = packed[i].distance_to(&packed[j]) - packed[i].r - packed[j].r;
                assert!(gap > -1e-6, "circles {i} and {j} overlap by {}", -gap);
            }
        }
    }

    #[test]
    fn lcg_sequence_is_fixed() {
        let mut a = Lcg::new();
        let mut b = Lcg::new();
        for _ in 0..10 {
            let value = a.next_f64();
            assert!((0.0..1.0).contains(&value));
            assert_eq!(value, b.next_f64());
        }
    }

    #[test]
    fn single_and_pair_packing() {
        let mut random = Lcg::new();
        let mut one = circles(&[5.0]);
        assert_eq!(pack_siblings(&mut one, &mut random), 5.0);

        let mut two = circles(&[3.0, 2.0]);
        assert_eq!(pack_siblings(&mut two, &mut random), 5.0);
        assert_eq!(two[0].x, -2.0);
        assert_eq!(two[1].x, 3.0);
    }

    #[test]
    fn siblings_do_not_overlap_and_fit_enclosure() {
        let mut random = Lcg::new();
        let mut packed = circles(&[10.0, 8.0, 8.0, 6.0, 5.0, 5.0, 3.0, 2.0, 2.0, 1.0]);
        let r = pack_siblings(&mut packed, &mut random);
        assert_disjoint(&packed);
        let origin = Circle::default();
        for circle in &packed {
            assert!(origin.distance_to(circle) + circle.r <= r + 1e-6);
        }
        // The enclosure cannot beat the total area.
        let area: f64 = packed.iter().map(|c| c.r * c.r).sum();
        assert!(r * r >= area - 1e-6);
    }

    #[test]
    fn three_equal_circles_are_mutually_tangent() {
        let mut random = Lcg::new();
        let mut packed = circles(&[1.0, 1.0, 1.0]);
        let r = pack_siblings(&mut packed, &mut random);
        for i in 0..3 {
            for j in (i + 1)..3 {
                assert!((packed[i].distance_to(&packed[j]) - 2.0).abs() < 1e-9);
            }
        }
        // Circumradius of the centers plus one radius.
        assert!((r - (1.0 + 2.0 / 3f64.sqrt())).abs() < 1e-9);
    }

    #[test]
    fn enclose_handles_nested_and_separate_circles() {
        let mut random = Lcg::new();
        let nested = [Circle::new(0.0, 0.0, 10.0), Circle::new(1.0, 1.0, 2.0)];
        let e = enclose(&nested, &mut random).unwrap();
        assert!((e.r - 10.0).abs() < 1e-9);

        let apart = [Circle::new(-5.0, 0.0, 1.0), Circle::new(5.0, 0.0, 1.0)];
        let e = enclose(&apart, &mut random).unwrap();
        assert!((e.r - 6.0).abs() < 1e-9);
        assert!(e.x.abs() < 1e-9);
        assert!(enclose(&[], &mut random).is_none());
    }

    #[test]
    fn tree_pack_fills_the_viewport() {
        let records = vec![
            CircleRecord::new("a", "A"),
            CircleRecord::new("b", "B").with_parent("a"),
            CircleRecord::new("c", "C").with_parent("a"),
        ];
        let (mut tree, _) = build_tree(&records);
        tree.annotate(&SizeConfig::default());
        let packed = pack_tree(&tree, 800.0, 600.0, 3.0);
        let root = packed[Tree::ROOT];
        assert_eq!((root.x, root.y), (400.0, 300.0));
        assert!((root.r - 300.0).abs() < 1e-9);
        for index in 1..tree.len() {
            let child = packed[index];
            assert!(root.distance_to(&child) + child.r <= root.r + 1e-6);
        }
    }

    #[test]
    fn padding_holds_at_full_size_on_deep_trees() {
        let mut records = vec![CircleRecord::new("c0", "C0").with_role("r0", "Lead")];
        for depth in 1..8 {
            records.push(
                CircleRecord::new(&format!("c{depth}"), "Level")
                    .with_parent(&format!("c{}", depth - 1))
                    .with_role(&format!("r{depth}"), "Role"),
            );
            records.push(
                CircleRecord::new(&format!("s{depth}"), "Side").with_parent(&format!("c{}", depth - 1)),
            );
        }
        let (mut tree, _) = build_tree(&records);
        tree.annotate(&SizeConfig::default());
        let padding = 3.0;
        let packed = pack_tree(&tree, 800.0, 800.0, padding);

        for (index, node) in tree.nodes().iter().enumerate() {
            let Some(parent) = node.parent else { continue };
            let child = packed[index];
            let outer = packed[parent];
            let gap = outer.r - outer.distance_to(&child) - child.r;
            assert!(gap >= padding - 1e-6, "{} sits {gap} from its parent edge", node.id);
            for &sibling in &tree.node(parent).children {
                if sibling > index {
                    let other = packed[sibling];
                    let apart = child.distance_to(&other) - child.r - other.r;
                    assert!(apart >= padding - 1e-6, "{} is {apart} from a sibling", node.id);
                }
            }
        }
    }

    #[test]
    fn zero_padding_packs_tangent() {
        let records = vec![
            CircleRecord::new("a", "A"),
            CircleRecord::new("b", "B").with_parent("a"),
            CircleRecord::new("c", "C").with_parent("a"),
        ];
        let (mut tree, _) = build_tree(&records);
        tree.annotate(&SizeConfig::default());
        let packed = pack_tree(&tree, 800.0, 800.0, 0.0);
        let (b, c) = (packed[1], packed[2]);
        assert!((b.distance_to(&c) - b.r - c.r).abs() < 1e-6);
        assert!((b.r + c.r - 400.0).abs() < 1e-6);
    }

    #[test]
    fn lone_leaf_takes_whole_viewport() {
        let (mut tree, _) = build_tree(&[CircleRecord::new("a", "A")]);
        tree.annotate(&SizeConfig::default());
        let packed = pack_tree(&tree, 500.0, 900.0, 3.0);
        assert!((packed[Tree::ROOT].r - 250.0).abs() < 1e-9);
    }
}
