//! Zoom-aware label and role visibility.
//!
//! Every decision is made on the rendered radius, `r * zoom`, so labels
//! appear and disappear as the user zooms without re-running the layout.

use crate::config::LabelConfig;

pub fn role_label_visible(r: f64, zoom: f64, config: &LabelConfig) -> bool {
    r * zoom >= config.role_label_min_rendered_radius
}

/// Fades small roles in as they grow on screen.
pub fn role_opacity(r: f64, zoom: f64, config: &LabelConfig) -> f64 {
    let rendered = r * zoom;
    let (lo, hi) = (config.role_opacity_min_size, config.role_opacity_max_size);
    if rendered <= lo {
        return config.role_opacity_min;
    }
    if rendered >= hi {
        return config.role_opacity_max;
    }
    let t = (rendered - lo) / (hi - lo);
    config.role_opacity_min + t * (config.role_opacity_max - config.role_opacity_min)
}

/// Roles are only drawn inside circles big enough to hold them.
pub fn roles_visible(r: f64, role_count: usize, config: &LabelConfig) -> bool {
    role_count > 0 && r > config.role_visibility_min_radius
}

/// Whether a circle shows its name. `child_radii` are the packed radii of
/// its direct child circles.
///
/// A circle whose children are prominent on screen hides its name unless
/// focused, so the label does not sit on top of theirs.
pub fn circle_name_visible(
    r: f64,
    child_radii: &[f64],
    is_focused: bool,
    zoom: f64,
    config: &LabelConfig,
) -> bool {
    let rendered = r * zoom;
    if rendered < config.circle_label_min_rendered_radius {
        return false;
    }

    let prominent_child = child_radii
        .iter()
        .any(|&child| child * zoom > config.circle_child_visibility_min_rendered_radius);
    if prominent_child {
        let children_rendered: f64 = child_radii.iter().map(|&child| child * zoom).sum();
        if children_rendered > rendered * config.children_ratio_threshold {
            return is_focused;
        }
    }

    is_focused
        || rendered > config.circle_label_large_rendered_radius
        || (zoom > config.circle_zoom_threshold
            && rendered > config.circle_label_zoomed_rendered_radius)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LabelConfig {
        LabelConfig::default()
    }

    #[test]
    fn role_label_threshold_scales_with_zoom() {
        let cfg = config();
        assert!(!role_label_visible(10.0, 1.0, &cfg));
        assert!(role_label_visible(10.0, 2.0, &cfg));
        assert!(role_label_visible(20.0, 1.0, &cfg));
    }

    #[test]
    fn role_opacity_interpolates_and_clamps() {
        let cfg = config();
        assert_eq!(role_opacity(2.0, 1.0, &cfg), 0.3);
        assert_eq!(role_opacity(100.0, 1.0, &cfg), 1.0);
        let mid = role_opacity(16.5, 1.0, &cfg);
        assert!((mid - 0.65).abs() < 1e-9);
        assert!(role_opacity(10.0, 1.0, &cfg) < role_opacity(10.0, 2.0, &cfg));
    }

    #[test]
    fn roles_hidden_in_small_circles() {
        let cfg = config();
        assert!(!roles_visible(25.0, 3, &cfg));
        assert!(!roles_visible(300.0, 0, &cfg));
        assert!(roles_visible(31.0, 1, &cfg));
    }

    #[test]
    fn tiny_circles_never_show_names() {
        let cfg = config();
        assert!(!circle_name_visible(40.0, &[], true, 1.0, &cfg));
    }

    #[test]
    fn large_or_focused_circles_show_names() {
        let cfg = config();
        assert!(circle_name_visible(120.0, &[], false, 1.0, &cfg));
        assert!(circle_name_visible(70.0, &[], true, 1.0, &cfg));
        assert!(!circle_name_visible(70.0, &[], false, 1.0, &cfg));
    }

    #[test]
    fn zoomed_in_threshold_applies_past_zoom_limit() {
        let cfg = config();
        // Rendered 64: above the zoomed floor but below "large".
        assert!(circle_name_visible(32.0, &[], false, 2.0, &cfg));
        assert!(!circle_name_visible(56.0, &[], false, 1.0, &cfg));
    }

    #[test]
    fn prominent_children_hide_parent_name_unless_focused() {
        let cfg = config();
        let children = [100.0, 100.0, 100.0];
        assert!(!circle_name_visible(150.0, &children, false, 1.0, &cfg));
        assert!(circle_name_visible(150.0, &children, true, 1.0, &cfg));
        // Small children do not compete with the parent label.
        assert!(circle_name_visible(150.0, &[70.0, 70.0, 70.0, 70.0], false, 1.0, &cfg));
    }
}
