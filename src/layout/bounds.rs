use serde::Serialize;

use super::error::LayoutError;
use super::types::{Circle, RoleOffset};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Result<Self, LayoutError> {
        let valid = |side: f64| side.is_finite() && side > 0.0;
        if !valid(width) || !valid(height) {
            return Err(LayoutError::InvalidViewport { width, height });
        }
        Ok(Self { width, height })
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width / self.height
    }
}

/// What the camera looks at: a center point and the layout-space width that
/// must fit the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewTarget {
    pub center_x: f64,
    pub center_y: f64,
    pub view_width: f64,
}

impl ViewTarget {
    pub fn zoom_level(&self, viewport: &Viewport) -> f64 {
        viewport.width / self.view_width
    }

    /// `(k, tx, ty)` such that `translate(tx, ty) scale(k)` centers the
    /// target in the viewport.
    pub fn transform(&self, viewport: &Viewport) -> (f64, f64, f64) {
        let k = self.zoom_level(viewport);
        (
            k,
            viewport.width / 2.0 - k * self.center_x,
            viewport.height / 2.0 - k * self.center_y,
        )
    }
}

/// A circle together with its roles, given relative to the circle center.
#[derive(Debug, Clone, Copy)]
pub struct BoundsItem<'a> {
    pub circle: Circle,
    pub roles: &'a [RoleOffset],
}

/// Fits every item, roles included, into the viewport.
pub fn calculate_bounds(items: &[BoundsItem<'_>], viewport: &Viewport, padding: f64) -> ViewTarget {
    if items.is_empty() {
        return ViewTarget {
            center_x: 0.0,
            center_y: 0.0,
            view_width: viewport.width,
        };
    }

    let mut min_x = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    let mut extend = |x: f64, y: f64, r: f64| {
        min_x = min_x.min(x - r);
        max_x = max_x.max(x + r);
        min_y = min_y.min(y - r);
        max_y = max_y.max(y + r);
    };
    for item in items {
        let circle = item.circle;
        extend(circle.x, circle.y, circle.r);
        for role in item.roles {
            extend(circle.x + role.x, circle.y + role.y, role.r);
        }
    }

    let bounds_width = max_x - min_x + padding * 2.0;
    let bounds_height = max_y - min_y + padding * 2.0;
    let aspect = viewport.aspect_ratio();
    let view_width = if bounds_width / bounds_height > aspect {
        bounds_width
    } else {
        bounds_height * aspect
    };

    ViewTarget {
        center_x: (min_x + max_x) / 2.0,
        center_y: (min_y + max_y) / 2.0,
        view_width,
    }
}

/// Frames a single circle so its diameter spans the shorter viewport side,
/// less `zoom_padding`.
pub fn zoom_to_node(circle: Circle, viewport: &Viewport, zoom_padding: f64) -> ViewTarget {
    let available = (viewport.width.min(viewport.height) - zoom_padding).max(1.0);
    ViewTarget {
        center_x: circle.x,
        center_y: circle.y,
        view_width: viewport.width * (circle.r * 2.0) / available,
    }
}
