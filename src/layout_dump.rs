use crate::config::LabelConfig;
use crate::ir::RoleStatus;
use crate::layout::labels::{CircleLabel, RoleLabel, circle_label_params, role_label_params};
use crate::layout::visibility::{role_label_visible, role_opacity, roles_visible};
use crate::layout::{PackedLayout, ViewTarget, Viewport};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDump {
    pub width: f64,
    pub height: f64,
    pub passes: usize,
    pub converged: bool,
    pub phantom_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zoom: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fit: Option<ViewTarget>,
    pub circles: Vec<CircleDump>,
    pub roles: Vec<RoleDump>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CircleDump {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
    pub depth: usize,
    pub x: f64,
    pub y: f64,
    pub r: f64,
    pub role_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<CircleLabelDump>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CircleLabelDump {
    pub name_visible: bool,
    pub roles_visible: bool,
    #[serde(flatten)]
    pub params: CircleLabel,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleDump {
    pub id: String,
    pub name: String,
    pub circle_id: Option<String>,
    pub status: Option<RoleStatus>,
    pub depth: usize,
    pub x: f64,
    pub y: f64,
    pub r: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<RoleLabelDump>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleLabelDump {
    pub visible: bool,
    pub opacity: f64,
    #[serde(flatten)]
    pub params: RoleLabel,
}

/// Zoom state to evaluate label decisions against.
#[derive(Debug, Clone, Default)]
pub struct LabelView {
    pub zoom: f64,
    pub focus: Option<String>,
}

impl LayoutDump {
    pub fn from_layout(layout: &PackedLayout) -> Self {
        let circles = layout
            .circles()
            .map(|node| CircleDump {
                id: node.id.clone(),
                name: node.name.clone(),
                parent_id: node.parent_id.clone(),
                depth: node.depth,
                x: node.x,
                y: node.y,
                r: node.r,
                role_ids: node.role_ids.clone(),
                label: None,
            })
            .collect();

        let roles = layout
            .roles()
            .map(|node| RoleDump {
                id: node.id.clone(),
                name: node.name.clone(),
                circle_id: node.parent_id.clone(),
                status: node.status,
                depth: node.depth,
                x: node.x,
                y: node.y,
                r: node.r,
                label: None,
            })
            .collect();

        Self {
            width: layout.width,
            height: layout.height,
            passes: layout.passes,
            converged: layout.converged,
            phantom_count: layout.phantom_count,
            zoom: None,
            focus: None,
            fit: None,
            circles,
            roles,
            warnings: layout.warnings.iter().map(ToString::to_string).collect(),
        }
    }

    /// Adds label decisions for `view` and the view that fits the chart.
    pub fn with_labels(
        mut self,
        layout: &PackedLayout,
        view: &LabelView,
        labels: &LabelConfig,
        bounds_padding: f64,
    ) -> Self {
        let focus = view.focus.as_deref();
        for circle in &mut self.circles {
            let has_children = layout.child_circles(&circle.id).next().is_some()
                || !circle.role_ids.is_empty();
            circle.label = Some(CircleLabelDump {
                name_visible: layout.circle_name_visible(&circle.id, focus, view.zoom, labels),
                roles_visible: roles_visible(circle.r, circle.role_ids.len(), labels),
                params: circle_label_params(
                    circle.r,
                    circle.depth,
                    has_children,
                    &circle.name,
                    view.zoom,
                    labels,
                ),
            });
        }
        for role in &mut self.roles {
            role.label = Some(RoleLabelDump {
                visible: role_label_visible(role.r, view.zoom, labels),
                opacity: role_opacity(role.r, view.zoom, labels),
                params: role_label_params(role.r, &role.name, labels),
            });
        }

        self.fit = Viewport::new(layout.width, layout.height)
            .ok()
            .map(|viewport| layout.bounds(&viewport, bounds_padding));
        self.zoom = Some(view.zoom);
        self.focus = view.focus.clone();
        self
    }
}

/// Writes the dump as pretty JSON to `path`, or stdout when `path` is `None`.
pub fn write_layout_dump(path: Option<&Path>, dump: &LayoutDump) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            let file = File::create(path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, dump)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            serde_json::to_writer_pretty(&mut writer, dump)?;
            writer.write_all(b"\n")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::ir::CircleRecord;
    use crate::layout::compute_layout;

    fn layout() -> PackedLayout {
        let records = vec![
            CircleRecord::new("org", "Org").with_role("chair", "Chair"),
            CircleRecord::new("ops", "Operations").with_parent("org"),
        ];
        compute_layout(&records, &LayoutConfig::default()).unwrap()
    }

    #[test]
    fn plain_dump_has_no_labels() {
        let layout = layout();
        let dump = LayoutDump::from_layout(&layout);
        assert_eq!(dump.circles.len(), 2);
        assert_eq!(dump.roles.len(), 1);
        assert_eq!(dump.roles[0].circle_id.as_deref(), Some("org"));
        let json = serde_json::to_value(&dump).unwrap();
        assert!(json["circles"][0].get("label").is_none());
        assert!(json.get("zoom").is_none());
        assert_eq!(json["circles"][0]["roleIds"][0], "chair");
    }

    #[test]
    fn label_dump_flattens_params() {
        let layout = layout();
        let config = LayoutConfig::default();
        let view = LabelView {
            zoom: 1.0,
            focus: Some("org".to_string()),
        };
        let dump = LayoutDump::from_layout(&layout).with_labels(
            &layout,
            &view,
            &config.labels,
            config.bounds.padding,
        );
        let json = serde_json::to_value(&dump).unwrap();
        assert_eq!(json["focus"], "org");
        assert_eq!(json["circles"][0]["label"]["nameVisible"], true);
        assert!(json["circles"][0]["label"]["fontSize"].is_number());
        assert!(json["roles"][0]["label"]["opacity"].is_number());
        assert!(json["fit"]["viewWidth"].is_number());
    }
}
