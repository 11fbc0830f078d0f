use crate::layout::LayoutError;
use serde::{Deserialize, Serialize};
use std::path::Path;

const ROLE_VALUES_BY_DEPTH: [f64; 4] = [2250.0, 500.0, 100.0, 35.0];

/// Weighting model fed to the packer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizeConfig {
    pub circle_base: f64,
    pub member_weight: f64,
    pub role_count_weight: f64,
    pub depth_decay: f64,
    /// Role leaf values indexed by owner depth; deeper owners reuse the last entry.
    pub role_values: Vec<f64>,
    pub enclosure_ratio: f64,
    pub min_value: f64,
}

impl Default for SizeConfig {
    fn default() -> Self {
        Self {
            circle_base: 100.0,
            member_weight: 20.0,
            role_count_weight: 15.0,
            depth_decay: 0.5,
            role_values: ROLE_VALUES_BY_DEPTH.to_vec(),
            enclosure_ratio: 5.0,
            min_value: 20.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackConfig {
    pub padding: f64,
    pub max_passes: usize,
    pub circle_to_role_radius_ratio: f64,
    pub phantom_margin_px: f64,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            padding: 3.0,
            max_passes: 2,
            circle_to_role_radius_ratio: 2.0,
            phantom_margin_px: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelConfig {
    pub role_visibility_min_radius: f64,
    pub role_label_min_rendered_radius: f64,
    pub role_opacity_min_size: f64,
    pub role_opacity_max_size: f64,
    pub role_opacity_min: f64,
    pub role_opacity_max: f64,
    pub circle_label_min_rendered_radius: f64,
    pub circle_label_large_rendered_radius: f64,
    pub circle_label_zoomed_rendered_radius: f64,
    pub circle_child_visibility_min_rendered_radius: f64,
    pub circle_zoom_threshold: f64,
    pub children_ratio_threshold: f64,
    pub role_font_size_ratio: f64,
    pub role_line_height_ratio: f64,
    pub role_label_width_ratio: f64,
    pub char_width_ratio: f64,
    pub circle_font_size_min: f64,
    pub circle_font_size_max: f64,
    pub circle_font_size_base_min: f64,
    pub circle_font_size_base_max: f64,
    pub circle_font_size_radius_ratio: f64,
    pub circle_label_width_ratio: f64,
    pub circle_label_width_max: f64,
    pub circle_line_height_ratio: f64,
    pub circle_label_height_offset: f64,
    pub name_length_threshold_medium: usize,
    pub name_length_threshold_long: usize,
    pub name_length_reduction_medium: f64,
    pub name_length_reduction_long: f64,
    pub depth_multiplier_min: f64,
    pub depth_multiplier_base: f64,
    pub depth_multiplier_step: f64,
    pub circle_label_y_offset_ratio: f64,
    pub max_lines_circle_name: usize,
    pub max_lines_role_label: usize,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            role_visibility_min_radius: 30.0,
            role_label_min_rendered_radius: 20.0,
            role_opacity_min_size: 8.0,
            role_opacity_max_size: 25.0,
            role_opacity_min: 0.3,
            role_opacity_max: 1.0,
            circle_label_min_rendered_radius: 50.0,
            circle_label_large_rendered_radius: 100.0,
            circle_label_zoomed_rendered_radius: 60.0,
            circle_child_visibility_min_rendered_radius: 80.0,
            circle_zoom_threshold: 1.5,
            children_ratio_threshold: 1.5,
            role_font_size_ratio: 0.22,
            role_line_height_ratio: 1.25,
            role_label_width_ratio: 1.6,
            char_width_ratio: 0.55,
            circle_font_size_min: 10.0,
            circle_font_size_max: 32.0,
            circle_font_size_base_min: 12.0,
            circle_font_size_base_max: 20.0,
            circle_font_size_radius_ratio: 5.0,
            circle_label_width_ratio: 1.6,
            circle_label_width_max: 300.0,
            circle_line_height_ratio: 1.3,
            circle_label_height_offset: 0.5,
            name_length_threshold_medium: 20,
            name_length_threshold_long: 30,
            name_length_reduction_medium: 0.85,
            name_length_reduction_long: 0.9,
            depth_multiplier_min: 0.7,
            depth_multiplier_base: 2.0,
            depth_multiplier_step: 0.3,
            circle_label_y_offset_ratio: 0.3,
            max_lines_circle_name: 2,
            max_lines_role_label: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundsConfig {
    pub padding: f64,
    pub zoom_padding: f64,
}

impl Default for BoundsConfig {
    fn default() -> Self {
        Self {
            padding: 10.0,
            zoom_padding: 40.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoomConfig {
    pub scale_min: f64,
    pub scale_max: f64,
    pub scale_step: f64,
    pub initial_level: f64,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            scale_min: 0.5,
            scale_max: 4.0,
            scale_step: 1.2,
            initial_level: 1.0,
        }
    }
}

impl ZoomConfig {
    pub fn clamp(&self, level: f64) -> f64 {
        if !level.is_finite() {
            return self.initial_level;
        }
        level.max(self.scale_min).min(self.scale_max)
    }

    pub fn zoom_in(&self, level: f64) -> f64 {
        self.clamp(level * self.scale_step)
    }

    pub fn zoom_out(&self, level: f64) -> f64 {
        self.clamp(level / self.scale_step)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub width: f64,
    pub height: f64,
    pub pack: PackConfig,
    pub size: SizeConfig,
    pub labels: LabelConfig,
    pub bounds: BoundsConfig,
    pub zoom: ZoomConfig,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 800.0,
            pack: PackConfig::default(),
            size: SizeConfig::default(),
            labels: LabelConfig::default(),
            bounds: BoundsConfig::default(),
            zoom: ZoomConfig::default(),
        }
    }
}

impl LayoutConfig {
    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Rejects configurations the engine cannot lay out. Everything else about
    /// the input is handled best-effort.
    pub fn validate(&self) -> Result<(), LayoutError> {
        positive("width", self.width)?;
        positive("height", self.height)?;
        non_negative("pack.padding", self.pack.padding)?;
        non_negative("pack.phantom_margin_px", self.pack.phantom_margin_px)?;
        positive(
            "pack.circle_to_role_radius_ratio",
            self.pack.circle_to_role_radius_ratio,
        )?;
        positive("size.min_value", self.size.min_value)?;
        positive("size.depth_decay", self.size.depth_decay)?;
        non_negative("size.enclosure_ratio", self.size.enclosure_ratio)?;
        non_negative("bounds.padding", self.bounds.padding)?;
        non_negative("bounds.zoom_padding", self.bounds.zoom_padding)?;
        positive("zoom.scale_min", self.zoom.scale_min)?;
        positive("zoom.scale_max", self.zoom.scale_max)?;
        positive("zoom.scale_step", self.zoom.scale_step)?;
        positive("zoom.initial_level", self.zoom.initial_level)?;
        if self.zoom.scale_min > self.zoom.scale_max {
            return Err(LayoutError::InvalidConfig {
                field: "zoom.scale_min",
                reason: format!(
                    "must not exceed zoom.scale_max ({} > {})",
                    self.zoom.scale_min, self.zoom.scale_max
                ),
            });
        }
        if self.size.role_values.is_empty() {
            return Err(LayoutError::InvalidConfig {
                field: "size.role_values",
                reason: "must contain at least one entry".to_string(),
            });
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), LayoutError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(LayoutError::InvalidConfig {
            field,
            reason: format!("must be a positive finite number, got {value}"),
        })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), LayoutError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(LayoutError::InvalidConfig {
            field,
            reason: format!("must be a non-negative finite number, got {value}"),
        })
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct PackConfigFile {
    padding: Option<f64>,
    max_passes: Option<usize>,
    circle_to_role_radius_ratio: Option<f64>,
    phantom_margin_px: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct SizeConfigFile {
    circle_base: Option<f64>,
    member_weight: Option<f64>,
    role_count_weight: Option<f64>,
    depth_decay: Option<f64>,
    role_values: Option<Vec<f64>>,
    enclosure_ratio: Option<f64>,
    min_value: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct LabelConfigFile {
    role_visibility_min_radius: Option<f64>,
    role_label_min_rendered_radius: Option<f64>,
    role_opacity_min_size: Option<f64>,
    role_opacity_max_size: Option<f64>,
    role_opacity_min: Option<f64>,
    role_opacity_max: Option<f64>,
    circle_label_min_rendered_radius: Option<f64>,
    circle_label_large_rendered_radius: Option<f64>,
    circle_label_zoomed_rendered_radius: Option<f64>,
    circle_child_visibility_min_rendered_radius: Option<f64>,
    circle_zoom_threshold: Option<f64>,
    children_ratio_threshold: Option<f64>,
    role_font_size_ratio: Option<f64>,
    role_line_height_ratio: Option<f64>,
    role_label_width_ratio: Option<f64>,
    char_width_ratio: Option<f64>,
    circle_font_size_min: Option<f64>,
    circle_font_size_max: Option<f64>,
    circle_font_size_base_min: Option<f64>,
    circle_font_size_base_max: Option<f64>,
    circle_font_size_radius_ratio: Option<f64>,
    circle_label_width_ratio: Option<f64>,
    circle_label_width_max: Option<f64>,
    circle_line_height_ratio: Option<f64>,
    circle_label_height_offset: Option<f64>,
    name_length_threshold_medium: Option<usize>,
    name_length_threshold_long: Option<usize>,
    name_length_reduction_medium: Option<f64>,
    name_length_reduction_long: Option<f64>,
    depth_multiplier_min: Option<f64>,
    depth_multiplier_base: Option<f64>,
    depth_multiplier_step: Option<f64>,
    circle_label_y_offset_ratio: Option<f64>,
    max_lines_circle_name: Option<usize>,
    max_lines_role_label: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct BoundsConfigFile {
    padding: Option<f64>,
    zoom_padding: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ZoomConfigFile {
    scale_min: Option<f64>,
    scale_max: Option<f64>,
    scale_step: Option<f64>,
    initial_level: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    width: Option<f64>,
    height: Option<f64>,
    pack: Option<PackConfigFile>,
    size: Option<SizeConfigFile>,
    labels: Option<LabelConfigFile>,
    bounds: Option<BoundsConfigFile>,
    zoom: Option<ZoomConfigFile>,
}

/// Loads a config file (JSON, or JSON5 when the extension says so) and merges
/// it over the defaults. No path means defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<LayoutConfig> {
    let Some(path) = path else {
        return Ok(LayoutConfig::default());
    };

    let contents = std::fs::read_to_string(path)?;
    let is_json5 = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json5"))
        .unwrap_or(false);
    parse_config(&contents, is_json5)
}

pub fn parse_config(contents: &str, json5_syntax: bool) -> anyhow::Result<LayoutConfig> {
    let parsed: ConfigFile = if json5_syntax {
        json5::from_str(contents)?
    } else {
        serde_json::from_str(contents)?
    };
    let config = merge_config_file(LayoutConfig::default(), parsed);
    config.validate()?;
    Ok(config)
}

fn merge_config_file(mut config: LayoutConfig, parsed: ConfigFile) -> LayoutConfig {
    if let Some(v) = parsed.width {
        config.width = v;
    }
    if let Some(v) = parsed.height {
        config.height = v;
    }

    if let Some(pack) = parsed.pack {
        if let Some(v) = pack.padding {
            config.pack.padding = v;
        }
        if let Some(v) = pack.max_passes {
            config.pack.max_passes = v;
        }
        if let Some(v) = pack.circle_to_role_radius_ratio {
            config.pack.circle_to_role_radius_ratio = v;
        }
        if let Some(v) = pack.phantom_margin_px {
            config.pack.phantom_margin_px = v;
        }
    }

    if let Some(size) = parsed.size {
        if let Some(v) = size.circle_base {
            config.size.circle_base = v;
        }
        if let Some(v) = size.member_weight {
            config.size.member_weight = v;
        }
        if let Some(v) = size.role_count_weight {
            config.size.role_count_weight = v;
        }
        if let Some(v) = size.depth_decay {
            config.size.depth_decay = v;
        }
        if let Some(v) = size.role_values {
            config.size.role_values = v;
        }
        if let Some(v) = size.enclosure_ratio {
            config.size.enclosure_ratio = v;
        }
        if let Some(v) = size.min_value {
            config.size.min_value = v;
        }
    }

    if let Some(labels) = parsed.labels {
        if let Some(v) = labels.role_visibility_min_radius {
            config.labels.role_visibility_min_radius = v;
        }
        if let Some(v) = labels.role_label_min_rendered_radius {
            config.labels.role_label_min_rendered_radius = v;
        }
        if let Some(v) = labels.role_opacity_min_size {
            config.labels.role_opacity_min_size = v;
        }
        if let Some(v) = labels.role_opacity_max_size {
            config.labels.role_opacity_max_size = v;
        }
        if let Some(v) = labels.role_opacity_min {
            config.labels.role_opacity_min = v;
        }
        if let Some(v) = labels.role_opacity_max {
            config.labels.role_opacity_max = v;
        }
        if let Some(v) = labels.circle_label_min_rendered_radius {
            config.labels.circle_label_min_rendered_radius = v;
        }
        if let Some(v) = labels.circle_label_large_rendered_radius {
            config.labels.circle_label_large_rendered_radius = v;
        }
        if let Some(v) = labels.circle_label_zoomed_rendered_radius {
            config.labels.circle_label_zoomed_rendered_radius = v;
        }
        if let Some(v) = labels.circle_child_visibility_min_rendered_radius {
            config.labels.circle_child_visibility_min_rendered_radius = v;
        }
        if let Some(v) = labels.circle_zoom_threshold {
            config.labels.circle_zoom_threshold = v;
        }
        if let Some(v) = labels.children_ratio_threshold {
            config.labels.children_ratio_threshold = v;
        }
        if let Some(v) = labels.role_font_size_ratio {
            config.labels.role_font_size_ratio = v;
        }
        if let Some(v) = labels.role_line_height_ratio {
            config.labels.role_line_height_ratio = v;
        }
        if let Some(v) = labels.role_label_width_ratio {
            config.labels.role_label_width_ratio = v;
        }
        if let Some(v) = labels.char_width_ratio {
            config.labels.char_width_ratio = v;
        }
        if let Some(v) = labels.circle_font_size_min {
            config.labels.circle_font_size_min = v;
        }
        if let Some(v) = labels.circle_font_size_max {
            config.labels.circle_font_size_max = v;
        }
        if let Some(v) = labels.circle_font_size_base_min {
            config.labels.circle_font_size_base_min = v;
        }
        if let Some(v) = labels.circle_font_size_base_max {
            config.labels.circle_font_size_base_max = v;
        }
        if let Some(v) = labels.circle_font_size_radius_ratio {
            config.labels.circle_font_size_radius_ratio = v;
        }
        if let Some(v) = labels.circle_label_width_ratio {
            config.labels.circle_label_width_ratio = v;
        }
        if let Some(v) = labels.circle_label_width_max {
            config.labels.circle_label_width_max = v;
        }
        if let Some(v) = labels.circle_line_height_ratio {
            config.labels.circle_line_height_ratio = v;
        }
        if let Some(v) = labels.circle_label_height_offset {
            config.labels.circle_label_height_offset = v;
        }
        if let Some(v) = labels.name_length_threshold_medium {
            config.labels.name_length_threshold_medium = v;
        }
        if let Some(v) = labels.name_length_threshold_long {
            config.labels.name_length_threshold_long = v;
        }
        if let Some(v) = labels.name_length_reduction_medium {
            config.labels.name_length_reduction_medium = v;
        }
        if let Some(v) = labels.name_length_reduction_long {
            config.labels.name_length_reduction_long = v;
        }
        if let Some(v) = labels.depth_multiplier_min {
            config.labels.depth_multiplier_min = v;
        }
        if let Some(v) = labels.depth_multiplier_base {
            config.labels.depth_multiplier_base = v;
        }
        if let Some(v) = labels.depth_multiplier_step {
            config.labels.depth_multiplier_step = v;
        }
        if let Some(v) = labels.circle_label_y_offset_ratio {
            config.labels.circle_label_y_offset_ratio = v;
        }
        if let Some(v) = labels.max_lines_circle_name {
            config.labels.max_lines_circle_name = v;
        }
        if let Some(v) = labels.max_lines_role_label {
            config.labels.max_lines_role_label = v;
        }
    }

    if let Some(bounds) = parsed.bounds {
        if let Some(v) = bounds.padding {
            config.bounds.padding = v;
        }
        if let Some(v) = bounds.zoom_padding {
            config.bounds.zoom_padding = v;
        }
    }

    if let Some(zoom) = parsed.zoom {
        if let Some(v) = zoom.scale_min {
            config.zoom.scale_min = v;
        }
        if let Some(v) = zoom.scale_max {
            config.zoom.scale_max = v;
        }
        if let Some(v) = zoom.scale_step {
            config.zoom.scale_step = v;
        }
        if let Some(v) = zoom.initial_level {
            config.zoom.initial_level = v;
        }
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(LayoutConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_width() {
        let config = LayoutConfig::default().with_size(0.0, 600.0);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, LayoutError::InvalidConfig { field: "width", .. }));
    }

    #[test]
    fn rejects_empty_role_table() {
        let mut config = LayoutConfig::default();
        config.size.role_values.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn merges_partial_file_over_defaults() {
        let config = parse_config(
            r#"{"width": 1024, "pack": {"maxPasses": 5, "circleToRoleRadiusRatio": 3}}"#,
            false,
        )
        .unwrap();
        assert_eq!(config.width, 1024.0);
        assert_eq!(config.height, 800.0);
        assert_eq!(config.pack.max_passes, 5);
        assert_eq!(config.pack.circle_to_role_radius_ratio, 3.0);
        assert_eq!(config.pack.padding, 3.0);
    }

    #[test]
    fn json5_config_with_comments() {
        let config = parse_config("{ // tighter packing\n pack: { padding: 1, }, }", true).unwrap();
        assert_eq!(config.pack.padding, 1.0);
    }

    #[test]
    fn invalid_file_values_fail_fast() {
        assert!(parse_config(r#"{"height": -5}"#, false).is_err());
    }

    #[test]
    fn rejects_inverted_zoom_extent() {
        let err = parse_config(r#"{"zoom": {"scaleMin": 5, "scaleMax": 1}}"#, false).unwrap_err();
        let err = err.downcast::<LayoutError>().unwrap();
        assert!(matches!(err, LayoutError::InvalidConfig { field: "zoom.scale_min", .. }));
        assert!(parse_config(r#"{"zoom": {"scaleStep": 0}}"#, false).is_err());
        assert!(parse_config(r#"{"bounds": {"padding": -1}}"#, false).is_err());
    }

    #[test]
    fn unvalidated_zoom_extent_does_not_panic() {
        let zoom = ZoomConfig {
            scale_min: 5.0,
            scale_max: 1.0,
            ..ZoomConfig::default()
        };
        assert_eq!(zoom.clamp(3.0), 1.0);
        assert_eq!(zoom.zoom_in(2.0), 1.0);
    }

    #[test]
    fn merges_label_typesetting_fields() {
        let config = parse_config(
            r#"{"labels": {
                "charWidthRatio": 0.6,
                "circleFontSizeMax": 40,
                "nameLengthThresholdLong": 24,
                "depthMultiplierStep": 0.25,
                "maxLinesCircleName": 3,
                "maxLinesRoleLabel": 1
            }}"#,
            false,
        )
        .unwrap();
        let labels = &config.labels;
        assert_eq!(labels.char_width_ratio, 0.6);
        assert_eq!(labels.circle_font_size_max, 40.0);
        assert_eq!(labels.name_length_threshold_long, 24);
        assert_eq!(labels.depth_multiplier_step, 0.25);
        assert_eq!(labels.max_lines_circle_name, 3);
        assert_eq!(labels.max_lines_role_label, 1);
        assert_eq!(labels.role_font_size_ratio, 0.22);
    }

    #[test]
    fn zoom_clamps_to_scale_extent() {
        let zoom = ZoomConfig::default();
        assert_eq!(zoom.clamp(10.0), 4.0);
        assert_eq!(zoom.clamp(0.1), 0.5);
        assert_eq!(zoom.clamp(f64::NAN), 1.0);
        assert!((zoom.zoom_in(1.0) - 1.2).abs() < 1e-12);
        assert_eq!(zoom.zoom_out(0.5), 0.5);
    }
}
