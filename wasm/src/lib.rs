use orgchart_layout::{LayoutConfig, PackedLayout, compute_layout, ir::records_from_json};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrgChartLayoutOptions {
    width: Option<f64>,
    height: Option<f64>,
    padding: Option<f64>,
    max_passes: Option<usize>,
    circle_to_role_radius_ratio: Option<f64>,
    phantom_margin_px: Option<f64>,
}

fn build_layout_config(options: OrgChartLayoutOptions) -> LayoutConfig {
    let mut config = LayoutConfig::default();

    if let Some(width) = options.width {
        config.width = width;
    }
    if let Some(height) = options.height {
        config.height = height;
    }
    if let Some(padding) = options.padding {
        config.pack.padding = padding;
    }
    if let Some(max_passes) = options.max_passes {
        config.pack.max_passes = max_passes;
    }
    if let Some(ratio) = options.circle_to_role_radius_ratio {
        config.pack.circle_to_role_radius_ratio = ratio;
    }
    if let Some(margin) = options.phantom_margin_px {
        config.pack.phantom_margin_px = margin;
    }

    config
}

fn layout_from_json(
    records_json: &str,
    options: OrgChartLayoutOptions,
) -> Result<PackedLayout, String> {
    let records = records_from_json(records_json).map_err(|error| error.to_string())?;
    compute_layout(&records, &build_layout_config(options)).map_err(|error| error.to_string())
}

#[wasm_bindgen]
pub fn layout_org_chart(
    records_json: &str,
    options_json: Option<String>,
) -> Result<String, JsValue> {
    let options = if let Some(raw_options) = options_json {
        serde_json::from_str::<OrgChartLayoutOptions>(&raw_options)
            .map_err(|error| JsValue::from_str(&error.to_string()))?
    } else {
        OrgChartLayoutOptions::default()
    };

    let layout = layout_from_json(records_json, options).map_err(|error| JsValue::from_str(&error))?;
    serde_json::to_string(&layout).map_err(|error| JsValue::from_str(&error.to_string()))
}
