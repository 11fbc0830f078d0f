//! Label typesetting for circles and roles.
//!
//! Text is measured in characters with a fixed width ratio; no font metrics
//! are consulted. Circle labels are sized in screen space and counter-scaled
//! by the zoom level so they stay readable at every zoom.

use serde::Serialize;

use crate::config::LabelConfig;

/// Characters reserved for the ellipsis when a line is cut short.
const ELLIPSIS_RESERVE: usize = 3;

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn take_chars(text: &str, count: usize) -> String {
    text.chars().take(count).collect()
}

/// Word-aware line breaking. Words longer than a line are cut; when text is
/// left over after `max_lines`, the last line ends with `…`.
pub fn split_into_lines(text: &str, max_chars: usize, max_lines: usize) -> Vec<String> {
    if char_len(text) <= max_chars {
        return vec![text.to_string()];
    }

    let keep = max_chars.saturating_sub(ELLIPSIS_RESERVE);
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if lines.len() >= max_lines {
            break;
        }
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };

        if char_len(&candidate) <= max_chars {
            current = candidate;
        } else if current.is_empty() {
            if lines.len() + 1 == max_lines {
                lines.push(format!("{}…", take_chars(word, keep)));
                break;
            }
            lines.push(take_chars(word, max_chars));
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }

    if !current.is_empty() && lines.len() < max_lines {
        if char_len(&current) > max_chars {
            lines.push(format!("{}…", take_chars(&current, keep)));
        } else {
            lines.push(current);
        }
    } else if !current.is_empty()
        && lines.len() == max_lines
        && let Some(last) = lines.last_mut()
        && !last.ends_with('…')
    {
        *last = format!("{}…", take_chars(last, keep));
    }

    if lines.is_empty() {
        vec![take_chars(text, max_chars)]
    } else {
        lines
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CircleName {
    pub lines: Vec<String>,
    pub truncated: bool,
}

/// Wraps a circle name onto at most `max_lines` lines, marking cuts with
/// `...`.
pub fn process_circle_name(name: &str, max_chars: usize, max_lines: usize) -> CircleName {
    if char_len(name) <= max_chars {
        return CircleName {
            lines: vec![name.to_string()],
            truncated: false,
        };
    }

    let keep = max_chars.saturating_sub(ELLIPSIS_RESERVE);
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut truncated = false;
    for word in name.split_whitespace() {
        if lines.len() >= max_lines {
            truncated = true;
            break;
        }
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };

        if char_len(&candidate) <= max_chars {
            current = candidate;
        } else if current.is_empty() {
            let cut = format!("{}...", take_chars(word, keep));
            truncated = true;
            if lines.is_empty() {
                current = cut;
            } else {
                lines.push(cut);
                break;
            }
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }

    if !current.is_empty() && lines.len() < max_lines {
        if char_len(&current) > max_chars {
            lines.push(format!("{}...", take_chars(&current, keep)));
            truncated = true;
        } else {
            lines.push(current);
        }
    } else if !current.is_empty() {
        truncated = true;
        if lines.len() > 1
            && let Some(last) = lines.last_mut()
            && !last.ends_with("...")
        {
            *last = if char_len(last) > keep {
                format!("{}...", take_chars(last, keep))
            } else {
                format!("{last}...")
            };
        }
    }

    CircleName { lines, truncated }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleLabel {
    pub font_size: f64,
    pub line_height: f64,
    pub lines: Vec<String>,
}

/// Role labels scale with the role itself, in layout units.
pub fn role_label_params(r: f64, name: &str, config: &LabelConfig) -> RoleLabel {
    let font_size = r * config.role_font_size_ratio;
    let line_height = font_size * config.role_line_height_ratio;
    let max_width = r * config.role_label_width_ratio;
    let char_width = font_size * config.char_width_ratio;
    let max_chars = chars_per_line(max_width, char_width);
    RoleLabel {
        font_size,
        line_height,
        lines: split_into_lines(name, max_chars, config.max_lines_role_label),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CircleLabel {
    /// Font size in layout units; renders at a zoom-independent size.
    pub font_size: f64,
    pub label_width: f64,
    pub label_height: f64,
    /// Vertical shift from the circle center. Circles with children move
    /// their label up so it clears the children.
    pub y_offset: f64,
    pub lines: Vec<String>,
}

pub fn circle_label_params(
    r: f64,
    depth: usize,
    has_children: bool,
    name: &str,
    zoom: f64,
    config: &LabelConfig,
) -> CircleLabel {
    let rendered = r * zoom;

    let mut base = (rendered / config.circle_font_size_radius_ratio)
        .min(config.circle_font_size_base_max)
        .max(config.circle_font_size_base_min);
    let name_len = char_len(name);
    if name_len > config.name_length_threshold_medium {
        base *= config.name_length_reduction_medium;
    }
    if name_len > config.name_length_threshold_long {
        base *= config.name_length_reduction_long;
    }

    let depth_multiplier = (config.depth_multiplier_base
        - depth as f64 * config.depth_multiplier_step)
        .max(config.depth_multiplier_min);
    let visual_font = (base * depth_multiplier)
        .min(config.circle_font_size_max)
        .max(config.circle_font_size_min);

    let visual_width =
        (rendered * config.circle_label_width_ratio).min(config.circle_label_width_max);
    let max_chars = chars_per_line(visual_width, visual_font * config.char_width_ratio);
    let name = process_circle_name(name, max_chars, config.max_lines_circle_name);

    let font_size = visual_font / zoom;
    let label_height = font_size
        * (config.circle_line_height_ratio * name.lines.len() as f64
            + config.circle_label_height_offset);
    let y_offset = if has_children {
        -r * config.circle_label_y_offset_ratio
    } else {
        0.0
    };

    CircleLabel {
        font_size,
        label_width: visual_width / zoom,
        label_height,
        y_offset,
        lines: name.lines,
    }
}

fn chars_per_line(width: f64, char_width: f64) -> usize {
    let chars = (width / char_width).floor();
    if chars.is_finite() && chars > 0.0 {
        chars as usize
    } else {
        0
    }
}
