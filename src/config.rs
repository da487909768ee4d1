use serde::{Deserialize, Serialize};
use std::path::Path;

/// Spacing constants and switches shared by every layout run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Left edge of the first column.
    pub start_x: f32,
    /// Top edge of the first row when the graph has no lanes.
    pub start_y: f32,
    /// Space kept right of and below the outermost shapes.
    pub margin: f32,
    pub horizontal_spacing: f32,
    pub vertical_spacing: f32,
    pub activity_width: f32,
    pub activity_height: f32,
    pub gateway_size: f32,
    pub event_size: f32,
    /// Space above the first row of a lane, reserved for the lane label.
    pub lane_label_margin: f32,
    pub lane_bottom_padding: f32,
    pub min_lane_height: f32,
    /// Interior padding between an expanded sub-process border and its body.
    pub subprocess_padding: f32,
    /// Sub-processes nested deeper than this are emitted collapsed.
    pub max_expanded_depth: usize,
    /// Horizontal stub length before a cross-lane route turns.
    pub edge_stub: f32,
    /// Distance of the cross-lane jump row from the source band edge.
    pub lane_jump_offset: f32,
    /// Clearance below nodes for routes of backward flows.
    pub loop_clearance: f32,
    pub pool_header_width: f32,
    pub pool_spacing: f32,
    pub infer_lanes: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            start_x: 80.0,
            start_y: 60.0,
            margin: 50.0,
            horizontal_spacing: 50.0,
            vertical_spacing: 40.0,
            activity_width: 100.0,
            activity_height: 80.0,
            gateway_size: 50.0,
            event_size: 36.0,
            lane_label_margin: 30.0,
            lane_bottom_padding: 20.0,
            min_lane_height: 150.0,
            subprocess_padding: 30.0,
            max_expanded_depth: 3,
            edge_stub: 20.0,
            lane_jump_offset: 12.0,
            loop_clearance: 20.0,
            pool_header_width: 30.0,
            pool_spacing: 40.0,
            infer_lanes: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub layout: LayoutConfig,
    pub lint: LintConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LintConfig {
    pub enabled: bool,
    pub require_start_event: bool,
    pub require_end_event: bool,
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            require_start_event: true,
            require_end_event: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    start_x: Option<f32>,
    start_y: Option<f32>,
    margin: Option<f32>,
    horizontal_spacing: Option<f32>,
    vertical_spacing: Option<f32>,
    activity_width: Option<f32>,
    activity_height: Option<f32>,
    gateway_size: Option<f32>,
    event_size: Option<f32>,
    lane_label_margin: Option<f32>,
    lane_bottom_padding: Option<f32>,
    min_lane_height: Option<f32>,
    subprocess_padding: Option<f32>,
    max_expanded_depth: Option<usize>,
    edge_stub: Option<f32>,
    lane_jump_offset: Option<f32>,
    loop_clearance: Option<f32>,
    pool_header_width: Option<f32>,
    pool_spacing: Option<f32>,
    infer_lanes: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LintConfigFile {
    enabled: Option<bool>,
    require_start_event: Option<bool>,
    require_end_event: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    layout: Option<LayoutConfigFile>,
    lint: Option<LintConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = match serde_json::from_str(contents) {
        Ok(parsed) => parsed,
        // Hand-edited config files often carry comments or trailing commas.
        Err(strict_err) => json5::from_str(contents).map_err(|_| strict_err)?,
    };

    if let Some(layout) = parsed.layout {
        apply_layout_overrides(&mut config.layout, layout);
    }
    if let Some(lint) = parsed.lint {
        if let Some(v) = lint.enabled {
            config.lint.enabled = v;
        }
        if let Some(v) = lint.require_start_event {
            config.lint.require_start_event = v;
        }
        if let Some(v) = lint.require_end_event {
            config.lint.require_end_event = v;
        }
    }

    config.layout = sanitize(config.layout);
    Ok(config)
}

fn apply_layout_overrides(layout: &mut LayoutConfig, file: LayoutConfigFile) {
    if let Some(v) = file.start_x {
        layout.start_x = v;
    }
    if let Some(v) = file.start_y {
        layout.start_y = v;
    }
    if let Some(v) = file.margin {
        layout.margin = v;
    }
    if let Some(v) = file.horizontal_spacing {
        layout.horizontal_spacing = v;
    }
    if let Some(v) = file.vertical_spacing {
        layout.vertical_spacing = v;
    }
    if let Some(v) = file.activity_width {
        layout.activity_width = v;
    }
    if let Some(v) = file.activity_height {
        layout.activity_height = v;
    }
    if let Some(v) = file.gateway_size {
        layout.gateway_size = v;
    }
    if let Some(v) = file.event_size {
        layout.event_size = v;
    }
    if let Some(v) = file.lane_label_margin {
        layout.lane_label_margin = v;
    }
    if let Some(v) = file.lane_bottom_padding {
        layout.lane_bottom_padding = v;
    }
    if let Some(v) = file.min_lane_height {
        layout.min_lane_height = v;
    }
    if let Some(v) = file.subprocess_padding {
        layout.subprocess_padding = v;
    }
    if let Some(v) = file.max_expanded_depth {
        layout.max_expanded_depth = v;
    }
    if let Some(v) = file.edge_stub {
        layout.edge_stub = v;
    }
    if let Some(v) = file.lane_jump_offset {
        layout.lane_jump_offset = v;
    }
    if let Some(v) = file.loop_clearance {
        layout.loop_clearance = v;
    }
    if let Some(v) = file.pool_header_width {
        layout.pool_header_width = v;
    }
    if let Some(v) = file.pool_spacing {
        layout.pool_spacing = v;
    }
    if let Some(v) = file.infer_lanes {
        layout.infer_lanes = v;
    }
}

// Sizes must stay positive and offsets non-negative or emitted bounds could go negative.
fn sanitize(mut layout: LayoutConfig) -> LayoutConfig {
    layout.start_x = layout.start_x.max(0.0);
    layout.start_y = layout.start_y.max(0.0);
    layout.margin = layout.margin.max(0.0);
    layout.horizontal_spacing = layout.horizontal_spacing.max(1.0);
    layout.vertical_spacing = layout.vertical_spacing.max(0.0);
    layout.activity_width = layout.activity_width.max(1.0);
    layout.activity_height = layout.activity_height.max(1.0);
    layout.gateway_size = layout.gateway_size.max(1.0);
    layout.event_size = layout.event_size.max(1.0);
    layout.lane_label_margin = layout.lane_label_margin.max(0.0);
    layout.lane_bottom_padding = layout.lane_bottom_padding.max(0.0);
    layout.min_lane_height = layout.min_lane_height.max(1.0);
    layout.subprocess_padding = layout.subprocess_padding.max(0.0);
    layout.edge_stub = layout.edge_stub.max(0.0);
    layout.lane_jump_offset = layout.lane_jump_offset.max(0.0);
    layout.loop_clearance = layout.loop_clearance.max(0.0);
    layout.pool_header_width = layout.pool_header_width.max(0.0);
    layout.pool_spacing = layout.pool_spacing.max(0.0);
    layout
}
