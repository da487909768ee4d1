pub mod lanes;
mod placement;
pub mod ranking;
mod routing;
pub(crate) mod types;
pub use types::*;

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

use log::debug;

use crate::config::LayoutConfig;
use crate::error::Result;
use crate::ir::{Definitions, NodeKind, ProcessGraph};
use crate::validate::{validate_definitions, validate_graph};

use placement::{lane_assignment, place_nodes};
use routing::{FlowEnds, route_flow, route_message_flow};

/// Lays out `graph` with the default spacing constants.
pub fn layout(graph: &ProcessGraph) -> Result<Layout> {
    compute_layout(graph, &LayoutConfig::default())
}

/// Validates `graph` and computes geometry for it and every nested sub-process.
pub fn compute_layout(graph: &ProcessGraph, config: &LayoutConfig) -> Result<Layout> {
    validate_graph(graph)?;
    let layout = layout_scope(graph, config, 0);
    debug!(
        process = graph.id.as_str(),
        nodes = layout.node_count_recursive(),
        flows = layout.flow_count_recursive(),
        width = layout.width,
        height = layout.height;
        "Computed layout"
    );
    Ok(layout)
}

// Nested bodies are laid out from their own origin; the host adds the padding.
fn body_config(config: &LayoutConfig, body: &ProcessGraph) -> LayoutConfig {
    LayoutConfig {
        start_x: if body.lanes.is_empty() {
            0.0
        } else {
            config.pool_header_width
        },
        start_y: 0.0,
        margin: 0.0,
        ..config.clone()
    }
}

fn layout_scope(graph: &ProcessGraph, config: &LayoutConfig, depth: usize) -> Layout {
    let graph: Cow<'_, ProcessGraph> = if config.infer_lanes && lanes::needs_inference(graph) {
        Cow::Owned(lanes::infer_lane_membership(graph))
    } else {
        Cow::Borrowed(graph)
    };
    let levels = ranking::assign_levels(&graph);

    let mut sizes: HashMap<String, (f32, f32)> = HashMap::new();
    let mut sub_layouts = BTreeMap::new();
    for node in &graph.nodes {
        let NodeKind::SubProcess { expanded, body, .. } = &node.kind else {
            continue;
        };
        let inner = layout_scope(body, &body_config(config, body), depth + 1);
        let show_inline = *expanded && depth < config.max_expanded_depth;
        if show_inline {
            let padding = config.subprocess_padding;
            let width = (inner.width + 2.0 * padding).max(config.activity_width);
            let height = (inner.height + 2.0 * padding).max(config.activity_height);
            sizes.insert(node.id.clone(), (width, height));
        }
        debug!(
            sub_process = node.id.as_str(),
            depth = depth + 1,
            expanded = show_inline;
            "Laid out sub-process body"
        );
        sub_layouts.insert(
            node.id.clone(),
            SubLayout {
                expanded: show_inline,
                padding: config.subprocess_padding,
                layout: inner,
            },
        );
    }

    let placement = place_nodes(&graph, &levels, &sizes, config);

    let assignment = lane_assignment(&graph);
    let band_of = |node_id: &str| {
        assignment
            .get(node_id)
            .and_then(|idx| placement.lane_bands.get(*idx))
    };
    let mut flow_waypoints = BTreeMap::new();
    for flow in &graph.flows {
        let (Some(source), Some(target)) = (
            placement.node_bounds.get(&flow.source_ref),
            placement.node_bounds.get(&flow.target_ref),
        ) else {
            continue;
        };
        let ends = FlowEnds {
            source,
            target,
            source_band: band_of(&flow.source_ref),
            target_band: band_of(&flow.target_ref),
            self_loop: flow.source_ref == flow.target_ref,
        };
        flow_waypoints.insert(flow.id.clone(), route_flow(&ends, config));
    }

    let levels = graph
        .nodes
        .iter()
        .map(|node| (node.id.clone(), levels.get(&node.id)))
        .collect();

    Layout {
        node_bounds: placement.node_bounds,
        flow_waypoints,
        lane_bands: placement.lane_bands,
        levels,
        sub_layouts,
        width: placement.width,
        height: placement.height,
    }
}

/// Lays out every process of `defs`. With a collaboration, participants are
/// stacked top to bottom as pools and message flows are routed between them.
pub fn compute_definitions_layout(defs: &Definitions, config: &LayoutConfig) -> Result<DefinitionsLayout> {
    validate_definitions(defs)?;

    let mut result = DefinitionsLayout::default();
    for process in &defs.processes {
        result
            .processes
            .insert(process.id.clone(), layout_scope(process, config, 0));
    }

    let Some(collab) = &defs.collaboration else {
        result.width = result.processes.values().map(|l| l.width).fold(0.0, f32::max);
        result.height = result.processes.values().map(|l| l.height).fold(0.0, f32::max);
        return Ok(result);
    };

    let pool_width = collab
        .participants
        .iter()
        .filter_map(|participant| result.processes.get(&participant.process_ref))
        .map(|layout| layout.width)
        .fold(0.0f32, f32::max)
        + config.pool_header_width;

    let mut cursor_y = 0.0f32;
    for participant in &collab.participants {
        let Some(process_layout) = result.processes.get(&participant.process_ref) else {
            continue;
        };
        let bounds = Bounds::new(0.0, cursor_y, pool_width, process_layout.height);
        result.pools.push(PoolLayout {
            participant_id: participant.id.clone(),
            process_id: participant.process_ref.clone(),
            bounds,
            origin: (config.pool_header_width, cursor_y),
        });
        cursor_y = bounds.bottom() + config.pool_spacing;
    }

    for flow in &collab.message_flows {
        let (Some(source), Some(target)) = (
            message_endpoint(&result, &flow.source_ref),
            message_endpoint(&result, &flow.target_ref),
        ) else {
            continue;
        };
        result
            .message_flow_waypoints
            .insert(flow.id.clone(), route_message_flow(&source, &target));
    }

    result.width = pool_width + config.margin;
    result.height = result
        .pools
        .last()
        .map_or(0.0, |pool| pool.bounds.bottom())
        + config.margin;
    debug!(
        collaboration = collab.id.as_str(),
        pools = result.pools.len(),
        message_flows = result.message_flow_waypoints.len();
        "Computed collaboration layout"
    );
    Ok(result)
}

// A message flow endpoint is either a whole participant or a node inside one.
fn message_endpoint(layout: &DefinitionsLayout, reference: &str) -> Option<Bounds> {
    if let Some(pool) = layout.pool(reference) {
        return Some(pool.bounds);
    }
    layout.pools.iter().find_map(|pool| {
        layout
            .processes
            .get(&pool.process_id)?
            .find_absolute(reference, pool.origin)
    })
}
