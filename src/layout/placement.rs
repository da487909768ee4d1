use std::collections::{BTreeMap, HashMap, HashSet};

use log::trace;

use crate::config::LayoutConfig;
use crate::ir::{Node, NodeKind, ProcessGraph};

use super::ranking::Levels;
use super::{Bounds, LaneBand};

/// Positions of one scope's nodes and lane bands before routing.
#[derive(Debug, Clone, Default)]
pub(super) struct Placement {
    pub node_bounds: BTreeMap<String, Bounds>,
    pub lane_bands: Vec<LaneBand>,
    pub width: f32,
    pub height: f32,
}

/// Default footprint of `node`. Expanded sub-processes are sized by the caller.
pub(super) fn base_size(node: &Node, config: &LayoutConfig) -> (f32, f32) {
    match node.kind {
        NodeKind::Event { .. } => (config.event_size, config.event_size),
        NodeKind::Gateway { .. } => (config.gateway_size, config.gateway_size),
        NodeKind::Activity { .. } | NodeKind::SubProcess { .. } => {
            (config.activity_width, config.activity_height)
        }
    }
}

/// Lane index per node. Nodes outside every lane fall back to the first lane;
/// boundary events follow their host.
pub(super) fn lane_assignment(graph: &ProcessGraph) -> HashMap<String, usize> {
    let mut assignment = HashMap::new();
    if graph.lanes.is_empty() {
        return assignment;
    }
    for node in graph.nodes.iter().filter(|node| !node.is_boundary_event()) {
        let lane = graph.lane_of(&node.id).unwrap_or(0);
        assignment.insert(node.id.clone(), lane);
    }
    for node in graph.nodes.iter().filter(|node| node.is_boundary_event()) {
        let lane = node
            .attached_to()
            .and_then(|host| assignment.get(host).copied())
            .or_else(|| graph.lane_of(&node.id))
            .unwrap_or(0);
        assignment.insert(node.id.clone(), lane);
    }
    assignment
}

pub(super) fn place_nodes(
    graph: &ProcessGraph,
    levels: &Levels,
    sizes: &HashMap<String, (f32, f32)>,
    config: &LayoutConfig,
) -> Placement {
    let size_of = |node: &Node| {
        sizes
            .get(&node.id)
            .copied()
            .unwrap_or_else(|| base_size(node, config))
    };
    let regular: Vec<&Node> = graph
        .nodes
        .iter()
        .filter(|node| !node.is_boundary_event())
        .collect();
    // Hosts carry boundary events that hang half an event below their bottom edge.
    let hosts: HashSet<&str> = graph.nodes.iter().filter_map(Node::attached_to).collect();
    let reach_of = |node: &Node, bottom: f32| {
        if hosts.contains(node.id.as_str()) {
            bottom + config.event_size / 2.0
        } else {
            bottom
        }
    };

    let column_count = levels.max_level() + 1;
    let mut column_widths = vec![config.activity_width; column_count];
    for node in &regular {
        let level = levels.get(&node.id);
        let (width, _) = size_of(node);
        if level < column_count && width > column_widths[level] {
            column_widths[level] = width;
        }
    }
    let mut column_x = Vec::with_capacity(column_count);
    let mut cursor = config.start_x;
    for width in &column_widths {
        column_x.push(cursor);
        cursor += width + config.horizontal_spacing;
    }

    let mut placement = Placement::default();
    let mut place_column = |node: &Node, top: f32| -> f32 {
        let level = levels.get(&node.id).min(column_count - 1);
        let (width, height) = size_of(node);
        let slot = height.max(config.activity_height);
        let x = column_x[level] + (column_widths[level] - width) / 2.0;
        let y = top + (slot - height) / 2.0;
        placement
            .node_bounds
            .insert(node.id.clone(), Bounds::new(x, y, width, height));
        trace!(node = node.id.as_str(), level = level, x = x, y = y; "Placed node");
        top + slot
    };

    if graph.lanes.is_empty() {
        let mut column_cursor = vec![config.start_y; column_count];
        for node in &regular {
            let level = levels.get(&node.id).min(column_count - 1);
            let bottom = place_column(node, column_cursor[level]);
            column_cursor[level] = (bottom + config.vertical_spacing).max(reach_of(node, bottom));
        }
    } else {
        let assignment = lane_assignment(graph);
        let mut band_y = 0.0f32;
        for (lane_idx, lane) in graph.lanes.iter().enumerate() {
            let content_top = band_y + config.lane_label_margin;
            let mut column_cursor = vec![content_top; column_count];
            let mut content_bottom = content_top;
            for node in regular
                .iter()
                .filter(|node| assignment.get(&node.id) == Some(&lane_idx))
            {
                let level = levels.get(&node.id).min(column_count - 1);
                let bottom = place_column(node, column_cursor[level]);
                let reach = reach_of(node, bottom);
                column_cursor[level] = (bottom + config.vertical_spacing).max(reach);
                content_bottom = content_bottom.max(reach);
            }
            let height = (content_bottom - band_y + config.lane_bottom_padding)
                .max(config.min_lane_height);
            placement.lane_bands.push(LaneBand {
                lane_id: lane.id.clone(),
                x: 0.0,
                y: band_y,
                width: 0.0,
                height,
            });
            band_y += height;
        }
    }

    place_boundary_events(graph, &mut placement.node_bounds, config);

    let (mut width, mut height) = placement
        .node_bounds
        .values()
        .fold((0.0f32, 0.0f32), |(w, h), b| (w.max(b.right()), h.max(b.bottom())));
    if placement.node_bounds.is_empty() {
        width = config.start_x + config.activity_width;
        height = config.start_y + config.activity_height;
    }
    width += config.margin;
    height += config.margin;
    if let Some(last) = placement.lane_bands.last() {
        height = height.max(last.bottom());
    }
    for band in &mut placement.lane_bands {
        band.width = width;
    }
    placement.width = width;
    placement.height = height;
    placement
}

// Boundary events straddle the bottom edge of their host, spread evenly when
// several share one host.
fn place_boundary_events(
    graph: &ProcessGraph,
    node_bounds: &mut BTreeMap<String, Bounds>,
    config: &LayoutConfig,
) {
    let mut by_host: Vec<(&str, Vec<&Node>)> = Vec::new();
    for node in graph.nodes.iter().filter(|node| node.is_boundary_event()) {
        let host = node.attached_to().unwrap_or_default();
        match by_host.iter_mut().find(|(id, _)| *id == host) {
            Some((_, events)) => events.push(node),
            None => by_host.push((host, vec![node])),
        }
    }

    for (host_id, events) in by_host {
        let Some(host) = node_bounds.get(host_id).copied() else {
            for node in events {
                let size = config.event_size;
                node_bounds.insert(
                    node.id.clone(),
                    Bounds::new(config.start_x, config.start_y, size, size),
                );
            }
            continue;
        };
        let count = events.len() as f32;
        for (idx, node) in events.into_iter().enumerate() {
            let size = config.event_size;
            let center_x = host.x + host.width * (idx as f32 + 1.0) / (count + 1.0);
            let bounds = Bounds::new(center_x - size / 2.0, host.bottom() - size / 2.0, size, size);
            node_bounds.insert(node.id.clone(), bounds);
        }
    }
}
