use crate::config::LayoutConfig;

use super::{Bounds, LaneBand};

/// Rows closer than this are treated as aligned.
const ALIGN_EPSILON: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum EdgeSide {
    Left,
    Right,
    Top,
    Bottom,
}

pub(super) fn anchor_point(bounds: &Bounds, side: EdgeSide) -> (f32, f32) {
    match side {
        EdgeSide::Left => (bounds.x, bounds.center_y()),
        EdgeSide::Right => (bounds.right(), bounds.center_y()),
        EdgeSide::Top => (bounds.center_x(), bounds.y),
        EdgeSide::Bottom => (bounds.center_x(), bounds.bottom()),
    }
}

/// Drops consecutive duplicates while keeping both endpoints.
pub(super) fn dedup_points(points: Vec<(f32, f32)>) -> Vec<(f32, f32)> {
    if points.len() <= 2 {
        return points;
    }
    let last = points[points.len() - 1];
    let mut out: Vec<(f32, f32)> = Vec::with_capacity(points.len());
    for point in &points[..points.len() - 1] {
        if out
            .last()
            .is_some_and(|prev| (prev.0 - point.0).abs() <= 1e-4 && (prev.1 - point.1).abs() <= 1e-4)
        {
            continue;
        }
        out.push(*point);
    }
    if out.len() > 1
        && out
            .last()
            .is_some_and(|prev| (prev.0 - last.0).abs() <= 1e-4 && (prev.1 - last.1).abs() <= 1e-4)
    {
        out.pop();
    }
    out.push(last);
    out
}

/// Endpoints of one sequence flow after placement.
pub(super) struct FlowEnds<'a> {
    pub source: &'a Bounds,
    pub target: &'a Bounds,
    pub source_band: Option<&'a LaneBand>,
    pub target_band: Option<&'a LaneBand>,
    pub self_loop: bool,
}

pub(super) fn route_flow(ends: &FlowEnds<'_>, config: &LayoutConfig) -> Vec<(f32, f32)> {
    if ends.self_loop {
        return route_self_loop(ends.source, config);
    }
    match (ends.source_band, ends.target_band) {
        (Some(from), Some(to)) if from.lane_id != to.lane_id => {
            route_cross_lane(ends.source, ends.target, from, to, config)
        }
        _ => route_same_lane(ends.source, ends.target, config),
    }
}

fn route_same_lane(source: &Bounds, target: &Bounds, config: &LayoutConfig) -> Vec<(f32, f32)> {
    let start = anchor_point(source, EdgeSide::Right);
    let end = anchor_point(target, EdgeSide::Left);

    if target.x >= source.right() {
        if (start.1 - end.1).abs() <= ALIGN_EPSILON {
            return vec![start, (end.0, start.1)];
        }
        let mid_x = (start.0 + end.0) / 2.0;
        return vec![start, (mid_x, start.1), (mid_x, end.1), end];
    }

    // Backward or overlapping: run underneath both shapes.
    let start = anchor_point(source, EdgeSide::Bottom);
    let end = anchor_point(target, EdgeSide::Bottom);
    let below = source.bottom().max(target.bottom()) + config.loop_clearance;
    vec![start, (start.0, below), (end.0, below), end]
}

fn route_cross_lane(
    source: &Bounds,
    target: &Bounds,
    from: &LaneBand,
    to: &LaneBand,
    config: &LayoutConfig,
) -> Vec<(f32, f32)> {
    let start = anchor_point(source, EdgeSide::Right);
    let end = anchor_point(target, EdgeSide::Left);

    let jump_y = if to.y >= from.bottom() {
        from.bottom() + config.lane_jump_offset
    } else if to.bottom() <= from.y {
        from.y - config.lane_jump_offset
    } else {
        (start.1 + end.1) / 2.0
    };

    // A forward gap too narrow for two stubs is split in thirds so the route
    // never doubles back and keeps all six points.
    let gap = end.0 - start.0;
    let stub = if gap > 0.0 && config.edge_stub * 2.0 >= gap {
        gap / 3.0
    } else {
        config.edge_stub
    };
    let exit_x = start.0 + stub;
    let entry_x = end.0 - stub;
    dedup_points(vec![
        start,
        (exit_x, start.1),
        (exit_x, jump_y),
        (entry_x, jump_y),
        (entry_x, end.1),
        end,
    ])
}

fn route_self_loop(bounds: &Bounds, config: &LayoutConfig) -> Vec<(f32, f32)> {
    let start = anchor_point(bounds, EdgeSide::Right);
    let end = anchor_point(bounds, EdgeSide::Top);
    let out_x = start.0 + config.edge_stub;
    let above = bounds.y - config.loop_clearance;
    vec![start, (out_x, start.1), (out_x, above), (end.0, above), end]
}

/// Vertical orthogonal route between two shapes in different pools.
pub(super) fn route_message_flow(source: &Bounds, target: &Bounds) -> Vec<(f32, f32)> {
    let (start, end) = if target.y >= source.bottom() {
        (
            anchor_point(source, EdgeSide::Bottom),
            anchor_point(target, EdgeSide::Top),
        )
    } else if target.bottom() <= source.y {
        (
            anchor_point(source, EdgeSide::Top),
            anchor_point(target, EdgeSide::Bottom),
        )
    } else {
        let start = anchor_point(source, EdgeSide::Right);
        let end = anchor_point(target, EdgeSide::Left);
        let mid_x = (start.0 + end.0) / 2.0;
        return vec![start, (mid_x, start.1), (mid_x, end.1), end];
    };
    let mid_y = (start.1 + end.1) / 2.0;
    vec![start, (start.0, mid_y), (end.0, mid_y), end]
}
