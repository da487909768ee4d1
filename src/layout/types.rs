use std::collections::BTreeMap;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.height / 2.0
    }

    pub fn translate(&self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// True when `point` lies on or within `slack` of this rectangle.
    pub fn touches(&self, point: (f32, f32), slack: f32) -> bool {
        point.0 >= self.x - slack
            && point.0 <= self.right() + slack
            && point.1 >= self.y - slack
            && point.1 <= self.bottom() + slack
    }
}

/// Horizontal band of one lane; spans the full canvas width.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaneBand {
    pub lane_id: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl LaneBand {
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.x, self.y, self.width, self.height)
    }
}

/// Layout of a sub-process body, in coordinates local to the host's interior.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubLayout {
    /// Whether the host is drawn expanded with its body inline.
    pub expanded: bool,
    /// Offset of the body origin from the host's top-left corner.
    pub padding: f32,
    pub layout: Layout,
}

/// Geometry of one process scope. Nested scopes live in `sub_layouts`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Layout {
    pub node_bounds: BTreeMap<String, Bounds>,
    pub flow_waypoints: BTreeMap<String, Vec<(f32, f32)>>,
    pub lane_bands: Vec<LaneBand>,
    pub levels: BTreeMap<String, usize>,
    pub sub_layouts: BTreeMap<String, SubLayout>,
    pub width: f32,
    pub height: f32,
}

impl Layout {
    pub fn bounds(&self, node_id: &str) -> Option<&Bounds> {
        self.node_bounds.get(node_id)
    }

    pub fn waypoints(&self, flow_id: &str) -> Option<&[(f32, f32)]> {
        self.flow_waypoints.get(flow_id).map(Vec::as_slice)
    }

    pub fn node_count_recursive(&self) -> usize {
        self.node_bounds.len()
            + self
                .sub_layouts
                .values()
                .map(|sub| sub.layout.node_count_recursive())
                .sum::<usize>()
    }

    pub fn flow_count_recursive(&self) -> usize {
        self.flow_waypoints.len()
            + self
                .sub_layouts
                .values()
                .map(|sub| sub.layout.flow_count_recursive())
                .sum::<usize>()
    }

    /// Bounds of every node, nested scopes included, translated so this
    /// scope's origin sits at `origin`. Bodies of collapsed sub-processes keep
    /// the offset of their host as well.
    pub fn absolute_bounds(&self, origin: (f32, f32)) -> Vec<(String, Bounds)> {
        let mut out = Vec::with_capacity(self.node_bounds.len());
        for (id, bounds) in &self.node_bounds {
            out.push((id.clone(), bounds.translate(origin.0, origin.1)));
            if let Some(sub) = self.sub_layouts.get(id) {
                let child_origin = (
                    origin.0 + bounds.x + sub.padding,
                    origin.1 + bounds.y + sub.padding,
                );
                out.extend(sub.layout.absolute_bounds(child_origin));
            }
        }
        out
    }

    pub fn find_absolute(&self, node_id: &str, origin: (f32, f32)) -> Option<Bounds> {
        if let Some(bounds) = self.node_bounds.get(node_id) {
            return Some(bounds.translate(origin.0, origin.1));
        }
        self.sub_layouts.iter().find_map(|(host_id, sub)| {
            let host = self.node_bounds.get(host_id)?;
            let child_origin = (
                origin.0 + host.x + sub.padding,
                origin.1 + host.y + sub.padding,
            );
            sub.layout.find_absolute(node_id, child_origin)
        })
    }
}

/// One participant of a collaboration drawn as a horizontal pool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolLayout {
    pub participant_id: String,
    pub process_id: String,
    pub bounds: Bounds,
    /// Where the origin of the participant's process layout lands.
    pub origin: (f32, f32),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DefinitionsLayout {
    pub processes: BTreeMap<String, Layout>,
    pub pools: Vec<PoolLayout>,
    pub message_flow_waypoints: BTreeMap<String, Vec<(f32, f32)>>,
    pub width: f32,
    pub height: f32,
}

impl DefinitionsLayout {
    pub fn pool(&self, participant_id: &str) -> Option<&PoolLayout> {
        self.pools
            .iter()
            .find(|pool| pool.participant_id == participant_id)
    }

    pub fn pool_for_process(&self, process_id: &str) -> Option<&PoolLayout> {
        self.pools.iter().find(|pool| pool.process_id == process_id)
    }
}
