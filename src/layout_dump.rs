use crate::ir::{Definitions, NodeKind, ProcessGraph};
use crate::layout::{DefinitionsLayout, Layout};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Flattened geometry of a whole document in absolute canvas coordinates.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDump {
    pub width: f32,
    pub height: f32,
    pub pools: Vec<PoolDump>,
    pub lanes: Vec<LaneDump>,
    pub nodes: Vec<NodeDump>,
    pub flows: Vec<FlowDump>,
    pub message_flows: Vec<FlowDump>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolDump {
    pub participant: String,
    pub process: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaneDump {
    pub id: String,
    pub scope: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDump {
    pub id: String,
    pub kind: String,
    pub scope: String,
    pub level: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expanded: Option<bool>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowDump {
    pub id: String,
    pub from: String,
    pub to: String,
    pub points: Vec<[f32; 2]>,
}

fn kind_name(kind: &NodeKind) -> &'static str {
    match kind {
        NodeKind::Event { role, .. } => role.tag(),
        NodeKind::Activity { variant } => variant.tag(),
        NodeKind::Gateway { variant } => variant.tag(),
        NodeKind::SubProcess { .. } => "subProcess",
    }
}

impl LayoutDump {
    pub fn from_layout(defs: &Definitions, layout: &DefinitionsLayout) -> Self {
        let mut dump = LayoutDump {
            width: layout.width,
            height: layout.height,
            pools: Vec::new(),
            lanes: Vec::new(),
            nodes: Vec::new(),
            flows: Vec::new(),
            message_flows: Vec::new(),
        };

        for pool in &layout.pools {
            dump.pools.push(PoolDump {
                participant: pool.participant_id.clone(),
                process: pool.process_id.clone(),
                x: pool.bounds.x,
                y: pool.bounds.y,
                width: pool.bounds.width,
                height: pool.bounds.height,
            });
        }

        for process in &defs.processes {
            let Some(process_layout) = layout.processes.get(&process.id) else {
                continue;
            };
            let origin = layout
                .pool_for_process(&process.id)
                .map_or((0.0, 0.0), |pool| pool.origin);
            dump.push_scope(process, process_layout, origin);
        }

        if let Some(collab) = &defs.collaboration {
            for flow in &collab.message_flows {
                if let Some(points) = layout.message_flow_waypoints.get(&flow.id) {
                    dump.message_flows.push(FlowDump {
                        id: flow.id.clone(),
                        from: flow.source_ref.clone(),
                        to: flow.target_ref.clone(),
                        points: points.iter().map(|(x, y)| [*x, *y]).collect(),
                    });
                }
            }
        }
        dump
    }

    fn push_scope(&mut self, graph: &ProcessGraph, layout: &Layout, origin: (f32, f32)) {
        for band in &layout.lane_bands {
            self.lanes.push(LaneDump {
                id: band.lane_id.clone(),
                scope: graph.id.clone(),
                x: band.x + origin.0,
                y: band.y + origin.1,
                width: band.width,
                height: band.height,
            });
        }
        for node in &graph.nodes {
            let Some(bounds) = layout.bounds(&node.id) else {
                continue;
            };
            let bounds = bounds.translate(origin.0, origin.1);
            let sub = layout.sub_layouts.get(&node.id);
            self.nodes.push(NodeDump {
                id: node.id.clone(),
                kind: kind_name(&node.kind).to_string(),
                scope: graph.id.clone(),
                level: layout.levels.get(&node.id).copied().unwrap_or(0),
                expanded: sub.map(|sub| sub.expanded),
                x: bounds.x,
                y: bounds.y,
                width: bounds.width,
                height: bounds.height,
            });
            // Bodies of collapsed sub-processes are not on this canvas.
            if let (Some(body), Some(sub)) = (node.body(), sub)
                && sub.expanded
            {
                let child_origin = (bounds.x + sub.padding, bounds.y + sub.padding);
                self.push_scope(body, &sub.layout, child_origin);
            }
        }
        for flow in &graph.flows {
            if let Some(points) = layout.waypoints(&flow.id) {
                self.flows.push(FlowDump {
                    id: flow.id.clone(),
                    from: flow.source_ref.clone(),
                    to: flow.target_ref.clone(),
                    points: points
                        .iter()
                        .map(|(x, y)| [x + origin.0, y + origin.1])
                        .collect(),
                });
            }
        }
    }
}

pub fn write_layout_dump(path: &Path, defs: &Definitions, layout: &DefinitionsLayout) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_layout(defs, layout);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::layout::compute_definitions_layout;
    use crate::parser::parse_json;

    #[test]
    fn dump_lists_every_visible_node_and_flow() {
        let defs = parse_json(
            r#"{
                "id": "P",
                "nodes": [
                    { "id": "S", "kind": { "type": "event", "role": "start" } },
                    { "id": "Sub", "kind": { "type": "subProcess", "body": {
                        "id": "Sub",
                        "nodes": [{ "id": "X", "kind": { "type": "activity" } }]
                    } } }
                ],
                "flows": [{ "id": "f1", "sourceRef": "S", "targetRef": "Sub" }]
            }"#,
        )
        .unwrap();
        let layout = compute_definitions_layout(&defs, &LayoutConfig::default()).unwrap();
        let dump = LayoutDump::from_layout(&defs, &layout);
        let ids: Vec<&str> = dump.nodes.iter().map(|node| node.id.as_str()).collect();
        assert_eq!(ids, vec!["S", "Sub", "X"]);
        assert_eq!(dump.nodes[1].expanded, Some(true));
        assert_eq!(dump.flows.len(), 1);

        let json = serde_json::to_value(&dump).unwrap();
        assert_eq!(json["nodes"][0]["kind"], "startEvent");
        assert!(json.get("messageFlows").is_some());
    }
}
