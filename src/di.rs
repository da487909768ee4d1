use log::debug;

use crate::error::{Result, StructuralError};
use crate::ir::{Definitions, GatewayVariant, NodeKind, ProcessGraph};
use crate::layout::{DefinitionsLayout, Layout};

pub const BPMNDI_NS: &str = "http://www.omg.org/spec/BPMN/20100524/DI";
pub const DC_NS: &str = "http://www.omg.org/spec/DD/20100524/DC";
pub const DI_NS: &str = "http://www.omg.org/spec/DD/20100524/DI";

/// Serialized `bpmndi:BPMNDiagram` elements, main diagram first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagramDocument {
    pub diagrams: Vec<String>,
}

impl DiagramDocument {
    pub fn to_xml(&self) -> String {
        self.diagrams.join("\n  ")
    }

    /// Splices the diagrams into `markup` right before the closing tag of its
    /// `definitions` root. Existing `BPMNDiagram` children are replaced where they
    /// stand; every other byte is kept.
    pub fn merge_into(&self, markup: &str) -> Result<String> {
        let doc = roxmltree::Document::parse(markup)?;
        let root = doc.root_element();
        if root.tag_name().name() != "definitions" {
            return Err(StructuralError::decode(format!(
                "expected a `definitions` root element, found `{}`",
                root.tag_name().name()
            )));
        }

        let existing: Vec<std::ops::Range<usize>> = root
            .children()
            .filter(|child| child.is_element() && child.tag_name().name() == "BPMNDiagram")
            .map(|child| child.range())
            .collect();
        let fragment = self.to_xml();

        let mut out = String::with_capacity(markup.len() + fragment.len() + 2);
        if let Some((first, rest)) = existing.split_first() {
            out.push_str(&markup[..first.start]);
            out.push_str(&fragment);
            let mut cursor = first.end;
            for range in rest {
                let gap = &markup[cursor..range.start];
                if !gap.trim().is_empty() {
                    out.push_str(gap);
                }
                cursor = range.end;
            }
            out.push_str(&markup[cursor..]);
        } else {
            let root_end = root.range().end;
            let close = markup[..root_end].rfind("</").ok_or_else(|| {
                StructuralError::decode("`definitions` root element has no closing tag")
            })?;
            out.push_str(&markup[..close]);
            out.push_str("  ");
            out.push_str(&fragment);
            out.push('\n');
            out.push_str(&markup[close..]);
        }
        debug!(replaced = existing.len(), diagrams = self.diagrams.len(); "Merged diagram interchange");
        Ok(out)
    }
}

fn coord(value: f32) -> i64 {
    value.round().max(0.0) as i64
}

pub(crate) fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

struct DiagramWriter {
    out: String,
    drill_downs: Vec<String>,
}

impl DiagramWriter {
    fn new() -> Self {
        Self {
            out: String::new(),
            drill_downs: Vec::new(),
        }
    }

    fn open_diagram(&mut self, element_id: &str) {
        let id = escape_xml(element_id);
        self.out.push_str(&format!(
            "<bpmndi:BPMNDiagram xmlns:bpmndi=\"{BPMNDI_NS}\" xmlns:dc=\"{DC_NS}\" xmlns:di=\"{DI_NS}\" id=\"BPMNDiagram_{id}\">\n"
        ));
        self.out.push_str(&format!(
            "    <bpmndi:BPMNPlane id=\"BPMNPlane_{id}\" bpmnElement=\"{id}\">\n"
        ));
    }

    fn close_diagram(&mut self) {
        self.out.push_str("    </bpmndi:BPMNPlane>\n");
        self.out.push_str("  </bpmndi:BPMNDiagram>");
    }

    fn shape(&mut self, element_id: &str, extra: &str, x: f32, y: f32, width: f32, height: f32) {
        let id = escape_xml(element_id);
        self.out.push_str(&format!(
            "      <bpmndi:BPMNShape id=\"{id}_di\" bpmnElement=\"{id}\"{extra}>\n"
        ));
        self.out.push_str(&format!(
            "        <dc:Bounds x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" />\n",
            coord(x),
            coord(y),
            coord(width),
            coord(height)
        ));
        self.out.push_str("      </bpmndi:BPMNShape>\n");
    }

    fn edge(&mut self, element_id: &str, points: &[(f32, f32)], origin: (f32, f32)) {
        let id = escape_xml(element_id);
        self.out.push_str(&format!(
            "      <bpmndi:BPMNEdge id=\"{id}_di\" bpmnElement=\"{id}\">\n"
        ));
        for (x, y) in points {
            self.out.push_str(&format!(
                "        <di:waypoint x=\"{}\" y=\"{}\" />\n",
                coord(x + origin.0),
                coord(y + origin.1)
            ));
        }
        self.out.push_str("      </bpmndi:BPMNEdge>\n");
    }

    /// Lanes, node shapes (recursing into expanded bodies) and then edges of
    /// one scope, shifted by `origin`.
    fn scope(&mut self, graph: &ProcessGraph, layout: &Layout, origin: (f32, f32)) {
        for band in &layout.lane_bands {
            self.shape(
                &band.lane_id,
                r#" isHorizontal="true""#,
                band.x + origin.0,
                band.y + origin.1,
                band.width,
                band.height,
            );
        }

        for node in &graph.nodes {
            let Some(bounds) = layout.bounds(&node.id) else {
                panic!("no bounds computed for node `{}`", node.id);
            };
            let bounds = bounds.translate(origin.0, origin.1);
            let sub = layout.sub_layouts.get(&node.id);
            let extra = match (&node.kind, sub) {
                (NodeKind::SubProcess { .. }, Some(sub)) => {
                    format!(r#" isExpanded="{}""#, sub.expanded)
                }
                (
                    NodeKind::Gateway {
                        variant: GatewayVariant::Exclusive,
                    },
                    _,
                ) => r#" isMarkerVisible="true""#.to_string(),
                _ => String::new(),
            };
            self.shape(&node.id, &extra, bounds.x, bounds.y, bounds.width, bounds.height);

            if let (Some(body), Some(sub)) = (node.body(), sub) {
                if sub.expanded {
                    let child_origin = (bounds.x + sub.padding, bounds.y + sub.padding);
                    self.scope(body, &sub.layout, child_origin);
                } else {
                    self.drill_down(&node.id, body, &sub.layout);
                }
            }
        }

        for flow in &graph.flows {
            if let Some(points) = layout.waypoints(&flow.id) {
                self.edge(&flow.id, points, origin);
            }
        }
    }

    // Collapsed sub-processes get their own diagram in local coordinates.
    fn drill_down(&mut self, element_id: &str, body: &ProcessGraph, layout: &Layout) {
        let mut nested = DiagramWriter::new();
        nested.open_diagram(element_id);
        nested.scope(body, layout, (0.0, 0.0));
        nested.close_diagram();
        self.drill_downs.push(nested.out);
        self.drill_downs.extend(nested.drill_downs);
    }

    fn finish(self, document: &mut DiagramDocument) {
        document.diagrams.push(self.out);
        document.diagrams.extend(self.drill_downs);
    }
}

/// DI for one process: a main diagram plus one drill-down diagram per
/// collapsed sub-process.
///
/// # Panics
///
/// Panics when `layout` lacks bounds for a node of `graph`.
pub fn serialize(graph: &ProcessGraph, layout: &Layout) -> DiagramDocument {
    let mut document = DiagramDocument::default();
    write_process_diagram(graph, layout, &mut document);
    document
}

fn write_process_diagram(graph: &ProcessGraph, layout: &Layout, document: &mut DiagramDocument) {
    let mut writer = DiagramWriter::new();
    writer.open_diagram(&graph.id);
    writer.scope(graph, layout, (0.0, 0.0));
    writer.close_diagram();
    writer.finish(document);
}

/// DI for a whole document. A collaboration gets one diagram holding every
/// pool; processes outside it get diagrams of their own.
///
/// # Panics
///
/// Panics when `layout` lacks geometry for a process or node of `defs`.
pub fn serialize_definitions(defs: &Definitions, layout: &DefinitionsLayout) -> DiagramDocument {
    let mut document = DiagramDocument::default();
    let process_layout = |id: &str| {
        layout
            .processes
            .get(id)
            .unwrap_or_else(|| panic!("no layout computed for process `{id}`"))
    };

    let Some(collab) = &defs.collaboration else {
        for process in &defs.processes {
            write_process_diagram(process, process_layout(&process.id), &mut document);
        }
        return document;
    };

    let mut writer = DiagramWriter::new();
    writer.open_diagram(&collab.id);
    for pool in &layout.pools {
        let bounds = pool.bounds;
        writer.shape(
            &pool.participant_id,
            r#" isHorizontal="true""#,
            bounds.x,
            bounds.y,
            bounds.width,
            bounds.height,
        );
        if let Some(process) = defs.process(&pool.process_id) {
            writer.scope(process, process_layout(&process.id), pool.origin);
        }
    }
    for flow in &collab.message_flows {
        if let Some(points) = layout.message_flow_waypoints.get(&flow.id) {
            writer.edge(&flow.id, points, (0.0, 0.0));
        }
    }
    writer.close_diagram();
    writer.finish(&mut document);

    for process in &defs.processes {
        if layout.pool_for_process(&process.id).is_none() {
            write_process_diagram(process, process_layout(&process.id), &mut document);
        }
    }
    document
}
