use crate::di::escape_xml;
use crate::ir::{Definitions, NodeKind, ProcessGraph};

pub const MODEL_NS: &str = "http://www.omg.org/spec/BPMN/20100524/MODEL";
const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
const TARGET_NS: &str = "http://bpmn.io/schema/bpmn";

fn name_attr(name: Option<&str>) -> String {
    name.map(|name| format!(r#" name="{}""#, escape_xml(name)))
        .unwrap_or_default()
}

/// Writes the structural part of `defs` as BPMN 2.0 XML, without any DI. The
/// result parses back into an equal model, collapsed flags aside.
pub fn write_definitions(defs: &Definitions) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str(&format!(
        "<bpmn:definitions xmlns:bpmn=\"{MODEL_NS}\" xmlns:xsi=\"{XSI_NS}\" id=\"{}\" targetNamespace=\"{TARGET_NS}\">\n",
        escape_xml(&defs.id)
    ));

    if let Some(collab) = &defs.collaboration {
        out.push_str(&format!(
            "  <bpmn:collaboration id=\"{}\">\n",
            escape_xml(&collab.id)
        ));
        for participant in &collab.participants {
            out.push_str(&format!(
                "    <bpmn:participant id=\"{}\"{} processRef=\"{}\" />\n",
                escape_xml(&participant.id),
                name_attr(participant.name.as_deref()),
                escape_xml(&participant.process_ref)
            ));
        }
        for flow in &collab.message_flows {
            out.push_str(&format!(
                "    <bpmn:messageFlow id=\"{}\"{} sourceRef=\"{}\" targetRef=\"{}\" />\n",
                escape_xml(&flow.id),
                name_attr(flow.name.as_deref()),
                escape_xml(&flow.source_ref),
                escape_xml(&flow.target_ref)
            ));
        }
        out.push_str("  </bpmn:collaboration>\n");
    }

    for process in &defs.processes {
        out.push_str(&format!(
            "  <bpmn:process id=\"{}\"{} isExecutable=\"false\">\n",
            escape_xml(&process.id),
            name_attr(process.name.as_deref())
        ));
        write_scope(&mut out, process, 2);
        out.push_str("  </bpmn:process>\n");
    }
    out.push_str("</bpmn:definitions>\n");
    out
}

fn write_scope(out: &mut String, graph: &ProcessGraph, depth: usize) {
    let pad = "  ".repeat(depth);

    if !graph.lanes.is_empty() {
        out.push_str(&format!(
            "{pad}<bpmn:laneSet id=\"LaneSet_{}\">\n",
            escape_xml(&graph.id)
        ));
        for lane in &graph.lanes {
            out.push_str(&format!(
                "{pad}  <bpmn:lane id=\"{}\"{}>\n",
                escape_xml(&lane.id),
                name_attr(Some(lane.name.as_str()))
            ));
            // Declaration order keeps the output stable across round trips.
            for node in graph.nodes.iter().filter(|node| lane.members.contains(&node.id)) {
                out.push_str(&format!(
                    "{pad}    <bpmn:flowNodeRef>{}</bpmn:flowNodeRef>\n",
                    escape_xml(&node.id)
                ));
            }
            out.push_str(&format!("{pad}  </bpmn:lane>\n"));
        }
        out.push_str(&format!("{pad}</bpmn:laneSet>\n"));
    }

    for node in &graph.nodes {
        let id = escape_xml(&node.id);
        let name = name_attr(node.name.as_deref());
        match &node.kind {
            NodeKind::Event { role, attached_to } => {
                let attached = attached_to
                    .as_deref()
                    .map(|host| format!(r#" attachedToRef="{}""#, escape_xml(host)))
                    .unwrap_or_default();
                out.push_str(&format!(
                    "{pad}<bpmn:{} id=\"{id}\"{name}{attached} />\n",
                    role.tag()
                ));
            }
            NodeKind::Activity { variant } => {
                out.push_str(&format!(
                    "{pad}<bpmn:{} id=\"{id}\"{name} />\n",
                    variant.tag()
                ));
            }
            NodeKind::Gateway { variant } => {
                out.push_str(&format!(
                    "{pad}<bpmn:{} id=\"{id}\"{name} />\n",
                    variant.tag()
                ));
            }
            NodeKind::SubProcess {
                triggered_by_event,
                body,
                ..
            } => {
                out.push_str(&format!(
                    "{pad}<bpmn:subProcess id=\"{id}\"{name} triggeredByEvent=\"{triggered_by_event}\">\n"
                ));
                write_scope(out, body, depth + 1);
                out.push_str(&format!("{pad}</bpmn:subProcess>\n"));
            }
        }
    }

    for flow in &graph.flows {
        let id = escape_xml(&flow.id);
        let name = name_attr(flow.name.as_deref());
        let source = escape_xml(&flow.source_ref);
        let target = escape_xml(&flow.target_ref);
        match &flow.condition_expression {
            Some(condition) => {
                out.push_str(&format!(
                    "{pad}<bpmn:sequenceFlow id=\"{id}\"{name} sourceRef=\"{source}\" targetRef=\"{target}\">\n"
                ));
                out.push_str(&format!(
                    "{pad}  <bpmn:conditionExpression xsi:type=\"bpmn:tFormalExpression\">{}</bpmn:conditionExpression>\n",
                    escape_xml(condition)
                ));
                out.push_str(&format!("{pad}</bpmn:sequenceFlow>\n"));
            }
            None => {
                out.push_str(&format!(
                    "{pad}<bpmn:sequenceFlow id=\"{id}\"{name} sourceRef=\"{source}\" targetRef=\"{target}\" />\n"
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ActivityVariant, EventRole, Flow, Lane, Node};
    use crate::parser::{parse_bpmn, parse_json};

    #[test]
    fn written_markup_parses_back_to_the_same_model() {
        let mut body = ProcessGraph::new("Sub");
        // Bodies carry the name of their sub-process once parsed.
        body.name = Some("Handle \"claim\"".to_string());
        body.nodes.push(Node::new(
            "Inner",
            Some("Inner <step>"),
            NodeKind::Activity {
                variant: ActivityVariant::ScriptTask,
            },
        ));
        let mut graph = ProcessGraph::new("P");
        graph.nodes.push(Node::new(
            "S",
            Some("Start"),
            NodeKind::Event {
                role: EventRole::Start,
                attached_to: None,
            },
        ));
        graph.nodes.push(Node::new(
            "Sub",
            Some("Handle \"claim\""),
            NodeKind::SubProcess {
                expanded: true,
                triggered_by_event: false,
                body,
            },
        ));
        graph.nodes.push(Node::new(
            "T",
            None,
            NodeKind::Event {
                role: EventRole::Boundary,
                attached_to: Some("Sub".to_string()),
            },
        ));
        let mut flow = Flow::new("f1", "S", "Sub");
        flow.condition_expression = Some("amount > 10 & ok".to_string());
        graph.flows.push(flow);
        let mut lane = Lane::new("L1", "Clerks");
        lane.members.extend(["S".to_string(), "Sub".to_string(), "T".to_string()]);
        graph.lanes.push(lane);

        let defs = Definitions::single(graph);
        let xml = write_definitions(&defs);
        let parsed = parse_bpmn(&xml).unwrap();
        assert_eq!(parsed.processes, defs.processes);
    }

    #[test]
    fn json_documents_can_be_merged_after_writing() {
        let json = r#"{
            "id": "P",
            "nodes": [
                { "id": "S", "kind": { "type": "event", "role": "start" } },
                { "id": "A", "name": "Work", "kind": { "type": "activity" } }
            ],
            "flows": [{ "id": "f1", "sourceRef": "S", "targetRef": "A" }]
        }"#;
        let defs = parse_json(json).unwrap();
        let xml = write_definitions(&defs);
        assert!(xml.contains(r#"<bpmn:startEvent id="S" />"#));
        assert!(xml.contains(r#"<bpmn:task id="A" name="Work" />"#));
        assert!(xml.ends_with("</bpmn:definitions>\n"));
    }
}
