use std::collections::{BTreeSet, HashSet};

use log::{debug, trace};
use roxmltree::Node as XmlNode;

use crate::error::{Result, StructuralError};
use crate::ir::{
    ActivityVariant, Collaboration, Definitions, EventRole, Flow, GatewayVariant, Lane,
    MessageFlow, Node, NodeKind, Participant, ProcessGraph,
};
use crate::validate::validate_definitions;

/// Decodes BPMN 2.0 XML into a validated [`Definitions`] tree.
pub fn parse_bpmn(input: &str) -> Result<Definitions> {
    let doc = roxmltree::Document::parse(input)?;
    let root = doc.root_element();
    if root.tag_name().name() != "definitions" {
        return Err(StructuralError::decode(format!(
            "expected a `definitions` root element, found `{}`",
            root.tag_name().name()
        )));
    }

    let collapsed = collapsed_sub_processes(root);
    let mut defs = Definitions {
        id: root.attribute("id").unwrap_or("Definitions_1").to_string(),
        processes: Vec::new(),
        collaboration: None,
    };

    for child in root.children().filter(XmlNode::is_element) {
        match child.tag_name().name() {
            "process" => {
                let id = required_attr(child, "id")?;
                let process = parse_scope(child, id, &collapsed)?;
                defs.processes.push(process);
            }
            "collaboration" => {
                defs.collaboration = Some(parse_collaboration(child)?);
            }
            other => trace!(element = other; "Skipping top-level element"),
        }
    }

    validate_definitions(&defs)?;
    debug!(
        processes = defs.processes.len(),
        pools = defs.collaboration.as_ref().map_or(0, |c| c.participants.len());
        "Parsed BPMN document"
    );
    Ok(defs)
}

/// Decodes the JSON form of the structure model. Accepts either a whole
/// `Definitions` document or a bare process graph, and tolerates JSON5 syntax.
pub fn parse_json(input: &str) -> Result<Definitions> {
    let value = match serde_json::from_str::<serde_json::Value>(input) {
        Ok(value) => value,
        Err(strict_err) => json5::from_str::<serde_json::Value>(input)
            .map_err(|_| StructuralError::from(strict_err))?,
    };

    let defs = if value.get("processes").is_some() {
        serde_json::from_value::<Definitions>(value)?
    } else {
        let mut process = serde_json::from_value::<ProcessGraph>(value)?;
        if process.id.is_empty() {
            process.id = "Process_1".to_string();
        }
        Definitions::single(process)
    };

    validate_definitions(&defs)?;
    debug!(processes = defs.processes.len(); "Parsed JSON document");
    Ok(defs)
}

fn required_attr<'a>(node: XmlNode<'a, '_>, name: &str) -> Result<&'a str> {
    node.attribute(name).ok_or_else(|| {
        StructuralError::decode(format!(
            "`{}` element is missing the `{name}` attribute",
            node.tag_name().name()
        ))
    })
}

fn optional_name(node: XmlNode<'_, '_>) -> Option<String> {
    node.attribute("name")
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

// Sub-processes an existing DI block already shows collapsed.
fn collapsed_sub_processes(root: XmlNode<'_, '_>) -> HashSet<String> {
    root.descendants()
        .filter(|node| node.is_element() && node.tag_name().name() == "BPMNShape")
        .filter(|node| node.attribute("isExpanded") == Some("false"))
        .filter_map(|node| node.attribute("bpmnElement").map(str::to_string))
        .collect()
}

fn parse_scope(elem: XmlNode<'_, '_>, id: &str, collapsed: &HashSet<String>) -> Result<ProcessGraph> {
    let mut graph = ProcessGraph {
        id: id.to_string(),
        name: optional_name(elem),
        ..Default::default()
    };

    for child in elem.children().filter(XmlNode::is_element) {
        let tag = child.tag_name().name();
        if let Some(role) = event_role(tag) {
            let attached_to = match role {
                EventRole::Boundary => Some(required_attr(child, "attachedToRef")?.to_string()),
                _ => None,
            };
            graph.nodes.push(Node {
                id: required_attr(child, "id")?.to_string(),
                name: optional_name(child),
                kind: NodeKind::Event { role, attached_to },
            });
        } else if let Some(variant) = ActivityVariant::from_tag(tag) {
            graph.nodes.push(Node {
                id: required_attr(child, "id")?.to_string(),
                name: optional_name(child),
                kind: NodeKind::Activity { variant },
            });
        } else if let Some(variant) = GatewayVariant::from_tag(tag) {
            graph.nodes.push(Node {
                id: required_attr(child, "id")?.to_string(),
                name: optional_name(child),
                kind: NodeKind::Gateway { variant },
            });
        } else {
            match tag {
                "subProcess" | "transaction" | "adHocSubProcess" => {
                    let sub_id = required_attr(child, "id")?;
                    let body = parse_scope(child, sub_id, collapsed)?;
                    graph.nodes.push(Node {
                        id: sub_id.to_string(),
                        name: optional_name(child),
                        kind: NodeKind::SubProcess {
                            expanded: !collapsed.contains(sub_id),
                            triggered_by_event: child.attribute("triggeredByEvent") == Some("true"),
                            body,
                        },
                    });
                }
                "sequenceFlow" => graph.flows.push(parse_sequence_flow(child)?),
                "laneSet" => collect_lanes(child, &mut graph.lanes)?,
                other => trace!(element = other, scope = id; "Skipping element without geometry"),
            }
        }
    }

    Ok(graph)
}

fn event_role(tag: &str) -> Option<EventRole> {
    match tag {
        "startEvent" => Some(EventRole::Start),
        "endEvent" => Some(EventRole::End),
        "intermediateCatchEvent" => Some(EventRole::IntermediateCatch),
        "intermediateThrowEvent" => Some(EventRole::IntermediateThrow),
        "boundaryEvent" => Some(EventRole::Boundary),
        _ => None,
    }
}

fn parse_sequence_flow(elem: XmlNode<'_, '_>) -> Result<Flow> {
    let condition_expression = elem
        .children()
        .find(|child| child.is_element() && child.tag_name().name() == "conditionExpression")
        .and_then(|cond| cond.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string);
    Ok(Flow {
        id: required_attr(elem, "id")?.to_string(),
        source_ref: required_attr(elem, "sourceRef")?.to_string(),
        target_ref: required_attr(elem, "targetRef")?.to_string(),
        name: optional_name(elem),
        condition_expression,
    })
}

// Nested lane sets are flattened to their leaf lanes: bands are one level deep.
fn collect_lanes(lane_set: XmlNode<'_, '_>, lanes: &mut Vec<Lane>) -> Result<()> {
    for lane in lane_set
        .children()
        .filter(|child| child.is_element() && child.tag_name().name() == "lane")
    {
        let child_set = lane
            .children()
            .find(|child| child.is_element() && child.tag_name().name() == "childLaneSet");
        if let Some(child_set) = child_set {
            collect_lanes(child_set, lanes)?;
            continue;
        }
        let members: BTreeSet<String> = lane
            .children()
            .filter(|child| child.is_element() && child.tag_name().name() == "flowNodeRef")
            .filter_map(|child| child.text())
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
            .collect();
        lanes.push(Lane {
            id: required_attr(lane, "id")?.to_string(),
            name: lane.attribute("name").unwrap_or_default().trim().to_string(),
            members,
        });
    }
    Ok(())
}

fn parse_collaboration(elem: XmlNode<'_, '_>) -> Result<Collaboration> {
    let mut participants = Vec::new();
    let mut black_boxes = HashSet::new();
    let mut message_flows = Vec::new();

    for child in elem.children().filter(XmlNode::is_element) {
        match child.tag_name().name() {
            "participant" => {
                let id = required_attr(child, "id")?;
                match child.attribute("processRef") {
                    Some(process_ref) => participants.push(Participant {
                        id: id.to_string(),
                        name: optional_name(child),
                        process_ref: process_ref.to_string(),
                    }),
                    None => {
                        debug!(participant = id; "Skipping black-box participant without a process");
                        black_boxes.insert(id.to_string());
                    }
                }
            }
            "messageFlow" => message_flows.push(MessageFlow {
                id: required_attr(child, "id")?.to_string(),
                name: optional_name(child),
                source_ref: required_attr(child, "sourceRef")?.to_string(),
                target_ref: required_attr(child, "targetRef")?.to_string(),
            }),
            other => trace!(element = other; "Skipping collaboration element"),
        }
    }

    message_flows.retain(|flow: &MessageFlow| {
        !black_boxes.contains(&flow.source_ref) && !black_boxes.contains(&flow.target_ref)
    });

    Ok(Collaboration {
        id: required_attr(elem, "id")?.to_string(),
        participants,
        message_flows,
    })
}
