use std::collections::HashSet;

use log::{debug, trace};

use crate::config::LintConfig;
use crate::error::{Result, StructuralError};
use crate::ir::{Definitions, EventRole, NodeKind, ProcessGraph};

/// Checks referential integrity of every process (recursively) and of the
/// collaboration wrapping them.
pub fn validate_definitions(defs: &Definitions) -> Result<()> {
    if defs.processes.is_empty() {
        return Err(StructuralError::MissingProcess);
    }

    let mut process_ids = HashSet::new();
    for process in &defs.processes {
        if !process_ids.insert(process.id.as_str()) {
            return Err(StructuralError::DuplicateId {
                id: process.id.clone(),
                scope: defs.id.clone(),
            });
        }
        validate_graph(process)?;
    }

    if let Some(collab) = &defs.collaboration {
        let mut participant_ids = HashSet::new();
        for participant in &collab.participants {
            if !participant_ids.insert(participant.id.as_str()) {
                return Err(StructuralError::DuplicateId {
                    id: participant.id.clone(),
                    scope: collab.id.clone(),
                });
            }
            if !process_ids.contains(participant.process_ref.as_str()) {
                return Err(StructuralError::DanglingParticipantProcess {
                    participant: participant.id.clone(),
                    process: participant.process_ref.clone(),
                });
            }
        }
        for flow in &collab.message_flows {
            for reference in [&flow.source_ref, &flow.target_ref] {
                let known = participant_ids.contains(reference.as_str())
                    || defs
                        .processes
                        .iter()
                        .any(|process| contains_node_recursive(process, reference));
                if !known {
                    return Err(StructuralError::DanglingMessageFlow {
                        flow: flow.id.clone(),
                        reference: reference.clone(),
                    });
                }
            }
        }
    }

    debug!(processes = defs.processes.len(); "Definitions validated");
    Ok(())
}

/// Validates one graph scope and, with the same rules, every sub-process body.
pub fn validate_graph(graph: &ProcessGraph) -> Result<()> {
    let mut ids: HashSet<&str> = HashSet::new();
    for node in &graph.nodes {
        if !ids.insert(node.id.as_str()) {
            return Err(duplicate(&node.id, graph));
        }
    }
    for flow in &graph.flows {
        if !ids.insert(flow.id.as_str()) {
            return Err(duplicate(&flow.id, graph));
        }
    }
    for lane in &graph.lanes {
        if !ids.insert(lane.id.as_str()) {
            return Err(duplicate(&lane.id, graph));
        }
    }

    let node_ids: HashSet<&str> = graph.nodes.iter().map(|node| node.id.as_str()).collect();
    for flow in &graph.flows {
        for reference in [&flow.source_ref, &flow.target_ref] {
            if !node_ids.contains(reference.as_str()) {
                return Err(StructuralError::DanglingFlowReference {
                    flow: flow.id.clone(),
                    reference: reference.clone(),
                    scope: graph.id.clone(),
                });
            }
        }
    }

    for lane in &graph.lanes {
        for member in &lane.members {
            if !node_ids.contains(member.as_str()) {
                return Err(StructuralError::DanglingLaneMember {
                    lane: lane.id.clone(),
                    node: member.clone(),
                });
            }
        }
    }

    for node in &graph.nodes {
        if let Some(host) = node.attached_to() {
            if host == node.id || !node_ids.contains(host) {
                return Err(StructuralError::DanglingAttachment {
                    event: node.id.clone(),
                    host: host.to_string(),
                });
            }
        }
        if let Some(body) = node.body() {
            trace!(sub_process = node.id.as_str(); "Validating sub-process body");
            validate_graph(body)?;
        }
    }

    Ok(())
}

fn duplicate(id: &str, graph: &ProcessGraph) -> StructuralError {
    StructuralError::DuplicateId {
        id: id.to_string(),
        scope: graph.id.clone(),
    }
}

fn contains_node_recursive(graph: &ProcessGraph, id: &str) -> bool {
    graph
        .nodes
        .iter()
        .any(|node| node.id == id || node.body().is_some_and(|body| contains_node_recursive(body, id)))
}

/// Non-fatal observation about a structurally valid document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LintWarning {
    MissingStartEvent { process: String },
    MissingEndEvent { process: String },
    NoSequenceFlows { process: String },
    InvalidNamespacePrefix { prefix: String },
}

impl std::fmt::Display for LintWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingStartEvent { process } => {
                write!(f, "process `{process}` has no start event")
            }
            Self::MissingEndEvent { process } => write!(f, "process `{process}` has no end event"),
            Self::NoSequenceFlows { process } => {
                write!(f, "process `{process}` has several nodes but no sequence flows")
            }
            Self::InvalidNamespacePrefix { prefix } => {
                write!(f, "invalid namespace prefix `{prefix}` (expected `bpmn:`)")
            }
        }
    }
}

const INVALID_PREFIXES: [&str; 2] = ["<bpmns:", "<BPMN:"];

pub fn lint(defs: &Definitions, source: Option<&str>, config: &LintConfig) -> Vec<LintWarning> {
    let mut warnings = Vec::new();
    if !config.enabled {
        return warnings;
    }

    for process in &defs.processes {
        let has_role = |wanted: EventRole| {
            process
                .nodes
                .iter()
                .any(|node| matches!(node.kind, NodeKind::Event { role, .. } if role == wanted))
        };
        if config.require_start_event && !has_role(EventRole::Start) {
            warnings.push(LintWarning::MissingStartEvent {
                process: process.id.clone(),
            });
        }
        if config.require_end_event && !has_role(EventRole::End) {
            warnings.push(LintWarning::MissingEndEvent {
                process: process.id.clone(),
            });
        }
        if process.nodes.len() > 1 && process.flows.is_empty() {
            warnings.push(LintWarning::NoSequenceFlows {
                process: process.id.clone(),
            });
        }
    }

    if let Some(source) = source {
        for prefix in INVALID_PREFIXES {
            if source.contains(prefix) {
                warnings.push(LintWarning::InvalidNamespacePrefix {
                    prefix: prefix.trim_start_matches('<').to_string(),
                });
            }
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ActivityVariant, Flow, Lane, Node};

    fn task(id: &str) -> Node {
        Node::new(
            id,
            Some(id),
            NodeKind::Activity {
                variant: ActivityVariant::Task,
            },
        )
    }

    fn event(id: &str, role: EventRole) -> Node {
        Node::new(
            id,
            None,
            NodeKind::Event {
                role,
                attached_to: None,
            },
        )
    }

    fn linear() -> ProcessGraph {
        let mut graph = ProcessGraph::new("P");
        graph.nodes.push(event("S", EventRole::Start));
        graph.nodes.push(task("A"));
        graph.nodes.push(event("E", EventRole::End));
        graph.flows.push(Flow::new("f1", "S", "A"));
        graph.flows.push(Flow::new("f2", "A", "E"));
        graph
    }

    #[test]
    fn accepts_well_formed_graph() {
        assert!(validate_graph(&linear()).is_ok());
    }

    #[test]
    fn rejects_dangling_flow() {
        let mut graph = linear();
        graph.flows.push(Flow::new("f3", "A", "Ghost"));
        assert_eq!(
            validate_graph(&graph),
            Err(StructuralError::DanglingFlowReference {
                flow: "f3".to_string(),
                reference: "Ghost".to_string(),
                scope: "P".to_string(),
            })
        );
    }

    #[test]
    fn rejects_duplicate_node_id() {
        let mut graph = linear();
        graph.nodes.push(task("A"));
        assert!(matches!(
            validate_graph(&graph),
            Err(StructuralError::DuplicateId { id, .. }) if id == "A"
        ));
    }

    #[test]
    fn rejects_unknown_lane_member() {
        let mut graph = linear();
        let mut lane = Lane::new("L1", "Customer");
        lane.members.insert("Nobody".to_string());
        graph.lanes.push(lane);
        assert!(matches!(
            validate_graph(&graph),
            Err(StructuralError::DanglingLaneMember { .. })
        ));
    }

    #[test]
    fn rejects_boundary_event_on_unknown_host() {
        let mut graph = linear();
        graph.nodes.push(Node::new(
            "B",
            None,
            NodeKind::Event {
                role: EventRole::Boundary,
                attached_to: Some("Missing".to_string()),
            },
        ));
        assert!(matches!(
            validate_graph(&graph),
            Err(StructuralError::DanglingAttachment { .. })
        ));
    }

    #[test]
    fn sub_process_bodies_use_the_same_rules() {
        let mut body = ProcessGraph::new("Sub");
        body.nodes.push(task("Inner"));
        body.flows.push(Flow::new("fi", "Inner", "S"));
        let mut graph = linear();
        graph.nodes.push(Node::new(
            "Sub",
            None,
            NodeKind::SubProcess {
                expanded: true,
                triggered_by_event: false,
                body,
            },
        ));
        // `S` lives in the parent scope, so the inner flow dangles.
        assert!(matches!(
            validate_graph(&graph),
            Err(StructuralError::DanglingFlowReference { scope, .. }) if scope == "Sub"
        ));
    }

    #[test]
    fn definitions_without_process_fail() {
        assert_eq!(
            validate_definitions(&Definitions::default()),
            Err(StructuralError::MissingProcess)
        );
    }

    #[test]
    fn lint_reports_missing_events_and_bad_prefix() {
        let mut graph = ProcessGraph::new("P");
        graph.nodes.push(task("A"));
        graph.nodes.push(task("B"));
        let defs = Definitions::single(graph);
        let warnings = lint(&defs, Some("<bpmns:task id=\"A\"/>"), &LintConfig::default());
        assert!(warnings.contains(&LintWarning::MissingStartEvent {
            process: "P".to_string()
        }));
        assert!(warnings.contains(&LintWarning::MissingEndEvent {
            process: "P".to_string()
        }));
        assert!(warnings.contains(&LintWarning::NoSequenceFlows {
            process: "P".to_string()
        }));
        assert!(warnings.contains(&LintWarning::InvalidNamespacePrefix {
            prefix: "bpmns:".to_string()
        }));
    }

    #[test]
    fn lint_can_be_disabled() {
        let defs = Definitions::single(ProcessGraph::new("P"));
        let config = LintConfig {
            enabled: false,
            ..LintConfig::default()
        };
        assert!(lint(&defs, None, &config).is_empty());
    }
}
