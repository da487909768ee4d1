use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// Root of a BPMN document: one or more processes and an optional collaboration
/// that wraps them into pools.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Definitions {
    #[serde(default = "default_definitions_id")]
    pub id: String,
    pub processes: Vec<ProcessGraph>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collaboration: Option<Collaboration>,
}

fn default_definitions_id() -> String {
    "Definitions_1".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collaboration {
    pub id: String,
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub message_flows: Vec<MessageFlow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub process_ref: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageFlow {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub source_ref: String,
    pub target_ref: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessGraph {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub flows: Vec<Flow>,
    #[serde(default)]
    pub lanes: Vec<Lane>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NodeKind {
    #[serde(rename_all = "camelCase")]
    Event {
        role: EventRole,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attached_to: Option<String>,
    },
    Activity {
        #[serde(default)]
        variant: ActivityVariant,
    },
    Gateway {
        #[serde(default)]
        variant: GatewayVariant,
    },
    #[serde(rename_all = "camelCase")]
    SubProcess {
        #[serde(default = "default_expanded")]
        expanded: bool,
        #[serde(default)]
        triggered_by_event: bool,
        #[serde(default)]
        body: ProcessGraph,
    },
}

fn default_expanded() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventRole {
    Start,
    End,
    IntermediateCatch,
    IntermediateThrow,
    Boundary,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivityVariant {
    #[default]
    Task,
    UserTask,
    ServiceTask,
    ScriptTask,
    ManualTask,
    SendTask,
    ReceiveTask,
    BusinessRuleTask,
    CallActivity,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GatewayVariant {
    #[default]
    Exclusive,
    Parallel,
    Inclusive,
    EventBased,
    Complex,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flow {
    pub id: String,
    pub source_ref: String,
    pub target_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lane {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub members: BTreeSet<String>,
}

impl EventRole {
    /// BPMN element name for this event role.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Start => "startEvent",
            Self::End => "endEvent",
            Self::IntermediateCatch => "intermediateCatchEvent",
            Self::IntermediateThrow => "intermediateThrowEvent",
            Self::Boundary => "boundaryEvent",
        }
    }
}

impl ActivityVariant {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "task" => Some(Self::Task),
            "userTask" => Some(Self::UserTask),
            "serviceTask" => Some(Self::ServiceTask),
            "scriptTask" => Some(Self::ScriptTask),
            "manualTask" => Some(Self::ManualTask),
            "sendTask" => Some(Self::SendTask),
            "receiveTask" => Some(Self::ReceiveTask),
            "businessRuleTask" => Some(Self::BusinessRuleTask),
            "callActivity" => Some(Self::CallActivity),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::UserTask => "userTask",
            Self::ServiceTask => "serviceTask",
            Self::ScriptTask => "scriptTask",
            Self::ManualTask => "manualTask",
            Self::SendTask => "sendTask",
            Self::ReceiveTask => "receiveTask",
            Self::BusinessRuleTask => "businessRuleTask",
            Self::CallActivity => "callActivity",
        }
    }

    /// Tasks carried out by a machine rather than a person.
    pub fn is_automated(self) -> bool {
        matches!(self, Self::ServiceTask | Self::SendTask | Self::ReceiveTask)
    }

    pub fn is_human(self) -> bool {
        matches!(self, Self::UserTask | Self::ManualTask)
    }
}

impl GatewayVariant {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "exclusiveGateway" => Some(Self::Exclusive),
            "parallelGateway" => Some(Self::Parallel),
            "inclusiveGateway" => Some(Self::Inclusive),
            "eventBasedGateway" => Some(Self::EventBased),
            "complexGateway" => Some(Self::Complex),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::Exclusive => "exclusiveGateway",
            Self::Parallel => "parallelGateway",
            Self::Inclusive => "inclusiveGateway",
            Self::EventBased => "eventBasedGateway",
            Self::Complex => "complexGateway",
        }
    }
}

impl Node {
    pub fn new(id: &str, name: Option<&str>, kind: NodeKind) -> Self {
        Self {
            id: id.to_string(),
            name: name.map(str::to_string),
            kind,
        }
    }

    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    /// Host id when this node is a boundary event attached to an activity.
    pub fn attached_to(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Event {
                role: EventRole::Boundary,
                attached_to,
            } => attached_to.as_deref(),
            _ => None,
        }
    }

    pub fn is_boundary_event(&self) -> bool {
        self.attached_to().is_some()
    }

    pub fn activity_variant(&self) -> Option<ActivityVariant> {
        match self.kind {
            NodeKind::Activity { variant } => Some(variant),
            _ => None,
        }
    }

    pub fn body(&self) -> Option<&ProcessGraph> {
        match &self.kind {
            NodeKind::SubProcess { body, .. } => Some(body),
            _ => None,
        }
    }
}

impl Flow {
    pub fn new(id: &str, source_ref: &str, target_ref: &str) -> Self {
        Self {
            id: id.to_string(),
            source_ref: source_ref.to_string(),
            target_ref: target_ref.to_string(),
            name: None,
            condition_expression: None,
        }
    }
}

impl Lane {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            members: BTreeSet::new(),
        }
    }
}

impl ProcessGraph {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Default::default()
        }
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Declaration index of every node, used as the deterministic tie-breaker.
    pub fn node_order(&self) -> HashMap<String, usize> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| (node.id.clone(), idx))
            .collect()
    }

    /// Lane that declares `node_id` as a member, if any.
    pub fn lane_of(&self, node_id: &str) -> Option<usize> {
        self.lanes
            .iter()
            .position(|lane| lane.members.contains(node_id))
    }

    /// Total number of nodes including every nested sub-process body.
    pub fn node_count_recursive(&self) -> usize {
        self.nodes
            .iter()
            .map(|node| 1 + node.body().map_or(0, ProcessGraph::node_count_recursive))
            .sum()
    }

    pub fn flow_count_recursive(&self) -> usize {
        self.flows.len()
            + self
                .nodes
                .iter()
                .filter_map(Node::body)
                .map(ProcessGraph::flow_count_recursive)
                .sum::<usize>()
    }
}

impl Definitions {
    pub fn single(process: ProcessGraph) -> Self {
        Self {
            id: default_definitions_id(),
            processes: vec![process],
            collaboration: None,
        }
    }

    pub fn process(&self, id: &str) -> Option<&ProcessGraph> {
        self.processes.iter().find(|process| process.id == id)
    }
}
