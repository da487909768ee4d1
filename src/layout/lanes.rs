use std::collections::HashSet;

use log::{debug, trace};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::ir::{Lane, Node, ProcessGraph};

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z0-9]+").unwrap());

const STOPWORDS: [&str; 12] = [
    "a", "an", "and", "by", "for", "in", "of", "on", "or", "the", "to", "with",
];

/// Lane vocabulary that marks machine-operated lanes.
const SYSTEM_TERMS: [&str; 12] = [
    "system",
    "systems",
    "automated",
    "automation",
    "back office",
    "backoffice",
    "it",
    "platform",
    "backend",
    "erp",
    "crm",
    "bot",
];

const OVERSIGHT_TERMS: [&str; 3] = ["compliance", "risk", "front office"];

struct DomainTable {
    lane_terms: &'static [&'static str],
    strong: &'static [&'static str],
    weak: &'static [&'static str],
}

const STRONG_KEYWORD_SCORE: u32 = 20;
const WEAK_KEYWORD_SCORE: u32 = 12;

const DOMAIN_TABLES: [DomainTable; 9] = [
    DomainTable {
        lane_terms: &["compliance", "risk", "legal", "audit", "regulatory"],
        strong: &[
            "kyc", "aml", "compliance", "sanctions", "regulatory", "audit", "risk", "fraud",
            "legal", "gdpr",
        ],
        weak: &[
            "review", "verify", "verification", "screening", "policy", "consent", "identity",
        ],
    },
    DomainTable {
        lane_terms: &["customer", "client", "applicant", "user", "patient", "requester", "buyer"],
        strong: &["submit", "apply", "application", "request", "sign", "purchase", "register"],
        weak: &["receive", "provide", "upload", "confirm", "accept", "fill", "pay"],
    },
    DomainTable {
        lane_terms: &[
            "system", "systems", "it", "automated", "automation", "platform", "backend",
            "back office", "erp", "crm",
        ],
        strong: &[
            "system", "automated", "automatic", "api", "sync", "database", "generate",
            "calculate", "notify", "notification", "email",
        ],
        weak: &[
            "update", "store", "record", "send", "process", "validate", "import", "export", "log",
        ],
    },
    DomainTable {
        lane_terms: &["finance", "accounting", "billing", "payments", "treasury", "accounts"],
        strong: &[
            "invoice", "payment", "billing", "refund", "accounting", "budget", "payroll", "ledger",
        ],
        weak: &["pay", "charge", "cost", "price", "fee", "credit", "reconcile"],
    },
    DomainTable {
        lane_terms: &["sales", "marketing", "account management", "business development"],
        strong: &["quote", "lead", "sales", "proposal", "deal", "contract", "campaign"],
        weak: &["offer", "negotiate", "prospect", "pitch", "upsell"],
    },
    DomainTable {
        lane_terms: &[
            "operations", "ops", "logistics", "warehouse", "shipping", "fulfillment", "fulfilment",
        ],
        strong: &[
            "ship", "shipping", "deliver", "delivery", "pack", "pick", "inventory", "stock",
            "dispatch",
        ],
        weak: &["prepare", "schedule", "assemble", "transport", "install"],
    },
    DomainTable {
        lane_terms: &["hr", "human resources", "recruiting", "recruitment", "people", "talent"],
        strong: &["hire", "interview", "onboard", "onboarding", "candidate", "recruit"],
        weak: &["training", "employee", "offer", "contract"],
    },
    DomainTable {
        lane_terms: &["manager", "management", "supervisor", "approver", "director", "lead"],
        strong: &["approve", "approval", "authorize", "authorise", "escalate", "decide", "signoff"],
        weak: &["decision", "review", "assign", "evaluate"],
    },
    DomainTable {
        lane_terms: &["support", "service desk", "helpdesk", "front office", "service"],
        strong: &["ticket", "support", "complaint", "inquiry", "enquiry", "helpdesk", "troubleshoot"],
        weak: &["respond", "resolve", "answer", "contact", "call"],
    },
];

/// Pre-tokenised view of a lane name shared by every rule.
pub(crate) struct LaneProfile {
    /// Lower-cased tokens joined by single spaces.
    phrase: String,
    tokens: Vec<String>,
    is_system: bool,
    is_oversight: bool,
}

/// Pre-tokenised view of a node name.
pub(crate) struct NodeProfile<'a> {
    node: &'a Node,
    lower: String,
    phrase: String,
    tokens: Vec<String>,
    capitalized: Vec<String>,
}

impl LaneProfile {
    pub(crate) fn new(lane: &Lane) -> Self {
        let tokens = tokenize(&lane.name);
        let phrase = tokens.join(" ");
        let is_system = SYSTEM_TERMS.iter().any(|term| contains_phrase(&phrase, term));
        let is_oversight = OVERSIGHT_TERMS
            .iter()
            .any(|term| contains_phrase(&phrase, term));
        Self {
            phrase,
            tokens,
            is_system,
            is_oversight,
        }
    }
}

impl<'a> NodeProfile<'a> {
    pub(crate) fn new(node: &'a Node) -> Self {
        let label = node.label();
        let tokens = tokenize(label);
        let capitalized = WORD_RE
            .find_iter(label)
            .map(|m| m.as_str())
            .filter(|word| word.chars().next().is_some_and(char::is_uppercase))
            .map(str::to_ascii_lowercase)
            .collect();
        Self {
            node,
            lower: label.to_ascii_lowercase(),
            phrase: tokens.join(" "),
            tokens,
            capitalized,
        }
    }
}

fn tokenize(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    WORD_RE
        .find_iter(text)
        .map(|m| m.as_str().to_ascii_lowercase())
        .filter(|word| !STOPWORDS.contains(&word.as_str()))
        .filter(|word| seen.insert(word.clone()))
        .collect()
}

// Word-boundary containment over space-joined token phrases.
fn contains_phrase(phrase: &str, term: &str) -> bool {
    if phrase.is_empty() || term.is_empty() {
        return false;
    }
    format!(" {phrase} ").contains(&format!(" {term} "))
}

pub(crate) type ScoreRule = fn(&NodeProfile<'_>, &LaneProfile) -> u32;

/// Scoring rules in evaluation order. Each is independent; the lane score is the sum.
pub(crate) const RULES: [(&str, ScoreRule); 7] = [
    ("token_overlap", token_overlap),
    ("exact_word", exact_word),
    ("domain_keywords", domain_keywords),
    ("automated_kind", automated_kind),
    ("human_kind", human_kind),
    ("capitalized_actor", capitalized_actor),
    ("substring_overlap", substring_overlap),
];

fn token_overlap(node: &NodeProfile<'_>, lane: &LaneProfile) -> u32 {
    let shared = lane
        .tokens
        .iter()
        .filter(|token| node.tokens.contains(token))
        .count() as u32;
    shared * 15
}

fn exact_word(node: &NodeProfile<'_>, lane: &LaneProfile) -> u32 {
    if contains_phrase(&node.phrase, &lane.phrase) {
        12
    } else {
        0
    }
}

fn domain_keywords(node: &NodeProfile<'_>, lane: &LaneProfile) -> u32 {
    DOMAIN_TABLES
        .iter()
        .filter(|table| {
            table
                .lane_terms
                .iter()
                .any(|term| contains_phrase(&lane.phrase, term))
        })
        .map(|table| {
            let hits = |words: &[&str]| {
                words
                    .iter()
                    .any(|word| node.tokens.iter().any(|token| token == word))
            };
            if hits(table.strong) {
                STRONG_KEYWORD_SCORE
            } else if hits(table.weak) {
                WEAK_KEYWORD_SCORE
            } else {
                0
            }
        })
        .max()
        .unwrap_or(0)
}

fn automated_kind(node: &NodeProfile<'_>, lane: &LaneProfile) -> u32 {
    match node.node.activity_variant() {
        Some(variant) if variant.is_automated() && lane.is_system => 8,
        _ => 0,
    }
}

fn human_kind(node: &NodeProfile<'_>, lane: &LaneProfile) -> u32 {
    match node.node.activity_variant() {
        Some(variant) if variant.is_human() => {
            let away_from_system = if lane.is_system { 0 } else { 5 };
            let oversight = if lane.is_oversight { 3 } else { 0 };
            away_from_system + oversight
        }
        _ => 0,
    }
}

fn capitalized_actor(node: &NodeProfile<'_>, lane: &LaneProfile) -> u32 {
    let mut seen = HashSet::new();
    let matches = node
        .capitalized
        .iter()
        .filter(|word| lane.tokens.contains(word) && seen.insert(word.as_str()))
        .count() as u32;
    matches * 10
}

fn substring_overlap(node: &NodeProfile<'_>, lane: &LaneProfile) -> u32 {
    let hit = lane.tokens.iter().any(|token| {
        let chars: Vec<char> = token.chars().collect();
        chars.len() >= 4
            && chars
                .windows(4)
                .any(|window| node.lower.contains(&window.iter().collect::<String>()))
    });
    if hit { 3 } else { 0 }
}

pub(crate) fn score(node: &NodeProfile<'_>, lane: &LaneProfile) -> u32 {
    RULES.iter().map(|(_, rule)| rule(node, lane)).sum()
}

/// Lane inference applies only when lanes exist but none lists a member.
pub fn needs_inference(graph: &ProcessGraph) -> bool {
    !graph.lanes.is_empty() && graph.lanes.iter().all(|lane| lane.members.is_empty())
}

/// Index of the best lane for `node`; ties and all-zero scores pick the first lane.
pub fn best_lane(node: &Node, lanes: &[Lane]) -> usize {
    let profile = NodeProfile::new(node);
    let mut best = (0usize, 0u32);
    for (idx, lane) in lanes.iter().enumerate() {
        let lane_profile = LaneProfile::new(lane);
        let value = score(&profile, &lane_profile);
        trace!(node = node.id.as_str(), lane = lane.id.as_str(), score = value; "Lane score");
        if idx == 0 || value > best.1 {
            best = (idx, value);
        }
    }
    best.0
}

/// Returns a copy of `graph` whose lanes list inferred members. Boundary
/// events follow their host's lane.
pub fn infer_lane_membership(graph: &ProcessGraph) -> ProcessGraph {
    let mut inferred = graph.clone();
    if !needs_inference(graph) {
        return inferred;
    }

    let mut assignment: Vec<(String, usize)> = Vec::with_capacity(graph.nodes.len());
    for node in graph.nodes.iter().filter(|node| !node.is_boundary_event()) {
        let lane_idx = best_lane(node, &graph.lanes);
        assignment.push((node.id.clone(), lane_idx));
    }
    for node in graph.nodes.iter().filter(|node| node.is_boundary_event()) {
        let host_lane = node
            .attached_to()
            .and_then(|host| assignment.iter().find(|(id, _)| id == host))
            .map_or(0, |(_, lane_idx)| *lane_idx);
        assignment.push((node.id.clone(), host_lane));
    }

    for (node_id, lane_idx) in assignment {
        inferred.lanes[lane_idx].members.insert(node_id);
    }
    debug!(
        process = graph.id.as_str(),
        lanes = graph.lanes.len(),
        nodes = graph.nodes.len();
        "Inferred lane membership"
    );
    inferred
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ActivityVariant, EventRole, NodeKind};

    fn activity(id: &str, name: &str, variant: ActivityVariant) -> Node {
        Node::new(id, Some(name), NodeKind::Activity { variant })
    }

    fn lanes(names: &[&str]) -> Vec<Lane> {
        names
            .iter()
            .enumerate()
            .map(|(idx, name)| Lane::new(&format!("Lane_{idx}"), name))
            .collect()
    }

    fn rule(name: &str) -> ScoreRule {
        RULES
            .iter()
            .find(|(rule_name, _)| *rule_name == name)
            .map(|(_, rule)| *rule)
            .unwrap()
    }

    #[test]
    fn kyc_review_goes_to_compliance() {
        let node = activity("Kyc", "KYC Review", ActivityVariant::UserTask);
        let lanes = lanes(&["Customer", "Compliance"]);
        assert_eq!(best_lane(&node, &lanes), 1);
    }

    #[test]
    fn token_overlap_scores_per_shared_token() {
        let node = activity("T", "Back office data entry", ActivityVariant::Task);
        let profile = NodeProfile::new(&node);
        let lane = LaneProfile::new(&Lane::new("L", "Back Office"));
        assert_eq!(rule("token_overlap")(&profile, &lane), 30);
        assert_eq!(rule("exact_word")(&profile, &lane), 12);
    }

    #[test]
    fn automated_kinds_prefer_system_lanes() {
        let node = activity("T", "Do thing", ActivityVariant::ServiceTask);
        let profile = NodeProfile::new(&node);
        let system = LaneProfile::new(&Lane::new("L1", "Core System"));
        let people = LaneProfile::new(&Lane::new("L2", "Clerks"));
        assert_eq!(rule("automated_kind")(&profile, &system), 8);
        assert_eq!(rule("automated_kind")(&profile, &people), 0);
    }

    #[test]
    fn human_kinds_avoid_system_and_lean_to_oversight() {
        let node = activity("T", "Look at file", ActivityVariant::ManualTask);
        let profile = NodeProfile::new(&node);
        let system = LaneProfile::new(&Lane::new("L1", "IT Platform"));
        let risk = LaneProfile::new(&Lane::new("L2", "Risk"));
        let clerks = LaneProfile::new(&Lane::new("L3", "Clerks"));
        assert_eq!(rule("human_kind")(&profile, &system), 0);
        assert_eq!(rule("human_kind")(&profile, &risk), 8);
        assert_eq!(rule("human_kind")(&profile, &clerks), 5);
    }

    #[test]
    fn capitalized_actor_name_matches_lane() {
        let node = activity("T", "Notify Alice about result", ActivityVariant::Task);
        let profile = NodeProfile::new(&node);
        let lane = LaneProfile::new(&Lane::new("L", "Alice"));
        assert_eq!(rule("capitalized_actor")(&profile, &lane), 10);
    }

    #[test]
    fn substring_overlap_counts_once() {
        let node = activity("T", "Warehousing and warehouse checks", ActivityVariant::Task);
        let profile = NodeProfile::new(&node);
        let lane = LaneProfile::new(&Lane::new("L", "Warehouse"));
        assert_eq!(rule("substring_overlap")(&profile, &lane), 3);
    }

    #[test]
    fn domain_keywords_distinguish_strong_and_weak() {
        let lane = LaneProfile::new(&Lane::new("L", "Finance"));
        let strong = activity("A", "Send invoice", ActivityVariant::Task);
        let weak = activity("B", "Check fee", ActivityVariant::Task);
        let none = activity("C", "Walk dog", ActivityVariant::Task);
        assert_eq!(rule("domain_keywords")(&NodeProfile::new(&strong), &lane), 20);
        assert_eq!(rule("domain_keywords")(&NodeProfile::new(&weak), &lane), 12);
        assert_eq!(rule("domain_keywords")(&NodeProfile::new(&none), &lane), 0);
    }

    #[test]
    fn zero_scores_fall_back_to_first_lane() {
        let node = activity("T", "Zzz", ActivityVariant::Task);
        assert_eq!(best_lane(&node, &lanes(&["Alpha", "Beta"])), 0);
    }

    #[test]
    fn inference_only_runs_when_every_lane_is_empty() {
        let mut graph = ProcessGraph::new("P");
        graph.nodes.push(activity("Inv", "Create invoice", ActivityVariant::Task));
        graph.lanes = lanes(&["Sales", "Finance"]);
        assert!(needs_inference(&graph));
        let inferred = infer_lane_membership(&graph);
        assert!(inferred.lanes[1].members.contains("Inv"));
        assert!(!needs_inference(&inferred));

        // Declared membership is left alone.
        let again = infer_lane_membership(&inferred);
        assert_eq!(again, inferred);
    }

    #[test]
    fn boundary_events_follow_host_lane() {
        let mut graph = ProcessGraph::new("P");
        graph.nodes.push(activity("Pay", "Process payment", ActivityVariant::ServiceTask));
        graph.nodes.push(Node::new(
            "Err",
            Some("Customer complaint"),
            NodeKind::Event {
                role: EventRole::Boundary,
                attached_to: Some("Pay".to_string()),
            },
        ));
        graph.lanes = lanes(&["Customer", "Billing System"]);
        let inferred = infer_lane_membership(&graph);
        assert!(inferred.lanes[1].members.contains("Pay"));
        assert!(inferred.lanes[1].members.contains("Err"));
    }
}
