use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

use log::trace;

use crate::ir::ProcessGraph;

/// Column index per node plus the amount of work spent computing it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Levels {
    pub levels: HashMap<String, usize>,
    /// Worklist pops performed by the relaxation, bounded by a small
    /// multiple of the node count even for cyclic graphs.
    pub visits: usize,
}

impl Levels {
    pub fn get(&self, node_id: &str) -> usize {
        self.levels.get(node_id).copied().unwrap_or(0)
    }

    pub fn max_level(&self) -> usize {
        self.levels.values().copied().max().unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
struct RankEdge {
    from: String,
    to: String,
    /// 1 for a sequence flow, 0 for the attachment of a boundary event.
    delta: usize,
}

fn rank_edges(graph: &ProcessGraph) -> Vec<RankEdge> {
    let mut edges = Vec::with_capacity(graph.flows.len());
    for flow in &graph.flows {
        if flow.source_ref == flow.target_ref {
            continue;
        }
        edges.push(RankEdge {
            from: flow.source_ref.clone(),
            to: flow.target_ref.clone(),
            delta: 1,
        });
    }
    for node in &graph.nodes {
        if let Some(host) = node.attached_to() {
            edges.push(RankEdge {
                from: host.to_string(),
                to: node.id.clone(),
                delta: 0,
            });
        }
    }
    edges
}

/// Assigns every node of `graph` a global column via longest-path BFS.
/// Lanes are ignored on purpose: a flow between lanes still advances one column.
pub fn assign_levels(graph: &ProcessGraph) -> Levels {
    let node_ids: Vec<String> = graph.nodes.iter().map(|node| node.id.clone()).collect();
    if node_ids.is_empty() {
        return Levels::default();
    }
    let node_order = graph.node_order();
    let edges = rank_edges(graph);

    let order = topological_order(&node_ids, &edges, &node_order);
    let order_index: HashMap<&str, usize> = order
        .iter()
        .enumerate()
        .map(|(idx, id)| (id.as_str(), idx))
        .collect();

    let mut forward: HashMap<&str, Vec<(&str, usize)>> = HashMap::new();
    let mut incoming: HashMap<&str, Vec<(&str, usize)>> = HashMap::new();
    for edge in &edges {
        incoming
            .entry(edge.to.as_str())
            .or_default()
            .push((edge.from.as_str(), edge.delta));
        let from_idx = order_index.get(edge.from.as_str()).copied().unwrap_or(0);
        let to_idx = order_index.get(edge.to.as_str()).copied().unwrap_or(0);
        if to_idx > from_idx {
            forward
                .entry(edge.from.as_str())
                .or_default()
                .push((edge.to.as_str(), edge.delta));
        }
    }

    let cap = node_ids.len().saturating_sub(1);
    let mut levels: HashMap<String, usize> = HashMap::new();
    let mut visits = 0usize;

    let mut roots: Vec<&str> = node_ids
        .iter()
        .map(String::as_str)
        .filter(|id| !incoming.contains_key(id))
        .collect();
    if roots.is_empty() {
        // Every node sits on a cycle: start from the first declared one.
        let synthetic = graph
            .nodes
            .iter()
            .find(|node| !node.is_boundary_event())
            .map_or(node_ids[0].as_str(), |node| node.id.as_str());
        roots.push(synthetic);
    }

    let mut queue: VecDeque<&str> = VecDeque::new();
    for root in &roots {
        levels.insert((*root).to_string(), 0);
        queue.push_back(*root);
    }
    relax(&mut queue, &forward, &mut levels, cap, &mut visits);

    // Nodes only reachable through a cycle without an entry point.
    for id in &order {
        if levels.contains_key(id) {
            continue;
        }
        let seeded = incoming
            .get(id.as_str())
            .into_iter()
            .flatten()
            .filter_map(|(from, delta)| levels.get(*from).map(|level| level + delta))
            .max()
            .unwrap_or(0)
            .min(cap);
        trace!(node = id.as_str(), level = seeded; "Seeding unreached node");
        levels.insert(id.clone(), seeded);
        queue.push_back(id.as_str());
        relax(&mut queue, &forward, &mut levels, cap, &mut visits);
    }

    Levels { levels, visits }
}

fn relax<'a>(
    queue: &mut VecDeque<&'a str>,
    forward: &HashMap<&'a str, Vec<(&'a str, usize)>>,
    levels: &mut HashMap<String, usize>,
    cap: usize,
    visits: &mut usize,
) {
    while let Some(id) = queue.pop_front() {
        *visits += 1;
        let level = levels.get(id).copied().unwrap_or(0);
        let Some(nexts) = forward.get(id) else {
            continue;
        };
        for (next, delta) in nexts {
            let candidate = level + delta;
            if candidate > cap {
                continue;
            }
            let current = levels.get(*next).copied();
            if current.is_none_or(|existing| candidate > existing) {
                levels.insert((*next).to_string(), candidate);
                queue.push_back(*next);
            }
        }
    }
}

// Kahn's algorithm keyed on declaration order. When only cycles remain, the
// earliest declared remaining node is taken next and its incoming edges become
// back-edges.
fn topological_order(
    node_ids: &[String],
    edges: &[RankEdge],
    node_order: &HashMap<String, usize>,
) -> Vec<String> {
    let set: HashSet<&str> = node_ids.iter().map(String::as_str).collect();
    let mut adj: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut indeg: HashMap<&str, usize> = node_ids.iter().map(|id| (id.as_str(), 0)).collect();
    for edge in edges {
        if set.contains(edge.from.as_str()) && set.contains(edge.to.as_str()) {
            adj.entry(edge.from.as_str()).or_default().push(edge.to.as_str());
            *indeg.entry(edge.to.as_str()).or_insert(0) += 1;
        }
    }

    let order_key = |id: &str| node_order.get(id).copied().unwrap_or(usize::MAX);

    let mut ready: BinaryHeap<Reverse<(usize, &str)>> = BinaryHeap::new();
    for id in node_ids {
        if indeg.get(id.as_str()).copied().unwrap_or(0) == 0 {
            ready.push(Reverse((order_key(id.as_str()), id.as_str())));
        }
    }

    let mut order = Vec::with_capacity(node_ids.len());
    let mut processed: HashSet<&str> = HashSet::new();
    loop {
        while let Some(Reverse((_key, id))) = ready.pop() {
            if !processed.insert(id) {
                continue;
            }
            order.push(id.to_string());
            if let Some(nexts) = adj.get(id) {
                for next in nexts {
                    if processed.contains(next) {
                        continue;
                    }
                    if let Some(deg) = indeg.get_mut(next) {
                        *deg = deg.saturating_sub(1);
                        if *deg == 0 {
                            ready.push(Reverse((order_key(*next), *next)));
                        }
                    }
                }
            }
        }

        if processed.len() >= set.len() {
            break;
        }

        let best = node_ids
            .iter()
            .map(String::as_str)
            .filter(|id| !processed.contains(id))
            .min_by_key(|id| order_key(*id));
        match best {
            Some(id) => ready.push(Reverse((order_key(id), id))),
            None => break,
        }
    }

    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ActivityVariant, EventRole, Flow, Node, NodeKind};

    fn task(id: &str) -> Node {
        Node::new(
            id,
            Some(id),
            NodeKind::Activity {
                variant: ActivityVariant::Task,
            },
        )
    }

    fn graph(nodes: &[&str], flows: &[(&str, &str)]) -> ProcessGraph {
        let mut graph = ProcessGraph::new("P");
        for id in nodes {
            graph.nodes.push(task(id));
        }
        for (idx, (from, to)) in flows.iter().enumerate() {
            graph.flows.push(Flow::new(&format!("f{idx}"), from, to));
        }
        graph
    }

    #[test]
    fn linear_chain_gets_consecutive_levels() {
        let g = graph(
            &["Start", "A", "B", "End"],
            &[("Start", "A"), ("A", "B"), ("B", "End")],
        );
        let levels = assign_levels(&g);
        let got: Vec<usize> = ["Start", "A", "B", "End"]
            .iter()
            .map(|id| levels.get(id))
            .collect();
        assert_eq!(got, vec![0, 1, 2, 3]);
    }

    #[test]
    fn longest_path_wins_over_shortcut() {
        let g = graph(
            &["S", "A", "B", "E"],
            &[("S", "A"), ("A", "B"), ("B", "E"), ("S", "E")],
        );
        let levels = assign_levels(&g);
        assert_eq!(levels.get("E"), 3);
    }

    #[test]
    fn rootless_cycle_terminates_quickly() {
        let g = graph(&["A", "B", "C"], &[("A", "B"), ("B", "C"), ("C", "A")]);
        let levels = assign_levels(&g);
        assert_eq!(levels.get("A"), 0);
        assert_eq!(levels.get("B"), 1);
        assert_eq!(levels.get("C"), 2);
        assert!(levels.visits <= 3 * g.nodes.len(), "visits = {}", levels.visits);
    }

    #[test]
    fn loop_back_does_not_stretch_columns() {
        let g = graph(
            &["S", "Work", "Check", "E"],
            &[("S", "Work"), ("Work", "Check"), ("Check", "Work"), ("Check", "E")],
        );
        let levels = assign_levels(&g);
        assert_eq!(levels.get("Work"), 1);
        assert_eq!(levels.get("Check"), 2);
        assert_eq!(levels.get("E"), 3);
    }

    #[test]
    fn detached_cycle_is_seeded_after_main_flow() {
        let g = graph(
            &["S", "T", "X", "Y"],
            &[("S", "T"), ("X", "Y"), ("Y", "X")],
        );
        let levels = assign_levels(&g);
        assert_eq!(levels.get("S"), 0);
        assert_eq!(levels.get("T"), 1);
        assert_eq!(levels.get("X"), 0);
        assert_eq!(levels.get("Y"), 1);
        assert_eq!(levels.levels.len(), 4);
    }

    #[test]
    fn isolated_nodes_sit_in_column_zero() {
        let g = graph(&["Lonely", "Other"], &[]);
        let levels = assign_levels(&g);
        assert_eq!(levels.get("Lonely"), 0);
        assert_eq!(levels.get("Other"), 0);
    }

    #[test]
    fn self_loop_is_ignored() {
        let g = graph(&["A", "B"], &[("A", "A"), ("A", "B")]);
        let levels = assign_levels(&g);
        assert_eq!(levels.get("A"), 0);
        assert_eq!(levels.get("B"), 1);
    }

    #[test]
    fn boundary_event_shares_host_column() {
        let mut g = graph(&["S", "Review", "Escalate"], &[("S", "Review")]);
        g.nodes.push(Node::new(
            "Timer",
            None,
            NodeKind::Event {
                role: EventRole::Boundary,
                attached_to: Some("Review".to_string()),
            },
        ));
        g.flows.push(Flow::new("fb", "Timer", "Escalate"));
        let levels = assign_levels(&g);
        assert_eq!(levels.get("Timer"), levels.get("Review"));
        assert_eq!(levels.get("Escalate"), levels.get("Review") + 1);
    }

    #[test]
    fn empty_graph_has_no_levels() {
        let levels = assign_levels(&ProcessGraph::new("P"));
        assert!(levels.levels.is_empty());
        assert_eq!(levels.max_level(), 0);
    }
}
