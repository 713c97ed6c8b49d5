//! Depth-first traversal over one edge kind
//!
//! Every node is visited at most once per traversal, regardless of how many
//! paths lead to it. Targets are expanded in stored order, so the output is a
//! preorder that follows first parents before later ones.

use rustc_hash::FxHashSet;

use super::store::GraphRead;
use super::store_models::EdgeKind;
use super::GraphResult;

/// What to do with a visited node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    IncludeAndContinue,
    /// Include the node but do not expand past it
    IncludeAndPrune,
    /// Leave the node out but keep expanding
    ExcludeAndContinue,
}

/// Walk `kind` edges from `start`, returning the included nodes in visit order
pub fn depth_first<S, F>(
    scope: &S,
    start: &str,
    kind: EdgeKind,
    mut evaluate: F,
) -> GraphResult<Vec<String>>
where
    S: GraphRead + ?Sized,
    F: FnMut(&str) -> Evaluation,
{
    let mut visited: FxHashSet<String> = FxHashSet::default();
    let mut stack = vec![start.to_string()];
    let mut included = Vec::new();

    while let Some(node) = stack.pop() {
        if !visited.insert(node.clone()) {
            continue;
        }

        let expand = match evaluate(node.as_str()) {
            Evaluation::IncludeAndContinue => {
                included.push(node.clone());
                true
            }
            Evaluation::IncludeAndPrune => {
                included.push(node.clone());
                false
            }
            Evaluation::ExcludeAndContinue => true,
        };

        if expand {
            let targets = scope.targets(kind, &node)?;
            // Reversed so the first target is popped first
            stack.extend(targets.into_iter().rev().filter(|t| !visited.contains(t)));
        }
    }

    Ok(included)
}

/// Every node reachable from `start` (inclusive) along `kind`
pub fn reachable<S: GraphRead + ?Sized>(scope: &S, start: &str, kind: EdgeKind) -> GraphResult<Vec<String>> {
    depth_first(scope, start, kind, |_| Evaluation::IncludeAndContinue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::store::GraphStore;

    fn diamond() -> GraphStore {
        // 3 -> (1, 2), 1 -> 0, 2 -> 0
        let store = GraphStore::in_memory().expect("create in-memory store");
        store
            .write(|scope| {
                scope.add_edge(EdgeKind::Parent, "3", "1")?;
                scope.add_edge(EdgeKind::Parent, "3", "2")?;
                scope.add_edge(EdgeKind::Parent, "1", "0")?;
                scope.add_edge(EdgeKind::Parent, "2", "0")
            })
            .expect("write diamond");
        store
    }

    #[test]
    fn test_reachable_visits_each_node_once() {
        let store = diamond();
        let nodes = store
            .read(|scope| reachable(scope, "3", EdgeKind::Parent))
            .expect("traverse");
        assert_eq!(nodes, vec!["3", "1", "0", "2"]);
    }

    #[test]
    fn test_prune_stops_expansion() {
        let store = diamond();
        let nodes = store
            .read(|scope| {
                depth_first(scope, "3", EdgeKind::Parent, |node| match node {
                    "3" => Evaluation::ExcludeAndContinue,
                    "1" => Evaluation::IncludeAndPrune,
                    _ => Evaluation::IncludeAndContinue,
                })
            })
            .expect("traverse");
        // 0 is still reached through 2
        assert_eq!(nodes, vec!["1", "2", "0"]);
    }

    #[test]
    fn test_unknown_start_yields_only_itself() {
        let store = diamond();
        let nodes = store
            .read(|scope| reachable(scope, "nope", EdgeKind::Parent))
            .expect("traverse");
        assert_eq!(nodes, vec!["nope"]);
    }
}
