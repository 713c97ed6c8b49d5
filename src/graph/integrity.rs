//! Store integrity audit
//!
//! Checks the structural invariants of the commit graph:
//! - the commit PARENT graph is acyclic
//! - a complete commit's PARENT targets equal its parent list
//! - FIRST_PARENT points at the first parent, and only when there is one
//! - every change has exactly one owning commit, matching its `commit_id`

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::FxHashMap;
use serde::Serialize;

use super::store::GraphRead;
use super::store_models::{CommitNode, EdgeKind};
use super::GraphResult;

/// One broken invariant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Violation {
    ParentCycle {
        commits: Vec<String>,
    },
    ParentEdges {
        commit: String,
        expected: Vec<String>,
        found: Vec<String>,
    },
    FirstParentEdge {
        commit: String,
        expected: Option<String>,
        found: Vec<String>,
    },
    ChangeOwners {
        change: String,
        owners: Vec<String>,
    },
    OwnerMismatch {
        change: String,
        commit_id: String,
        owner: String,
    },
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::ParentCycle { commits } => {
                write!(f, "parent cycle through {}", commits.join(", "))
            }
            Violation::ParentEdges {
                commit,
                expected,
                found,
            } => write!(
                f,
                "commit {commit}: PARENT edges {found:?}, expected {expected:?}"
            ),
            Violation::FirstParentEdge {
                commit,
                expected,
                found,
            } => write!(
                f,
                "commit {commit}: FIRST_PARENT edges {found:?}, expected {expected:?}"
            ),
            Violation::ChangeOwners { change, owners } => {
                write!(f, "change {change} has {} owners {owners:?}", owners.len())
            }
            Violation::OwnerMismatch {
                change,
                commit_id,
                owner,
            } => write!(
                f,
                "change {change} records commit {commit_id} but is owned by {owner}"
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    pub commits_checked: usize,
    pub stubs: usize,
    pub changes_checked: usize,
    pub violations: Vec<Violation>,
}

impl IntegrityReport {
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Audit the whole store
pub fn check<S: GraphRead + ?Sized>(scope: &S) -> GraphResult<IntegrityReport> {
    let mut report = IntegrityReport::default();
    let commits = scope.commit_nodes()?;

    for commit in &commits {
        report.commits_checked += 1;
        let Some(info) = commit.info() else {
            report.stubs += 1;
            continue;
        };

        let expected: Vec<String> = info.parents.iter().map(|p| p.0.clone()).collect();
        let found = scope.targets(EdgeKind::Parent, &commit.id)?;
        if found != expected {
            report.violations.push(Violation::ParentEdges {
                commit: commit.id.clone(),
                expected: expected.clone(),
                found,
            });
        }

        let expected_first = expected.first().cloned();
        let found_first = scope.targets(EdgeKind::FirstParent, &commit.id)?;
        if found_first != expected_first.iter().cloned().collect::<Vec<_>>() {
            report.violations.push(Violation::FirstParentEdge {
                commit: commit.id.clone(),
                expected: expected_first,
                found: found_first,
            });
        }
    }

    for change in scope.change_nodes()? {
        report.changes_checked += 1;
        let owners = scope.sources(EdgeKind::Contains, &change.id)?;
        match owners.as_slice() {
            [owner] if *owner == change.commit_id => {}
            [owner] => report.violations.push(Violation::OwnerMismatch {
                change: change.id.clone(),
                commit_id: change.commit_id.clone(),
                owner: owner.clone(),
            }),
            _ => report.violations.push(Violation::ChangeOwners {
                change: change.id.clone(),
                owners,
            }),
        }
    }

    report
        .violations
        .extend(parent_cycles(scope, &commits)?);
    Ok(report)
}

/// Cycles in the commit PARENT graph, found with Tarjan's SCC
fn parent_cycles<S: GraphRead + ?Sized>(
    scope: &S,
    commits: &[CommitNode],
) -> GraphResult<Vec<Violation>> {
    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let mut index: FxHashMap<&str, NodeIndex> = FxHashMap::default();
    for commit in commits {
        index.insert(commit.id.as_str(), graph.add_node(commit.id.as_str()));
    }

    for commit in commits {
        let from = index[commit.id.as_str()];
        for target in scope.targets(EdgeKind::Parent, &commit.id)? {
            if let Some(&to) = index.get(target.as_str()) {
                graph.add_edge(from, to, ());
            }
        }
    }

    let mut cycles: Vec<Violation> = tarjan_scc(&graph)
        .into_iter()
        .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
        .map(|scc| {
            let mut commits: Vec<String> = scc.iter().map(|&n| graph[n].to_string()).collect();
            commits.sort();
            Violation::ParentCycle { commits }
        })
        .collect();
    cycles.sort_by(|a, b| a.to_string().cmp(&b.to_string()));
    Ok(cycles)
}
