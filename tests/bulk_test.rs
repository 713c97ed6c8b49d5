//! Bulk ingestion tests
//!
//! Ladder-shaped histories large enough that the connection pass splits its
//! work across several workers.

use std::time::Instant;

use revgraph::config::IndexConfig;
use revgraph::graph::Axis;
use revgraph::index::CommitIndex;
use revgraph::models::{Commit, CommitId, CommitInfo, FileChange, FileRevision, History};

fn index() -> CommitIndex {
    let config = IndexConfig {
        index_wait_secs: 0,
        workers: Some(4),
        ..Default::default()
    };
    CommitIndex::in_memory(config).expect("create index")
}

/// `left_i` merges `left_{i-1}` and `right_{i-1}`; `right_i` follows `right_{i-1}`
fn ladder(height: usize, path: Option<&str>) -> Vec<Commit> {
    let mut commits = Vec::with_capacity(2 * height);
    for i in 1..=height {
        let (left_parents, right_parents) = if i == 1 {
            (Vec::new(), Vec::new())
        } else {
            (
                vec![format!("left_{}", i - 1), format!("right_{}", i - 1)],
                vec![format!("right_{}", i - 1)],
            )
        };
        let changes = |i: usize| match path {
            Some(path) if i == 1 => vec![FileChange::created(path)],
            Some(path) => vec![FileChange::modified(path)],
            None => Vec::new(),
        };

        let left: Vec<&str> = left_parents.iter().map(String::as_str).collect();
        let right: Vec<&str> = right_parents.iter().map(String::as_str).collect();
        commits.push(Commit::new(CommitInfo::bare(format!("left_{i}"), &left), changes(i)));
        commits.push(Commit::new(CommitInfo::bare(format!("right_{i}"), &right), changes(i)));
    }
    commits
}

fn history_of_only_change(index: &CommitIndex, commit_id: &str) -> History<FileRevision> {
    let commit = index
        .get(&CommitId::new(commit_id))
        .unwrap()
        .unwrap_or_else(|| panic!("commit {commit_id} missing"));
    index
        .changes_history(&commit.changes[0].id, Axis::Full)
        .unwrap()
}

#[test]
fn test_many_commits() {
    let height = 150;
    let index = index();

    let started = Instant::now();
    let stats = index.add_all(&ladder(height, None)).unwrap();
    println!("Inserted {} revisions in {:?}", 2 * height, started.elapsed());
    assert_eq!(stats.added, 2 * height);

    let left = index
        .commit_history(&CommitId::new(format!("left_{height}")), Axis::Full)
        .unwrap();
    assert_eq!(left.len(), 2 * height - 1);

    let right = index
        .commit_history(&CommitId::new(format!("right_{height}")), Axis::Full)
        .unwrap();
    assert_eq!(right.len(), height);

    // First parents of left_i stay on the left side
    let left_first_parent = index
        .commit_history(&CommitId::new(format!("left_{height}")), Axis::FirstParent)
        .unwrap();
    assert_eq!(left_first_parent.len(), height);
}

#[test]
fn test_many_commits_with_changes() {
    let height = 300;
    let index = index();

    let started = Instant::now();
    let stats = index.add_all(&ladder(height, Some("file.txt"))).unwrap();
    println!(
        "Inserted {} revisions with changes in {:?}",
        2 * height,
        started.elapsed()
    );

    let full_pass = &stats.connections[0];
    assert_eq!(full_pass.axis, Axis::Full);
    assert_eq!(full_pass.commits, 2 * height);
    assert_eq!(full_pass.workers, 4);
    assert!(full_pass.chunks > 1);
    // left_i links to two revisions, right_i to one, the roots to none
    assert_eq!(full_pass.edges, 3 * (height - 1));
    assert_eq!(stats.connections[1].edges, 2 * (height - 1));

    assert_eq!(
        history_of_only_change(&index, &format!("left_{height}")).len(),
        2 * height - 1
    );
    assert_eq!(
        history_of_only_change(&index, &format!("right_{height}")).len(),
        height
    );

    let mid = height / 2;
    assert_eq!(
        history_of_only_change(&index, &format!("left_{mid}")).len(),
        2 * mid - 1
    );
    assert_eq!(
        history_of_only_change(&index, &format!("right_{mid}")).len(),
        mid
    );

    assert!(index.check_integrity().unwrap().is_ok());
}
