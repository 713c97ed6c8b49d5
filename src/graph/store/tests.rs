use super::*;
use crate::graph::schema::META_LOADED;
use crate::models::{Action, CommitInfo};
use tempfile::tempdir;

fn change(commit: &str, path: &str) -> ChangeNode {
    ChangeNode {
        id: format!("{commit}#{path}"),
        action: Action::Modified,
        path: path.to_string(),
        old_path: None,
        commit_id: commit.to_string(),
    }
}

#[test]
fn test_basic_operations() {
    let store = GraphStore::in_memory().expect("create in-memory store");

    store
        .write(|scope| {
            let mut node = scope.find_or_create_commit("1")?;
            node.complete(&CommitInfo::bare("1", &["0"]))?;
            scope.put_commit(&node)?;
            scope.find_or_create_commit("0")?;
            scope.add_edge(EdgeKind::Parent, "1", "0")?;
            scope.create_change("1", &change("1", "a.txt"))
        })
        .expect("write commit");

    store
        .read(|scope| {
            let one = scope.commit("1")?.expect("commit 1");
            assert!(one.is_complete());
            let zero = scope.commit("0")?.expect("commit 0");
            assert!(!zero.is_complete());

            assert_eq!(scope.targets(EdgeKind::Parent, "1")?, vec!["0".to_string()]);
            assert_eq!(scope.sources(EdgeKind::Parent, "0")?, vec!["1".to_string()]);
            assert_eq!(scope.changes_at_path("a.txt")?, vec!["1#a.txt".to_string()]);
            assert_eq!(scope.owner_of("1#a.txt")?, "1");
            assert_eq!(scope.changes_of("1")?.len(), 1);
            assert_eq!(scope.change_count()?, 1);

            let mut ids = scope.commit_ids()?;
            ids.sort();
            assert_eq!(ids, vec!["0".to_string(), "1".to_string()]);
            Ok(())
        })
        .expect("read back");
}

#[test]
fn test_find_or_create_is_unique() {
    let store = GraphStore::in_memory().expect("create in-memory store");

    store
        .write(|scope| {
            scope.find_or_create_commit("x")?;
            scope.find_or_create_commit("x")?;
            Ok(())
        })
        .expect("write");

    let ids = store.read(|scope| scope.commit_ids()).expect("read ids");
    assert_eq!(ids, vec!["x".to_string()]);
}

#[test]
fn test_edges_keep_insertion_order() {
    let store = GraphStore::in_memory().expect("create in-memory store");

    store
        .write(|scope| {
            for parent in ["b", "a", "c"] {
                scope.add_edge(EdgeKind::Parent, "m", parent)?;
            }
            Ok(())
        })
        .expect("write edges");

    let targets = store
        .read(|scope| scope.targets(EdgeKind::Parent, "m"))
        .expect("read targets");
    assert_eq!(targets, vec!["b", "a", "c"]);
}

#[test]
fn test_set_edges_replaces_previous_targets() {
    let store = GraphStore::in_memory().expect("create in-memory store");

    store
        .write(|scope| {
            scope.set_edges(EdgeKind::FirstParent, "2#a", &["1#a".to_string()])?;
            scope.set_edges(EdgeKind::FirstParent, "2#a", &["0#a".to_string()])
        })
        .expect("write edges");

    store
        .read(|scope| {
            assert_eq!(scope.targets(EdgeKind::FirstParent, "2#a")?, vec!["0#a"]);
            assert!(scope.sources(EdgeKind::FirstParent, "1#a")?.is_empty());
            assert_eq!(scope.sources(EdgeKind::FirstParent, "0#a")?, vec!["2#a"]);
            Ok(())
        })
        .expect("read edges");

    store
        .write(|scope| scope.set_edges(EdgeKind::FirstParent, "2#a", &[]))
        .expect("clear edges");
    let lists = store.read(|scope| scope.edge_lists()).expect("edge lists");
    assert!(lists.is_empty());
}

#[test]
fn test_duplicate_change_is_rejected() {
    let store = GraphStore::in_memory().expect("create in-memory store");

    let err = store
        .write(|scope| {
            scope.find_or_create_commit("1")?;
            scope.create_change("1", &change("1", "a.txt"))?;
            scope.create_change("1", &change("1", "a.txt"))
        })
        .expect_err("duplicate change");
    assert!(matches!(err, GraphError::DuplicateChange { .. }));
}

#[test]
fn test_failed_write_rolls_back() {
    let store = GraphStore::in_memory().expect("create in-memory store");

    let result: GraphResult<()> = store.write(|scope| {
        scope.find_or_create_commit("lost")?;
        Err(GraphError::MalformedGraph("abort".into()))
    });
    assert!(result.is_err());

    let found = store.read(|scope| scope.commit("lost")).expect("read");
    assert!(found.is_none());
}

#[test]
fn test_owner_of_requires_exactly_one_owner() {
    let store = GraphStore::in_memory().expect("create in-memory store");

    store
        .write(|scope| {
            scope.find_or_create_commit("1")?;
            scope.find_or_create_commit("2")?;
            scope.create_change("1", &change("1", "a.txt"))?;
            // A second owner for the same change
            scope.add_edge(EdgeKind::Contains, "2", "1#a.txt")
        })
        .expect("write");

    let err = store
        .read(|scope| scope.owner_of("1#a.txt"))
        .expect_err("two owners");
    assert!(matches!(err, GraphError::MalformedGraph(_)));

    let err = store
        .read(|scope| scope.owner_of("missing"))
        .expect_err("no owner");
    assert!(matches!(err, GraphError::MalformedGraph(_)));
}

#[test]
fn test_indexes_online_after_init() {
    let store = GraphStore::in_memory().expect("create in-memory store");
    assert!(store.await_indexes_online(std::time::Duration::from_millis(10)));
}

#[test]
fn test_persistence() {
    let dir = tempdir().expect("create temp dir");
    let path = dir.path().join("index");

    {
        let store = GraphStore::new(&path).expect("create graph store");
        store
            .write(|scope| {
                scope.find_or_create_commit("0")?;
                scope.create_change("0", &change("0", "a.txt"))?;
                scope.set_meta(META_LOADED, "1")
            })
            .expect("write");
        // Release the database lock before reopening
        drop(store);
    }

    {
        let store = GraphStore::new(&path).expect("reload graph store");
        assert_eq!(store.db_path(), Some(path.as_path()));
        store
            .read(|scope| {
                assert!(scope.commit("0")?.is_some());
                assert_eq!(scope.changes_at_path("a.txt")?.len(), 1);
                assert_eq!(scope.meta(META_LOADED)?.as_deref(), Some("1"));
                Ok(())
            })
            .expect("read back");
    }
}
