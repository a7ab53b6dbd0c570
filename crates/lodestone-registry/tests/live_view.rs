//! Integration tests for the live view: freshness, reuse, and what an
//! in-progress iteration observes when the registry changes underneath it.

use std::collections::HashSet;
use std::rc::Rc;

use lodestone_protocol::PlayerIdentity;
use lodestone_registry::{ConnectionHandle, LiveView, PlayerRegistry};

// =========================================================================
// Helpers
// =========================================================================

fn id(name: &str) -> PlayerIdentity {
    PlayerIdentity::new(name)
}

fn registry_with(names: &[&str]) -> PlayerRegistry {
    let mut reg = PlayerRegistry::new();
    for name in names {
        reg.connect(id(name), ConnectionHandle::channel("127.0.0.1").0)
            .expect("fresh names should connect");
    }
    reg
}

fn names(view: &LiveView) -> HashSet<String> {
    view.iter().map(|p| p.name().to_string()).collect()
}

// =========================================================================
// Freshness
// =========================================================================

#[test]
fn test_view_reflects_disconnect_without_reacquiring() {
    let mut reg = registry_with(&["A", "B"]);
    let view = reg.live_view();
    assert_eq!(names(&view), HashSet::from(["A".into(), "B".into()]));

    reg.disconnect(&id("A")).unwrap();

    // Same view object, iterated again: only B remains.
    assert_eq!(names(&view), HashSet::from(["B".into()]));
    assert_eq!(view.len(), 1);
    assert!(!view.contains(&id("A")));
}

#[test]
fn test_view_reflects_later_connects() {
    let mut reg = registry_with(&[]);
    let view = reg.live_view();
    assert!(view.is_empty());

    reg.connect(id("C"), ConnectionHandle::channel("10.0.0.3").0)
        .unwrap();

    assert_eq!(view.len(), 1);
    assert!(view.get("c").is_some());
}

#[test]
fn test_view_identity_is_stable() {
    let mut reg = registry_with(&["A"]);
    let first = reg.live_view();
    reg.disconnect(&id("A")).unwrap();
    let second = reg.live_view();

    assert!(first.ptr_eq(&second));
}

// =========================================================================
// Snapshot isolation
// =========================================================================

#[test]
fn test_snapshot_is_isolated_from_later_changes() {
    let mut reg = registry_with(&["A", "B", "C"]);
    let snapshot = reg.live_view().snapshot();

    reg.disconnect(&id("B")).unwrap();

    assert_eq!(snapshot.len(), 3);
    let b = snapshot.iter().find(|p| p.name() == "B").unwrap();
    assert!(!b.is_online(), "the snapshot handle sees the session ended");
}

#[test]
fn test_snapshot_allows_disconnecting_everyone() {
    let mut reg = registry_with(&["A", "B", "C", "D"]);

    for player in reg.live_view().snapshot() {
        reg.disconnect(player.identity()).unwrap();
    }

    assert!(reg.is_empty());
}

// =========================================================================
// Mid-iteration mutation (documented hazard, must not panic)
// =========================================================================

#[test]
fn test_iteration_skips_player_removed_mid_iteration() {
    let mut reg = registry_with(&["A", "B", "C"]);
    let view = reg.live_view();
    let mut seen = Vec::new();

    for player in view.iter() {
        seen.push(player.name().to_string());
        if player.name() == "A" {
            // Side effect of the loop body: C leaves before we reach it.
            reg.disconnect(&id("C")).unwrap();
        }
    }

    assert_eq!(seen, vec!["A".to_string(), "B".to_string()]);
}

#[test]
fn test_iteration_does_not_revisit_or_panic_when_current_player_leaves() {
    let mut reg = registry_with(&["A", "B", "C"]);
    let view = reg.live_view();
    let mut visited = 0;

    for player in &view {
        visited += 1;
        reg.disconnect(player.identity()).unwrap();
    }

    assert_eq!(visited, 3);
    assert!(view.is_empty());
}

#[test]
fn test_items_are_shared_handles_not_copies() {
    let reg = registry_with(&["A"]);
    let from_view = reg.live_view().iter().next().unwrap();
    let from_lookup = reg.by_exact_name("a").unwrap();

    assert!(Rc::ptr_eq(&from_view, &from_lookup));
}
