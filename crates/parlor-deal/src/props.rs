//! Equitable prop distribution.
//!
//! The pool is authoritative: each prop carries its own `assigned_to` slot.
//! Distribution fills the empty slots with a single min-heap of
//! `(current count, seat)` across the *entire* importance-sorted pool — one
//! heap for the whole run, never restarted per tier. Per-player prop views
//! are derived from the pool afterwards.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use parlor_protocol::{PlayerId, PropId, PropView};
use parlor_state::{Prop, SessionState};
use serde::Serialize;

use crate::error::DealError;

/// Report of one distribution run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Distribution {
    /// Props newly assigned by this run.
    pub assigned: usize,
    /// Props still unassigned afterwards.
    pub left: usize,
    /// Total props now held per player.
    pub per_player: BTreeMap<PlayerId, usize>,
}

/// Result of a facilitator override on a single prop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reassignment {
    pub prop_id: PropId,
    /// Who held the prop before, so both owners can be re-notified.
    pub previous_owner: Option<PlayerId>,
    pub new_owner: PlayerId,
}

/// Facilitator dashboard summary of the pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolSummary {
    pub total: usize,
    pub assigned: usize,
    pub left: usize,
    pub per_player: BTreeMap<PlayerId, usize>,
    /// Unassigned counts per importance tier: `[high, medium, low]`.
    pub unassigned_by_tier: [usize; 3],
}

// ---------------------------------------------------------------------------
// Distribution
// ---------------------------------------------------------------------------

/// Assigns every unassigned prop to the least-served player.
///
/// Deterministic: props are processed by importance (high first) then
/// numeric-aware id order, and ties between equally-served players go to the
/// lower seat. Existing assignments are never touched, so re-running with no
/// new props is a no-op reporting zero assigned. An empty roster assigns
/// nothing and reports all zeroes.
pub fn distribute_equitable(state: &mut SessionState) -> Distribution {
    if state.players.is_empty() {
        return Distribution {
            assigned: 0,
            left: 0,
            per_player: BTreeMap::new(),
        };
    }

    let counts = count_per_player(&state.props);
    let mut heap: BinaryHeap<Reverse<(usize, u32, PlayerId)>> = state
        .players
        .iter()
        .map(|p| Reverse((counts.get(&p.id).copied().unwrap_or(0), p.seat, p.id.clone())))
        .collect();

    let mut open: Vec<usize> = (0..state.props.len())
        .filter(|&i| state.props[i].assigned_to.is_none())
        .collect();
    open.sort_by_key(|&i| {
        let prop = &state.props[i];
        (prop.importance.rank(), id_sort_key(prop.id.as_str()))
    });

    let mut assigned = 0;
    for index in open {
        let Reverse((count, seat, player_id)) = heap.pop().expect("roster is non-empty");
        state.props[index].assigned_to = Some(player_id.clone());
        assigned += 1;
        heap.push(Reverse((count + 1, seat, player_id)));
    }

    sync_player_views(state);

    let left = state
        .props
        .iter()
        .filter(|p| p.assigned_to.is_none())
        .count();
    Distribution {
        assigned,
        left,
        per_player: count_per_player(&state.props),
    }
}

/// Clears every assignment slot and the derived views.
///
/// Returns the number of props that had an owner.
pub fn reset_assignments(state: &mut SessionState) -> usize {
    let mut cleared = 0;
    for prop in &mut state.props {
        if prop.assigned_to.take().is_some() {
            cleared += 1;
        }
    }
    sync_player_views(state);
    cleared
}

/// Facilitator override: (re)assigns one specific prop.
///
/// # Errors
/// [`DealError::PropNotFound`] if the pool has no such prop.
pub fn assign_specific(
    state: &mut SessionState,
    prop_id: &PropId,
    player_id: &PlayerId,
) -> Result<Reassignment, DealError> {
    let prop = state
        .props
        .iter_mut()
        .find(|p| &p.id == prop_id)
        .ok_or_else(|| DealError::PropNotFound(prop_id.clone()))?;

    let previous_owner = prop.assigned_to.replace(player_id.clone());
    sync_player_views(state);

    Ok(Reassignment {
        prop_id: prop_id.clone(),
        previous_owner,
        new_owner: player_id.clone(),
    })
}

/// Snapshot of the pool for the facilitator dashboard.
pub fn pool_summary(state: &SessionState) -> PoolSummary {
    let total = state.props.len();
    let assigned = state
        .props
        .iter()
        .filter(|p| p.assigned_to.is_some())
        .count();
    let mut unassigned_by_tier = [0usize; 3];
    for prop in state.props.iter().filter(|p| p.assigned_to.is_none()) {
        unassigned_by_tier[prop.importance.rank() as usize] += 1;
    }
    PoolSummary {
        total,
        assigned,
        left: total - assigned,
        per_player: count_per_player(&state.props),
        unassigned_by_tier,
    }
}

/// Rebuilds each player's ordered prop view from the pool.
pub fn sync_player_views(state: &mut SessionState) {
    let mut by_player: BTreeMap<PlayerId, Vec<PropId>> = BTreeMap::new();
    for prop in &state.props {
        if let Some(owner) = &prop.assigned_to {
            by_player.entry(owner.clone()).or_default().push(prop.id.clone());
        }
    }
    for ids in by_player.values_mut() {
        ids.sort_by_key(|id| id_sort_key(id.as_str()));
    }
    for player in &mut state.players {
        let ids = by_player.remove(&player.id).unwrap_or_default();
        player.props = ids
            .into_iter()
            .enumerate()
            .map(|(i, id)| PropView {
                num: i as u32 + 1,
                id,
            })
            .collect();
    }
}

fn count_per_player(props: &[Prop]) -> BTreeMap<PlayerId, usize> {
    let mut counts = BTreeMap::new();
    for prop in props {
        if let Some(owner) = &prop.assigned_to {
            *counts.entry(owner.clone()).or_insert(0) += 1;
        }
    }
    counts
}

/// Numeric-aware id ordering: `env2` sorts before `env10`; ids without a
/// trailing number sort after numbered ones, lexicographically.
fn id_sort_key(id: &str) -> (u8, u64, String) {
    let digits = id.chars().rev().take_while(|c| c.is_ascii_digit()).count();
    let tail = &id[id.len() - digits..];
    match tail.parse::<u64>() {
        Ok(n) => (0, n, String::new()),
        Err(_) => (1, 0, id.to_owned()),
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_protocol::{Importance, SessionId};

    fn state_with(players: &[&str], props: &[(&str, Importance)]) -> SessionState {
        let mut state = SessionState::new(SessionId::new("s1"));
        for name in players {
            state.add_player(PlayerId::new(*name), name.to_uppercase());
        }
        for (id, importance) in props {
            state.props.push(Prop {
                id: PropId::new(*id),
                importance: *importance,
                assigned_to: None,
            });
        }
        state
    }

    fn counts(state: &SessionState) -> Vec<usize> {
        state
            .players
            .iter()
            .map(|p| p.props.len())
            .collect()
    }

    // =====================================================================
    // id_sort_key()
    // =====================================================================

    #[test]
    fn test_id_sort_key_orders_numerically() {
        let mut ids = vec!["env10", "env2", "env1"];
        ids.sort_by_key(|id| id_sort_key(id));
        assert_eq!(ids, vec!["env1", "env2", "env10"]);
    }

    #[test]
    fn test_id_sort_key_unnumbered_ids_sort_last() {
        let mut ids = vec!["letter", "env3", "env12"];
        ids.sort_by_key(|id| id_sort_key(id));
        assert_eq!(ids, vec!["env3", "env12", "letter"]);
    }

    // =====================================================================
    // distribute_equitable()
    // =====================================================================

    #[test]
    fn test_distribute_empty_roster_touches_nothing() {
        let mut state = state_with(&[], &[("env1", Importance::High)]);

        let report = distribute_equitable(&mut state);

        assert_eq!(report.assigned, 0);
        assert_eq!(report.left, 0);
        assert!(report.per_player.is_empty());
        assert!(state.props[0].assigned_to.is_none());
    }

    #[test]
    fn test_distribute_balances_within_one() {
        let mut state = state_with(
            &["a", "b", "c"],
            &[
                ("env1", Importance::Medium),
                ("env2", Importance::Medium),
                ("env3", Importance::Medium),
                ("env4", Importance::Medium),
                ("env5", Importance::Medium),
                ("env6", Importance::Medium),
                ("env7", Importance::Medium),
            ],
        );

        let report = distribute_equitable(&mut state);

        assert_eq!(report.assigned, 7);
        assert_eq!(report.left, 0);
        let held = counts(&state);
        let (min, max) = (held.iter().min().unwrap(), held.iter().max().unwrap());
        assert!(max - min <= 1, "spread {held:?} exceeds one");
    }

    #[test]
    fn test_distribute_is_idempotent() {
        let mut state = state_with(
            &["a", "b"],
            &[("env1", Importance::High), ("env2", Importance::Low)],
        );

        distribute_equitable(&mut state);
        let first: Vec<_> = state.props.iter().map(|p| p.assigned_to.clone()).collect();

        let report = distribute_equitable(&mut state);

        assert_eq!(report.assigned, 0, "second run assigns nothing new");
        let second: Vec<_> = state.props.iter().map(|p| p.assigned_to.clone()).collect();
        assert_eq!(first, second, "assignments unchanged");
    }

    #[test]
    fn test_distribute_tops_up_without_reshuffling() {
        let mut state = state_with(
            &["a", "b"],
            &[("env1", Importance::High), ("env2", Importance::High)],
        );
        distribute_equitable(&mut state);
        let before: Vec<_> = state.props.iter().map(|p| p.assigned_to.clone()).collect();

        // New props arrive later; existing placements must not move.
        state.props.push(Prop {
            id: PropId::new("env3"),
            importance: Importance::Low,
            assigned_to: None,
        });
        state.props.push(Prop {
            id: PropId::new("env4"),
            importance: Importance::Low,
            assigned_to: None,
        });
        let report = distribute_equitable(&mut state);

        assert_eq!(report.assigned, 2);
        assert_eq!(
            &state.props[..2].iter().map(|p| p.assigned_to.clone()).collect::<Vec<_>>(),
            &before[..],
        );
        let held = counts(&state);
        assert!(held.iter().max().unwrap() - held.iter().min().unwrap() <= 1);
    }

    #[test]
    fn test_distribute_respects_preexisting_imbalance() {
        // Player a already holds two props; the heap must serve b first.
        let mut state = state_with(
            &["a", "b"],
            &[
                ("env1", Importance::Medium),
                ("env2", Importance::Medium),
                ("env3", Importance::Medium),
            ],
        );
        state.props[0].assigned_to = Some(PlayerId::new("a"));
        state.props[1].assigned_to = Some(PlayerId::new("a"));

        distribute_equitable(&mut state);

        assert_eq!(
            state.props[2].assigned_to.as_ref().unwrap(),
            &PlayerId::new("b")
        );
    }

    #[test]
    fn test_distribute_single_heap_across_tiers() {
        // 2 players, 2 high + 2 low. A per-tier round-robin restarted at
        // each bucket would hand seat 0 both first picks; the single global
        // heap alternates.
        let mut state = state_with(
            &["a", "b"],
            &[
                ("env1", Importance::High),
                ("env2", Importance::High),
                ("env3", Importance::Low),
                ("env4", Importance::Low),
            ],
        );

        distribute_equitable(&mut state);

        let held = counts(&state);
        assert_eq!(held, vec![2, 2]);
        // Each player got exactly one high prop.
        let high_owners: Vec<_> = state.props[..2]
            .iter()
            .map(|p| p.assigned_to.clone().unwrap())
            .collect();
        assert_ne!(high_owners[0], high_owners[1]);
    }

    #[test]
    fn test_distribute_end_to_end_scenario() {
        // 4 players, 5 props (2 high, 2 medium, 1 low): everyone ends with
        // at least one, nobody with more than two, and the two high props
        // land on the two least-served players first — seats 0 and 1 on a
        // fresh pool.
        let mut state = state_with(
            &["a", "b", "c", "d"],
            &[
                ("env5", Importance::Low),
                ("env1", Importance::High),
                ("env3", Importance::Medium),
                ("env2", Importance::High),
                ("env4", Importance::Medium),
            ],
        );

        let report = distribute_equitable(&mut state);

        assert_eq!(report.assigned, 5);
        assert_eq!(report.left, 0);
        let held = counts(&state);
        assert!(held.iter().all(|&n| (1..=2).contains(&n)), "held {held:?}");

        let owner_of = |id: &str| {
            state
                .prop(&PropId::new(id))
                .unwrap()
                .assigned_to
                .clone()
                .unwrap()
        };
        assert_eq!(owner_of("env1"), PlayerId::new("a"));
        assert_eq!(owner_of("env2"), PlayerId::new("b"));
    }

    #[test]
    fn test_player_views_are_ordered_and_numbered() {
        let mut state = state_with(
            &["a"],
            &[
                ("env10", Importance::Low),
                ("env2", Importance::Medium),
                ("env1", Importance::High),
            ],
        );

        distribute_equitable(&mut state);

        let views = &state.players[0].props;
        let ids: Vec<_> = views.iter().map(|v| v.id.as_str().to_owned()).collect();
        assert_eq!(ids, vec!["env1", "env2", "env10"]);
        let nums: Vec<_> = views.iter().map(|v| v.num).collect();
        assert_eq!(nums, vec![1, 2, 3]);
    }

    // =====================================================================
    // reset_assignments() / assign_specific() / pool_summary()
    // =====================================================================

    #[test]
    fn test_reset_assignments_clears_pool_and_views() {
        let mut state = state_with(
            &["a", "b"],
            &[("env1", Importance::High), ("env2", Importance::Low)],
        );
        distribute_equitable(&mut state);

        let cleared = reset_assignments(&mut state);

        assert_eq!(cleared, 2);
        assert!(state.props.iter().all(|p| p.assigned_to.is_none()));
        assert!(state.players.iter().all(|p| p.props.is_empty()));
    }

    #[test]
    fn test_assign_specific_reports_previous_owner() {
        let mut state = state_with(&["a", "b"], &[("env1", Importance::High)]);
        state.props[0].assigned_to = Some(PlayerId::new("a"));
        sync_player_views(&mut state);

        let outcome = assign_specific(&mut state, &PropId::new("env1"), &PlayerId::new("b"))
            .unwrap();

        assert_eq!(outcome.previous_owner, Some(PlayerId::new("a")));
        assert_eq!(outcome.new_owner, PlayerId::new("b"));
        assert!(state.players[0].props.is_empty());
        assert_eq!(state.players[1].props.len(), 1);
    }

    #[test]
    fn test_assign_specific_unknown_prop_fails() {
        let mut state = state_with(&["a"], &[]);

        let err = assign_specific(&mut state, &PropId::new("ghost"), &PlayerId::new("a"))
            .unwrap_err();

        assert!(matches!(err, DealError::PropNotFound(_)));
    }

    #[test]
    fn test_pool_summary_counts_by_tier() {
        let mut state = state_with(
            &["a"],
            &[
                ("env1", Importance::High),
                ("env2", Importance::Medium),
                ("env3", Importance::Low),
            ],
        );
        state.props[0].assigned_to = Some(PlayerId::new("a"));

        let summary = pool_summary(&state);

        assert_eq!(summary.total, 3);
        assert_eq!(summary.assigned, 1);
        assert_eq!(summary.left, 2);
        assert_eq!(summary.unassigned_by_tier, [0, 1, 1]);
        assert_eq!(summary.per_player[&PlayerId::new("a")], 1);
    }
}
