//! Tiered hint delivery and the culprit's destroy action.
//!
//! The discoverer/others asymmetry is computed once, at delivery time, and
//! frozen into the hint record. Later display queries filter that history,
//! so they always agree with what was actually pushed to each player.

use parlor_protocol::{HintId, HintTier, PlayerId};
use parlor_state::{HintDeliveryEntry, HintRecord, PreparedRound, SessionState, hex_token, unix_now};

use crate::error::DealError;

/// When no sharing rule matches, fall through these tiers in order and use
/// the first one present in the round's hint map.
const TIER_FALLBACK: [HintTier; 3] = [HintTier::Vague, HintTier::Minor, HintTier::Misleading];

/// Delivers a discovered hint to every player on the roster.
///
/// With `share`, everyone receives the discoverer's exact tier. Without it,
/// the discoverer still gets their tier and everyone else gets the degraded
/// tier from the round's sharing rules (falling back through
/// vague → minor → misleading, then the source tier itself).
///
/// Produces one immutable [`HintRecord`] with a delivery entry per player,
/// appends it to the session history, and logs an audit event. Pushing the
/// per-recipient messages is the caller's job (see
/// [`DealEngine`](crate::DealEngine)).
///
/// # Errors
/// [`DealError::UnknownDiscoverer`], [`DealError::RoundNotPrepared`], or
/// [`DealError::TierUnavailable`].
pub fn deliver_hint(
    state: &mut SessionState,
    round_index: u32,
    discoverer_id: &PlayerId,
    tier: HintTier,
    share: bool,
) -> Result<HintRecord, DealError> {
    if !state.has_player(discoverer_id) {
        return Err(DealError::UnknownDiscoverer(discoverer_id.clone()));
    }
    let prepared = state
        .prepared
        .get(&round_index)
        .filter(|p| !p.hints.is_empty())
        .ok_or(DealError::RoundNotPrepared(round_index))?;
    if !prepared.hints.contains_key(&tier) {
        return Err(DealError::TierUnavailable(tier));
    }

    let other_tier = resolve_other_tier(tier, share, prepared);

    let deliveries: Vec<HintDeliveryEntry> = state
        .players
        .iter()
        .map(|player| {
            let deliver_tier = if share || &player.id == discoverer_id {
                tier
            } else {
                other_tier
            };
            let text = prepared
                .hints
                .get(&deliver_tier)
                .or_else(|| prepared.hints.get(&tier))
                .cloned()
                .unwrap_or_default();
            HintDeliveryEntry {
                player_id: player.id.clone(),
                tier: deliver_tier,
                text,
            }
        })
        .collect();

    let record = HintRecord {
        hint_id: HintId::new(hex_token()),
        round_index,
        discoverer_id: discoverer_id.clone(),
        source_tier: tier,
        shared: share,
        other_tier,
        deliveries,
        destroyed: false,
        destroyed_by: None,
        created_at: unix_now(),
    };

    state.hints.push(record.clone());
    state.log_event(
        "hint_delivered",
        serde_json::json!({
            "hint_id": record.hint_id.as_str(),
            "round_index": round_index,
            "discoverer_id": discoverer_id.as_str(),
            "shared": share,
        }),
    );
    tracing::info!(
        session_id = %state.session_id,
        hint_id = %record.hint_id,
        %discoverer_id,
        %tier,
        share,
        "hint delivered"
    );

    Ok(record)
}

/// Marks a hint destroyed, exactly once, by the designated culprit.
///
/// # Errors
/// [`DealError::HintNotFound`], [`DealError::AlreadyDestroyed`],
/// [`DealError::NotAuthorized`] (a culprit is cast and the caller is not
/// them), or [`DealError::QuotaReached`]. A quota of 0 means unlimited.
pub fn destroy_hint(
    state: &mut SessionState,
    hint_id: &HintId,
    killer_id: &PlayerId,
) -> Result<HintRecord, DealError> {
    let culprit = state.culprit_id().cloned();
    let quota = state.killer.destroy_quota;
    let used = state.killer.destroy_used;

    let record = state
        .hints
        .iter_mut()
        .find(|h| &h.hint_id == hint_id)
        .ok_or_else(|| DealError::HintNotFound(hint_id.clone()))?;

    if record.destroyed {
        return Err(DealError::AlreadyDestroyed(hint_id.clone()));
    }
    if let Some(culprit) = culprit {
        if &culprit != killer_id {
            return Err(DealError::NotAuthorized);
        }
    }
    if quota > 0 && used >= quota {
        return Err(DealError::QuotaReached { quota });
    }

    record.destroyed = true;
    record.destroyed_by = Some(killer_id.clone());
    let snapshot = record.clone();

    state.killer.destroy_used = used + 1;
    state.log_event(
        "hint_destroyed",
        serde_json::json!({
            "hint_id": hint_id.as_str(),
            "killer_id": killer_id.as_str(),
        }),
    );
    tracing::info!(
        session_id = %state.session_id,
        %hint_id,
        %killer_id,
        "hint destroyed"
    );

    Ok(snapshot)
}

/// Hints visible to one player: their own delivery entries from records that
/// have not been destroyed.
pub fn hints_for_player(state: &SessionState, player_id: &PlayerId) -> Vec<HintDeliveryEntry> {
    state
        .hints
        .iter()
        .filter(|record| !record.destroyed)
        .flat_map(|record| record.deliveries.iter())
        .filter(|entry| &entry.player_id == player_id)
        .cloned()
        .collect()
}

fn resolve_other_tier(tier: HintTier, share: bool, prepared: &PreparedRound) -> HintTier {
    if share {
        return tier;
    }
    if let Some(mapped) = prepared.sharing_rules.get(&tier) {
        if prepared.hints.contains_key(mapped) {
            return *mapped;
        }
    }
    for fallback in TIER_FALLBACK {
        if prepared.hints.contains_key(&fallback) {
            return fallback;
        }
    }
    tier
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_protocol::SessionId;
    use parlor_state::PlayerRole;
    use std::collections::BTreeMap;

    fn prepared(tiers: &[(HintTier, &str)], rules: &[(HintTier, HintTier)]) -> PreparedRound {
        PreparedRound {
            hints: tiers
                .iter()
                .map(|(t, text)| (*t, text.to_string()))
                .collect(),
            sharing_rules: rules.iter().copied().collect::<BTreeMap<_, _>>(),
            intro: None,
            outro: None,
        }
    }

    fn state_with_round(prepared_round: PreparedRound) -> SessionState {
        let mut state = SessionState::new(SessionId::new("s1"));
        for name in ["a", "b", "c"] {
            state.add_player(PlayerId::new(name), name.to_uppercase());
        }
        state.prepared.insert(1, prepared_round);
        state
    }

    fn tier_for<'a>(record: &'a HintRecord, player: &str) -> &'a HintDeliveryEntry {
        record
            .deliveries
            .iter()
            .find(|d| d.player_id == PlayerId::new(player))
            .unwrap()
    }

    // =====================================================================
    // deliver_hint()
    // =====================================================================

    #[test]
    fn test_deliver_shared_gives_everyone_the_same_tier() {
        let mut state = state_with_round(prepared(
            &[(HintTier::Major, "The will was rewritten."), (HintTier::Vague, "Papers rustle.")],
            &[(HintTier::Major, HintTier::Vague)],
        ));

        let record =
            deliver_hint(&mut state, 1, &PlayerId::new("a"), HintTier::Major, true).unwrap();

        assert!(record.shared);
        for delivery in &record.deliveries {
            assert_eq!(delivery.tier, HintTier::Major);
            assert_eq!(delivery.text, "The will was rewritten.");
        }
    }

    #[test]
    fn test_deliver_unshared_degrades_others_via_rule() {
        let mut state = state_with_round(prepared(
            &[(HintTier::Major, "The will was rewritten."), (HintTier::Vague, "Papers rustle.")],
            &[(HintTier::Major, HintTier::Vague)],
        ));

        let record =
            deliver_hint(&mut state, 1, &PlayerId::new("a"), HintTier::Major, false).unwrap();

        assert_eq!(tier_for(&record, "a").tier, HintTier::Major);
        assert_eq!(tier_for(&record, "b").tier, HintTier::Vague);
        assert_eq!(tier_for(&record, "c").tier, HintTier::Vague);
        assert_eq!(tier_for(&record, "b").text, "Papers rustle.");
        assert_eq!(record.other_tier, HintTier::Vague);
    }

    #[test]
    fn test_deliver_unshared_falls_back_through_chain() {
        // No sharing rule and no vague text: the chain lands on minor.
        let mut state = state_with_round(prepared(
            &[
                (HintTier::Major, "major text"),
                (HintTier::Minor, "minor text"),
                (HintTier::Misleading, "misleading text"),
            ],
            &[],
        ));

        let record =
            deliver_hint(&mut state, 1, &PlayerId::new("a"), HintTier::Major, false).unwrap();

        assert_eq!(record.other_tier, HintTier::Minor);
    }

    #[test]
    fn test_deliver_unshared_rule_pointing_at_missing_tier_is_skipped() {
        // The rule maps major→vague but the round has no vague text, so the
        // fallback chain resolves minor instead.
        let mut state = state_with_round(prepared(
            &[(HintTier::Major, "major text"), (HintTier::Minor, "minor text")],
            &[(HintTier::Major, HintTier::Vague)],
        ));

        let record =
            deliver_hint(&mut state, 1, &PlayerId::new("a"), HintTier::Major, false).unwrap();

        assert_eq!(record.other_tier, HintTier::Minor);
    }

    #[test]
    fn test_deliver_unshared_with_no_alternative_keeps_source_tier() {
        let mut state = state_with_round(prepared(&[(HintTier::Major, "major text")], &[]));

        let record =
            deliver_hint(&mut state, 1, &PlayerId::new("a"), HintTier::Major, false).unwrap();

        assert_eq!(record.other_tier, HintTier::Major);
        assert_eq!(tier_for(&record, "b").text, "major text");
    }

    #[test]
    fn test_deliver_unknown_discoverer_fails() {
        let mut state = state_with_round(prepared(&[(HintTier::Major, "x")], &[]));

        let err = deliver_hint(&mut state, 1, &PlayerId::new("ghost"), HintTier::Major, true)
            .unwrap_err();

        assert!(matches!(err, DealError::UnknownDiscoverer(_)));
        assert!(state.hints.is_empty());
    }

    #[test]
    fn test_deliver_unprepared_round_fails() {
        let mut state = state_with_round(prepared(&[(HintTier::Major, "x")], &[]));

        let err =
            deliver_hint(&mut state, 9, &PlayerId::new("a"), HintTier::Major, true).unwrap_err();

        assert!(matches!(err, DealError::RoundNotPrepared(9)));
    }

    #[test]
    fn test_deliver_unavailable_tier_fails() {
        let mut state = state_with_round(prepared(&[(HintTier::Major, "x")], &[]));

        let err = deliver_hint(&mut state, 1, &PlayerId::new("a"), HintTier::Misleading, true)
            .unwrap_err();

        assert!(matches!(err, DealError::TierUnavailable(HintTier::Misleading)));
    }

    #[test]
    fn test_deliver_appends_to_history_and_journal() {
        let mut state = state_with_round(prepared(&[(HintTier::Major, "x")], &[]));

        let record =
            deliver_hint(&mut state, 1, &PlayerId::new("a"), HintTier::Major, true).unwrap();

        assert_eq!(state.hints.len(), 1);
        assert_eq!(state.hints[0].hint_id, record.hint_id);
        assert!(state.events.iter().any(|e| e.kind == "hint_delivered"));
    }

    // =====================================================================
    // destroy_hint()
    // =====================================================================

    fn delivered_state() -> (SessionState, HintId) {
        let mut state = state_with_round(prepared(&[(HintTier::Major, "x")], &[]));
        state.player_mut(&PlayerId::new("c")).unwrap().role = PlayerRole::Culprit;
        state.killer.destroy_quota = 2;
        let record =
            deliver_hint(&mut state, 1, &PlayerId::new("a"), HintTier::Major, true).unwrap();
        (state, record.hint_id)
    }

    #[test]
    fn test_destroy_by_culprit_marks_record_once() {
        let (mut state, hint_id) = delivered_state();

        let record = destroy_hint(&mut state, &hint_id, &PlayerId::new("c")).unwrap();

        assert!(record.destroyed);
        assert_eq!(record.destroyed_by, Some(PlayerId::new("c")));
        assert_eq!(state.killer.destroy_used, 1);
    }

    #[test]
    fn test_destroy_twice_fails_with_already_destroyed() {
        let (mut state, hint_id) = delivered_state();
        destroy_hint(&mut state, &hint_id, &PlayerId::new("c")).unwrap();

        let err = destroy_hint(&mut state, &hint_id, &PlayerId::new("c")).unwrap_err();

        assert!(matches!(err, DealError::AlreadyDestroyed(_)));
        assert_eq!(state.killer.destroy_used, 1, "quota not double-charged");
    }

    #[test]
    fn test_destroy_by_non_culprit_is_not_authorized() {
        let (mut state, hint_id) = delivered_state();

        let err = destroy_hint(&mut state, &hint_id, &PlayerId::new("a")).unwrap_err();

        assert!(matches!(err, DealError::NotAuthorized));
        assert!(!state.hint(&hint_id).unwrap().destroyed);
    }

    #[test]
    fn test_destroy_without_cast_culprit_is_open() {
        // No culprit cast yet: the role gate does not apply.
        let mut state = state_with_round(prepared(&[(HintTier::Major, "x")], &[]));
        let record =
            deliver_hint(&mut state, 1, &PlayerId::new("a"), HintTier::Major, true).unwrap();

        assert!(destroy_hint(&mut state, &record.hint_id, &PlayerId::new("b")).is_ok());
    }

    #[test]
    fn test_destroy_quota_two_allows_two_then_blocks() {
        let mut state = state_with_round(prepared(&[(HintTier::Major, "x")], &[]));
        state.player_mut(&PlayerId::new("c")).unwrap().role = PlayerRole::Culprit;
        state.killer.destroy_quota = 2;
        let killer = PlayerId::new("c");
        let ids: Vec<HintId> = (0..3)
            .map(|_| {
                deliver_hint(&mut state, 1, &PlayerId::new("a"), HintTier::Major, true)
                    .unwrap()
                    .hint_id
            })
            .collect();

        assert!(destroy_hint(&mut state, &ids[0], &killer).is_ok());
        assert!(destroy_hint(&mut state, &ids[1], &killer).is_ok());
        let err = destroy_hint(&mut state, &ids[2], &killer).unwrap_err();
        assert!(matches!(err, DealError::QuotaReached { quota: 2 }));
        assert!(!state.hint(&ids[2]).unwrap().destroyed);
    }

    #[test]
    fn test_destroy_quota_zero_is_unlimited() {
        let mut state = state_with_round(prepared(&[(HintTier::Major, "x")], &[]));
        let killer = PlayerId::new("a");
        for _ in 0..5 {
            let id = deliver_hint(&mut state, 1, &killer, HintTier::Major, true)
                .unwrap()
                .hint_id;
            assert!(destroy_hint(&mut state, &id, &killer).is_ok());
        }
    }

    #[test]
    fn test_destroy_unknown_hint_fails() {
        let (mut state, _) = delivered_state();

        let err =
            destroy_hint(&mut state, &HintId::new("ghost"), &PlayerId::new("c")).unwrap_err();

        assert!(matches!(err, DealError::HintNotFound(_)));
    }

    // =====================================================================
    // hints_for_player()
    // =====================================================================

    #[test]
    fn test_hints_for_player_matches_delivery_entries() {
        let mut state = state_with_round(prepared(
            &[(HintTier::Major, "major text"), (HintTier::Vague, "vague text")],
            &[(HintTier::Major, HintTier::Vague)],
        ));
        deliver_hint(&mut state, 1, &PlayerId::new("a"), HintTier::Major, false).unwrap();

        let a_view = hints_for_player(&state, &PlayerId::new("a"));
        let b_view = hints_for_player(&state, &PlayerId::new("b"));

        assert_eq!(a_view[0].tier, HintTier::Major);
        assert_eq!(b_view[0].tier, HintTier::Vague);
    }

    #[test]
    fn test_hints_for_player_hides_destroyed_records() {
        let mut state = state_with_round(prepared(&[(HintTier::Major, "x")], &[]));
        let record =
            deliver_hint(&mut state, 1, &PlayerId::new("a"), HintTier::Major, true).unwrap();
        destroy_hint(&mut state, &record.hint_id, &PlayerId::new("b")).unwrap();

        assert!(hints_for_player(&state, &PlayerId::new("a")).is_empty());
    }
}
