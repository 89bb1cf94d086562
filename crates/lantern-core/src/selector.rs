//! Cluster selection: given the working set, pick the next displayable
//! group while preserving traversal continuity.

use std::collections::BTreeSet;

use crate::cluster::{MessageCluster, RelatedMessage};
use crate::config::EngineConfig;
use crate::message::Message;
use crate::similarity::similarity;
use crate::working_set::WorkingSet;

/// Select the next cluster. Returns `None` only when the working set is
/// empty — the no-content signal, never a panic.
///
/// Focus precedence: the previous cluster's pre-selected next (when still
/// a member), else the lowest priority id present, else the lowest-id
/// member. Related entries are the top `cluster_size - 1` members by
/// similarity to the focus, ties broken by ascending id. The previous
/// focus is forced into related (pinned at 1.0) when ranking dropped it,
/// so consecutive clusters always overlap.
pub fn select_cluster(
    working_set: &WorkingSet,
    priority_ids: &BTreeSet<i64>,
    previous: Option<&MessageCluster>,
    config: &EngineConfig,
    total_shown: u64,
) -> Option<MessageCluster> {
    let focus = choose_focus(working_set, priority_ids, previous)?.clone();
    let cap = config.cluster_size.saturating_sub(1);

    let mut related: Vec<RelatedMessage> = working_set
        .iter()
        .filter(|m| m.id != focus.id)
        .map(|m| RelatedMessage {
            similarity: similarity(&focus, m, &config.similarity),
            message: m.clone(),
        })
        .collect();
    sort_by_score(&mut related);
    related.truncate(cap);

    // Next is chosen from the genuine ranking before the continuity entry
    // is pinned at 1.0, so the previous focus cannot capture the next slot
    // and ping-pong the traversal.
    let next = choose_next(&related, priority_ids)
        .cloned()
        .unwrap_or_else(|| focus.clone());

    if let Some(prev) = previous {
        force_continuity(&mut related, prev, &focus, &next, working_set, cap);
    }

    Some(MessageCluster {
        focus,
        related,
        next,
        duration_ms: config.cluster_duration_ms,
        total_shown,
    })
}

fn choose_focus<'a>(
    working_set: &'a WorkingSet,
    priority_ids: &BTreeSet<i64>,
    previous: Option<&MessageCluster>,
) -> Option<&'a Message> {
    if let Some(prev) = previous
        && let Some(member) = working_set.get(prev.next.id)
    {
        return Some(member);
    }
    // BTreeSet iterates ascending, so the first present id is the lowest.
    if let Some(id) = priority_ids.iter().find(|id| working_set.contains(**id)) {
        return working_set.get(*id);
    }
    working_set.first()
}

/// Prefer a priority member (lowest id on tie); otherwise the
/// highest-similarity entry, which after sorting is the head.
fn choose_next<'a>(
    related: &'a [RelatedMessage],
    priority_ids: &BTreeSet<i64>,
) -> Option<&'a Message> {
    related
        .iter()
        .filter(|r| priority_ids.contains(&r.message.id))
        .min_by_key(|r| r.message.id)
        .or_else(|| related.first())
        .map(|r| &r.message)
}

/// Ensure the previous focus survives into the new related list so the
/// renderer never drops it mid-transition. Pinned at similarity 1.0,
/// replacing the lowest-scored entry that is not the chosen next.
fn force_continuity(
    related: &mut Vec<RelatedMessage>,
    previous: &MessageCluster,
    focus: &Message,
    next: &Message,
    working_set: &WorkingSet,
    cap: usize,
) {
    let prev_focus_id = previous.focus.id;
    if prev_focus_id == focus.id {
        return;
    }
    if related.iter().any(|r| r.message.id == prev_focus_id) {
        return;
    }
    let Some(member) = working_set.get(prev_focus_id) else {
        return;
    };
    let pinned = RelatedMessage {
        message: member.clone(),
        similarity: 1.0,
    };
    if related.len() < cap {
        related.push(pinned);
    } else if let Some(pos) = related.iter().rposition(|r| r.message.id != next.id) {
        related[pos] = pinned;
    } else {
        // Capacity 1 and the sole entry is next — keep next, skip forcing.
        return;
    }
    sort_by_score(related);
}

fn sort_by_score(related: &mut [RelatedMessage]) {
    related.sort_by(|a, b| {
        b.similarity
            .total_cmp(&a.similarity)
            .then(a.message.id.cmp(&b.message.id))
    });
}
