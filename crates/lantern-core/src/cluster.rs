use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::message::Message;

/// A companion of the focus with its similarity score. The score is the
/// heuristic blend, except for a continuity-preserved previous focus,
/// which is pinned at 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedMessage {
    pub message: Message,
    pub similarity: f64,
}

/// One displayable group: the foregrounded message, its similarity-ranked
/// companions, and the pre-selected next focus. An emitted value, not
/// retained state — the coordinator keeps only the previous cluster for
/// continuity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageCluster {
    pub focus: Message,
    pub related: Vec<RelatedMessage>,
    /// Becomes the focus next cycle. Equals `focus` in the single-member
    /// self-loop case, otherwise a member of `related`.
    pub next: Message,
    pub duration_ms: u64,
    /// Running count of clusters shown, this one included.
    pub total_shown: u64,
}

impl MessageCluster {
    pub fn related_ids(&self) -> Vec<i64> {
        self.related.iter().map(|r| r.message.id).collect()
    }
}

/// A selector postcondition failed. These are programming errors: the
/// coordinator logs them and retries selection rather than emitting a
/// corrupt cluster.
#[derive(Debug, Clone, PartialEq)]
pub enum ClusterDefect {
    DuplicateId(i64),
    FocusInRelated(i64),
    RelatedUnderfilled { len: usize, required: usize },
    NextNotInCluster(i64),
}

impl fmt::Display for ClusterDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterDefect::DuplicateId(id) => write!(f, "duplicate id {id} in cluster"),
            ClusterDefect::FocusInRelated(id) => {
                write!(f, "focus {id} appears in its own related list")
            }
            ClusterDefect::RelatedUnderfilled { len, required } => {
                write!(f, "related has {len} entries, expected at least {required}")
            }
            ClusterDefect::NextNotInCluster(id) => {
                write!(f, "next {id} is neither the focus nor a related member")
            }
        }
    }
}

/// Check the selector postconditions against the working set the cluster
/// was drawn from.
pub fn verify_cluster(
    cluster: &MessageCluster,
    working_set_len: usize,
    cluster_size: usize,
) -> Result<(), ClusterDefect> {
    let mut seen = BTreeSet::new();
    seen.insert(cluster.focus.id);
    for related in &cluster.related {
        let id = related.message.id;
        if id == cluster.focus.id {
            return Err(ClusterDefect::FocusInRelated(id));
        }
        if !seen.insert(id) {
            return Err(ClusterDefect::DuplicateId(id));
        }
    }
    if !seen.contains(&cluster.next.id) {
        return Err(ClusterDefect::NextNotInCluster(cluster.next.id));
    }
    let required = (cluster_size.saturating_sub(1)).min(working_set_len.saturating_sub(1));
    if cluster.related.len() < required {
        return Err(ClusterDefect::RelatedUnderfilled {
            len: cluster.related.len(),
            required,
        });
    }
    Ok(())
}
