// Upline walks
//
// The placement tree (parent edges) and the referral chain (sponsor edges)
// are two different relations. Each has its own walk and they must never be
// mixed: binary pairing, leg volumes and milestones follow parents, sponsor
// and repurchase bonuses follow sponsors.

use std::collections::HashSet;

use log::trace;
use mlm_common::participant::{ParticipantId, Position};

use super::{error::EngineError, storage::Storage};

/// Maximum number of steps a walk may take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkLimit(usize);

impl WalkLimit {
    /// Bound a walk by the configured depth and the number of participants:
    /// a chain longer than the directory can only be a cycle.
    pub async fn new<S: Storage>(storage: &S, max_walk_depth: usize) -> Result<Self, EngineError> {
        let count = storage.count_participants().await?;
        let by_count = usize::try_from(count).unwrap_or(usize::MAX).saturating_add(1);
        Ok(Self(max_walk_depth.min(by_count)))
    }

    /// Bound a traversal that can visit the whole directory
    pub async fn whole_directory<S: Storage>(storage: &S) -> Result<Self, EngineError> {
        Self::new(storage, usize::MAX).await
    }

    pub fn get(&self) -> usize {
        self.0
    }
}

/// Keeps track of visited nodes so a corrupted relation fails fast
struct Visitor {
    start: ParticipantId,
    limit: WalkLimit,
    visited: HashSet<ParticipantId>,
}

impl Visitor {
    fn new(start: ParticipantId, limit: WalkLimit) -> Self {
        let mut visited = HashSet::new();
        visited.insert(start);
        Self {
            start,
            limit,
            visited,
        }
    }

    fn visit(&mut self, id: ParticipantId, relation: &str) -> Result<(), EngineError> {
        if self.visited.len() > self.limit.get() {
            return Err(EngineError::WalkDepthExceeded {
                start: self.start,
                max_depth: self.limit.get(),
            });
        }
        if !self.visited.insert(id) {
            return Err(EngineError::InternalInconsistency(format!(
                "{} cycle through {} starting at {}",
                relation, id, self.start
            )));
        }
        Ok(())
    }
}

/// One step of the placement walk: the ancestor, and the slot under it the
/// walk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeStep {
    pub ancestor: ParticipantId,
    pub leg: Position,
}

/// Placement ancestors of `start`, nearest first, up to the root
pub async fn tree_ancestors<S: Storage>(
    storage: &S,
    start: ParticipantId,
    limit: WalkLimit,
) -> Result<Vec<TreeStep>, EngineError> {
    let mut visitor = Visitor::new(start, limit);
    let mut steps = Vec::new();
    let mut current = storage.get_participant(start).await?;

    while let Some(parent) = current.parent {
        visitor.visit(parent, "parent")?;
        let leg = current.position.ok_or_else(|| {
            EngineError::InternalInconsistency(format!(
                "{} has parent {} but no position",
                current.id, parent
            ))
        })?;
        steps.push(TreeStep {
            ancestor: parent,
            leg,
        });
        current = storage.get_participant(parent).await?;
    }

    if log::log_enabled!(log::Level::Trace) {
        trace!("{} has {} tree ancestors", start, steps.len());
    }
    Ok(steps)
}

/// Sponsor chain of `start`, nearest first, at most `max_levels` entries
pub async fn sponsor_chain<S: Storage>(
    storage: &S,
    start: ParticipantId,
    max_levels: usize,
    limit: WalkLimit,
) -> Result<Vec<ParticipantId>, EngineError> {
    let mut visitor = Visitor::new(start, limit);
    let mut chain = Vec::new();
    let mut current = storage.get_participant(start).await?;

    while chain.len() < max_levels {
        let Some(sponsor) = current.sponsor else {
            break;
        };
        visitor.visit(sponsor, "sponsor")?;
        chain.push(sponsor);
        current = storage.get_participant(sponsor).await?;
    }

    if log::log_enabled!(log::Level::Trace) {
        trace!("{} has {} sponsors in chain", start, chain.len());
    }
    Ok(chain)
}

/// Is `ancestor` the node itself or one of its placement ancestors?
pub async fn is_tree_ancestor_or_self<S: Storage>(
    storage: &S,
    ancestor: ParticipantId,
    node: ParticipantId,
    limit: WalkLimit,
) -> Result<bool, EngineError> {
    if ancestor == node {
        return Ok(true);
    }
    let mut visitor = Visitor::new(node, limit);
    let mut current = storage.get_participant(node).await?;
    while let Some(parent) = current.parent {
        if parent == ancestor {
            return Ok(true);
        }
        visitor.visit(parent, "parent")?;
        current = storage.get_participant(parent).await?;
    }
    Ok(false)
}

/// Placement subtree of `root` in post-order: children before their parent
pub async fn post_order<S: Storage>(
    storage: &S,
    root: ParticipantId,
    limit: WalkLimit,
) -> Result<Vec<ParticipantId>, EngineError> {
    let mut visitor = Visitor::new(root, limit);
    let mut order = Vec::new();
    // (node, children already pushed)
    let mut stack = vec![(root, false)];

    while let Some((id, expanded)) = stack.pop() {
        if expanded {
            order.push(id);
            continue;
        }
        let participant = storage.get_participant(id).await?;
        stack.push((id, true));
        // right pushed first so the left subtree is visited first
        for child in [participant.right_child, participant.left_child]
            .into_iter()
            .flatten()
        {
            visitor.visit(child, "child")?;
            stack.push((child, false));
        }
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::storage::{MemoryStorage, ParticipantProvider};
    use mlm_common::participant::Participant;

    // 1 <- 2 <- ... <- n, each one the left child and sponsored by its parent
    async fn line(n: ParticipantId) -> MemoryStorage {
        let mut storage = MemoryStorage::in_memory();
        storage
            .set_participant(&Participant::new(1, "p1".into(), None, None, None, 0))
            .await
            .unwrap();
        for id in 2..=n {
            let participant = Participant::new(
                id,
                format!("p{}", id),
                Some(id - 1),
                Some(id - 1),
                Some(Position::Left),
                0,
            );
            storage.set_participant(&participant).await.unwrap();
        }
        storage
    }

    #[tokio::test]
    async fn test_walks_follow_their_own_relation() {
        let mut storage = line(4).await;
        // 4 is sponsored by the root instead of its parent
        let mut last = storage.get_participant(4).await.unwrap();
        last.sponsor = Some(1);
        storage.set_participant(&last).await.unwrap();

        let limit = WalkLimit::new(&storage, 100).await.unwrap();
        let ancestors: Vec<_> = tree_ancestors(&storage, 4, limit)
            .await
            .unwrap()
            .into_iter()
            .map(|step| step.ancestor)
            .collect();
        assert_eq!(ancestors, vec![3, 2, 1]);
        assert_eq!(sponsor_chain(&storage, 4, 10, limit).await.unwrap(), vec![1]);
        assert_eq!(sponsor_chain(&storage, 3, 1, limit).await.unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn test_parent_cycle_is_detected() {
        let mut storage = line(3).await;
        let mut root = storage.get_participant(1).await.unwrap();
        root.parent = Some(3);
        root.position = Some(Position::Right);
        storage.set_participant(&root).await.unwrap();

        let limit = WalkLimit::new(&storage, 100).await.unwrap();
        assert!(matches!(
            tree_ancestors(&storage, 3, limit).await,
            Err(EngineError::InternalInconsistency(_))
        ));
        assert!(matches!(
            is_tree_ancestor_or_self(&storage, 9, 3, limit).await,
            Err(EngineError::InternalInconsistency(_))
        ));
    }

    #[tokio::test]
    async fn test_sponsor_cycle_is_detected() {
        let mut storage = line(3).await;
        let mut root = storage.get_participant(1).await.unwrap();
        root.sponsor = Some(3);
        storage.set_participant(&root).await.unwrap();

        let limit = WalkLimit::new(&storage, 100).await.unwrap();
        assert!(matches!(
            sponsor_chain(&storage, 3, 10, limit).await,
            Err(EngineError::InternalInconsistency(_))
        ));
        // a short enough chain never reaches the cycle
        assert_eq!(sponsor_chain(&storage, 3, 2, limit).await.unwrap(), vec![2, 1]);
    }

    #[tokio::test]
    async fn test_walk_limit_is_enforced() {
        let storage = line(5).await;
        let limit = WalkLimit::new(&storage, 2).await.unwrap();
        assert_eq!(limit.get(), 2);

        assert!(matches!(
            tree_ancestors(&storage, 5, limit).await,
            Err(EngineError::WalkDepthExceeded {
                start: 5,
                max_depth: 2
            })
        ));
        assert!(matches!(
            sponsor_chain(&storage, 5, 10, limit).await,
            Err(EngineError::WalkDepthExceeded { start: 5, .. })
        ));
        // two steps fit
        assert_eq!(tree_ancestors(&storage, 3, limit).await.unwrap().len(), 2);

        // the participant count bounds the limit too
        assert_eq!(WalkLimit::new(&storage, 100).await.unwrap().get(), 6);
        let whole = WalkLimit::whole_directory(&storage).await.unwrap();
        assert_eq!(post_order(&storage, 1, whole).await.unwrap(), vec![5, 4, 3, 2, 1]);
    }
}
