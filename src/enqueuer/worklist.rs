//! The pending action queue of the fixpoint driver.

use std::collections::VecDeque;

use strum::EnumCount;

use crate::enqueuer::{ActionKind, EnqueuerAction};

/// Counters of a worklist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorklistStats {
    /// Actions pushed over the lifetime of the worklist.
    pub enqueued: usize,
    /// Actions popped over the lifetime of the worklist.
    pub processed: usize,
    /// Largest number of pending actions observed.
    pub peak: usize,
    /// Popped actions per [`ActionKind`], indexed by discriminant.
    pub processed_by_kind: [usize; ActionKind::COUNT],
}

impl WorklistStats {
    /// Popped actions of one kind
    #[must_use]
    pub fn processed_of(&self, kind: ActionKind) -> usize {
        self.processed_by_kind[kind as usize]
    }
}

/// FIFO queue of pending actions.
#[derive(Debug, Default)]
pub struct Worklist {
    queue: VecDeque<EnqueuerAction>,
    stats: WorklistStats,
}

impl Worklist {
    /// Creates an empty worklist
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an action
    pub fn push(&mut self, action: EnqueuerAction) {
        self.queue.push_back(action);
        self.stats.enqueued += 1;
        self.stats.peak = self.stats.peak.max(self.queue.len());
    }

    /// Appends all actions in order
    pub fn extend(&mut self, actions: impl IntoIterator<Item = EnqueuerAction>) {
        for action in actions {
            self.push(action);
        }
    }

    /// Removes the oldest pending action
    pub fn pop(&mut self) -> Option<EnqueuerAction> {
        let action = self.queue.pop_front()?;
        self.stats.processed += 1;
        self.stats.processed_by_kind[action.kind() as usize] += 1;
        Some(action)
    }

    /// Returns true if nothing is pending
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of pending actions
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Counters since creation
    #[must_use]
    pub fn stats(&self) -> &WorklistStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{enqueuer::KeepReason, program::Token};

    #[test]
    fn test_fifo_and_counters() {
        let mut worklist = Worklist::new();
        worklist.extend((0..3).map(|index| EnqueuerAction::MarkTypeLive {
            ty: Token::class(index),
            reason: KeepReason::ImplicitRoot,
        }));
        worklist.push(EnqueuerAction::MarkMethodLive {
            method: Token::method(0),
            reason: KeepReason::ImplicitRoot,
        });

        assert_eq!(worklist.len(), 4);
        assert!(matches!(
            worklist.pop(),
            Some(EnqueuerAction::MarkTypeLive { ty, .. }) if ty == Token::class(0)
        ));
        while worklist.pop().is_some() {}

        let stats = worklist.stats();
        assert_eq!(stats.enqueued, 4);
        assert_eq!(stats.processed, 4);
        assert_eq!(stats.peak, 4);
        assert_eq!(stats.processed_of(ActionKind::MarkTypeLive), 3);
        assert_eq!(stats.processed_of(ActionKind::MarkMethodLive), 1);
        assert!(worklist.is_empty());
    }
}
