use keyed_priority_queue::KeyedPriorityQueue;
use rustc_hash::FxHashMap;
use std::{cmp::Ordering, collections::VecDeque};

use super::{resources::Memory, state::ProcId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueKind {
    Intake,
    HoldBySize,
    HoldFifo,
    Ready,
}

/// Position in the size-ordered hold queue: ascending memory, then insertion order.
#[derive(PartialEq, Eq, Hash, Debug, Copy, Clone)]
pub struct SizeKey {
    pub memory: Memory,
    pub seq: u64,
}

impl SizeKey {
    fn order(&self) -> (Memory, u64) {
        (self.memory, self.seq)
    }
}

// KeyedPriorityQueue is a max-heap, so the smallest (memory, seq) must compare greatest
impl PartialOrd for SizeKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SizeKey {
    fn cmp(&self, other: &Self) -> Ordering {
        other.order().cmp(&self.order())
    }
}

/// The four process containers. They hold arena handles only; `membership`
/// records which container a handle currently sits in.
#[derive(Debug)]
pub struct QueueSet {
    intake: VecDeque<ProcId>,
    hold_by_size: KeyedPriorityQueue<ProcId, SizeKey>,
    hold_fifo: VecDeque<ProcId>,
    ready: VecDeque<ProcId>,
    membership: FxHashMap<ProcId, QueueKind>,

    // Increment upon hold-by-size insertion
    next_seq: u64,
}

impl Default for QueueSet {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueSet {
    pub fn new() -> Self {
        Self {
            intake: VecDeque::new(),
            hold_by_size: KeyedPriorityQueue::new(),
            hold_fifo: VecDeque::new(),
            ready: VecDeque::new(),
            membership: FxHashMap::default(),
            next_seq: 0,
        }
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }

    fn claim(&mut self, proc_id: ProcId, kind: QueueKind) {
        let prev = self.membership.insert(proc_id, kind);
        assert!(
            prev.is_none(),
            "Process {proc_id:?} already present in {prev:?}, cannot enter {kind:?}"
        );
    }

    fn unclaim(&mut self, proc_id: ProcId, kind: QueueKind) {
        let removed = self.membership.remove(&proc_id);
        debug_assert_eq!(
            removed,
            Some(kind),
            "Process {proc_id:?} missing {kind:?} membership"
        );
    }

    pub fn push_intake(&mut self, proc_id: ProcId) {
        self.claim(proc_id, QueueKind::Intake);
        self.intake.push_back(proc_id);
    }

    pub fn push_ready(&mut self, proc_id: ProcId) {
        self.claim(proc_id, QueueKind::Ready);
        self.ready.push_back(proc_id);
    }

    pub fn push_hold_fifo(&mut self, proc_id: ProcId) {
        self.claim(proc_id, QueueKind::HoldFifo);
        self.hold_fifo.push_back(proc_id);
    }

    pub fn push_hold_by_size(&mut self, proc_id: ProcId, memory: Memory) {
        self.claim(proc_id, QueueKind::HoldBySize);
        let key = SizeKey {
            memory,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.hold_by_size.push(proc_id, key);
    }

    pub fn head(&self, kind: QueueKind) -> Option<ProcId> {
        match kind {
            QueueKind::Intake => self.intake.front().copied(),
            QueueKind::HoldBySize => self.hold_by_size.peek().map(|(id, _)| *id),
            QueueKind::HoldFifo => self.hold_fifo.front().copied(),
            QueueKind::Ready => self.ready.front().copied(),
        }
    }

    pub fn pop(&mut self, kind: QueueKind) -> Option<ProcId> {
        let proc_id = match kind {
            QueueKind::Intake => self.intake.pop_front(),
            QueueKind::HoldBySize => self.hold_by_size.pop().map(|(id, _)| id),
            QueueKind::HoldFifo => self.hold_fifo.pop_front(),
            QueueKind::Ready => self.ready.pop_front(),
        }?;
        self.unclaim(proc_id, kind);
        Some(proc_id)
    }

    /// Handles in queue order, head first.
    pub fn list(&self, kind: QueueKind) -> Vec<ProcId> {
        match kind {
            QueueKind::Intake => self.intake.iter().copied().collect(),
            QueueKind::HoldBySize => {
                let mut entries: Vec<_> = self.hold_by_size.iter().collect();
                entries.sort_by_key(|(_, key)| key.order());
                entries.into_iter().map(|(id, _)| *id).collect()
            }
            QueueKind::HoldFifo => self.hold_fifo.iter().copied().collect(),
            QueueKind::Ready => self.ready.iter().copied().collect(),
        }
    }

    pub fn ready(&self) -> impl Iterator<Item = ProcId> + '_ {
        self.ready.iter().copied()
    }

    pub fn len(&self, kind: QueueKind) -> usize {
        match kind {
            QueueKind::Intake => self.intake.len(),
            QueueKind::HoldBySize => self.hold_by_size.len(),
            QueueKind::HoldFifo => self.hold_fifo.len(),
            QueueKind::Ready => self.ready.len(),
        }
    }

    pub fn is_empty(&self, kind: QueueKind) -> bool {
        self.len(kind) == 0
    }

    pub fn location(&self, proc_id: ProcId) -> Option<QueueKind> {
        self.membership.get(&proc_id).copied()
    }

    pub fn memberships(&self) -> impl Iterator<Item = (ProcId, QueueKind)> + '_ {
        self.membership.iter().map(|(id, kind)| (*id, *kind))
    }
}
