use crate::component::InstanceId;
use crate::hash::map::HashSet;

/// Dirty-instance queue with a single pending-frame flag.
///
/// `mark` reports whether the caller must request a frame: only the first
/// mark after a flush starts does. A flush in progress takes the batch and
/// clears the flag up front, so marks made while it runs land in the next
/// batch instead of the current one.
#[derive(Default)]
pub(crate) struct DirtyQueue {
    dirty: Vec<InstanceId>,
    queued: HashSet<InstanceId>,
    pending: bool,
    flushing: bool,
}

impl DirtyQueue {
    pub(crate) fn mark(&mut self, instance: InstanceId) -> bool {
        if self.queued.insert(instance) {
            self.dirty.push(instance);
        }
        if self.pending {
            false
        } else {
            self.pending = true;
            true
        }
    }

    /// Takes the current batch, or `None` when a flush is already running.
    pub(crate) fn begin_flush(&mut self) -> Option<Vec<InstanceId>> {
        if self.flushing {
            return None;
        }
        self.flushing = true;
        self.pending = false;
        self.queued.clear();
        Some(std::mem::take(&mut self.dirty))
    }

    pub(crate) fn end_flush(&mut self) {
        self.flushing = false;
    }

    pub(crate) fn is_pending(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub(crate) fn is_flushing(&self) -> bool {
        self.flushing
    }

    pub(crate) fn len(&self) -> usize {
        self.dirty.len()
    }
}
