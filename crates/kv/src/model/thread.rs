use std::thread::{self, ThreadId};

/// Records the thread that opened a write transaction.
///
/// Write transactions of LMDB-style engines, and everything derived from
/// them, must be driven from the opening thread. Engines store one of these
/// at transaction start and call [`ThreadAffinity::assert_current`] on every
/// mutating call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadAffinity {
    owner: ThreadId,
}

impl Default for ThreadAffinity {
    fn default() -> Self {
        Self::current()
    }
}

impl ThreadAffinity {
    /// Bind to the calling thread.
    pub fn current() -> Self {
        Self { owner: thread::current().id() }
    }

    /// The thread this value is bound to.
    pub const fn owner(&self) -> ThreadId {
        self.owner
    }

    /// True if called from the bound thread.
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.owner
    }

    /// Panic unless called from the bound thread.
    #[track_caller]
    pub fn assert_current(&self) {
        assert!(
            self.is_current(),
            "write transaction opened on {:?} used from {:?}",
            self.owner,
            thread::current().id()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_thread_passes() {
        let affinity = ThreadAffinity::current();
        affinity.assert_current();
        assert!(affinity.is_current());
    }

    #[test]
    fn other_thread_panics() {
        let affinity = ThreadAffinity::current();
        let outcome = thread::spawn(move || affinity.assert_current()).join();
        assert!(outcome.is_err());
    }
}
