//! The cache contract: what the model persists between sessions about the
//! selected mailbox, and nothing more. Real backends live outside this
//! crate; [`NoCache`] is the in-memory stub that forgets everything when
//! dropped.

/// Per-mailbox numbers and the sequence↔UID correspondence.
///
/// The engine calls this from a single task; implementations need not be
/// thread-safe.
pub trait Cache {
    /// Server sent fresh UIDVALIDITY/UIDNEXT/EXISTS for the selected
    /// mailbox.
    fn set_new_numbers(&mut self, uid_validity: u32, uid_next: u32, exists: u32);

    /// Throws away all cached information.
    fn forget(&mut self);

    /// Throws away only the sequence↔UID map.
    fn forget_seq_uid(&mut self);

    fn uid_next(&self) -> u32;
    fn exists(&self) -> u32;
    fn uid_validity(&self) -> u32;

    fn seq_to_uid(&self, seq: u32) -> Option<u32>;
    fn uid_to_seq(&self, uid: u32) -> Option<u32>;
    fn add_seq_uid(&mut self, seq: u32, uid: u32);
}

/// A cache that does not actually cache anything beyond the three numbers
/// needed for the current session.
#[derive(Debug, Default)]
pub struct NoCache {
    uid_next: u32,
    uid_validity: u32,
    exists: u32,
    seq_to_uid: std::collections::BTreeMap<u32, u32>,
}

impl NoCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Cache for NoCache {
    fn set_new_numbers(&mut self, uid_validity: u32, uid_next: u32, exists: u32) {
        self.uid_validity = uid_validity;
        self.uid_next = uid_next;
        self.exists = exists;
    }

    fn forget(&mut self) {
        *self = NoCache::default();
    }

    fn forget_seq_uid(&mut self) {
        self.seq_to_uid.clear();
    }

    fn uid_next(&self) -> u32 {
        self.uid_next
    }

    fn exists(&self) -> u32 {
        self.exists
    }

    fn uid_validity(&self) -> u32 {
        self.uid_validity
    }

    fn seq_to_uid(&self, seq: u32) -> Option<u32> {
        self.seq_to_uid.get(&seq).copied()
    }

    fn uid_to_seq(&self, uid: u32) -> Option<u32> {
        self.seq_to_uid
            .iter()
            .find(|(_, &u)| u == uid)
            .map(|(&seq, _)| seq)
    }

    fn add_seq_uid(&mut self, seq: u32, uid: u32) {
        self.seq_to_uid.insert(seq, uid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_round_trip() {
        let mut cache = NoCache::new();
        cache.set_new_numbers(17, 45, 3);
        assert_eq!(cache.uid_validity(), 17);
        assert_eq!(cache.uid_next(), 45);
        assert_eq!(cache.exists(), 3);
    }

    #[test]
    fn seq_uid_map() {
        let mut cache = NoCache::new();
        cache.add_seq_uid(1, 100);
        cache.add_seq_uid(2, 102);
        assert_eq!(cache.seq_to_uid(2), Some(102));
        assert_eq!(cache.uid_to_seq(102), Some(2));
        assert_eq!(cache.seq_to_uid(3), None);
        cache.forget_seq_uid();
        assert_eq!(cache.seq_to_uid(1), None);
    }

    #[test]
    fn forget_clears_everything() {
        let mut cache = NoCache::new();
        cache.set_new_numbers(1, 2, 3);
        cache.add_seq_uid(1, 9);
        cache.forget();
        assert_eq!(cache.uid_validity(), 0);
        assert_eq!(cache.seq_to_uid(1), None);
    }
}
