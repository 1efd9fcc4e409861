//! Roster of reporters active in the shared match room.
//!
//! Keyed by user_id (unique), append-on-join, remove-on-leave. Insertion
//! order is preserved for display only — it carries no other meaning.

use std::collections::HashMap;

use pitchside_proto::Reporter;

/// The set of currently active reporters.
pub struct Roster {
    order: Vec<u64>,
    reporters: HashMap<u64, Reporter>,
}

impl Roster {
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            reporters: HashMap::new(),
        }
    }

    /// Add or refresh a reporter. Returns true if they were new.
    ///
    /// A re-join of a known id updates in place without reordering.
    pub fn join(&mut self, reporter: Reporter) -> bool {
        let is_new = !self.reporters.contains_key(&reporter.user_id);
        if is_new {
            self.order.push(reporter.user_id);
        }
        self.reporters.insert(reporter.user_id, reporter);
        is_new
    }

    /// Remove a reporter, returning their entry if present.
    pub fn leave(&mut self, user_id: u64) -> Option<Reporter> {
        let removed = self.reporters.remove(&user_id);
        if removed.is_some() {
            self.order.retain(|id| *id != user_id);
        }
        removed
    }

    /// Replace the whole roster with an authoritative server list.
    pub fn replace_all(&mut self, reporters: Vec<Reporter>) {
        self.order.clear();
        self.reporters.clear();
        for reporter in reporters {
            self.join(reporter);
        }
    }

    pub fn get(&self, user_id: u64) -> Option<&Reporter> {
        self.reporters.get(&user_id)
    }

    pub fn contains(&self, user_id: u64) -> bool {
        self.reporters.contains_key(&user_id)
    }

    /// Reporters in display (insertion) order.
    pub fn iter(&self) -> impl Iterator<Item = &Reporter> {
        self.order.iter().filter_map(|id| self.reporters.get(id))
    }

    pub fn len(&self) -> usize {
        self.reporters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }
}

impl Default for Roster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reporter(user_id: u64, name: &str) -> Reporter {
        Reporter {
            user_id,
            username: name.to_string(),
            team_id: Some(1),
            team_name: None,
        }
    }

    #[test]
    fn test_join_and_leave() {
        let mut roster = Roster::new();
        assert!(roster.join(reporter(7, "Alice")));
        assert!(roster.join(reporter(9, "Bob")));
        assert_eq!(roster.len(), 2);

        let left = roster.leave(7).unwrap();
        assert_eq!(left.username, "Alice");
        assert_eq!(roster.len(), 1);
        assert!(roster.leave(7).is_none());
    }

    #[test]
    fn test_rejoin_updates_in_place() {
        let mut roster = Roster::new();
        roster.join(reporter(7, "Alice"));
        roster.join(reporter(9, "Bob"));

        // Alice switches team — same key, no duplicate, no reorder.
        let mut alice = reporter(7, "Alice");
        alice.team_id = Some(2);
        assert!(!roster.join(alice));

        assert_eq!(roster.len(), 2);
        let names: Vec<&str> = roster.iter().map(|r| r.username.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Bob"]);
        assert_eq!(roster.get(7).unwrap().team_id, Some(2));
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut roster = Roster::new();
        roster.join(reporter(30, "Carol"));
        roster.join(reporter(10, "Alice"));
        roster.join(reporter(20, "Bob"));

        let ids: Vec<u64> = roster.iter().map(|r| r.user_id).collect();
        assert_eq!(ids, vec![30, 10, 20]);
    }

    #[test]
    fn test_replace_all() {
        let mut roster = Roster::new();
        roster.join(reporter(1, "Old"));

        roster.replace_all(vec![reporter(7, "Alice"), reporter(9, "Bob")]);
        assert_eq!(roster.len(), 2);
        assert!(!roster.contains(1));
        let ids: Vec<u64> = roster.iter().map(|r| r.user_id).collect();
        assert_eq!(ids, vec![7, 9]);
    }
}
