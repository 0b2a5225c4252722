// 🎯 Candidate Selector - Pick the identities that represent each profile
// The earlier a source appears in the list, the higher its priority

use crate::db::{self, Identity};
use anyhow::Result;
use rusqlite::Connection;
use std::collections::BTreeMap;

/// Candidate identities per profile uuid, ordered by uuid.
pub type Candidates = BTreeMap<String, Vec<Identity>>;

/// Produces the candidate set of every profile touched by `sources`.
pub trait CandidateSelector {
    fn select_candidates(&self, sources: &[String]) -> Result<Candidates>;
}

// ============================================================================
// SOURCE PRIORITY SELECTOR
// ============================================================================

/// Selects, for each profile with an identity in one of the sources, the
/// identities coming from the highest-priority source present in that
/// profile. Ties keep identity-id order.
pub struct SourcePrioritySelector<'a> {
    conn: &'a Connection,
}

impl<'a> SourcePrioritySelector<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        SourcePrioritySelector { conn }
    }
}

impl CandidateSelector for SourcePrioritySelector<'_> {
    fn select_candidates(&self, sources: &[String]) -> Result<Candidates> {
        let mut by_profile: BTreeMap<String, Vec<Identity>> = BTreeMap::new();

        for source in sources {
            for identity in db::get_profile_identities_by_source(self.conn, source)? {
                by_profile.entry(identity.uuid.clone()).or_default().push(identity);
            }
        }

        let mut candidates = Candidates::new();

        for (uuid, mut identities) in by_profile {
            // A profile is fetched once per matching source
            identities.sort_by(|a, b| a.id.cmp(&b.id));
            identities.dedup_by(|a, b| a.id == b.id);

            let selected = select_by_priority(identities, sources);
            candidates.insert(uuid, selected);
        }

        tracing::debug!(profiles = candidates.len(), "candidates selected");

        Ok(candidates)
    }
}

/// Keep the identities whose source has the lowest index in `sources`.
/// Identities from unlisted sources never qualify.
pub fn select_by_priority(identities: Vec<Identity>, sources: &[String]) -> Vec<Identity> {
    let mut best: Option<usize> = None;
    let mut selected = Vec::new();

    for identity in identities {
        let priority = match sources.iter().position(|s| *s == identity.source) {
            Some(p) => p,
            None => continue,
        };

        match best {
            Some(b) if priority > b => {}
            Some(b) if priority == b => selected.push(identity),
            _ => {
                best = Some(priority);
                selected = vec![identity];
            }
        }
    }

    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{insert_identities, setup_database};

    fn sources(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        insert_identities(
            &conn,
            &[
                Identity::new(Some("uuid-1"), "git", Some("John Smith"), None, Some("jsmith")),
                Identity::new(Some("uuid-1"), "github", None, None, Some("jsmith-bot")),
                Identity::new(Some("uuid-1"), "github", None, None, Some("jsmith")),
                Identity::new(Some("uuid-2"), "jira", None, None, Some("jdoe")),
                Identity::new(Some("uuid-3"), "github", None, None, Some("ci-bot")),
                Identity::new(Some("uuid-3"), "slack", None, None, Some("ci")),
            ],
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_highest_priority_source_wins() {
        let conn = test_db();
        let selector = SourcePrioritySelector::new(&conn);

        let candidates = selector.select_candidates(&sources(&["git", "github"])).unwrap();

        let uuid1 = &candidates["uuid-1"];
        assert_eq!(uuid1.len(), 1);
        assert_eq!(uuid1[0].source, "git");

        let uuid3 = &candidates["uuid-3"];
        assert_eq!(uuid3.len(), 1, "slack is not a requested source");
        assert_eq!(uuid3[0].username.as_deref(), Some("ci-bot"));

        assert!(!candidates.contains_key("uuid-2"));
    }

    #[test]
    fn test_tied_priority_keeps_all() {
        let conn = test_db();
        let selector = SourcePrioritySelector::new(&conn);

        let candidates = selector.select_candidates(&sources(&["github", "git"])).unwrap();

        let uuid1 = &candidates["uuid-1"];
        assert_eq!(uuid1.len(), 2);
        assert!(uuid1.iter().all(|i| i.source == "github"));
        assert!(uuid1[0].id < uuid1[1].id, "ties keep identity-id order");
    }

    #[test]
    fn test_profiles_ordered_by_uuid() {
        let conn = test_db();
        let selector = SourcePrioritySelector::new(&conn);

        let candidates = selector
            .select_candidates(&sources(&["slack", "jira", "github"]))
            .unwrap();
        let uuids: Vec<&String> = candidates.keys().collect();

        assert_eq!(uuids, vec!["uuid-1", "uuid-2", "uuid-3"]);
        assert_eq!(candidates["uuid-3"][0].source, "slack");
    }

    #[test]
    fn test_unknown_source_selects_nothing() {
        let conn = test_db();
        let selector = SourcePrioritySelector::new(&conn);

        let candidates = selector.select_candidates(&sources(&["gerrit"])).unwrap();
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_select_by_priority_ignores_unlisted() {
        let identities = vec![
            Identity::new(Some("u"), "slack", None, None, Some("a")),
            Identity::new(Some("u"), "git", None, None, Some("b")),
        ];

        let selected = select_by_priority(identities, &sources(&["git"]));
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].source, "git");
    }
}
