use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const SCHEMA_VERSION: u32 = 1;

/// A configured person. Associations are the emails and author names that
/// identify them in commit history, stored lower-cased.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub name: String,
    #[serde(default)]
    pub associations: Vec<String>,
}

impl User {
    pub fn new<I, S>(name: impl Into<String>, associations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            name: name.into(),
            associations: associations
                .into_iter()
                .map(|a| a.as_ref().to_lowercase())
                .collect(),
        }
    }

    pub fn is_associated(&self, needle: &str) -> bool {
        self.associations.iter().any(|a| a == needle)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub name: String,
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub compare: Vec<String>,
    #[serde(default)]
    pub invert: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Repository {
    /// Expects lower-cased author fields, as team exclusion does.
    pub fn excludes(&self, email_lc: &str, name_lc: &str) -> bool {
        self.exclude.iter().any(|e| {
            let e = e.to_lowercase();
            e == email_lc || e == name_lc
        })
    }
}

/// Per-day activity of one author in one repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DayStats {
    #[serde(default)]
    pub lines_added: u64,
    #[serde(default)]
    pub lines_deleted: u64,
    #[serde(default)]
    pub lines_changed: u64,
    #[serde(default)]
    pub files_changed: u64,
    #[serde(default)]
    pub commits: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DayStats {
    pub fn add_commit(&mut self, added: u64, deleted: u64, files: u64, title: &str) {
        self.lines_added += added;
        self.lines_deleted += deleted;
        self.lines_changed += added + deleted;
        self.files_changed += files;
        self.commits += 1;
        let title = title.trim();
        if !title.is_empty() {
            match &mut self.message {
                Some(message) => {
                    message.push('\n');
                    message.push_str(title);
                }
                None => self.message = Some(title.to_string()),
            }
        }
    }
}

/// Statistics of one author in one repository, as persisted in a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AuthorRecord {
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub commits: u64,
    #[serde(default)]
    pub lines_changed: u64,
    #[serde(default)]
    pub map: BTreeMap<String, DayStats>,
}

impl AuthorRecord {
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Folds one commit into the record and its day bucket, keeping the
    /// aggregate totals equal to the sum of the day map.
    pub fn add_commit(&mut self, day: String, added: u64, deleted: u64, files: u64, title: &str) {
        self.commits += 1;
        self.lines_changed += added + deleted;
        self.map
            .entry(day)
            .or_default()
            .add_commit(added, deleted, files, title);
    }

    pub fn lines_added(&self) -> u64 {
        self.map.values().map(|d| d.lines_added).sum()
    }

    pub fn lines_deleted(&self) -> u64 {
        self.map.values().map(|d| d.lines_deleted).sum()
    }

    pub fn files_changed(&self) -> u64 {
        self.map.values().map(|d| d.files_changed).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn user_associations_are_lowercased() {
        let user = User::new("alice", ["Alice@Example.COM", "Alice Liddell"]);
        assert!(user.is_associated("alice@example.com"));
        assert!(user.is_associated("alice liddell"));
        assert!(!user.is_associated("Alice Liddell"));
    }

    #[test]
    fn repository_exclude_folds_non_ascii_case() {
        let repo = Repository {
            name: "r".into(),
            exclude: vec!["ÉRIC".into()],
            ..Default::default()
        };
        assert!(repo.excludes("eric@x.io", "éric"));
        assert!(!repo.excludes("eric@x.io", "eric"));
    }

    #[test]
    fn add_commit_keeps_totals_in_sync_with_day_map() {
        let mut record = AuthorRecord::new("a@x.io", "A");
        record.add_commit("2024-01-01".into(), 3, 1, 2, "first");
        record.add_commit("2024-01-01".into(), 5, 0, 1, "second");
        record.add_commit("2024-01-03".into(), 0, 7, 1, "");

        assert_eq!(record.commits, 3);
        assert_eq!(record.lines_changed, 16);
        let day_sum: u64 = record.map.values().map(|d| d.lines_changed).sum();
        assert_eq!(day_sum, record.lines_changed);
        assert_eq!(record.lines_added(), 8);
        assert_eq!(record.lines_deleted(), 8);
        assert_eq!(record.files_changed(), 4);

        let first = &record.map["2024-01-01"];
        assert_eq!(first.commits, 2);
        assert_eq!(first.message.as_deref(), Some("first\nsecond"));
        assert_eq!(record.map["2024-01-03"].message, None);
    }

    #[test]
    fn snapshot_json_uses_camel_case_and_tolerates_missing_fields() {
        let json = r#"{
            "email": "a@x.io",
            "name": "A",
            "commits": 1,
            "linesChanged": 4,
            "map": { "2024-01-01": { "linesAdded": 3, "linesDeleted": 1, "linesChanged": 4, "filesChanged": 1 } }
        }"#;
        let record: AuthorRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.map["2024-01-01"].commits, 0);
        assert_eq!(record.map["2024-01-01"].lines_changed, 4);

        let back = serde_json::to_value(&record).unwrap();
        assert!(back.get("linesChanged").is_some());
        assert!(back["map"]["2024-01-01"].get("message").is_none());
    }
}
