use crate::error::{GteamError, Result};
use crate::model::AuthorRecord;
use crate::util::timestamp_day_key;
use chrono::DateTime;
use gix::object::tree::diff::ChangeDetached;
use gix::{discover, ObjectId, Repository};
use indicatif::{ProgressBar, ProgressStyle};
use similar::{ChangeTag, TextDiff};
use std::collections::{HashMap, HashSet, VecDeque};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;

pub struct GitRepo {
    repo: Repository,
    path: PathBuf,
}

/// Line and file counts of one commit's diff against its first parent.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct DiffTotals {
    files: u64,
    added: u64,
    deleted: u64,
}

impl DiffTotals {
    fn record(&mut self, added: u64, deleted: u64) {
        self.files += 1;
        self.added += added;
        self.deleted += deleted;
    }
}

impl GitRepo {
    /// Open the repository containing `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = discover(path.as_ref())?;
        let path = repo.workdir().unwrap_or_else(|| repo.path()).to_path_buf();
        Ok(Self { repo, path })
    }

    pub fn is_git_repository<P: AsRef<Path>>(path: P) -> bool {
        gix::open(path.as_ref()).is_ok()
    }

    /// Clones `url` into `dir` with the `git` binary.
    pub fn clone<P: AsRef<Path>>(url: &str, dir: P, branch: Option<&str>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut args = vec![OsStr::new("clone"), OsStr::new("--quiet")];
        if let Some(branch) = branch {
            args.push(OsStr::new("--branch"));
            args.push(OsStr::new(branch));
        }
        args.push(OsStr::new(url));
        args.push(dir.as_os_str());
        run_git(None, &args)?;
        Self::open(dir)
    }

    pub fn checkout(&mut self, branch: &str) -> Result<()> {
        run_git(Some(&self.path), &[OsStr::new("checkout"), OsStr::new("--quiet"), OsStr::new(branch)])?;
        self.reload()
    }

    /// Fast-forwards the current branch from its upstream.
    pub fn pull(&mut self) -> Result<()> {
        run_git(Some(&self.path), &[OsStr::new("pull"), OsStr::new("--ff-only"), OsStr::new("--quiet")])?;
        self.reload()
    }

    fn reload(&mut self) -> Result<()> {
        self.repo = gix::open(&self.path)?;
        Ok(())
    }

    /// Walks history from HEAD and folds every commit into a record per
    /// distinct (email, name) author, bucketed by UTC commit day.
    pub fn collect_authors(&self, include_merges: bool) -> Result<Vec<AuthorRecord>> {
        let mut head = self.repo.head()?;
        let head_commit = head.peel_to_commit_in_place()?;

        let mut authors: HashMap<(String, String), AuthorRecord> = HashMap::new();
        let mut seen: HashSet<ObjectId> = HashSet::new();
        let mut stack: VecDeque<ObjectId> = VecDeque::from([head_commit.id]);

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Walking {}", self.path.display()));

        while let Some(commit_id) = stack.pop_back() {
            if !seen.insert(commit_id) {
                continue;
            }

            let commit = self.repo.find_commit(commit_id)?;
            let secs = commit.time()?.seconds;
            let timestamp = DateTime::from_timestamp(secs, 0)
                .ok_or_else(|| GteamError::InvalidDate(format!("Invalid timestamp: {secs}")))?;

            let parents: Vec<ObjectId> = commit.parent_ids().map(|id| id.into()).collect();
            stack.extend(parents.iter().copied());
            pb.inc(1);

            if !include_merges && parents.len() > 1 {
                continue;
            }

            let author = commit.author()?;
            let email = author.email.to_string();
            let name = author.name.to_string();
            let title = commit.message()?.title.to_string();

            let totals = self.diff_totals(commit_id, parents.first().copied())?;
            authors
                .entry((email.clone(), name.clone()))
                .or_insert_with(|| AuthorRecord::new(email, name))
                .add_commit(
                    timestamp_day_key(&timestamp),
                    totals.added,
                    totals.deleted,
                    totals.files,
                    &title,
                );
        }

        pb.finish_and_clear();

        let mut records: Vec<AuthorRecord> = authors.into_values().collect();
        records.sort_by(|a, b| (&a.email, &a.name).cmp(&(&b.email, &b.name)));
        tracing::debug!(
            path = %self.path.display(),
            commits = seen.len(),
            authors = records.len(),
            "collected author statistics"
        );
        Ok(records)
    }

    fn diff_totals(&self, commit_id: ObjectId, parent_id: Option<ObjectId>) -> Result<DiffTotals> {
        let commit_tree = self.repo.find_commit(commit_id)?.tree()?;
        let changes: Vec<ChangeDetached> = match parent_id {
            Some(parent_id) => {
                let parent_tree = self.repo.find_commit(parent_id)?.tree()?;
                self.repo
                    .diff_tree_to_tree(Some(&parent_tree), Some(&commit_tree), None)?
            }
            None => self.repo.diff_tree_to_tree(None, Some(&commit_tree), None)?,
        };

        let mut totals = DiffTotals::default();
        for change in changes {
            self.handle_change(change, &mut totals);
        }
        Ok(totals)
    }

    /// Tree entries also show up in the change list; only blobs count.
    fn find_blob(&self, id: ObjectId) -> Option<gix::Object<'_>> {
        self.repo
            .find_object(id)
            .ok()
            .filter(|obj| obj.kind == gix::object::Kind::Blob)
    }

    fn handle_change(&self, change: ChangeDetached, totals: &mut DiffTotals) {
        match change {
            ChangeDetached::Addition { id, .. } => {
                if let Some(obj) = self.find_blob(id) {
                    totals.record(count_lines(&obj.data), 0);
                }
            }
            ChangeDetached::Deletion { id, .. } => {
                if let Some(obj) = self.find_blob(id) {
                    totals.record(0, count_lines(&obj.data));
                }
            }
            ChangeDetached::Modification { previous_id, id, .. } => {
                if let (Some(old_obj), Some(new_obj)) = (self.find_blob(previous_id), self.find_blob(id))
                {
                    let (added, deleted) = line_delta(&old_obj.data, &new_obj.data);
                    totals.record(added, deleted);
                }
            }
            ChangeDetached::Rewrite {
                source_id, id, copy, ..
            } => {
                if let (Some(old_obj), Some(new_obj)) = (self.find_blob(source_id), self.find_blob(id))
                {
                    let (added, deleted) = line_delta(&old_obj.data, &new_obj.data);
                    if copy {
                        totals.record(added, 0);
                    } else {
                        totals.record(added, deleted);
                    }
                }
            }
        }
    }
}

fn is_binary(data: &[u8]) -> bool {
    data.iter().take(8192).any(|&b| b == 0)
}

/// Binary or non-UTF-8 blobs count as zero lines.
fn count_lines(data: &[u8]) -> u64 {
    if is_binary(data) {
        return 0;
    }
    std::str::from_utf8(data)
        .map(|t| t.lines().count() as u64)
        .unwrap_or(0)
}

fn line_delta(old: &[u8], new: &[u8]) -> (u64, u64) {
    if is_binary(old) || is_binary(new) {
        return (0, 0);
    }
    let old_text = std::str::from_utf8(old).unwrap_or("");
    let new_text = std::str::from_utf8(new).unwrap_or("");

    let diff = TextDiff::from_lines(old_text, new_text);
    let mut added = 0u64;
    let mut deleted = 0u64;
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Insert => added += 1,
            ChangeTag::Delete => deleted += 1,
            ChangeTag::Equal => {}
        }
    }
    (added, deleted)
}

fn run_git(dir: Option<&Path>, args: &[&OsStr]) -> Result<()> {
    let mut cmd = Command::new("git");
    if let Some(dir) = dir {
        cmd.current_dir(dir);
    }
    let output = cmd.args(args).output()?;
    if !output.status.success() {
        let shown: Vec<_> = args.iter().map(|a| a.to_string_lossy()).collect();
        return Err(GteamError::GitCommand(format!(
            "git {}: {}",
            shown.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn line_delta_counts_inserted_and_deleted_lines() {
        assert_eq!(line_delta(b"a\nb\nc\n", b"a\nc\nd\ne\n"), (2, 1));
        assert_eq!(line_delta(b"", b"x\ny\n"), (2, 0));
        assert_eq!(line_delta(b"same\n", b"same\n"), (0, 0));
    }

    #[test]
    fn binary_blobs_have_no_lines() {
        assert_eq!(count_lines(b"one\ntwo\n"), 2);
        assert_eq!(count_lines(b"\x00\x01\x02"), 0);
        assert_eq!(line_delta(b"a\n", b"a\x00b"), (0, 0));
    }

    #[test]
    fn diff_totals_count_files() {
        let mut totals = DiffTotals::default();
        totals.record(3, 1);
        totals.record(0, 2);
        assert_eq!(totals, DiffTotals { files: 2, added: 3, deleted: 3 });
    }
}
