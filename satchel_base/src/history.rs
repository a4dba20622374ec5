//! Edit lines of record kinds and their compilation into per-version field slices.

use crate::error::HistoryError;
use crate::schema::Schema;
use crate::version::VersionTag;
use std::collections::{BTreeMap, BTreeSet};

/// One change to the field set of a record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Edit {
    Added(String),
    Deleted(String),
    /// Rename, `previous` is deleted and `latest` added in the same step.
    Moved { previous: String, latest: String },
}

impl Edit {
    pub fn added(name: impl Into<String>) -> Self {
        Edit::Added(name.into())
    }

    pub fn deleted(name: impl Into<String>) -> Self {
        Edit::Deleted(name.into())
    }

    pub fn moved(previous: impl Into<String>, latest: impl Into<String>) -> Self {
        Edit::Moved {
            previous: previous.into(),
            latest: latest.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionEntry {
    pub tag: String,
    pub edits: Vec<Edit>,
    pub note: Option<String>,
}

/// Append-only edit line, oldest entry first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VersionHistory {
    entries: Vec<VersionEntry>,
}

impl VersionHistory {
    pub fn new() -> Self {
        VersionHistory::default()
    }

    pub fn version(mut self, tag: impl Into<String>, edits: impl IntoIterator<Item = Edit>) -> Self {
        self.entries.push(VersionEntry {
            tag: tag.into(),
            edits: edits.into_iter().collect(),
            note: None,
        });
        self
    }

    /// Attach a note to the latest entry.
    pub fn note(mut self, note: impl Into<String>) -> Self {
        if let Some(last) = self.entries.last_mut() {
            last.note = Some(note.into());
        }
        self
    }

    pub fn entries(&self) -> &[VersionEntry] {
        &self.entries
    }

    pub fn oldest(&self) -> Option<&str> {
        self.entries.first().map(|e| e.tag.as_str())
    }

    pub fn latest(&self) -> Option<&str> {
        self.entries.last().map(|e| e.tag.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Field names of the current schema visible at each released version.
pub type VersionSlice = BTreeMap<VersionTag, BTreeSet<String>>;

fn joined<'a>(names: impl IntoIterator<Item = &'a String>) -> String {
    let names: BTreeSet<&str> = names.into_iter().map(|n| n.as_str()).collect();
    names.into_iter().collect::<Vec<_>>().join(",")
}

/// Compute the version slice of `record` from its edit line.
///
/// A name is visible at version `v` when it was added at or before `v` and not deleted at or
/// before `v`. Names never mentioned by the edit line are visible at every version. Returns
/// `None` when there is no edit line to track.
pub fn compile_history(
    history: Option<&VersionHistory>,
    schema: &Schema,
    record: &str,
) -> Result<Option<VersionSlice>, HistoryError> {
    let Some(history) = history.filter(|h| !h.is_empty()) else {
        return Ok(None);
    };
    let keys: BTreeSet<String> = schema.keys().map(|k| k.to_string()).collect();

    let mut tags = Vec::with_capacity(history.len());
    let mut added = BTreeSet::new();
    let mut deleted = BTreeSet::new();
    let mut added_at = Vec::with_capacity(history.len());
    let mut deleted_so_far = Vec::with_capacity(history.len());

    for entry in history.entries() {
        let tag: VersionTag = entry.tag.parse().map_err(|source| HistoryError::BadTag {
            record: record.to_string(),
            tag: entry.tag.clone(),
            source,
        })?;
        if let Some(previous) = tags.last() {
            if tag <= *previous {
                return Err(HistoryError::OutOfOrder {
                    record: record.to_string(),
                    previous: previous.to_string(),
                    tag: entry.tag.clone(),
                });
            }
        }

        let mut a = BTreeSet::new();
        let mut d = BTreeSet::new();
        for edit in &entry.edits {
            match edit {
                Edit::Added(name) => {
                    a.insert(name.clone());
                }
                Edit::Deleted(name) => {
                    d.insert(name.clone());
                }
                Edit::Moved { previous, latest } => {
                    if previous == latest {
                        return Err(HistoryError::SelfMove {
                            record: record.to_string(),
                            name: latest.clone(),
                        });
                    }
                    d.insert(previous.clone());
                    a.insert(latest.clone());
                }
            }
        }

        let err = |names: String| (record.to_string(), names, entry.tag.clone());
        if !a.is_subset(&keys) {
            let (record, names, tag) = err(joined(&a));
            return Err(HistoryError::AddNotInSchema { record, names, tag });
        }
        if !d.is_subset(&keys) {
            let (record, names, tag) = err(joined(&d));
            return Err(HistoryError::DeleteNotInSchema { record, names, tag });
        }
        if !a.is_disjoint(&added) {
            let (record, names, tag) = err(joined(a.intersection(&added)));
            return Err(HistoryError::DuplicateAdd { record, names, tag });
        }
        if !a.is_disjoint(&deleted) {
            let (record, names, tag) = err(joined(a.intersection(&deleted)));
            return Err(HistoryError::DeleteAdd { record, names, tag });
        }
        if !d.is_disjoint(&deleted) {
            let (record, names, tag) = err(joined(d.intersection(&deleted)));
            return Err(HistoryError::DuplicateDelete { record, names, tag });
        }
        if !a.is_disjoint(&d) {
            let (record, names, tag) = err(joined(a.intersection(&d)));
            return Err(HistoryError::AddDelete { record, names, tag });
        }

        added.extend(a.iter().cloned());
        deleted.extend(d);
        added_at.push(a);
        deleted_so_far.push(deleted.clone());
        tags.push(tag);
    }

    // Names added strictly after each entry, collected from the end of the line.
    let mut later = BTreeSet::new();
    let mut added_after = vec![BTreeSet::new(); tags.len()];
    for (i, a) in added_at.iter().enumerate().rev() {
        added_after[i] = later.clone();
        later.extend(a.iter().cloned());
    }

    let mut slice = VersionSlice::new();
    for (i, tag) in tags.into_iter().enumerate() {
        let visible: BTreeSet<String> = keys
            .iter()
            .filter(|k| !added_after[i].contains(*k) && !deleted_so_far[i].contains(*k))
            .cloned()
            .collect();
        slice.insert(tag, visible);
    }
    log::debug!("version slice of {record}: {slice:?}");
    Ok(Some(slice))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{compile_schema, Declarations};
    use crate::value::{Record, Value};

    fn schema(names: &[&str]) -> Schema {
        let mut record = Record::new("test::R");
        for n in names {
            record.set(*n, Value::Integer(0));
        }
        compile_schema("R", Some(&Value::Record(record)), &Declarations::new(), &|_| false)
            .unwrap()
    }

    fn names(slice: &VersionSlice, tag: &str) -> Vec<String> {
        slice[&tag.parse::<VersionTag>().unwrap()].iter().cloned().collect()
    }

    #[test]
    fn slices_are_monotone() {
        let h = VersionHistory::new()
            .version("1.0", [Edit::added("a")])
            .version("1.1", [Edit::added("b")]);
        let slice = compile_history(Some(&h), &schema(&["a", "b"]), "R").unwrap().unwrap();
        assert_eq!(names(&slice, "1.0"), ["a"]);
        assert_eq!(names(&slice, "1.1"), ["a", "b"]);
    }

    #[test]
    fn untracked_names_are_always_visible() {
        let h = VersionHistory::new()
            .version("0.1", [])
            .version("0.2", [Edit::added("c")])
            .version("0.3", [Edit::deleted("a")]);
        let slice = compile_history(Some(&h), &schema(&["a", "b", "c"]), "R")
            .unwrap()
            .unwrap();
        assert_eq!(names(&slice, "0.1"), ["a", "b"]);
        assert_eq!(names(&slice, "0.2"), ["a", "b", "c"]);
        assert_eq!(names(&slice, "0.3"), ["b", "c"]);
    }

    #[test]
    fn move_deletes_and_adds() {
        let h = VersionHistory::new()
            .version("1.0", [])
            .version("1.1", [Edit::moved("name", "title")])
            .note("renamed for the catalogue");
        let slice = compile_history(Some(&h), &schema(&["name", "title"]), "R")
            .unwrap()
            .unwrap();
        assert_eq!(names(&slice, "1.0"), ["name"]);
        assert_eq!(names(&slice, "1.1"), ["title"]);
        assert_eq!(h.entries()[1].note.as_deref(), Some("renamed for the catalogue"));
    }

    #[test]
    fn no_history_no_slice() {
        let s = schema(&["a"]);
        assert_eq!(compile_history(None, &s, "R"), Ok(None));
        assert_eq!(compile_history(Some(&VersionHistory::new()), &s, "R"), Ok(None));
    }

    #[test]
    fn edit_line_violations() {
        let s = schema(&["a", "b"]);
        let check = |h: VersionHistory| compile_history(Some(&h), &s, "R").unwrap_err();

        let e = check(VersionHistory::new().version("1.0", [Edit::added("z")]));
        assert!(matches!(e, HistoryError::AddNotInSchema { .. }));
        assert_eq!(
            e.to_string(),
            "addition(s) to \"R\" (z) at version \"1.0\" not reflected in schema"
        );

        let e = check(VersionHistory::new().version("1.0", [Edit::deleted("z")]));
        assert!(matches!(e, HistoryError::DeleteNotInSchema { .. }));

        let e = check(
            VersionHistory::new()
                .version("1.0", [Edit::added("a")])
                .version("1.1", [Edit::added("a")]),
        );
        assert!(matches!(e, HistoryError::DuplicateAdd { ref names, .. } if names == "a"));

        let e = check(
            VersionHistory::new()
                .version("1.0", [Edit::deleted("a")])
                .version("1.1", [Edit::added("a")]),
        );
        assert!(matches!(e, HistoryError::DeleteAdd { .. }));

        let e = check(
            VersionHistory::new()
                .version("1.0", [Edit::deleted("a")])
                .version("1.1", [Edit::deleted("a")]),
        );
        assert!(matches!(e, HistoryError::DuplicateDelete { .. }));

        let e = check(VersionHistory::new().version("1.0", [Edit::added("a"), Edit::deleted("a")]));
        assert!(matches!(e, HistoryError::AddDelete { .. }));

        let e = check(VersionHistory::new().version("1.0", [Edit::moved("a", "a")]));
        assert!(matches!(e, HistoryError::SelfMove { .. }));
    }

    #[test]
    fn tags_must_increase() {
        let s = schema(&["a"]);
        let h = VersionHistory::new().version("1.1", []).version("1.0", []);
        assert!(matches!(
            compile_history(Some(&h), &s, "R"),
            Err(HistoryError::OutOfOrder { .. })
        ));
        let h = VersionHistory::new().version("one", []);
        assert!(matches!(
            compile_history(Some(&h), &s, "R"),
            Err(HistoryError::BadTag { .. })
        ));
    }
}
