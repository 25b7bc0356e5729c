//! Embedded schemaless document engine
//!
//! Named collections of JSON objects, each behind its own reader-writer lock.
//! Locks are only ever taken with a timeout derived from the caller's
//! [`Deadline`], so a stuck writer surfaces as `Timeout` instead of blocking
//! the worker. Query results are copied out before the guard is released;
//! no cursor outlives the call that produced it.
//!
//! An engine opened on a directory keeps each collection in `<name>.json`
//! there. Every mutation rewrites the file while the collection's write lock
//! is held, and is rolled back in memory if the write fails. One process owns
//! the directory at a time.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt::Display;
use std::fs;
use std::io;
use std::mem;
use std::path::{Path, PathBuf};

use libris_core::errors::{LibrisError, Result};
use libris_core::query::SortDirection;
use libris_core::storage::Deadline;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::lock_timeout;
use crate::matching::substring_matcher;

/// One stored JSON object
pub type Document = Map<String, Value>;

/// Native query predicate
#[derive(Debug, Clone)]
pub enum Filter {
    MatchAll,
    /// Field equals value
    Eq(String, Value),
    /// String field matches the pattern
    Regex(String, Regex),
    /// Array field contains every value
    All(String, Vec<Value>),
    /// Field orders strictly after value
    Gt(String, Value),
    And(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(field.to_string(), value.into())
    }

    pub fn gt(field: &str, value: impl Into<Value>) -> Self {
        Filter::Gt(field.to_string(), value.into())
    }

    pub fn all<V: Into<Value>>(field: &str, values: impl IntoIterator<Item = V>) -> Self {
        Filter::All(field.to_string(), values.into_iter().map(Into::into).collect())
    }

    /// Case-insensitive literal substring match
    ///
    /// # Errors
    /// Returns `LibrisError::Internal` if the escaped pattern fails to compile.
    pub fn contains_ci(field: &str, needle: &str) -> Result<Self> {
        let rx = substring_matcher(needle).map_err(|e| LibrisError::Internal {
            message: format!("filter pattern for {}: {}", field, e),
        })?;
        Ok(Filter::Regex(field.to_string(), rx))
    }

    /// Conjunction, collapsing to `MatchAll` when empty
    pub fn and(mut filters: Vec<Filter>) -> Self {
        match filters.len() {
            0 => Filter::MatchAll,
            1 => filters.remove(0),
            _ => Filter::And(filters),
        }
    }

    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::MatchAll => true,
            Filter::Eq(field, value) => doc.get(field) == Some(value),
            Filter::Regex(field, rx) => doc
                .get(field)
                .and_then(Value::as_str)
                .is_some_and(|s| rx.is_match(s)),
            Filter::All(field, values) => match doc.get(field) {
                Some(Value::Array(items)) => values.iter().all(|v| items.contains(v)),
                _ => false,
            },
            Filter::Gt(field, value) => doc
                .get(field)
                .is_some_and(|v| compare_values(Some(v), Some(value)) == Ordering::Greater),
            Filter::And(filters) => filters.iter().all(|f| f.matches(doc)),
        }
    }
}

/// Field update applied by `update_one`
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOp {
    /// Overwrite the field
    Set(String, Value),
    /// Append each value the array field does not already hold
    AddToSet(String, Vec<Value>),
}

impl UpdateOp {
    /// One `Set` per field of `doc`, skipping `except`
    pub fn set_all(doc: Document, except: &[&str]) -> Vec<UpdateOp> {
        doc.into_iter()
            .filter(|(k, _)| !except.contains(&k.as_str()))
            .map(|(k, v)| UpdateOp::Set(k, v))
            .collect()
    }

    fn apply(&self, doc: &mut Document) {
        match self {
            UpdateOp::Set(field, value) => {
                doc.insert(field.clone(), value.clone());
            }
            UpdateOp::AddToSet(field, values) => {
                let entry = doc
                    .entry(field.clone())
                    .or_insert_with(|| Value::Array(Vec::new()));
                if !entry.is_array() {
                    *entry = Value::Array(Vec::new());
                }
                if let Value::Array(items) = entry {
                    for v in values {
                        if !items.contains(v) {
                            items.push(v.clone());
                        }
                    }
                }
            }
        }
    }
}

/// Sort, skip and limit for `find`
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub sort: Vec<(String, SortDirection)>,
    pub skip: u64,
    pub limit: Option<u64>,
}

/// Total order over JSON values: missing and null first, then numbers,
/// strings, booleans, arrays and objects
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
        },
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (a, b) => type_rank(a).cmp(&type_rank(b)),
    }
}

fn type_rank(v: Option<&Value>) -> u8 {
    match v {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Bool(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Object(_)) => 5,
    }
}

/// Name and unique indexes of one collection
#[derive(Debug, Clone, Copy)]
pub struct CollectionSpec {
    pub name: &'static str,
    /// Each entry is a compound unique index; a document missing any of its
    /// fields is not indexed
    pub unique: &'static [&'static [&'static str]],
}

/// On-disk form of one collection
#[derive(Debug, Default, Deserialize)]
struct StoredCollection {
    sequence: i64,
    documents: Vec<Document>,
}

#[derive(Serialize)]
struct StoredCollectionRef<'a> {
    sequence: i64,
    documents: &'a [Document],
}

fn file_error(op: &str, path: &Path, err: impl Display) -> LibrisError {
    LibrisError::Persistence {
        op: op.to_string(),
        message: format!("{}: {}", path.display(), err),
    }
}

/// Documents of one collection
#[derive(Debug)]
pub struct DocCollection {
    name: &'static str,
    docs: Vec<Document>,
    unique: &'static [&'static [&'static str]],
    sequence: i64,
    file: Option<PathBuf>,
}

impl DocCollection {
    fn new(spec: &CollectionSpec) -> Self {
        Self {
            name: spec.name,
            docs: Vec::new(),
            unique: spec.unique,
            sequence: 0,
            file: None,
        }
    }

    /// Collection backed by `file`, starting empty if the file does not exist yet
    fn load(spec: &CollectionSpec, file: PathBuf) -> Result<Self> {
        let stored = match fs::read(&file) {
            Ok(bytes) => serde_json::from_slice::<StoredCollection>(&bytes)
                .map_err(|e| file_error("document_load", &file, e))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => StoredCollection::default(),
            Err(e) => return Err(file_error("document_load", &file, e)),
        };
        Ok(Self {
            name: spec.name,
            docs: stored.documents,
            unique: spec.unique,
            sequence: stored.sequence,
            file: Some(file),
        })
    }

    /// Write the collection to its file via a staging file and rename
    fn persist(&self) -> Result<()> {
        let Some(file) = &self.file else {
            return Ok(());
        };
        let bytes = serde_json::to_vec(&StoredCollectionRef {
            sequence: self.sequence,
            documents: &self.docs,
        })?;
        let staging = file.with_extension("json.tmp");
        fs::write(&staging, bytes).map_err(|e| file_error("document_persist", &staging, e))?;
        fs::rename(&staging, file).map_err(|e| file_error("document_persist", file, e))
    }

    /// Persist a mutation already applied in memory, reverting it with `undo`
    /// if the write fails
    fn commit(&mut self, undo: impl FnOnce(&mut Self)) -> Result<()> {
        if let Err(err) = self.persist() {
            tracing::warn!(collection = self.name, error = %err, "document write failed");
            undo(self);
            return Err(err);
        }
        Ok(())
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Next value of the collection's id sequence
    ///
    /// Reaches disk with the next successful mutation.
    pub fn next_sequence(&mut self) -> i64 {
        self.sequence += 1;
        self.sequence
    }

    /// First unique index `candidate` would collide on, ignoring `skip`
    fn unique_violation(&self, candidate: &Document, skip: Option<usize>) -> Option<&'static str> {
        for index in self.unique {
            let Some(key) = index
                .iter()
                .map(|f| candidate.get(*f))
                .collect::<Option<Vec<_>>>()
            else {
                continue;
            };
            let collides = self.docs.iter().enumerate().any(|(i, doc)| {
                Some(i) != skip && index.iter().zip(&key).all(|(f, v)| doc.get(*f) == Some(*v))
            });
            if collides {
                return index.first().copied();
            }
        }
        None
    }

    fn duplicate(&self, field: &str) -> LibrisError {
        LibrisError::DuplicateKey {
            collection: self.name.to_string(),
            field: field.to_string(),
        }
    }

    /// # Errors
    /// Returns `LibrisError::DuplicateKey` if a unique index rejects the document.
    pub fn insert_one(&mut self, doc: Document) -> Result<()> {
        if let Some(field) = self.unique_violation(&doc, None) {
            return Err(self.duplicate(field));
        }
        self.docs.push(doc);
        self.commit(|c| {
            c.docs.pop();
        })
    }

    pub fn find_one(&self, filter: &Filter) -> Option<Document> {
        self.docs.iter().find(|d| filter.matches(d)).cloned()
    }

    /// Matching documents, sorted then sliced; ties keep insertion order
    pub fn find(&self, filter: &Filter, opts: &FindOptions) -> Vec<Document> {
        let mut hits: Vec<&Document> = self.docs.iter().filter(|d| filter.matches(d)).collect();

        if !opts.sort.is_empty() {
            hits.sort_by(|a, b| {
                opts.sort
                    .iter()
                    .map(|(field, direction)| {
                        let ord = compare_values(a.get(field), b.get(field));
                        match direction {
                            SortDirection::Ascending => ord,
                            SortDirection::Descending => ord.reverse(),
                        }
                    })
                    .find(|ord| *ord != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }

        let skip = usize::try_from(opts.skip).unwrap_or(usize::MAX);
        let limit = opts
            .limit
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
        hits.into_iter().skip(skip).take(limit).cloned().collect()
    }

    pub fn count(&self, filter: &Filter) -> u64 {
        self.docs.iter().filter(|d| filter.matches(d)).count() as u64
    }

    /// Apply `ops` to the first match; returns the number matched (0 or 1)
    ///
    /// # Errors
    /// Returns `LibrisError::DuplicateKey` if the result collides with another
    /// document; the stored document is left unchanged.
    pub fn update_one(&mut self, filter: &Filter, ops: &[UpdateOp]) -> Result<u64> {
        let Some(pos) = self.docs.iter().position(|d| filter.matches(d)) else {
            return Ok(0);
        };
        let mut updated = self.docs[pos].clone();
        for op in ops {
            op.apply(&mut updated);
        }
        if let Some(field) = self.unique_violation(&updated, Some(pos)) {
            return Err(self.duplicate(field));
        }
        let previous = mem::replace(&mut self.docs[pos], updated);
        self.commit(move |c| c.docs[pos] = previous)?;
        Ok(1)
    }

    /// Like `update_one`, inserting `seed` with `ops` applied when nothing matches
    ///
    /// # Errors
    /// Returns `LibrisError::DuplicateKey` on a unique index collision.
    pub fn upsert_one(&mut self, filter: &Filter, seed: Document, ops: &[UpdateOp]) -> Result<()> {
        if self.update_one(filter, ops)? == 1 {
            return Ok(());
        }
        let mut doc = seed;
        for op in ops {
            op.apply(&mut doc);
        }
        self.insert_one(doc)
    }

    /// # Errors
    /// Returns `LibrisError::Persistence` if a file-backed collection cannot be
    /// written; the document stays in place.
    pub fn delete_one(&mut self, filter: &Filter) -> Result<u64> {
        let Some(pos) = self.docs.iter().position(|d| filter.matches(d)) else {
            return Ok(0);
        };
        let removed = self.docs.remove(pos);
        self.commit(move |c| c.docs.insert(pos, removed))?;
        Ok(1)
    }

    /// # Errors
    /// As `delete_one`.
    pub fn delete_many(&mut self, filter: &Filter) -> Result<u64> {
        let previous = self.file.is_some().then(|| self.docs.clone());
        let before = self.docs.len();
        self.docs.retain(|d| !filter.matches(d));
        let removed = (before - self.docs.len()) as u64;
        if removed > 0 {
            self.commit(move |c| {
                if let Some(docs) = previous {
                    c.docs = docs;
                }
            })?;
        }
        Ok(removed)
    }

    /// Largest value of `field` across the collection
    pub fn max(&self, field: &str) -> Option<Value> {
        self.docs
            .iter()
            .filter_map(|d| d.get(field))
            .max_by(|a, b| compare_values(Some(a), Some(b)))
            .cloned()
    }
}

/// Set of named collections fixed at construction
#[derive(Debug)]
pub struct DocumentEngine {
    collections: HashMap<&'static str, RwLock<DocCollection>>,
}

impl DocumentEngine {
    /// Engine held in memory only
    pub fn new(specs: &[CollectionSpec]) -> Self {
        let collections = specs
            .iter()
            .map(|spec| (spec.name, RwLock::new(DocCollection::new(spec))))
            .collect();
        Self { collections }
    }

    /// Engine persisted under `dir`, reloading whatever a previous run left there
    ///
    /// # Errors
    /// Returns `LibrisError::Persistence` if the directory cannot be created or
    /// a collection file cannot be read or parsed.
    pub fn open(specs: &[CollectionSpec], dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).map_err(|e| file_error("document_open", dir, e))?;
        let collections = specs
            .iter()
            .map(|spec| {
                let file = dir.join(format!("{}.json", spec.name));
                Ok((spec.name, RwLock::new(DocCollection::load(spec, file)?)))
            })
            .collect::<Result<HashMap<_, _>>>()?;
        Ok(Self { collections })
    }

    fn collection(&self, name: &str) -> Result<&RwLock<DocCollection>> {
        self.collections
            .get(name)
            .ok_or_else(|| LibrisError::Internal {
                message: format!("unknown document collection: {}", name),
            })
    }

    /// Shared access, waiting at most until `deadline`
    ///
    /// # Errors
    /// Returns `LibrisError::Timeout` if the lock is not granted in time.
    pub fn read(
        &self,
        name: &str,
        op: &str,
        deadline: &Deadline,
    ) -> Result<RwLockReadGuard<'_, DocCollection>> {
        self.collection(name)?
            .try_read_for(deadline.remaining())
            .ok_or_else(|| lock_timeout(op, name, deadline))
    }

    /// Exclusive access, waiting at most until `deadline`
    ///
    /// # Errors
    /// Returns `LibrisError::Timeout` if the lock is not granted in time.
    pub fn write(
        &self,
        name: &str,
        op: &str,
        deadline: &Deadline,
    ) -> Result<RwLockWriteGuard<'_, DocCollection>> {
        self.collection(name)?
            .try_write_for(deadline.remaining())
            .ok_or_else(|| lock_timeout(op, name, deadline))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    const SPECS: &[CollectionSpec] = &[
        CollectionSpec {
            name: "books",
            unique: &[&["id"]],
        },
        CollectionSpec {
            name: "tokens",
            unique: &[&["hash", "scope"]],
        },
    ];

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    fn deadline() -> Deadline {
        Deadline::after(Duration::from_secs(5))
    }

    fn seeded_books(engine: &DocumentEngine) {
        let mut books = engine.write("books", "seed", &deadline()).unwrap();
        for (id, title, genres) in [
            (1, "It", json!(["horror", "classic"])),
            (2, "Fit for Life", json!(["health"])),
            (3, "The Cat in the Hat", json!(["children", "classic"])),
            (4, "Kit Carson", json!(["horror", "western", "classic"])),
        ] {
            books
                .insert_one(doc(json!({"id": id, "title": title, "genres": genres})))
                .unwrap();
        }
    }

    fn ids(docs: &[Document]) -> Vec<i64> {
        docs.iter().map(|d| d["id"].as_i64().unwrap()).collect()
    }

    #[test]
    fn test_case_insensitive_substring() {
        let engine = DocumentEngine::new(SPECS);
        seeded_books(&engine);
        let books = engine.read("books", "test", &deadline()).unwrap();

        let filter = Filter::contains_ci("title", "it").unwrap();
        let hits = books.find(&filter, &FindOptions::default());
        assert_eq!(ids(&hits), vec![1, 2, 4]);
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let engine = DocumentEngine::new(SPECS);
        seeded_books(&engine);
        let books = engine.read("books", "test", &deadline()).unwrap();

        let filter = Filter::contains_ci("title", ".*").unwrap();
        assert_eq!(books.count(&filter), 0);
    }

    #[test]
    fn test_all_requires_superset() {
        let engine = DocumentEngine::new(SPECS);
        seeded_books(&engine);
        let books = engine.read("books", "test", &deadline()).unwrap();

        let filter = Filter::all("genres", ["horror", "classic"]);
        let hits = books.find(&filter, &FindOptions::default());
        assert_eq!(ids(&hits), vec![1, 4]);
    }

    #[test]
    fn test_sort_skip_limit() {
        let engine = DocumentEngine::new(SPECS);
        seeded_books(&engine);
        let books = engine.read("books", "test", &deadline()).unwrap();

        let opts = FindOptions {
            sort: vec![("title".to_string(), SortDirection::Descending)],
            skip: 1,
            limit: Some(2),
        };
        let hits = books.find(&Filter::MatchAll, &opts);
        // Descending titles: The Cat.., Kit Carson, It, Fit for Life
        assert_eq!(ids(&hits), vec![4, 1]);
    }

    #[test]
    fn test_unique_index_rejects_duplicates() {
        let engine = DocumentEngine::new(SPECS);
        let mut tokens = engine.write("tokens", "test", &deadline()).unwrap();
        tokens
            .insert_one(doc(json!({"hash": "aa", "scope": "activation"})))
            .unwrap();
        tokens
            .insert_one(doc(json!({"hash": "aa", "scope": "authentication"})))
            .unwrap();

        let err = tokens
            .insert_one(doc(json!({"hash": "aa", "scope": "activation"})))
            .unwrap_err();
        assert_eq!(
            err,
            LibrisError::DuplicateKey {
                collection: "tokens".to_string(),
                field: "hash".to_string()
            }
        );
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn test_update_one_checks_unique_and_keeps_original() {
        let engine = DocumentEngine::new(SPECS);
        seeded_books(&engine);
        let mut books = engine.write("books", "test", &deadline()).unwrap();

        let err = books
            .update_one(&Filter::eq("id", 2), &[UpdateOp::Set("id".into(), json!(1))])
            .unwrap_err();
        assert!(matches!(err, LibrisError::DuplicateKey { .. }));
        assert!(books.find_one(&Filter::eq("id", 2)).is_some());

        let matched = books
            .update_one(&Filter::eq("id", 99), &[UpdateOp::Set("title".into(), json!("x"))])
            .unwrap();
        assert_eq!(matched, 0);
    }

    #[test]
    fn test_add_to_set_upsert() {
        let engine = DocumentEngine::new(SPECS);
        let mut books = engine.write("books", "test", &deadline()).unwrap();
        let filter = Filter::eq("id", 7);
        let ops = [UpdateOp::AddToSet("genres".into(), vec![json!("a"), json!("b")])];

        books.upsert_one(&filter, doc(json!({"id": 7})), &ops).unwrap();
        books
            .upsert_one(
                &filter,
                doc(json!({"id": 7})),
                &[UpdateOp::AddToSet("genres".into(), vec![json!("b"), json!("c")])],
            )
            .unwrap();

        assert_eq!(books.len(), 1);
        assert_eq!(
            books.find_one(&filter).unwrap()["genres"],
            json!(["a", "b", "c"])
        );
    }

    #[test]
    fn test_delete_and_max() {
        let engine = DocumentEngine::new(SPECS);
        seeded_books(&engine);
        let mut books = engine.write("books", "test", &deadline()).unwrap();

        assert_eq!(books.max("id"), Some(json!(4)));
        assert_eq!(books.delete_one(&Filter::eq("id", 4)).unwrap(), 1);
        assert_eq!(books.delete_one(&Filter::eq("id", 4)).unwrap(), 0);
        assert_eq!(books.max("id"), Some(json!(3)));
        assert_eq!(
            books
                .delete_many(&Filter::all("genres", ["classic"]))
                .unwrap(),
            2
        );
        assert_eq!(books.len(), 1);
    }

    #[test]
    fn test_gt_on_numbers() {
        let engine = DocumentEngine::new(SPECS);
        seeded_books(&engine);
        let books = engine.read("books", "test", &deadline()).unwrap();
        assert_eq!(books.count(&Filter::gt("id", 2)), 2);
    }

    #[test]
    fn test_lock_wait_times_out() {
        let engine = DocumentEngine::new(SPECS);
        let _held = engine.write("books", "holder", &deadline()).unwrap();

        let short = Deadline::after(Duration::from_millis(50));
        let err = engine.read("books", "book_get", &short).unwrap_err();
        assert_eq!(
            err,
            LibrisError::Timeout {
                op: "book_get".to_string(),
                after_ms: 50
            }
        );
    }

    #[test]
    fn test_unknown_collection() {
        let engine = DocumentEngine::new(SPECS);
        assert!(matches!(
            engine.read("nope", "test", &deadline()).unwrap_err(),
            LibrisError::Internal { .. }
        ));
    }

    #[test]
    fn test_opened_engine_reloads_documents_and_sequence() {
        let dir = tempfile::TempDir::new().unwrap();
        {
            let engine = DocumentEngine::open(SPECS, dir.path()).unwrap();
            let mut books = engine.write("books", "test", &deadline()).unwrap();
            for title in ["It", "Kit Carson"] {
                let id = books.next_sequence();
                books
                    .insert_one(doc(json!({"id": id, "title": title})))
                    .unwrap();
            }
            assert_eq!(books.delete_one(&Filter::eq("id", 2)).unwrap(), 1);
        }
        assert!(dir.path().join("books.json").exists());

        let engine = DocumentEngine::open(SPECS, dir.path()).unwrap();
        let mut books = engine.write("books", "test", &deadline()).unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books.find_one(&Filter::eq("id", 1)).unwrap()["title"], json!("It"));
        assert_eq!(books.next_sequence(), 3);

        let tokens = engine.read("tokens", "test", &deadline()).unwrap();
        assert!(tokens.is_empty());
    }

    #[test]
    fn test_failed_write_rolls_back_memory() {
        let dir = tempfile::TempDir::new().unwrap();
        let engine = DocumentEngine::open(SPECS, dir.path()).unwrap();
        let mut books = engine.write("books", "test", &deadline()).unwrap();
        books.insert_one(doc(json!({"id": 1, "title": "It"}))).unwrap();

        // A directory where the staging file should go makes every write fail
        fs::create_dir(dir.path().join("books.json.tmp")).unwrap();

        let err = books
            .insert_one(doc(json!({"id": 2, "title": "Kit Carson"})))
            .unwrap_err();
        assert!(matches!(err, LibrisError::Persistence { .. }));
        assert_eq!(books.len(), 1);

        let err = books.delete_one(&Filter::eq("id", 1)).unwrap_err();
        assert!(matches!(err, LibrisError::Persistence { .. }));
        assert_eq!(books.len(), 1);
    }

    #[test]
    fn test_corrupt_collection_file_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(dir.path().join("books.json"), b"{not json").unwrap();
        let err = DocumentEngine::open(SPECS, dir.path()).unwrap_err();
        assert!(matches!(err, LibrisError::Persistence { .. }));
    }
}
