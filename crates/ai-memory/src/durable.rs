//! Durable storage backends.
//!
//! Scalars are stored natively; arrays are stored as JSON text and parsed
//! back on read. Field names equal memory cell names.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::{CellValue, StoreError};

/// Ownership scope of a durable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
    World,
    /// Keyed by `AgentId::stable_id`.
    Agent(u64),
}

/// At-rest representation of a cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DurableValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// JSON array text.
    Encoded(String),
}

impl DurableValue {
    pub fn encode(value: &CellValue) -> Result<Self, StoreError> {
        Ok(match value {
            CellValue::Bool(b) => DurableValue::Bool(*b),
            CellValue::Int(i) => DurableValue::Int(*i),
            CellValue::Float(f) => DurableValue::Float(*f),
            CellValue::Text(s) => DurableValue::Text(s.clone()),
            CellValue::List(items) => {
                DurableValue::Encoded(serde_json::to_string(items).map_err(StoreError::Encode)?)
            }
        })
    }

    pub fn decode(&self) -> Result<CellValue, StoreError> {
        Ok(match self {
            DurableValue::Bool(b) => CellValue::Bool(*b),
            DurableValue::Int(i) => CellValue::Int(*i),
            DurableValue::Float(f) => CellValue::Float(*f),
            DurableValue::Text(s) => CellValue::Text(s.clone()),
            DurableValue::Encoded(text) => CellValue::List(
                serde_json::from_str::<Vec<CellValue>>(text).map_err(StoreError::Decode)?,
            ),
        })
    }
}

/// Synchronous key/value persistence. Every `store` must be durable when it returns.
pub trait DurableStore {
    fn load(&mut self, scope: Scope, field: &str) -> Result<Option<DurableValue>, StoreError>;

    fn store(&mut self, scope: Scope, field: &str, value: DurableValue) -> Result<(), StoreError>;
}

impl<S: DurableStore + ?Sized> DurableStore for Box<S> {
    fn load(&mut self, scope: Scope, field: &str) -> Result<Option<DurableValue>, StoreError> {
        (**self).load(scope, field)
    }

    fn store(&mut self, scope: Scope, field: &str, value: DurableValue) -> Result<(), StoreError> {
        (**self).store(scope, field, value)
    }
}

/// Lets several stores (agent memory, world registry, tests) share one backend.
impl<S: DurableStore + ?Sized> DurableStore for Rc<RefCell<S>> {
    fn load(&mut self, scope: Scope, field: &str) -> Result<Option<DurableValue>, StoreError> {
        self.borrow_mut().load(scope, field)
    }

    fn store(&mut self, scope: Scope, field: &str, value: DurableValue) -> Result<(), StoreError> {
        self.borrow_mut().store(scope, field, value)
    }
}

type Document = BTreeMap<String, DurableValue>;

/// Process-local backend. Survives cache clears, not process exit.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    docs: BTreeMap<Scope, Document>,
    writes: u64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::new()))
    }

    pub fn field(&self, scope: Scope, field: &str) -> Option<&DurableValue> {
        self.docs.get(&scope)?.get(field)
    }

    pub fn scopes(&self) -> impl Iterator<Item = Scope> + '_ {
        self.docs.keys().copied()
    }

    /// Total number of `store` calls served.
    pub fn writes(&self) -> u64 {
        self.writes
    }
}

impl DurableStore for InMemoryStore {
    fn load(&mut self, scope: Scope, field: &str) -> Result<Option<DurableValue>, StoreError> {
        Ok(self.field(scope, field).cloned())
    }

    fn store(&mut self, scope: Scope, field: &str, value: DurableValue) -> Result<(), StoreError> {
        self.docs
            .entry(scope)
            .or_default()
            .insert(field.to_string(), value);
        self.writes += 1;
        Ok(())
    }
}

/// One JSON document per scope under a root directory:
/// `world.json` and `agents/<stable_id>.json`.
///
/// Each write rewrites the whole document via a temp file + rename.
#[derive(Debug)]
pub struct JsonFileStore {
    root: PathBuf,
    docs: BTreeMap<Scope, Document>,
}

impl JsonFileStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        let agents = root.join("agents");
        fs::create_dir_all(&agents).map_err(|source| StoreError::Io {
            path: agents.clone(),
            source,
        })?;
        Ok(Self {
            root,
            docs: BTreeMap::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, scope: Scope) -> PathBuf {
        match scope {
            Scope::World => self.root.join("world.json"),
            Scope::Agent(id) => self.root.join("agents").join(format!("{id}.json")),
        }
    }

    fn document(&mut self, scope: Scope) -> Result<&mut Document, StoreError> {
        if !self.docs.contains_key(&scope) {
            let path = self.path_for(scope);
            let doc = match fs::read(&path) {
                Ok(bytes) => serde_json::from_slice::<Document>(&bytes)
                    .map_err(|source| StoreError::Document { path, source })?,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Document::new(),
                Err(source) => return Err(StoreError::Io { path, source }),
            };
            self.docs.insert(scope, doc);
        }
        Ok(self.docs.entry(scope).or_default())
    }

    fn flush(&self, scope: Scope, doc: &Document) -> Result<(), StoreError> {
        let path = self.path_for(scope);
        let bytes = serde_json::to_vec_pretty(doc).map_err(StoreError::Encode)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| StoreError::Io { path, source })
    }
}

impl DurableStore for JsonFileStore {
    fn load(&mut self, scope: Scope, field: &str) -> Result<Option<DurableValue>, StoreError> {
        Ok(self.document(scope)?.get(field).cloned())
    }

    fn store(&mut self, scope: Scope, field: &str, value: DurableValue) -> Result<(), StoreError> {
        let doc = self.document(scope)?;
        doc.insert(field.to_string(), value);
        let snapshot = doc.clone();
        self.flush(scope, &snapshot)
    }
}

/// Read a field through `durable`, writing `default` through on first use.
///
/// Never fails: storage or decode problems are logged and the default is used.
pub(crate) fn load_or_default(
    durable: &mut dyn DurableStore,
    scope: Scope,
    field: &'static str,
    default: impl FnOnce() -> CellValue,
) -> CellValue {
    match durable.load(scope, field) {
        Ok(Some(stored)) => match stored.decode() {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(
                    ?scope,
                    field,
                    error = %err,
                    "stored value unreadable, using default"
                );
                default()
            }
        },
        Ok(None) => {
            let value = default();
            let written = DurableValue::encode(&value).and_then(|d| durable.store(scope, field, d));
            if let Err(err) = written {
                tracing::warn!(?scope, field, error = %err, "could not write default through");
            }
            value
        }
        Err(err) => {
            tracing::warn!(?scope, field, error = %err, "durable load failed, using default");
            default()
        }
    }
}
