use std::cell::Cell;
use std::rc::Rc;

use ai_memory::{
    DurableStore, DurableValue, Field, InMemoryStore, JsonFileStore, Scope, StoreError,
    WorldRegistry,
};

const MAX_POPULATION: Field<i64> = Field::persistent("max_population", || 10);
const PEACEFUL: Field<bool> = Field::persistent("peaceful_mode", || false);
const QUEUE: Field<Vec<String>> = Field::persistent("queue", Vec::new);

struct ReadOnlyAfter {
    inner: InMemoryStore,
    locked: Rc<Cell<bool>>,
}

impl DurableStore for ReadOnlyAfter {
    fn load(&mut self, scope: Scope, field: &str) -> Result<Option<DurableValue>, StoreError> {
        self.inner.load(scope, field)
    }

    fn store(&mut self, scope: Scope, field: &str, value: DurableValue) -> Result<(), StoreError> {
        if self.locked.get() {
            return Err(StoreError::Io {
                path: "world.json".into(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            });
        }
        self.inner.store(scope, field, value)
    }
}

#[test]
fn initialize_only_writes_once() {
    let backend = InMemoryStore::shared();
    let mut registry = WorldRegistry::new(backend.clone());

    assert!(!registry.contains(MAX_POPULATION));
    assert!(registry.initialize(MAX_POPULATION, 3).unwrap());
    assert!(!registry.initialize(MAX_POPULATION, 8).unwrap());
    assert_eq!(registry.get(MAX_POPULATION), 3);

    registry.clear_cache();
    assert!(registry.contains(MAX_POPULATION));
    assert_eq!(registry.get(MAX_POPULATION), 3);
}

#[test]
fn defaults_are_written_through_under_world_scope() {
    let backend = InMemoryStore::shared();
    let mut registry = WorldRegistry::new(backend.clone());

    assert!(!registry.get(PEACEFUL));
    assert_eq!(
        backend.borrow().field(Scope::World, "peaceful_mode"),
        Some(&DurableValue::Bool(false))
    );
}

#[test]
fn array_cells_keep_order_across_reload() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut registry = WorldRegistry::new(JsonFileStore::open(dir.path()).unwrap());
        registry.push_to_array(QUEUE, "a".to_string(), false).unwrap();
        registry.push_to_array(QUEUE, "b".to_string(), false).unwrap();
        registry.push_to_array(QUEUE, "a".to_string(), true).unwrap();
    }
    let mut registry = WorldRegistry::new(JsonFileStore::open(dir.path()).unwrap());
    assert_eq!(registry.get(QUEUE), vec!["a", "b"]);
    assert!(registry.remove_from_array(QUEUE, &"a".to_string()).unwrap());
    assert_eq!(registry.get(QUEUE), vec!["b"]);
}

#[test]
fn failed_array_write_is_not_visible() {
    let locked = Rc::new(Cell::new(false));
    let mut registry = WorldRegistry::new(ReadOnlyAfter {
        inner: InMemoryStore::new(),
        locked: locked.clone(),
    });
    registry.push_to_array(QUEUE, "a".to_string(), false).unwrap();

    locked.set(true);
    assert!(registry.push_to_array(QUEUE, "b".to_string(), false).is_err());
    assert!(registry.remove_from_array(QUEUE, &"a".to_string()).is_err());
    assert!(registry.set(MAX_POPULATION, 1).is_err());

    assert_eq!(registry.get(QUEUE), vec!["a"]);
    assert_eq!(registry.get(MAX_POPULATION), 10);
}
