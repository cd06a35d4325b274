use std::collections::BTreeMap;

use crate::durable::load_or_default;
use crate::{CellValue, DurableStore, DurableValue, Field, MemoryError, MemoryValue, Scope};

/// World-global cells: population caps, behavior-mode toggles, the snapshot queue.
///
/// Same contract as [`crate::MemoryStore`] Persistent cells, under [`Scope::World`].
/// Every key is expected to have a single conceptual writer. The persistence
/// mode of a [`Field`] is ignored here: registry cells are always durable.
pub struct WorldRegistry {
    cells: BTreeMap<&'static str, CellValue>,
    durable: Box<dyn DurableStore>,
}

impl WorldRegistry {
    pub fn new(durable: impl DurableStore + 'static) -> Self {
        Self {
            cells: BTreeMap::new(),
            durable: Box::new(durable),
        }
    }

    pub fn get<T: MemoryValue>(&mut self, field: Field<T>) -> T {
        let name = field.name();
        let cell = match self.cells.get(name) {
            Some(cell) => cell.clone(),
            None => {
                let cell = load_or_default(self.durable.as_mut(), Scope::World, name, || {
                    field.default_value().into_cell()
                });
                self.cells.insert(name, cell.clone());
                cell
            }
        };
        T::from_cell(&cell).unwrap_or_else(|| {
            tracing::warn!(
                field = name,
                found = cell.kind(),
                "registry cell has unexpected type, using default"
            );
            field.default_value()
        })
    }

    pub fn set<T: MemoryValue>(&mut self, field: Field<T>, value: T) -> Result<(), MemoryError> {
        let name = field.name();
        let value = value.into_cell();
        DurableValue::encode(&value)
            .and_then(|d| self.durable.store(Scope::World, name, d))
            .map_err(|source| MemoryError::WriteThrough {
                field: name,
                source,
            })?;
        self.cells.insert(name, value);
        Ok(())
    }

    /// Whether the cell has ever been written (cached or durable). Never writes a default.
    pub fn contains<T>(&mut self, field: Field<T>) -> bool {
        if self.cells.contains_key(field.name()) {
            return true;
        }
        match self.durable.load(Scope::World, field.name()) {
            Ok(found) => found.is_some(),
            Err(err) => {
                tracing::warn!(field = field.name(), error = %err, "durable probe failed");
                false
            }
        }
    }

    /// Write `value` only if the cell was never written. Returns whether it wrote.
    pub fn initialize<T: MemoryValue>(
        &mut self,
        field: Field<T>,
        value: T,
    ) -> Result<bool, MemoryError> {
        if self.contains(field) {
            return Ok(false);
        }
        self.set(field, value)?;
        Ok(true)
    }

    pub fn is_in_array<T>(&mut self, field: Field<Vec<T>>, value: &T) -> bool
    where
        T: MemoryValue + PartialEq,
    {
        self.get(field).contains(value)
    }

    pub fn push_to_array<T>(
        &mut self,
        field: Field<Vec<T>>,
        value: T,
        unique: bool,
    ) -> Result<bool, MemoryError>
    where
        T: MemoryValue + PartialEq,
    {
        let mut items = self.get(field);
        if unique && items.contains(&value) {
            return Ok(false);
        }
        items.push(value);
        self.set(field, items)?;
        Ok(true)
    }

    pub fn remove_from_array<T>(
        &mut self,
        field: Field<Vec<T>>,
        value: &T,
    ) -> Result<bool, MemoryError>
    where
        T: MemoryValue + PartialEq,
    {
        let mut items = self.get(field);
        let before = items.len();
        items.retain(|item| item != value);
        if items.len() == before {
            return Ok(false);
        }
        self.set(field, items)?;
        Ok(true)
    }

    pub fn clear_cache(&mut self) {
        self.cells.clear();
    }
}
