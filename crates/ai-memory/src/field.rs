use core::fmt;

use crate::{CellValue, MemoryValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Persistence {
    /// Mirrored to durable storage on every write.
    Persistent,
    /// Process memory only; reaped when the owner becomes invalid.
    Transient,
}

/// Statically declared, typed memory cell.
///
/// ```
/// use ai_memory::Field;
///
/// const HUNGER: Field<f64> = Field::transient("hunger", || 0.0);
/// const VISITED: Field<Vec<String>> = Field::persistent("visited", Vec::new);
/// assert_eq!(VISITED.name(), "visited");
/// ```
pub struct Field<T> {
    name: &'static str,
    persistence: Persistence,
    default: fn() -> T,
}

impl<T> Copy for Field<T> {}

impl<T> Clone for Field<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("persistence", &self.persistence)
            .finish()
    }
}

impl<T> Field<T> {
    pub const fn persistent(name: &'static str, default: fn() -> T) -> Self {
        Self {
            name,
            persistence: Persistence::Persistent,
            default,
        }
    }

    pub const fn transient(name: &'static str, default: fn() -> T) -> Self {
        Self {
            name,
            persistence: Persistence::Transient,
            default,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub const fn persistence(&self) -> Persistence {
        self.persistence
    }

    pub fn default_value(&self) -> T {
        (self.default)()
    }
}

impl<T: MemoryValue> Field<T> {
    /// Untyped description, used where fields are handled as a set (snapshots).
    pub fn spec(&self) -> FieldSpec {
        FieldSpec {
            name: self.name,
            persistence: self.persistence,
            default: self.default_value().into_cell(),
        }
    }
}

/// Untyped counterpart of [`Field`].
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub persistence: Persistence,
    pub default: CellValue,
}
