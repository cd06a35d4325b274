use ai_core::Vec3;
use serde::{Deserialize, Serialize};

/// Dynamic value held by a memory cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<CellValue>),
}

impl CellValue {
    pub fn as_list(&self) -> Option<&[CellValue]> {
        match self {
            CellValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CellValue::Bool(_) => "bool",
            CellValue::Int(_) => "int",
            CellValue::Float(_) => "float",
            CellValue::Text(_) => "text",
            CellValue::List(_) => "list",
        }
    }
}

/// Rust types that can live in a memory cell.
pub trait MemoryValue: Sized + 'static {
    fn into_cell(self) -> CellValue;
    fn from_cell(cell: &CellValue) -> Option<Self>;
}

impl MemoryValue for bool {
    fn into_cell(self) -> CellValue {
        CellValue::Bool(self)
    }

    fn from_cell(cell: &CellValue) -> Option<Self> {
        match cell {
            CellValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl MemoryValue for i64 {
    fn into_cell(self) -> CellValue {
        CellValue::Int(self)
    }

    fn from_cell(cell: &CellValue) -> Option<Self> {
        match cell {
            CellValue::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl MemoryValue for f64 {
    fn into_cell(self) -> CellValue {
        CellValue::Float(self)
    }

    fn from_cell(cell: &CellValue) -> Option<Self> {
        match cell {
            CellValue::Float(f) => Some(*f),
            // Integral floats may come back from storage as ints.
            CellValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl MemoryValue for String {
    fn into_cell(self) -> CellValue {
        CellValue::Text(self)
    }

    fn from_cell(cell: &CellValue) -> Option<Self> {
        match cell {
            CellValue::Text(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl<T: MemoryValue> MemoryValue for Vec<T> {
    fn into_cell(self) -> CellValue {
        CellValue::List(self.into_iter().map(MemoryValue::into_cell).collect())
    }

    fn from_cell(cell: &CellValue) -> Option<Self> {
        cell.as_list()?.iter().map(T::from_cell).collect()
    }
}

/// Stored as `[x, y, z]`.
impl MemoryValue for Vec3 {
    fn into_cell(self) -> CellValue {
        CellValue::List(vec![
            CellValue::Float(self.x as f64),
            CellValue::Float(self.y as f64),
            CellValue::Float(self.z as f64),
        ])
    }

    fn from_cell(cell: &CellValue) -> Option<Self> {
        match <Vec<f64>>::from_cell(cell)?.as_slice() {
            [x, y, z] => Some(Vec3::new(*x as f32, *y as f32, *z as f32)),
            _ => None,
        }
    }
}
