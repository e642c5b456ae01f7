//! The dynamic value type that crosses the runtime boundary.
//!
//! Compiled components talk to the runtime in terms of loosely-typed values:
//! props, reactive state fields, capability payloads and context entries all
//! move through [`StateValue`]. Host objects that don't fit the primitive
//! variants ride along as [`AnyValue`] trait objects compared by downcast.

use fxhash::FxHashMap;
use indexmap::IndexMap;
use std::{any::Any, fmt, rc::Rc};

/// A loosely-typed value as seen by compiled component code.
///
/// Equality is structural for the primitive variants and delegated to
/// [`AnyValue::any_cmp`] for host objects. Writes to reactive cells are gated
/// on this equality.
#[derive(Clone)]
pub enum StateValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<StateValue>),
    Map(IndexMap<String, StateValue>),
    Any(Rc<dyn AnyValue>),
}

impl StateValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            StateValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            StateValue::Int(n) => Some(*n),
            StateValue::Float(f) => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            StateValue::Float(f) => Some(*f),
            StateValue::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            StateValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Truthiness as compiled conditionals see it.
    pub fn is_truthy(&self) -> bool {
        match self {
            StateValue::Null => false,
            StateValue::Bool(b) => *b,
            StateValue::Int(n) => *n != 0,
            StateValue::Float(f) => *f != 0.0,
            StateValue::Text(s) => !s.is_empty(),
            StateValue::List(_) | StateValue::Map(_) | StateValue::Any(_) => true,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, StateValue::Null)
    }
}

impl PartialEq for StateValue {
    fn eq(&self, other: &Self) -> bool {
        use StateValue::*;
        match (self, other) {
            (Null, Null) => true,
            (Bool(l), Bool(r)) => l == r,
            (Int(l), Int(r)) => l == r,
            (Float(l), Float(r)) => l == r,
            (Text(l), Text(r)) => l == r,
            (List(l), List(r)) => l == r,
            (Map(l), Map(r)) => l == r,
            (Any(l), Any(r)) => l.any_cmp(&**r),
            _ => false,
        }
    }
}

impl fmt::Debug for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "Null"),
            Self::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            Self::Int(v) => f.debug_tuple("Int").field(v).finish(),
            Self::Float(v) => f.debug_tuple("Float").field(v).finish(),
            Self::Text(v) => f.debug_tuple("Text").field(v).finish(),
            Self::List(v) => f.debug_tuple("List").field(v).finish(),
            Self::Map(v) => f.debug_tuple("Map").field(v).finish(),
            Self::Any(_) => f.debug_tuple("Any").finish(),
        }
    }
}

/// Renders the value the way it appears when interpolated into text content.
impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateValue::Null => Ok(()),
            StateValue::Bool(b) => write!(f, "{}", b),
            StateValue::Int(n) => write!(f, "{}", n),
            StateValue::Float(v) => write!(f, "{}", v),
            StateValue::Text(s) => f.write_str(s),
            StateValue::List(items) => {
                for item in items {
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
            StateValue::Map(_) => f.write_str("[object]"),
            StateValue::Any(_) => f.write_str("[object]"),
        }
    }
}

impl From<bool> for StateValue {
    fn from(v: bool) -> Self {
        StateValue::Bool(v)
    }
}

impl From<i64> for StateValue {
    fn from(v: i64) -> Self {
        StateValue::Int(v)
    }
}

impl From<i32> for StateValue {
    fn from(v: i32) -> Self {
        StateValue::Int(v as i64)
    }
}

impl From<f64> for StateValue {
    fn from(v: f64) -> Self {
        StateValue::Float(v)
    }
}

impl From<&str> for StateValue {
    fn from(v: &str) -> Self {
        StateValue::Text(v.to_string())
    }
}

impl From<String> for StateValue {
    fn from(v: String) -> Self {
        StateValue::Text(v)
    }
}

impl<T: Into<StateValue>> From<Option<T>> for StateValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => StateValue::Null,
        }
    }
}

impl From<Vec<StateValue>> for StateValue {
    fn from(v: Vec<StateValue>) -> Self {
        StateValue::List(v)
    }
}

/// Host objects stored in [`StateValue::Any`].
///
/// Comparison downcasts the other side to the concrete type; values of
/// different concrete types are never equal. Everything behind this trait
/// is `'static`, so the downcast needs no pointer games.
pub trait AnyValue {
    fn as_any(&self) -> &dyn Any;
    fn any_cmp(&self, other: &dyn AnyValue) -> bool;
}

impl<T: PartialEq + Any> AnyValue for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn any_cmp(&self, other: &dyn AnyValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .map(|other| self == other)
            .unwrap_or(false)
    }
}

/// Convenience for building a [`StateValue::Map`] from pairs.
pub fn value_map<K: Into<String>, V: Into<StateValue>>(
    pairs: impl IntoIterator<Item = (K, V)>,
) -> StateValue {
    let mut map = IndexMap::new();
    for (k, v) in pairs {
        map.insert(k.into(), v.into());
    }
    StateValue::Map(map)
}

#[allow(dead_code)]
pub(crate) type ValueTable = FxHashMap<String, StateValue>;
