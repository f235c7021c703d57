//! Dynamic values carried by state, stores, props and memo dependencies.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// A dynamically typed value.
///
/// Scalars compare by value. `List` and `Record` compare by reference: two
/// separately built records with identical fields are *not* equal, which is
/// the inequality the runtime uses to decide whether a write is a change.
#[derive(Clone, Default)]
pub enum Data {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(Rc<[Data]>),
    Record(Rc<Record>),
}

impl Data {
    pub fn kind(&self) -> &'static str {
        match self {
            Data::Null => "null",
            Data::Bool(_) => "bool",
            Data::Int(_) => "int",
            Data::Float(_) => "float",
            Data::Str(_) => "string",
            Data::List(_) => "list",
            Data::Record(_) => "record",
        }
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self, Data::List(_) | Data::Record(_))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Data::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Data::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Data::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Rc<Record>> {
        match self {
            Data::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Data]> {
        match self {
            Data::List(items) => Some(items),
            _ => None,
        }
    }

    /// Dependency comparison used by `use_memo`: scalars by value, records
    /// field by field, lists by reference.
    pub fn dependency_eq(&self, other: &Data) -> bool {
        match (self, other) {
            (Data::Record(a), Data::Record(b)) => Rc::ptr_eq(a, b) || a.shallow_eq(b),
            _ => self == other,
        }
    }

    /// Text rendering of a scalar, `None` for lists and records.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Data::Null => Some(String::new()),
            Data::Bool(value) => Some(value.to_string()),
            Data::Int(value) => Some(value.to_string()),
            Data::Float(value) => Some(value.to_string()),
            Data::Str(value) => Some(value.to_string()),
            Data::List(_) | Data::Record(_) => None,
        }
    }
}

impl PartialEq for Data {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Data::Null, Data::Null) => true,
            (Data::Bool(a), Data::Bool(b)) => a == b,
            (Data::Int(a), Data::Int(b)) => a == b,
            // Bitwise, so a NaN written twice is not a change.
            (Data::Float(a), Data::Float(b)) => a.to_bits() == b.to_bits(),
            (Data::Str(a), Data::Str(b)) => a == b,
            (Data::List(a), Data::List(b)) => Rc::ptr_eq(a, b),
            (Data::Record(a), Data::Record(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Data::Null => f.write_str("null"),
            Data::Bool(value) => write!(f, "{value}"),
            Data::Int(value) => write!(f, "{value}"),
            Data::Float(value) => write!(f, "{value}"),
            Data::Str(value) => write!(f, "{value:?}"),
            Data::List(items) => f.debug_list().entries(items.iter()).finish(),
            Data::Record(record) => fmt::Debug::fmt(&**record, f),
        }
    }
}

impl From<bool> for Data {
    fn from(value: bool) -> Self {
        Data::Bool(value)
    }
}

macro_rules! data_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Data {
                fn from(value: $ty) -> Self {
                    Data::Int(i64::from(value))
                }
            }
        )*
    };
}

data_from_int!(i8, i16, i32, i64, u8, u16, u32);

/// Values above `i64::MAX` saturate.
macro_rules! data_from_wide_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Data {
                fn from(value: $ty) -> Self {
                    Data::Int(i64::try_from(value).unwrap_or(i64::MAX))
                }
            }
        )*
    };
}

data_from_wide_int!(u64, usize);

impl From<f64> for Data {
    fn from(value: f64) -> Self {
        Data::Float(value)
    }
}

impl From<f32> for Data {
    fn from(value: f32) -> Self {
        Data::Float(f64::from(value))
    }
}

impl From<&str> for Data {
    fn from(value: &str) -> Self {
        Data::Str(Rc::from(value))
    }
}

impl From<String> for Data {
    fn from(value: String) -> Self {
        Data::Str(Rc::from(value))
    }
}

impl From<Record> for Data {
    fn from(value: Record) -> Self {
        Data::Record(Rc::new(value))
    }
}

impl From<Rc<Record>> for Data {
    fn from(value: Rc<Record>) -> Self {
        Data::Record(value)
    }
}

impl From<Vec<Data>> for Data {
    fn from(value: Vec<Data>) -> Self {
        Data::List(Rc::from(value))
    }
}

impl<T: Into<Data>> From<Option<T>> for Data {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Data::Null)
    }
}

/// An ordered set of named fields.
#[derive(Clone, Default, PartialEq)]
pub struct Record {
    fields: BTreeMap<String, Data>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Data>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Data> {
        self.fields.get(field)
    }

    /// Stores `value`, returning the previous value of the field.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Data>) -> Option<Data> {
        self.fields.insert(field.into(), value.into())
    }

    pub fn remove(&mut self, field: &str) -> Option<Data> {
        self.fields.remove(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Data)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Same field names and per-field [`Data`] equality.
    pub fn shallow_eq(&self, other: &Record) -> bool {
        self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .all(|(name, value)| other.fields.get(name) == Some(value))
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.fields.iter()).finish()
    }
}

impl<K: Into<String>, V: Into<Data>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

/// Props handed to a component render function.
///
/// Cloning is cheap and preserves identity; [`Props::changed_from`] treats
/// two props objects as unchanged when they are the same allocation or
/// shallowly equal.
#[derive(Clone, Default)]
pub struct Props(Rc<Record>);

impl Props {
    pub fn new(record: Record) -> Self {
        Self(Rc::new(record))
    }

    pub fn get(&self, field: &str) -> Option<&Data> {
        self.0.get(field)
    }

    pub fn record(&self) -> &Record {
        &self.0
    }

    pub fn ptr_eq(&self, other: &Props) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn changed_from(&self, previous: &Props) -> bool {
        !self.ptr_eq(previous) && !self.0.shallow_eq(&previous.0)
    }
}

impl From<Record> for Props {
    fn from(record: Record) -> Self {
        Props::new(record)
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

/// Builds a [`Record`] from `field => value` pairs.
///
/// ```
/// let state = trellis_core::record! { "count" => 0, "label" => "clicks" };
/// assert_eq!(state.get("count").and_then(|v| v.as_int()), Some(0));
/// ```
#[macro_export]
macro_rules! record {
    () => {
        $crate::Record::new()
    };
    ($($field:expr => $value:expr),+ $(,)?) => {
        $crate::Record::new()$(.with($field, $value))+
    };
}
