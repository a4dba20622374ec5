use crate::error::ValueError;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Runtime form of portable data, driven by a [`TypeExpr`](crate::TypeExpr).
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    Character(u8),
    Rune(char),
    Block(Vec<u8>),
    String(Vec<u8>),
    Unicode(String),
    Enumeration(i64),
    ClockTime(f64),
    TimeSpan(f64),
    WorldTime(DateTime<Utc>),
    TimeDelta(Duration),
    Uuid(Uuid),
    /// Portable path of a record kind.
    Type(String),
    Any(Box<Record>),
    Address(Vec<u64>),
    Sequence(Vec<Value>),
    Set(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Record(Record),
    Pointer(Option<Box<Value>>),
}

impl Value {
    pub fn describe(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Integer(_) => "Integer",
            Value::Unsigned(_) => "Unsigned",
            Value::Float(_) => "Float",
            Value::Character(_) => "Character",
            Value::Rune(_) => "Rune",
            Value::Block(_) => "Block",
            Value::String(_) => "String",
            Value::Unicode(_) => "Unicode",
            Value::Enumeration(_) => "Enumeration",
            Value::ClockTime(_) => "ClockTime",
            Value::TimeSpan(_) => "TimeSpan",
            Value::WorldTime(_) => "WorldTime",
            Value::TimeDelta(_) => "TimeDelta",
            Value::Uuid(_) => "UUID",
            Value::Type(_) => "Type",
            Value::Any(_) => "Any",
            Value::Address(_) => "Address",
            Value::Sequence(_) => "Sequence",
            Value::Set(_) => "Set",
            Value::Map(_) => "Map",
            Value::Record(_) => "Record",
            Value::Pointer(_) => "Pointer",
        }
    }

    pub fn mismatch(&self, expected: &'static str) -> ValueError {
        ValueError::Mismatch {
            expected,
            found: self.describe(),
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Unwrap a record of the expected kind.
    pub fn into_record(self, kind: &str) -> Result<Record, ValueError> {
        match self {
            Value::Record(r) if r.kind == kind => Ok(r),
            Value::Record(r) => Err(ValueError::WrongRecord {
                expected: kind.to_string(),
                found: r.kind,
            }),
            other => Err(other.mismatch("Record")),
        }
    }

    pub fn map_get<'a>(pairs: &'a [(Value, Value)], key: &Value) -> Option<&'a Value> {
        pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

/// Instance of a record kind, fields kept in declaration order.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    kind: String,
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new(kind: impl Into<String>) -> Self {
        Record {
            kind: kind.into(),
            fields: Vec::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.set(name, value);
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Replace an existing field in place or append a new one.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn take(&mut self, name: &str) -> Option<Value> {
        let idx = self.fields.iter().position(|(n, _)| n == name)?;
        Some(self.fields.remove(idx).1)
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.take(name).is_some()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_fields_keep_order() {
        let mut r = Record::new("shop::Sku")
            .with("code", Value::Unicode("A1".into()))
            .with("count", Value::Integer(2));
        r.set("code", Value::Unicode("B2".into()));
        let names: Vec<&str> = r.fields().map(|(n, _)| n).collect();
        assert_eq!(names, ["code", "count"]);
        assert_eq!(r.field("code"), Some(&Value::Unicode("B2".into())));
        assert_eq!(r.take("count"), Some(Value::Integer(2)));
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn into_record_checks_kind() {
        let v = Value::Record(Record::new("shop::Sku"));
        assert!(v.clone().into_record("shop::Sku").is_ok());
        assert!(matches!(
            v.into_record("shop::Order"),
            Err(ValueError::WrongRecord { .. })
        ));
        assert!(matches!(
            Value::Integer(1).into_record("shop::Sku"),
            Err(ValueError::Mismatch { expected: "Record", .. })
        ));
    }
}
