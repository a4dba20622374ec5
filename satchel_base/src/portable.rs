//! Mapping between Rust types and portable type expressions and values.

use crate::error::ValueError;
use crate::graph::{Native, NodeId, TypeGraph};
use crate::type_expr::Kind;
use crate::value::Value;
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::hash::Hash;
use uuid::Uuid;

/// A Rust type that can be described by a type expression and carried as a [`Value`].
pub trait Portable: Sized {
    /// Add the raw description of this type to `graph`.
    fn declare(graph: &mut TypeGraph) -> NodeId;

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Result<Self, ValueError>;
}

impl Portable for bool {
    fn declare(graph: &mut TypeGraph) -> NodeId {
        graph.native(Native::Bool)
    }

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(other.mismatch("Bool")),
        }
    }
}

fn whole_number(value: Value, target: &'static str) -> Result<i128, ValueError> {
    match value {
        Value::Integer(i) => Ok(i as i128),
        Value::Unsigned(u) => Ok(u as i128),
        other => Err(other.mismatch(target)),
    }
}

macro_rules! portable_signed {
    ($($ty:ty => $declare:expr),* $(,)?) => {
        $(
            impl Portable for $ty {
                fn declare(graph: &mut TypeGraph) -> NodeId {
                    $declare(graph)
                }

                fn to_value(&self) -> Value {
                    Value::Integer(*self as i64)
                }

                fn from_value(value: Value) -> Result<Self, ValueError> {
                    let n = whole_number(value, stringify!($ty))?;
                    <$ty>::try_from(n).map_err(|_| ValueError::OutOfRange(n.to_string(), stringify!($ty)))
                }
            }
        )*
    };
}

macro_rules! portable_unsigned {
    ($($ty:ty => $declare:expr),* $(,)?) => {
        $(
            impl Portable for $ty {
                fn declare(graph: &mut TypeGraph) -> NodeId {
                    $declare(graph)
                }

                fn to_value(&self) -> Value {
                    Value::Unsigned(*self as u64)
                }

                fn from_value(value: Value) -> Result<Self, ValueError> {
                    let n = whole_number(value, stringify!($ty))?;
                    <$ty>::try_from(n).map_err(|_| ValueError::OutOfRange(n.to_string(), stringify!($ty)))
                }
            }
        )*
    };
}

portable_signed! {
    i16 => |g: &mut TypeGraph| g.class(Kind::Integer2),
    i32 => |g: &mut TypeGraph| g.class(Kind::Integer4),
    i64 => |g: &mut TypeGraph| g.native(Native::Int),
}

portable_unsigned! {
    u8 => |g: &mut TypeGraph| g.class(Kind::Byte),
    u16 => |g: &mut TypeGraph| g.class(Kind::Unsigned2),
    u32 => |g: &mut TypeGraph| g.class(Kind::Unsigned4),
    u64 => |g: &mut TypeGraph| g.class(Kind::Unsigned8),
}

fn real_number(value: Value, target: &'static str) -> Result<f64, ValueError> {
    match value {
        Value::Float(f) => Ok(f),
        Value::Integer(i) => Ok(i as f64),
        Value::Unsigned(u) => Ok(u as f64),
        other => Err(other.mismatch(target)),
    }
}

impl Portable for f32 {
    fn declare(graph: &mut TypeGraph) -> NodeId {
        graph.class(Kind::Float4)
    }

    fn to_value(&self) -> Value {
        Value::Float(*self as f64)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        real_number(value, "f32").map(|f| f as f32)
    }
}

impl Portable for f64 {
    fn declare(graph: &mut TypeGraph) -> NodeId {
        graph.native(Native::Float)
    }

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        real_number(value, "f64")
    }
}

impl Portable for char {
    fn declare(graph: &mut TypeGraph) -> NodeId {
        graph.class(Kind::Rune)
    }

    fn to_value(&self) -> Value {
        Value::Rune(*self)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Rune(c) => Ok(c),
            Value::Character(b) => Ok(b as char),
            other => Err(other.mismatch("Rune")),
        }
    }
}

impl Portable for String {
    fn declare(graph: &mut TypeGraph) -> NodeId {
        graph.native(Native::Str)
    }

    fn to_value(&self) -> Value {
        Value::Unicode(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Unicode(s) => Ok(s),
            other => Err(other.mismatch("Unicode")),
        }
    }
}

impl Portable for Uuid {
    fn declare(graph: &mut TypeGraph) -> NodeId {
        graph.native(Native::Uuid)
    }

    fn to_value(&self) -> Value {
        Value::Uuid(*self)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Uuid(u) => Ok(u),
            other => Err(other.mismatch("UUID")),
        }
    }
}

impl Portable for DateTime<Utc> {
    fn declare(graph: &mut TypeGraph) -> NodeId {
        graph.native(Native::DateTime)
    }

    fn to_value(&self) -> Value {
        Value::WorldTime(*self)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::WorldTime(dt) => Ok(dt),
            other => Err(other.mismatch("WorldTime")),
        }
    }
}

impl Portable for Duration {
    fn declare(graph: &mut TypeGraph) -> NodeId {
        graph.native(Native::Duration)
    }

    fn to_value(&self) -> Value {
        Value::TimeDelta(*self)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::TimeDelta(d) => Ok(d),
            other => Err(other.mismatch("TimeDelta")),
        }
    }
}

impl<T: Portable> Portable for Box<T> {
    fn declare(graph: &mut TypeGraph) -> NodeId {
        T::declare(graph)
    }

    fn to_value(&self) -> Value {
        self.as_ref().to_value()
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        T::from_value(value).map(Box::new)
    }
}

/// Optional values are back-references, an absent value is a null pointer.
/// An `Option` is declared as a `PointerTo` its element. Pointers never compare equal under
/// [`equal_to`](crate::equal_to), so a record with an `Option` field is not `equal_values` to
/// itself. Compare such records field by field or through the Rust type's own `PartialEq`.
impl<T: Portable> Portable for Option<T> {
    fn declare(graph: &mut TypeGraph) -> NodeId {
        let element = T::declare(graph);
        graph.pointer_to(element)
    }

    fn to_value(&self) -> Value {
        Value::Pointer(self.as_ref().map(|v| Box::new(v.to_value())))
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Pointer(None) | Value::Null => Ok(None),
            Value::Pointer(Some(v)) => T::from_value(*v).map(Some),
            other => Err(other.mismatch("Pointer")),
        }
    }
}

fn elements<T: Portable>(value: Value, expected: &'static str) -> Result<Vec<T>, ValueError> {
    let items = match value {
        Value::Sequence(items) if expected == "Sequence" => items,
        Value::Set(items) if expected == "Set" => items,
        other => return Err(other.mismatch(expected)),
    };
    items
        .into_iter()
        .enumerate()
        .map(|(i, v)| T::from_value(v).map_err(|e| e.within(format!("[{i}]"))))
        .collect()
}

impl<T: Portable> Portable for Vec<T> {
    fn declare(graph: &mut TypeGraph) -> NodeId {
        let element = T::declare(graph);
        graph.vector_of(element)
    }

    fn to_value(&self) -> Value {
        Value::Sequence(self.iter().map(Portable::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        elements(value, "Sequence")
    }
}

impl<T: Portable> Portable for VecDeque<T> {
    fn declare(graph: &mut TypeGraph) -> NodeId {
        let element = T::declare(graph);
        graph.deque_of(element)
    }

    fn to_value(&self) -> Value {
        Value::Sequence(self.iter().map(Portable::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        elements(value, "Sequence").map(VecDeque::from)
    }
}

impl<T: Portable, const N: usize> Portable for [T; N] {
    fn declare(graph: &mut TypeGraph) -> NodeId {
        let element = T::declare(graph);
        graph.array_of(element, N)
    }

    fn to_value(&self) -> Value {
        Value::Sequence(self.iter().map(Portable::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        let items: Vec<T> = elements(value, "Sequence")?;
        let found = items.len();
        items.try_into().map_err(|_| ValueError::Length { expected: N, found })
    }
}

impl<T: Portable + Eq + Hash> Portable for HashSet<T> {
    fn declare(graph: &mut TypeGraph) -> NodeId {
        let element = T::declare(graph);
        graph.set_of(element)
    }

    fn to_value(&self) -> Value {
        Value::Set(self.iter().map(Portable::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        elements(value, "Set").map(|v: Vec<T>| v.into_iter().collect())
    }
}

impl<T: Portable + Ord> Portable for BTreeSet<T> {
    fn declare(graph: &mut TypeGraph) -> NodeId {
        let element = T::declare(graph);
        graph.set_of(element)
    }

    fn to_value(&self) -> Value {
        Value::Set(self.iter().map(Portable::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        elements(value, "Set").map(|v: Vec<T>| v.into_iter().collect())
    }
}

fn pairs<K: Portable, V: Portable>(value: Value) -> Result<Vec<(K, V)>, ValueError> {
    let Value::Map(pairs) = value else {
        return Err(value.mismatch("Map"));
    };
    pairs
        .into_iter()
        .map(|(k, v)| {
            let k = K::from_value(k).map_err(|e| e.within("key"))?;
            let v = V::from_value(v).map_err(|e| e.within("value"))?;
            Ok((k, v))
        })
        .collect()
}

impl<K: Portable + Eq + Hash, V: Portable> Portable for HashMap<K, V> {
    fn declare(graph: &mut TypeGraph) -> NodeId {
        let key = K::declare(graph);
        let value = V::declare(graph);
        graph.map_of(key, value)
    }

    fn to_value(&self) -> Value {
        Value::Map(self.iter().map(|(k, v)| (k.to_value(), v.to_value())).collect())
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        pairs(value).map(|p: Vec<(K, V)>| p.into_iter().collect())
    }
}

impl<K: Portable + Ord, V: Portable> Portable for BTreeMap<K, V> {
    fn declare(graph: &mut TypeGraph) -> NodeId {
        let key = K::declare(graph);
        let value = V::declare(graph);
        graph.map_of(key, value)
    }

    fn to_value(&self) -> Value {
        Value::Map(self.iter().map(|(k, v)| (k.to_value(), v.to_value())).collect())
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        pairs(value).map(|p: Vec<(K, V)>| p.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fix;
    use crate::type_expr::TypeExpr;

    fn expr<T: Portable>() -> TypeExpr {
        let mut g = TypeGraph::new();
        let n = T::declare(&mut g);
        fix(&g, n, &|_| false).unwrap()
    }

    #[test]
    fn declarations() {
        assert_eq!(expr::<u8>(), TypeExpr::Byte);
        assert_eq!(expr::<i64>(), TypeExpr::Integer8);
        assert_eq!(expr::<Vec<String>>(), TypeExpr::vector_of(TypeExpr::Unicode));
        assert_eq!(
            expr::<BTreeMap<u32, [f32; 2]>>().to_string(),
            "MapOf(Unsigned4(),ArrayOf(Float4(),2))"
        );
        assert_eq!(expr::<Option<Box<bool>>>().to_string(), "PointerTo(Boolean())");
        assert_eq!(expr::<VecDeque<Uuid>>().to_string(), "DequeOf(UUID())");
    }

    #[test]
    fn integers_accept_either_sign_when_in_range() {
        assert_eq!(u16::from_value(Value::Integer(7)), Ok(7));
        assert_eq!(i32::from_value(Value::Unsigned(7)), Ok(7));
        assert_eq!(
            u8::from_value(Value::Integer(-1)),
            Err(ValueError::OutOfRange("-1".into(), "u8"))
        );
        assert!(i16::from_value(Value::Unicode("7".into())).is_err());
    }

    #[test]
    fn containers_round_trip() {
        let mut m = HashMap::new();
        m.insert("a".to_string(), vec![1i64, 2]);
        assert_eq!(HashMap::from_value(m.to_value()), Ok(m));

        let a = [1u32, 2, 3];
        assert_eq!(<[u32; 3]>::from_value(a.to_value()), Ok(a));
        assert_eq!(
            <[u32; 2]>::from_value(a.to_value()),
            Err(ValueError::Length { expected: 2, found: 3 })
        );

        let o: Option<String> = None;
        assert_eq!(o.to_value(), Value::Pointer(None));
        assert_eq!(Option::<String>::from_value(Value::Null), Ok(None));
    }

    #[test]
    fn element_errors_name_their_position() {
        let v = Value::Sequence(vec![Value::Integer(1), Value::Bool(true)]);
        let e = Vec::<i64>::from_value(v).unwrap_err();
        assert_eq!(e.to_string(), "[1]: expected i64, found Bool");
    }
}
