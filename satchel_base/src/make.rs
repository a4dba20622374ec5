//! Manufacturing default and example values from type expressions.

use crate::date_time::{default_world, fake_clock, fake_world};
use crate::registry::Registry;
use crate::type_expr::TypeExpr;
use crate::value::{Record, Value};
use chrono::Duration;
use std::collections::HashSet;
use uuid::Uuid;

impl Registry {
    /// The value a fresh, never-assigned item of type `te` holds.
    ///
    /// Containers are empty, arrays are filled element-wise, records are their registered
    /// default and pointers are null.
    pub fn make(&self, te: &TypeExpr) -> Value {
        match te {
            TypeExpr::Boolean => Value::Bool(false),
            TypeExpr::Byte => Value::Unsigned(0),
            TypeExpr::Character => Value::Character(b' '),
            TypeExpr::Rune => Value::Rune(' '),
            TypeExpr::Integer2 | TypeExpr::Integer4 | TypeExpr::Integer8 => Value::Integer(0),
            TypeExpr::Unsigned2 | TypeExpr::Unsigned4 | TypeExpr::Unsigned8 => Value::Unsigned(0),
            TypeExpr::Float4 | TypeExpr::Float8 => Value::Float(0.0),
            TypeExpr::Block => Value::Block(Vec::new()),
            TypeExpr::String => Value::String(Vec::new()),
            TypeExpr::Unicode => Value::Unicode(String::new()),
            TypeExpr::Enumeration(e) => e.first().map_or(Value::Null, Value::Enumeration),
            TypeExpr::ClockTime => Value::ClockTime(0.0),
            TypeExpr::TimeSpan => Value::TimeSpan(0.0),
            TypeExpr::WorldTime => Value::WorldTime(default_world()),
            TypeExpr::TimeDelta => Value::TimeDelta(Duration::zero()),
            TypeExpr::Uuid => Value::Uuid(Uuid::nil()),
            TypeExpr::Type | TypeExpr::Word | TypeExpr::Any => Value::Null,
            TypeExpr::TargetAddress | TypeExpr::Address => Value::Address(Vec::new()),
            TypeExpr::ArrayOf(e, size) => Value::Sequence((0..*size).map(|_| self.make(e)).collect()),
            TypeExpr::VectorOf(_) | TypeExpr::DequeOf(_) => Value::Sequence(Vec::new()),
            TypeExpr::SetOf(_) => Value::Set(Vec::new()),
            TypeExpr::MapOf(..) => Value::Map(Vec::new()),
            TypeExpr::UserDefined(path) => self
                .get(path)
                .map_or(Value::Null, |r| r.default_value().clone()),
            TypeExpr::PointerTo(_) => Value::Pointer(None),
        }
    }

    /// A representative, non-default value of type `te`: one element per container and
    /// every schema field of a record filled in.
    pub fn fake(&self, te: &TypeExpr) -> Value {
        let mut building = HashSet::new();
        self.fake_inner(te, &mut building)
    }

    fn fake_inner(&self, te: &TypeExpr, building: &mut HashSet<String>) -> Value {
        const CAFE: [u8; 4] = [0x0c, 0x0a, 0x0f, 0x0e];
        match te {
            TypeExpr::Boolean => Value::Bool(true),
            TypeExpr::Byte => Value::Unsigned(0x0c),
            TypeExpr::Character => Value::Character(b'c'),
            TypeExpr::Rune => Value::Rune('C'),
            TypeExpr::Integer2 | TypeExpr::Integer4 | TypeExpr::Integer8 => Value::Integer(-42),
            TypeExpr::Unsigned2 | TypeExpr::Unsigned4 | TypeExpr::Unsigned8 => Value::Unsigned(42),
            TypeExpr::Float4 | TypeExpr::Float8 => Value::Float(0.5),
            TypeExpr::Block => Value::Block(CAFE.to_vec()),
            TypeExpr::String => Value::String(b"CAFE".to_vec()),
            TypeExpr::Unicode => Value::Unicode("CAFE".to_string()),
            TypeExpr::Enumeration(e) => e.first().map_or(Value::Null, Value::Enumeration),
            TypeExpr::ClockTime => Value::ClockTime(fake_clock()),
            TypeExpr::TimeSpan => Value::TimeSpan(0.5),
            TypeExpr::WorldTime => Value::WorldTime(fake_world()),
            TypeExpr::TimeDelta => Value::TimeDelta(Duration::milliseconds(500)),
            TypeExpr::Uuid => Value::Uuid(Uuid::new_v4()),
            TypeExpr::Type | TypeExpr::Word | TypeExpr::Any => Value::Null,
            TypeExpr::TargetAddress | TypeExpr::Address => {
                Value::Address(CAFE.iter().map(|b| *b as u64).collect())
            }
            TypeExpr::VectorOf(e) | TypeExpr::DequeOf(e) => {
                Value::Sequence(vec![self.fake_inner(e, building)])
            }
            TypeExpr::ArrayOf(e, size) => {
                Value::Sequence((0..*size).map(|_| self.fake_inner(e, building)).collect())
            }
            TypeExpr::SetOf(e) => Value::Set(vec![self.fake_inner(e, building)]),
            TypeExpr::MapOf(k, v) => {
                let k = self.fake_inner(k, building);
                let v = self.fake_inner(v, building);
                Value::Map(vec![(k, v)])
            }
            TypeExpr::UserDefined(path) => {
                let Some(registration) = self.get(path) else {
                    return Value::Null;
                };
                if !building.insert(path.clone()) {
                    return Value::Null;
                }
                let mut record = match registration.default_value() {
                    Value::Record(r) => r.clone(),
                    _ => Record::new(path.as_str()),
                };
                for (name, field) in registration.schema().iter() {
                    let value = self.fake_inner(field, building);
                    record.set(name, value);
                }
                building.remove(path);
                Value::Record(record)
            }
            TypeExpr::PointerTo(p) => {
                // A pointer back into a record under construction stays null.
                let target = p.element().filter(|e| match e.effective_type() {
                    Some(path) => !building.contains(path),
                    None => true,
                });
                match target {
                    Some(e) => Value::Pointer(Some(Box::new(self.fake_inner(e, building)))),
                    None => Value::Pointer(None),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::VersionHistory;
    use crate::registry::RecordDecl;
    use crate::schema::Declarations;

    fn registry() -> Registry {
        let mut r = Registry::new();
        let mut d = Declarations::new();
        d.declare_with("next", |g| {
            let node = g.user_defined("list::Node");
            g.pointer_to(node)
        });
        d.declare_with("tags", |g| {
            let s = g.native(crate::graph::Native::Str);
            g.vector_of(s)
        });
        r.register_record(
            RecordDecl::new("list::Node")
                .default_value(Value::Record(
                    Record::new("list::Node")
                        .with("value", Value::Integer(0))
                        .with("tags", Value::Sequence(Vec::new()))
                        .with("next", Value::Pointer(None)),
                ))
                .declarations(d)
                .history(VersionHistory::new().version("1.0", [])),
        )
        .unwrap();
        r
    }

    #[test]
    fn make_defaults() {
        let r = registry();
        assert_eq!(r.make(&TypeExpr::vector_of(TypeExpr::Integer8)), Value::Sequence(vec![]));
        assert_eq!(
            r.make(&TypeExpr::ArrayOf(Box::new(TypeExpr::Boolean), 2)),
            Value::Sequence(vec![Value::Bool(false), Value::Bool(false)])
        );
        let node = r.make(&TypeExpr::user_defined("list::Node"));
        assert_eq!(node.as_record().map(|n| n.kind()), Some("list::Node"));
        assert_eq!(r.make(&TypeExpr::user_defined("list::Gone")), Value::Null);
    }

    #[test]
    fn fake_stops_at_cycles() {
        let r = registry();
        let node = r.fake(&TypeExpr::user_defined("list::Node"));
        let node = node.as_record().unwrap();
        assert_eq!(node.field("value"), Some(&Value::Integer(-42)));
        assert_eq!(
            node.field("tags"),
            Some(&Value::Sequence(vec![Value::Unicode("CAFE".into())]))
        );
        assert_eq!(node.field("next"), Some(&Value::Pointer(None)));
    }
}
