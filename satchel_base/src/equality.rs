use crate::registry::Registry;
use crate::type_expr::TypeExpr;
use crate::value::Value;

/// Type-directed comparison of two values of type `te`.
///
/// Records compare on their schema fields only, anything outside the schema is ignored.
/// Values behind a `PointerTo` never compare equal, not even to themselves: two messages
/// are not expected to share referenced data and comparing through a back-reference could
/// run around a cycle forever.
pub fn equal_to(a: &Value, b: &Value, te: &TypeExpr, registry: &Registry) -> bool {
    match te {
        TypeExpr::ArrayOf(e, _) | TypeExpr::VectorOf(e) | TypeExpr::DequeOf(e) => {
            let (Value::Sequence(a), Value::Sequence(b)) = (a, b) else {
                return false;
            };
            a.len() == b.len() && a.iter().zip(b).all(|(i, j)| equal_to(i, j, e, registry))
        }
        TypeExpr::SetOf(_) => {
            let (Value::Set(a), Value::Set(b)) = (a, b) else {
                return false;
            };
            a.len() == b.len() && a.iter().all(|i| b.contains(i)) && b.iter().all(|j| a.contains(j))
        }
        TypeExpr::MapOf(_, v) => {
            let (Value::Map(a), Value::Map(b)) = (a, b) else {
                return false;
            };
            a.len() == b.len()
                && b.iter().all(|(k, bv)| match Value::map_get(a, k) {
                    Some(av) => equal_to(av, bv, v, registry),
                    None => false,
                })
        }
        TypeExpr::UserDefined(path) => {
            let (Some(a), Some(b)) = (a.as_record(), b.as_record()) else {
                return false;
            };
            let Some(registration) = registry.get(path) else {
                return false;
            };
            registration.schema().iter().all(|(name, field)| {
                match (a.field(name), b.field(name)) {
                    (Some(x), Some(y)) => equal_to(x, y, field, registry),
                    _ => false,
                }
            })
        }
        TypeExpr::PointerTo(_) => false,
        TypeExpr::Any => match (a, b) {
            (Value::Any(x), Value::Any(y)) => {
                x.kind() == y.kind()
                    && equal_to(
                        &Value::Record(x.as_ref().clone()),
                        &Value::Record(y.as_ref().clone()),
                        &TypeExpr::UserDefined(y.kind().to_string()),
                        registry,
                    )
            }
            _ => a == b,
        },
        _ => a == b,
    }
}

/// Compare two values without a type expression. Registered records compare on their
/// schema, everything else on plain equality.
pub fn equal_values(a: &Value, b: &Value, registry: &Registry) -> bool {
    match (a, b) {
        (Value::Record(x), Value::Record(y)) if registry.contains(y.kind()) => {
            x.kind() == y.kind()
                && equal_to(a, b, &TypeExpr::UserDefined(y.kind().to_string()), registry)
        }
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RecordDecl;
    use crate::schema::Declarations;
    use crate::value::Record;

    fn registry() -> Registry {
        let mut r = Registry::new();
        let mut d = Declarations::new();
        d.declare_fixed("lines", TypeExpr::vector_of(TypeExpr::Integer8));
        d.declare_fixed("parent", TypeExpr::pointer_to(TypeExpr::Unicode));
        r.register_record(
            RecordDecl::new("shop::Order")
                .default_value(order(vec![], "x"))
                .declarations(d),
        )
        .unwrap();
        r
    }

    fn order(lines: Vec<i64>, note: &str) -> Value {
        Value::Record(
            Record::new("shop::Order")
                .with("lines", Value::Sequence(lines.into_iter().map(Value::Integer).collect()))
                .with("note", Value::Unicode(note.to_string()))
                .with("parent", Value::Pointer(None)),
        )
    }

    #[test]
    fn reflexive_without_pointers() {
        let mut r = registry();
        let sku = Value::Record(
            Record::new("shop::Sku")
                .with("code", Value::Unicode("A1".into()))
                .with("sizes", Value::Sequence(vec![Value::Float(0.5)])),
        );
        let mut d = Declarations::new();
        d.declare_fixed("sizes", TypeExpr::vector_of(TypeExpr::Float8));
        r.register_record(RecordDecl::new("shop::Sku").default_value(sku.clone()).declarations(d))
            .unwrap();
        assert!(equal_to(&sku, &sku, &TypeExpr::user_defined("shop::Sku"), &r));
        assert!(equal_values(&sku, &sku, &r));
    }

    #[test]
    fn pointer_fields_are_never_equal() {
        let r = registry();
        let a = order(vec![1], "a");
        assert!(!equal_to(&a, &a, &TypeExpr::user_defined("shop::Order"), &r));
        let p = Value::Pointer(None);
        assert!(!equal_to(&p, &p, &TypeExpr::pointer_to(TypeExpr::Integer8), &r));
    }

    #[test]
    fn containers() {
        let r = registry();
        let set = TypeExpr::SetOf(Box::new(TypeExpr::Integer8));
        let a = Value::Set(vec![Value::Integer(1), Value::Integer(2)]);
        let b = Value::Set(vec![Value::Integer(2), Value::Integer(1)]);
        assert!(equal_to(&a, &b, &set, &r));

        let map = TypeExpr::map_of(TypeExpr::Unicode, TypeExpr::Float8);
        let m = |x: f64| Value::Map(vec![(Value::Unicode("k".into()), Value::Float(x))]);
        assert!(equal_to(&m(1.0), &m(1.0), &map, &r));
        assert!(!equal_to(&m(1.0), &m(2.0), &map, &r));

        let vec = TypeExpr::vector_of(TypeExpr::Integer8);
        let short = Value::Sequence(vec![Value::Integer(1)]);
        let long = Value::Sequence(vec![Value::Integer(1), Value::Integer(1)]);
        assert!(!equal_to(&short, &long, &vec, &r));
    }

    #[test]
    fn records_ignore_fields_outside_schema() {
        let mut r = Registry::new();
        r.register_record(
            RecordDecl::new("shop::Sku").default_value(Value::Record(
                Record::new("shop::Sku").with("code", Value::Unicode(String::new())),
            )),
        )
        .unwrap();
        let a = Value::Record(
            Record::new("shop::Sku")
                .with("code", Value::Unicode("A".into()))
                .with("cached", Value::Integer(1)),
        );
        let b = Value::Record(Record::new("shop::Sku").with("code", Value::Unicode("A".into())));
        assert!(equal_values(&a, &b, &r));
        let c = Value::Record(Record::new("shop::Sku"));
        assert!(!equal_values(&a, &c, &r));
        assert!(equal_values(&Value::Integer(3), &Value::Integer(3), &r));
    }
}
