use crate::error::RegistrationError;
use crate::graph::{fix, NodeId, TypeGraph};
use crate::type_expr::TypeExpr;
use crate::value::Value;

/// Ordered `name -> TypeExpr` mapping of one record kind.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Schema {
    fields: Vec<(String, TypeExpr)>,
}

impl Schema {
    pub fn new() -> Self {
        Schema { fields: Vec::new() }
    }

    pub fn get(&self, name: &str) -> Option<&TypeExpr> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TypeExpr)> {
        self.fields.iter().map(|(n, t)| (n.as_str(), t))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Keys are unique, a second insert of the same name replaces the expression in place.
    fn insert(&mut self, name: &str, te: TypeExpr) {
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some((_, t)) => *t = te,
            None => self.fields.push((name.to_string(), te)),
        }
    }
}

/// Explicit per-field type information that overrides inference from the default instance.
#[derive(Clone, Debug, Default)]
pub struct Declarations {
    graph: TypeGraph,
    entries: Vec<(String, NodeId)>,
}

impl Declarations {
    pub fn new() -> Self {
        Declarations::default()
    }

    pub fn graph(&mut self) -> &mut TypeGraph {
        &mut self.graph
    }

    pub fn declare(&mut self, name: impl Into<String>, node: NodeId) {
        let name = name.into();
        self.entries.retain(|(n, _)| *n != name);
        self.entries.push((name, node));
    }

    pub fn declare_with(&mut self, name: impl Into<String>, f: impl FnOnce(&mut TypeGraph) -> NodeId) {
        let node = f(&mut self.graph);
        self.declare(name, node);
    }

    pub fn declare_fixed(&mut self, name: impl Into<String>, te: TypeExpr) {
        let node = self.graph.fixed(te);
        self.declare(name, node);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve every declaration, failing on the first one that cannot be fixed.
    fn fix_all(
        &self,
        record: &str,
        is_record: &dyn Fn(&str) -> bool,
    ) -> Result<Vec<(String, TypeExpr)>, RegistrationError> {
        let mut fixed = Vec::with_capacity(self.entries.len());
        for (name, node) in &self.entries {
            let te = fix(&self.graph, *node, is_record).map_err(|e| {
                let track = e.correct_track();
                let at = if track.is_empty() {
                    format!("{record}.{name}")
                } else {
                    format!("{record}.{name} ({track})")
                };
                RegistrationError::rejected(at, e.reason)
            })?;
            fixed.push((name.clone(), te));
        }
        Ok(fixed)
    }
}

/// Closed value -> leaf table used when a field has no explicit declaration.
pub fn infer_type(value: &Value, is_record: &dyn Fn(&str) -> bool) -> Option<TypeExpr> {
    let te = match value {
        Value::Bool(_) => TypeExpr::Boolean,
        Value::Integer(_) => TypeExpr::Integer8,
        Value::Unsigned(_) => TypeExpr::Unsigned8,
        Value::Float(_) => TypeExpr::Float8,
        Value::Block(_) => TypeExpr::Block,
        Value::String(_) => TypeExpr::String,
        Value::Unicode(_) => TypeExpr::Unicode,
        Value::WorldTime(_) => TypeExpr::WorldTime,
        Value::TimeDelta(_) => TypeExpr::TimeDelta,
        Value::Uuid(_) => TypeExpr::Uuid,
        Value::Record(r) if is_record(r.kind()) => TypeExpr::UserDefined(r.kind().to_string()),
        _ => return None,
    };
    Some(te)
}

/// Derive the on-wire shape of record `name` from its default instance.
///
/// Every field of the instance, in declaration order, takes its explicit declaration when
/// there is one and is otherwise inferred from its runtime value.
pub fn compile_schema(
    name: &str,
    default: Option<&Value>,
    explicit: &Declarations,
    is_record: &dyn Fn(&str) -> bool,
) -> Result<Schema, RegistrationError> {
    let explicit = explicit.fix_all(name, is_record)?;

    let Some(default) = default else {
        return Err(RegistrationError::rejected(name, "not default constructable"));
    };
    let Some(instance) = default.as_record() else {
        return Err(RegistrationError::rejected(
            name,
            format!("default instance is a {}, not a record", default.describe()),
        ));
    };

    let mut schema = Schema::new();
    for (field, value) in instance.fields() {
        let te = match explicit.iter().find(|(n, _)| n == field) {
            Some((_, te)) => te.clone(),
            None => match infer_type(value, is_record) {
                Some(te) => te,
                None => {
                    return Err(RegistrationError::rejected(
                        format!("{name}.{field}"),
                        "not enough type information provided/discoverable",
                    ))
                }
            },
        };
        schema.insert(field, te);
    }
    log::trace!("compiled schema of {name}: {} field(s)", schema.len());
    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_expr::Kind;
    use crate::value::Record;

    fn known(path: &str) -> bool {
        path == "shop::Sku" || path == "shop::Order"
    }

    fn order() -> Value {
        Value::Record(
            Record::new("shop::Order")
                .with("id", Value::Integer(0))
                .with("note", Value::Unicode(String::new()))
                .with("items", Value::Sequence(Vec::new()))
                .with("first", Value::Record(Record::new("shop::Sku"))),
        )
    }

    #[test]
    fn inferred_and_explicit() {
        let mut explicit = Declarations::new();
        explicit.declare_with("items", |g| {
            let sku = g.user_defined("shop::Sku");
            g.vector_of(sku)
        });
        explicit.declare_with("id", |g| g.class(Kind::Integer4));

        let schema = compile_schema("Order", Some(&order()), &explicit, &known).unwrap();
        let keys: Vec<&str> = schema.keys().collect();
        assert_eq!(keys, ["id", "note", "items", "first"]);
        assert_eq!(schema.get("id"), Some(&TypeExpr::Integer4));
        assert_eq!(schema.get("note"), Some(&TypeExpr::Unicode));
        assert_eq!(
            schema.get("items"),
            Some(&TypeExpr::vector_of(TypeExpr::user_defined("shop::Sku")))
        );
        assert_eq!(schema.get("first"), Some(&TypeExpr::user_defined("shop::Sku")));
    }

    #[test]
    fn container_needs_declaration() {
        let e = compile_schema("Order", Some(&order()), &Declarations::new(), &known).unwrap_err();
        assert_eq!(
            e.to_string(),
            "cannot register \"Order.items\" (not enough type information provided/discoverable)"
        );
    }

    #[test]
    fn bad_declaration_reports_track() {
        let mut explicit = Declarations::new();
        explicit.declare_with("items", |g| {
            let sku = g.user_defined("shop::Unknown");
            g.vector_of(sku)
        });
        let e = compile_schema("Order", Some(&order()), &explicit, &known).unwrap_err();
        let RegistrationError::Rejected { name, reason } = e else {
            panic!("not a rejection");
        };
        assert_eq!(name, "Order.items (VectorOf.UserDefined)");
        assert!(reason.contains("shop::Unknown"));
    }

    #[test]
    fn needs_default_instance() {
        let e = compile_schema("Order", None, &Declarations::new(), &known).unwrap_err();
        assert!(e.to_string().contains("not default constructable"));
        let e = compile_schema("Order", Some(&Value::Integer(1)), &Declarations::new(), &known)
            .unwrap_err();
        assert!(e.to_string().contains("not a record"));
    }

    #[test]
    fn unregistered_nested_record_is_not_inferred() {
        let v = Value::Record(Record::new("x::Y"));
        assert_eq!(infer_type(&v, &known), None);
        assert_eq!(infer_type(&Value::Float(1.0), &known), Some(TypeExpr::Float8));
        assert_eq!(infer_type(&Value::Null, &known), None);
    }
}
