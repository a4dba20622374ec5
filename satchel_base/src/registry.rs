use crate::error::RegistrationError;
use crate::history::{compile_history, VersionHistory, VersionSlice};
use crate::schema::{compile_schema, Declarations, Schema};
use crate::type_expr::TypeExpr;
use crate::value::Value;
use crate::version::{VersionTag, INITIAL_VERSION};
use crate::Message;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Runtime controls of a record kind. Only `not_portable` changes what is compiled, the other
/// flags are carried for the message layer that sends records around.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MessageOptions {
    /// Log every time a record of this kind is sent.
    pub message_trail: bool,
    /// Log every time a record of this kind is received.
    pub execution_trace: bool,
    pub copy_before_sending: bool,
    /// Never serialized (file handles, sockets). No schema is compiled.
    pub not_portable: bool,
}

impl Default for MessageOptions {
    fn default() -> Self {
        MessageOptions {
            message_trail: true,
            execution_trace: true,
            copy_before_sending: true,
            not_portable: false,
        }
    }
}

/// Everything known about a registered record kind.
#[derive(Debug)]
pub struct Registration {
    name: String,
    module: String,
    path: String,
    schema: Schema,
    default: Value,
    version_history: Option<VersionHistory>,
    version_slice: Option<VersionSlice>,
    options: MessageOptions,
}

impl Registration {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    /// Portable identity, `module::Name`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Value of a freshly constructed instance.
    pub fn default_value(&self) -> &Value {
        &self.default
    }

    pub fn version_history(&self) -> Option<&VersionHistory> {
        self.version_history.as_ref()
    }

    pub fn version_slice(&self) -> Option<&VersionSlice> {
        self.version_slice.as_ref()
    }

    pub fn options(&self) -> MessageOptions {
        self.options
    }

    /// Oldest and latest released versions.
    pub fn history_range(&self) -> Option<(VersionTag, VersionTag)> {
        let slice = self.version_slice.as_ref()?;
        let (oldest, _) = slice.first_key_value()?;
        let (latest, _) = slice.last_key_value()?;
        Some((*oldest, *latest))
    }

    pub fn current_version(&self) -> Option<VersionTag> {
        self.history_range().map(|(_, latest)| latest)
    }

    /// Field names visible at `tag`, `None` for tags that were never released.
    pub fn slice(&self, tag: &VersionTag) -> Option<&BTreeSet<String>> {
        self.version_slice.as_ref()?.get(tag)
    }
}

/// Description of a record kind for [`Registry::register_record`], for kinds that are not
/// backed by a Rust type deriving [`Message`].
#[derive(Clone, Debug)]
pub struct RecordDecl {
    path: String,
    default: Option<Value>,
    declarations: Declarations,
    history: Option<VersionHistory>,
    options: MessageOptions,
}

impl RecordDecl {
    pub fn new(path: impl Into<String>) -> Self {
        RecordDecl {
            path: path.into(),
            default: None,
            declarations: Declarations::new(),
            history: None,
            options: MessageOptions::default(),
        }
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn declarations(mut self, declarations: Declarations) -> Self {
        self.declarations = declarations;
        self
    }

    pub fn declare_fixed(mut self, name: impl Into<String>, te: TypeExpr) -> Self {
        self.declarations.declare_fixed(name, te);
        self
    }

    pub fn history(mut self, history: VersionHistory) -> Self {
        self.history = Some(history);
        self
    }

    pub fn options(mut self, options: MessageOptions) -> Self {
        self.options = options;
        self
    }
}

/// Registration table of record kinds.
///
/// Filled once at startup through `&mut self`, then shared read-only (usually behind an
/// `Arc`). [`Registry::replace_history`] is the only mutation after that and needs the
/// caller to hold the only handle.
#[derive(Debug, Default)]
pub struct Registry {
    records: HashMap<String, Arc<Registration>>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// Compile and register the record kind `M`. Records referenced by `M` must be registered
    /// first, `M` itself counts as known so it can point back at itself.
    pub fn register<M: Message>(&mut self) -> Result<Arc<Registration>, RegistrationError> {
        let mut declarations = Declarations::new();
        M::explicit(&mut declarations);
        let mut decl = RecordDecl::new(M::PATH)
            .default_value(M::default().to_value())
            .declarations(declarations)
            .options(M::options());
        if let Some(history) = M::version_history() {
            decl = decl.history(history);
        }
        self.register_record(decl)
    }

    pub fn register_record(
        &mut self,
        decl: RecordDecl,
    ) -> Result<Arc<Registration>, RegistrationError> {
        let path = decl.path;
        if self.records.contains_key(&path) {
            return Err(RegistrationError::rejected(path, "already registered"));
        }
        let (module, name) = match path.rsplit_once("::") {
            Some((module, name)) => (module.to_string(), name.to_string()),
            None => (String::new(), path.clone()),
        };
        if name.is_empty() {
            return Err(RegistrationError::rejected(path, "not a portable path"));
        }

        let (schema, version_slice) = if decl.options.not_portable {
            (Schema::new(), None)
        } else {
            let is_record = |p: &str| p == path || self.records.contains_key(p);
            let schema = compile_schema(&name, decl.default.as_ref(), &decl.declarations, &is_record)?;
            let slice = compile_history(decl.history.as_ref(), &schema, &name)?;
            (schema, slice)
        };
        log::trace!(
            "registered {path}: {} field(s), {} version(s)",
            schema.len(),
            version_slice.as_ref().map_or(0, |s| s.len())
        );

        let registration = Arc::new(Registration {
            name,
            module,
            path: path.clone(),
            schema,
            default: decl.default.unwrap_or(Value::Null),
            version_history: decl.history,
            version_slice,
            options: decl.options,
        });
        self.records.insert(path, registration.clone());
        Ok(registration)
    }

    pub fn get(&self, path: &str) -> Option<&Arc<Registration>> {
        self.records.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.records.contains_key(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(|k| k.as_str())
    }

    pub fn history_range(&self, path: &str) -> Option<(VersionTag, VersionTag)> {
        self.get(path)?.history_range()
    }

    pub fn current_version(&self, path: &str) -> Option<VersionTag> {
        self.get(path)?.current_version()
    }

    pub fn slice(&self, path: &str, tag: &VersionTag) -> Option<&BTreeSet<String>> {
        self.get(path)?.slice(tag)
    }

    /// Registration of the record kind `te` ultimately carries.
    pub fn effective_type(&self, te: &TypeExpr) -> Option<&Arc<Registration>> {
        self.get(te.effective_type()?)
    }

    /// Current version of a `UserDefined` expression. A history that only ever held
    /// [`INITIAL_VERSION`] does not count as versioned.
    pub fn type_version(&self, te: &TypeExpr) -> Option<VersionTag> {
        let TypeExpr::UserDefined(path) = te else {
            return None;
        };
        let (oldest, latest) = self.history_range(path)?;
        if oldest == INITIAL_VERSION && latest == INITIAL_VERSION {
            return None;
        }
        Some(latest)
    }

    /// Swap the edit line of a registered record and recompute its slices, returning the
    /// previous line. Fails without changes when the new line does not compile.
    pub fn replace_history(
        &mut self,
        path: &str,
        history: Option<VersionHistory>,
    ) -> Result<Option<VersionHistory>, RegistrationError> {
        let Some(current) = self.records.get(path) else {
            return Err(RegistrationError::rejected(path, "not a registered record"));
        };
        let version_slice = if current.options.not_portable {
            None
        } else {
            compile_history(history.as_ref(), &current.schema, &current.name)?
        };
        let replaced = Registration {
            name: current.name.clone(),
            module: current.module.clone(),
            path: current.path.clone(),
            schema: current.schema.clone(),
            default: current.default.clone(),
            version_history: history,
            version_slice,
            options: current.options,
        };
        log::debug!("replaced version history of {path}");
        let previous = self.records.insert(path.to_string(), Arc::new(replaced));
        Ok(previous.and_then(|p| p.version_history.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Edit;
    use crate::value::Record;

    fn sku() -> RecordDecl {
        RecordDecl::new("shop::Sku").default_value(Value::Record(
            Record::new("shop::Sku")
                .with("code", Value::Unicode(String::new()))
                .with("count", Value::Integer(0)),
        ))
    }

    #[test]
    fn register_and_lookup() {
        let mut r = Registry::new();
        let h = VersionHistory::new()
            .version("1.0", [])
            .version("1.1", [Edit::added("count")]);
        let reg = r.register_record(sku().history(h)).unwrap();
        assert_eq!(reg.name(), "Sku");
        assert_eq!(reg.module(), "shop");
        assert_eq!(reg.schema().len(), 2);
        assert_eq!(
            r.history_range("shop::Sku"),
            Some((VersionTag::new(1, 0), VersionTag::new(1, 1)))
        );
        assert_eq!(
            r.type_version(&TypeExpr::user_defined("shop::Sku")),
            Some(VersionTag::new(1, 1))
        );
        let at = r.slice("shop::Sku", &VersionTag::new(1, 0)).unwrap();
        assert!(at.contains("code") && !at.contains("count"));
    }

    #[test]
    fn duplicates_are_rejected() {
        let mut r = Registry::new();
        r.register_record(sku()).unwrap();
        let e = r.register_record(sku()).unwrap_err();
        assert!(e.to_string().contains("already registered"));
    }

    #[test]
    fn bad_history_fails_fast() {
        let mut r = Registry::new();
        let h = VersionHistory::new()
            .version("1.0", [Edit::added("code")])
            .version("1.1", [Edit::added("code")]);
        let e = r.register_record(sku().history(h)).unwrap_err();
        assert!(matches!(e, RegistrationError::History(_)));
        assert!(!r.contains("shop::Sku"));
    }

    #[test]
    fn initial_version_is_unversioned() {
        let mut r = Registry::new();
        r.register_record(sku().history(VersionHistory::new().version("0.0", [])))
            .unwrap();
        assert_eq!(r.type_version(&TypeExpr::user_defined("shop::Sku")), None);
        assert_eq!(r.type_version(&TypeExpr::Integer8), None);
    }

    #[test]
    fn not_portable_skips_compilation() {
        let mut r = Registry::new();
        let decl = RecordDecl::new("io::Handle")
            .default_value(Value::Record(Record::new("io::Handle").with("fd", Value::Null)))
            .options(MessageOptions {
                not_portable: true,
                ..MessageOptions::default()
            });
        let reg = r.register_record(decl).unwrap();
        assert!(reg.schema().is_empty());
    }

    #[test]
    fn replace_history_recomputes_slice() {
        let mut r = Registry::new();
        r.register_record(sku()).unwrap();
        assert_eq!(r.current_version("shop::Sku"), None);

        let h = VersionHistory::new().version("2.0", []);
        let previous = r.replace_history("shop::Sku", Some(h.clone())).unwrap();
        assert_eq!(previous, None);
        assert_eq!(r.current_version("shop::Sku"), Some(VersionTag::new(2, 0)));

        let bad = VersionHistory::new().version("2.1", [Edit::deleted("gone")]);
        assert!(r.replace_history("shop::Sku", Some(bad)).is_err());
        assert_eq!(r.current_version("shop::Sku"), Some(VersionTag::new(2, 0)));

        assert_eq!(r.replace_history("shop::Sku", None).unwrap(), Some(h));
        assert!(r.replace_history("shop::Nope", None).is_err());
    }

    #[test]
    fn self_reference_through_pointer() {
        let mut r = Registry::new();
        let mut d = Declarations::new();
        d.declare_with("next", |g| {
            let node = g.user_defined("list::Node");
            g.pointer_to(node)
        });
        let decl = RecordDecl::new("list::Node")
            .default_value(Value::Record(
                Record::new("list::Node")
                    .with("value", Value::Integer(0))
                    .with("next", Value::Pointer(None)),
            ))
            .declarations(d);
        let reg = r.register_record(decl).unwrap();
        assert_eq!(
            reg.schema().get("next").map(|t| t.to_string()),
            Some("PointerTo(UserDefined(list::Node))".to_string())
        );
    }
}
