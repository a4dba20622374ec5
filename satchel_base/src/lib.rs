pub mod date_time;
pub mod equality;
pub mod error;
pub mod graph;
pub mod history;
mod make;
pub mod portable;
pub mod registry;
pub mod schema;
pub mod type_expr;
pub mod value;
pub mod version;

pub use equality::{equal_to, equal_values};
pub use error::{HistoryError, RegistrationError, TypeTrack, ValueError, VersionError};
pub use graph::{fix, Native, NodeId, RawType, TypeGraph};
pub use history::{compile_history, Edit, VersionEntry, VersionHistory, VersionSlice};
pub use portable::Portable;
pub use registry::{MessageOptions, RecordDecl, Registration, Registry};
pub use schema::{compile_schema, infer_type, Declarations, Schema};
pub use type_expr::{Enumeration, Kind, Pointer, TypeExpr};
pub use value::{Record, Value};
pub use version::{version_scenario, Scenario, VersionTag, INITIAL_VERSION};

/// A record kind: a struct with a default instance, a portable identity and optionally an
/// edit line. Usually implemented with `#[derive(Message)]`.
pub trait Message: Portable + Default {
    /// Type name, without the module.
    const NAME: &'static str;
    /// Module the type is declared in.
    const MODULE: &'static str;
    /// Portable identity, `module::Name`.
    const PATH: &'static str;

    /// Declare the type of every field that cannot be inferred from the default instance.
    fn explicit(_declarations: &mut Declarations) {}

    fn version_history() -> Option<VersionHistory> {
        None
    }

    fn options() -> MessageOptions {
        MessageOptions::default()
    }

    fn type_expr() -> TypeExpr {
        TypeExpr::UserDefined(Self::PATH.to_string())
    }
}
