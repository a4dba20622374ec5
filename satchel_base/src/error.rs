use thiserror::Error;

/// Failure while resolving a raw type node into a [`TypeExpr`](crate::TypeExpr).
///
/// The path grows innermost-first as the error unwinds through containers,
/// [`TypeTrack::correct_track`] renders it outermost-first.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason} (at {})", self.correct_track())]
pub struct TypeTrack {
    pub path: Vec<String>,
    pub reason: String,
}

impl TypeTrack {
    pub fn new(name: Option<&str>, reason: impl Into<String>) -> Self {
        TypeTrack {
            path: name.map(|n| vec![n.to_string()]).unwrap_or_default(),
            reason: reason.into(),
        }
    }

    pub fn push(mut self, name: impl Into<String>) -> Self {
        self.path.push(name.into());
        self
    }

    pub fn correct_track(&self) -> String {
        let parts: Vec<&str> = self.path.iter().rev().map(|s| s.as_str()).collect();
        parts.join(".")
    }
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("cannot register \"{name}\" ({reason})")]
    Rejected { name: String, reason: String },

    #[error(transparent)]
    History(#[from] HistoryError),
}

impl RegistrationError {
    pub fn rejected(name: impl Into<String>, reason: impl Into<String>) -> Self {
        RegistrationError::Rejected {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Edit line of a record that cannot be compiled into version slices.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("version tag \"{tag}\" of \"{record}\" is not usable: {source}")]
    BadTag {
        record: String,
        tag: String,
        source: VersionError,
    },

    #[error("version \"{tag}\" of \"{record}\" does not follow \"{previous}\"")]
    OutOfOrder {
        record: String,
        previous: String,
        tag: String,
    },

    #[error("moving \"{name}\" of \"{record}\" to the same name")]
    SelfMove { record: String, name: String },

    #[error("addition(s) to \"{record}\" ({names}) at version \"{tag}\" not reflected in schema")]
    AddNotInSchema {
        record: String,
        names: String,
        tag: String,
    },

    #[error("deletion(s) from \"{record}\" ({names}) at version \"{tag}\" still expected in schema")]
    DeleteNotInSchema {
        record: String,
        names: String,
        tag: String,
    },

    #[error("duplicate add to \"{record}\" ({names}) at version \"{tag}\"")]
    DuplicateAdd {
        record: String,
        names: String,
        tag: String,
    },

    #[error("cannot delete-add to \"{record}\" ({names}) at version \"{tag}\"")]
    DeleteAdd {
        record: String,
        names: String,
        tag: String,
    },

    #[error("duplicate delete from \"{record}\" ({names}) at version \"{tag}\"")]
    DuplicateDelete {
        record: String,
        names: String,
        tag: String,
    },

    #[error("strange add-delete to \"{record}\" ({names}) at version \"{tag}\"")]
    AddDelete {
        record: String,
        names: String,
        tag: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("cannot access major/minor numbers in \"{}\"", .0)]
    Missing(String),

    #[error("non-integer version tag \"{}\"", .0)]
    NotNumeric(String),
}

/// A runtime [`Value`](crate::Value) does not have the shape a Rust type expects.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueError {
    #[error("expected {expected}, found {found}")]
    Mismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("{} does not fit into {}", .0, .1)]
    OutOfRange(String, &'static str),

    #[error("expected record \"{expected}\", found \"{found}\"")]
    WrongRecord { expected: String, found: String },

    #[error("expected {expected} elements, found {found}")]
    Length { expected: usize, found: usize },

    #[error("{field}: {source}")]
    Field {
        field: String,
        source: Box<ValueError>,
    },
}

impl ValueError {
    pub fn within(self, field: impl Into<String>) -> Self {
        ValueError::Field {
            field: field.into(),
            source: Box::new(self),
        }
    }
}
