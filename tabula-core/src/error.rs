use crate::EntityKind;

/// Failures of the mapping layer that callers may want to tell apart.
///
/// They travel inside [`anyhow::Error`](crate::Error), possibly wrapped in context, and can be
/// recovered with `error.downcast_ref::<CrudError>()`. Backend failures are not listed here,
/// they are reported as the underlying error with the operation attached as context.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CrudError {
    /// The dynamic type of the value is not accepted by the validator.
    #[error("Field `{field}` must be {expected}, found {found}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
    /// A range, length, word count or format rule was violated.
    #[error("Field `{field}` {rule}")]
    Constraint { field: String, rule: String },
    #[error("Field `{0}` can't be null")]
    NotNull(String),
    /// An update or delete payload is missing part of the primary key.
    #[error("Key `{0}` not present in data")]
    MissingKey(String),
    #[error("Record not found")]
    NotFound,
    #[error("Table `{0}` does not declare a primary key")]
    NoPrimaryKey(String),
    #[error("Table `{0}` has no column to update")]
    EmptyUpdate(String),
    #[error("Table `{table}` has a primary key of {expected} columns, {found} values given")]
    KeyCount {
        table: String,
        expected: usize,
        found: usize,
    },
    #[error("Entity kind {kind:?} is not implemented by the `{backend}` driver")]
    NotImplemented {
        kind: EntityKind,
        backend: &'static str,
    },
    #[error("No driver registered for backend `{0}`")]
    NoDriverRegistered(String),
    #[error("No connection attached to `{0}`")]
    Disconnected(String),
}

impl CrudError {
    pub fn type_mismatch(field: &str, expected: &'static str, found: &crate::Value) -> Self {
        CrudError::TypeMismatch {
            field: field.to_owned(),
            expected,
            found: found.kind_name(),
        }
    }

    pub fn constraint(field: &str, rule: impl Into<String>) -> Self {
        CrudError::Constraint {
            field: field.to_owned(),
            rule: rule.into(),
        }
    }
}
