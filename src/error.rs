use thiserror::Error;

/// Errors produced by the attendance engine.
///
/// Malformed rows are not an error value: the normalizer drops them and
/// reports the drops as data alongside the surviving records.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A required column role is absent from the source table.
    #[error("required {role} column not found (expected header {expected:?})")]
    MissingColumn {
        role: &'static str,
        expected: String,
    },

    /// No records survived filtering; callers render an empty state.
    #[error("no attendance records after filtering")]
    EmptyInput,
}

pub type Result<T> = std::result::Result<T, EngineError>;
