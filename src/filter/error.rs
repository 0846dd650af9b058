use thiserror::Error;

/// Rejections raised while compiling a where/order/window filter. Every one
/// of these is the caller's fault and surfaces as a 400.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("Invalid table: {0}")]
    InvalidTable(String),

    #[error("Invalid column: {0}")]
    InvalidColumn(String),

    #[error("Filter {0} must be a JSON object")]
    NotAnObject(&'static str),

    #[error("Unsupported filter operator: {0}")]
    UnsupportedOperator(String),

    #[error("Invalid operand: {0}")]
    InvalidOperatorData(String),

    #[error("{0} must be non-negative, got {1}")]
    NegativeWindow(&'static str, i64),

    #[error("Filter nested deeper than {0} levels")]
    TooDeep(usize),
}
