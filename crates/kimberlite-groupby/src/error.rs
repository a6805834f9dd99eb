//! Error types for group-by evaluation.

use thiserror::Error;

/// Group-by evaluation errors.
///
/// The first three variants are usage errors in the query itself and carry
/// the name the query author needs to fix it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GroupByError {
    /// `count` inside a group-by targeted something other than `uid`.
    #[error("only the uid predicate is allowed in count within groupby, got count({attr})")]
    CountOnNonUid { attr: String },

    /// A variable was assigned from a grouping with more or fewer than one key.
    #[error("variable {var} in groupby expects exactly one grouping key, got {found}")]
    VarRequiresSingleKey { var: String, found: usize },

    /// A variable was assigned from a grouping whose key is not a uid.
    #[error("variable {var} can only be assigned when grouped by a uid attribute, {attr} is not")]
    VarRequiresUidKey { var: String, attr: String },

    /// A value had the wrong type for the requested operation.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// A value has no canonical string form.
    #[error("cannot marshal {type_name} value: {reason}")]
    Marshal {
        type_name: &'static str,
        reason: String,
    },

    /// Integer arithmetic in a reducer overflowed.
    #[error("arithmetic overflow in {0}")]
    ArithmeticOverflow(String),

    /// A single grouping produced more groups than allowed.
    #[error("groupby produced more than {limit} groups")]
    TooManyGroups { limit: usize },

    /// A node requested more aggregate fields than allowed.
    #[error("too many aggregates in groupby ({requested} > {limit})")]
    TooManyAggregates { requested: usize, limit: usize },
}

impl GroupByError {
    /// Returns true for errors caused by the shape of the query rather
    /// than by the data it ran over.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            GroupByError::CountOnNonUid { .. }
                | GroupByError::VarRequiresSingleKey { .. }
                | GroupByError::VarRequiresUidKey { .. }
        )
    }
}

/// Result type for group-by operations.
pub type Result<T> = std::result::Result<T, GroupByError>;
