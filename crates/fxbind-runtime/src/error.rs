//! Errors raised while creating a closure-property binding.
//!
//! Every variant surfaces at bind time, from
//! [`ClosureProperty::set_expression`](crate::reactive::ClosureProperty::set_expression).
//! A failed bind never leaves a partially attached dependency tree behind.

use fxbind_core::EvalError;

/// Errors from binding an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    /// The expression reads a property on the return value of a method call.
    Unbindable { property: String },
    /// No resolution strategy produced a property for a recorded name.
    Resolution { name: String, target: String },
    /// The substitute evaluation scope could not be constructed.
    Construction { kind: String, message: String },
}

impl BindError {
    /// Wrap a scope-construction failure.
    #[must_use]
    pub fn construction(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Construction {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for BindError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unbindable { property } => write!(
                f,
                "cannot bind to property '{property}' on the return value of a method call"
            ),
            Self::Resolution { name, target } => {
                write!(f, "no observable property or attribute '{name}' on {target}")
            }
            Self::Construction { kind, message } => write!(
                f,
                "a closure expression binding could not be created because of {kind}:\n\t{message}"
            ),
        }
    }
}

impl std::error::Error for BindError {}

impl From<EvalError> for BindError {
    /// `Unbindable` maps one to one. Any other evaluation failure reaching a
    /// bind operation is a construction failure carrying the original kind
    /// and message.
    fn from(err: EvalError) -> Self {
        match err {
            EvalError::Unbindable { property } => Self::Unbindable { property },
            other => Self::construction(other.kind(), other.to_string()),
        }
    }
}
