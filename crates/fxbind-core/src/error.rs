//! Errors raised while evaluating an expression against host objects.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Variant |
//! |---------|-------|---------|
//! | Bind through a call result | `a.call().b` while recording dependencies | `Unbindable` |
//! | Unknown member | Name not exposed by any resolution strategy | `NoSuchProperty` |
//! | Read-only member | Owner-side `set` on a property the owner only exposes | `ReadOnly` |
//! | Unknown method | `invoke` on an object without that method | `NoSuchMethod` |
//! | Null dereference | Member access on `Value::Null` | `NullTarget` |
//! | Wrong type | Scalar conversion of an incompatible value | `TypeMismatch` |
//! | Unbound name | Scope lookup with no capture and no context | `UnknownVariable` |
//! | Host failure | Error raised by host code (methods, expression body) | `Failed` |

/// Errors from expression evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// A property was accessed on the return value of a method call while
    /// dependencies were being recorded.
    Unbindable { property: String },
    /// The target does not expose a member with this name.
    NoSuchProperty { target: String, name: String },
    /// The member exists but its owner holds no settable handle to it.
    ReadOnly { target: String, name: String },
    /// The target does not expose a method with this name.
    NoSuchMethod { target: String, name: String },
    /// A member was accessed on `Null`.
    NullTarget { name: String },
    /// A value could not be converted to the requested type.
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    /// A scope lookup found neither a capture nor a context member.
    UnknownVariable(String),
    /// Free-form failure reported by host code.
    Failed(String),
}

impl EvalError {
    /// Create a free-form failure.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Short, stable name of the variant (used in logs and wrapped errors).
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Unbindable { .. } => "Unbindable",
            Self::NoSuchProperty { .. } => "NoSuchProperty",
            Self::ReadOnly { .. } => "ReadOnly",
            Self::NoSuchMethod { .. } => "NoSuchMethod",
            Self::NullTarget { .. } => "NullTarget",
            Self::TypeMismatch { .. } => "TypeMismatch",
            Self::UnknownVariable(_) => "UnknownVariable",
            Self::Failed(_) => "Failed",
        }
    }

    /// Whether this error aborts dependency discovery.
    #[must_use]
    pub const fn is_unbindable(&self) -> bool {
        matches!(self, Self::Unbindable { .. })
    }
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unbindable { property } => write!(
                f,
                "cannot bind to property '{property}' on the return value of a method call"
            ),
            Self::NoSuchProperty { target, name } => {
                write!(f, "no property '{name}' on {target}")
            }
            Self::ReadOnly { target, name } => write!(
                f,
                "property '{name}' on {target} is not settable through its owner"
            ),
            Self::NoSuchMethod { target, name } => write!(f, "no method '{name}' on {target}"),
            Self::NullTarget { name } => write!(f, "cannot read '{name}' on null"),
            Self::TypeMismatch { expected, found } => {
                write!(f, "type mismatch: expected {expected}, found {found}")
            }
            Self::UnknownVariable(name) => write!(f, "unknown variable '{name}'"),
            Self::Failed(msg) => write!(f, "evaluation failed: {msg}"),
        }
    }
}

impl std::error::Error for EvalError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_member() {
        let err = EvalError::NoSuchProperty {
            target: "Point".into(),
            name: "z".into(),
        };
        assert_eq!(err.to_string(), "no property 'z' on Point");
    }

    #[test]
    fn unbindable_is_flagged() {
        let err = EvalError::Unbindable {
            property: "name".into(),
        };
        assert!(err.is_unbindable());
        assert_eq!(err.kind(), "Unbindable");
        assert!(!EvalError::failed("boom").is_unbindable());
    }
}
