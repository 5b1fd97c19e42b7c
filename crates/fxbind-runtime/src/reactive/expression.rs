#![forbid(unsafe_code)]

//! Re-evaluable expressions with a substitutable evaluation scope.
//!
//! # Design
//!
//! An [`Expression`] is a body `Fn(&Scope) -> Result<Value, EvalError>` plus
//! the data it reads: an optional *context* object (names resolved from the
//! enclosing object) and named *captures* (values captured from an enclosing
//! scope). The body never touches either directly. It reaches them through
//! the [`Scope`] it is handed, and walks member paths with [`Slot`]:
//!
//! ```ignore
//! let sum = Expression::builder()
//!     .capture("point", point.clone())
//!     .build(|cx| {
//!         let point = cx.get("point")?;
//!         Ok(Value::Int(point.get("x")?.as_int()? + point.get("y")?.as_int()?))
//!     });
//! ```
//!
//! The same body therefore runs in two modes:
//!
//! - **live**: `Scope` answers from the real captures and context;
//! - **recording**: `Scope` answers every name with a recorder slot, so the
//!   pass only traces which member paths the body touches. Method calls
//!   return the terminal marker and never execute. Scalar conversions of a
//!   recorded slot yield neutral values (`0`, `0.0`, `false`, `""`) so the
//!   body keeps walking.
//!
//! The expression itself is never modified by a recording pass.

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use fxbind_core::{EvalError, HostObject, ObjectRef, PropertyRef, Value, read_member};
use tracing::trace;

use super::recorder::{DependencyNode, RecorderNode, Recording};
use crate::error::BindError;

type Body = dyn Fn(&Scope<'_>) -> Result<Value, EvalError>;

/// A re-evaluable computation producing one [`Value`].
///
/// Cloning is cheap and shares the body, context, and captures.
#[derive(Clone)]
pub struct Expression {
    body: Rc<Body>,
    context: Option<Value>,
    captures: Rc<[(String, Value)]>,
    label: Option<Rc<str>>,
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expression")
            .field("label", &self.label)
            .field("context", &self.context.as_ref().map(Value::describe))
            .field(
                "captures",
                &self.captures.iter().map(|(n, _)| n).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Expression {
    /// An expression with no context and no captures.
    pub fn new(body: impl Fn(&Scope<'_>) -> Result<Value, EvalError> + 'static) -> Self {
        Self::builder().build(body)
    }

    #[must_use]
    pub fn builder() -> ExpressionBuilder {
        ExpressionBuilder::default()
    }

    /// Evaluate against the real context and captures.
    pub fn evaluate(&self) -> Result<Value, EvalError> {
        (self.body)(&Scope {
            mode: Mode::Live(self),
        })
    }

    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    #[must_use]
    pub fn context(&self) -> Option<&Value> {
        self.context.as_ref()
    }

    /// Names of the captured values, in declaration order.
    pub fn capture_names(&self) -> impl Iterator<Item = &str> {
        self.captures.iter().map(|(name, _)| name.as_str())
    }

    fn capture(&self, name: &str) -> Option<&Value> {
        self.captures
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    fn validate(&self) -> Result<(), BindError> {
        for (index, (name, _)) in self.captures.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(BindError::construction(
                    "EmptyCaptureName",
                    format!("capture #{index} has an empty name"),
                ));
            }
            if self.captures[..index].iter().any(|(n, _)| n == name) {
                return Err(BindError::construction(
                    "DuplicateCapture",
                    format!("capture '{name}' is declared more than once"),
                ));
            }
        }
        match &self.context {
            None | Some(Value::Object(_) | Value::Property(_)) => Ok(()),
            Some(other) => Err(BindError::construction(
                "InvalidContext",
                format!("context must be an object, found {}", other.type_name()),
            )),
        }
    }

    /// Run the body once in recording mode and return the touched paths.
    ///
    /// The body sees neutral stand-ins, so it may fail or even panic (an
    /// integer division by a recorded `0`, say). Both are swallowed and the
    /// accesses recorded up to that point are kept. A panic is only caught
    /// when the build unwinds; under `panic = "abort"` it aborts.
    pub fn discover(&self) -> Result<Vec<DependencyNode>, BindError> {
        self.validate()?;
        let recording = Recording::new();
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            (self.body)(&Scope {
                mode: Mode::Recording(&recording),
            })
        }));
        if let Some(property) = recording.dead_end() {
            return Err(BindError::Unbindable { property });
        }
        match outcome {
            Ok(Ok(_)) => {}
            Ok(Err(EvalError::Unbindable { property })) => {
                return Err(BindError::Unbindable { property });
            }
            Ok(Err(err)) => trace!(
                error = %err,
                kind = err.kind(),
                "discovery pass stopped early; keeping recorded accesses"
            ),
            Err(payload) => trace!(
                panic = %panic_message(payload.as_ref()),
                "discovery pass panicked; keeping recorded accesses"
            ),
        }
        Ok(recording.into_dependencies())
    }

    /// Root object that recorded top-level names resolve against.
    pub(crate) fn scope_object(&self) -> ObjectRef {
        Rc::new(ExpressionScope {
            captures: Rc::clone(&self.captures),
            context: self.context.clone(),
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Builder for [`Expression`].
#[derive(Default)]
pub struct ExpressionBuilder {
    context: Option<Value>,
    captures: Vec<(String, Value)>,
    label: Option<String>,
}

impl ExpressionBuilder {
    /// Object that uncaptured names resolve against.
    #[must_use]
    pub fn context(mut self, context: impl Into<Value>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Capture a named value. Declaring the same name twice is reported when
    /// the expression is bound.
    #[must_use]
    pub fn capture(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.captures.push((name.into(), value.into()));
        self
    }

    /// Label used in logs.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn build(
        self,
        body: impl Fn(&Scope<'_>) -> Result<Value, EvalError> + 'static,
    ) -> Expression {
        Expression {
            body: Rc::new(body),
            context: self.context,
            captures: self.captures.into(),
            label: self.label.map(Rc::from),
        }
    }
}

// ---------------------------------------------------------------------------
// Scope / Slot
// ---------------------------------------------------------------------------

enum Mode<'a> {
    Live(&'a Expression),
    Recording(&'a Rc<Recording>),
}

/// Evaluation scope handed to an expression body.
pub struct Scope<'a> {
    mode: Mode<'a>,
}

impl Scope<'_> {
    /// Look up a captured value or, failing that, a context member.
    pub fn get(&self, name: &str) -> Result<Slot, EvalError> {
        match &self.mode {
            Mode::Live(expr) => {
                if let Some(value) = expr.capture(name) {
                    return Ok(Slot::live(value.clone()));
                }
                match &expr.context {
                    Some(context) => read_member(context, name).map(Slot::live),
                    None => Err(EvalError::UnknownVariable(name.to_string())),
                }
            }
            Mode::Recording(recording) => Ok(Slot::recorded(
                recording.root().access(name),
                Rc::clone(recording),
            )),
        }
    }

    /// Invoke a method on the context object.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Slot, EvalError> {
        match &self.mode {
            Mode::Live(expr) => match &expr.context {
                Some(context) => invoke_on(context, name, args).map(Slot::live),
                None => Err(EvalError::NoSuchMethod {
                    target: "expression scope".to_string(),
                    name: name.to_string(),
                }),
            },
            Mode::Recording(recording) => Ok(Slot::terminal(Rc::clone(recording))),
        }
    }

    /// Whether this is a dependency-recording pass.
    #[must_use]
    pub fn is_recording(&self) -> bool {
        matches!(self.mode, Mode::Recording(_))
    }
}

fn invoke_on(target: &Value, name: &str, args: &[Value]) -> Result<Value, EvalError> {
    match target {
        Value::Object(object) => object.invoke(name, args),
        Value::Property(p) => invoke_on(&p.value(), name, args),
        Value::Null => Err(EvalError::NullTarget {
            name: name.to_string(),
        }),
        other => Err(EvalError::NoSuchMethod {
            target: other.describe(),
            name: name.to_string(),
        }),
    }
}

#[derive(Clone)]
enum SlotKind {
    Live(Value),
    Recorded {
        node: Rc<RecorderNode>,
        recording: Rc<Recording>,
    },
    Terminal(Rc<Recording>),
}

/// A value (or recorded stand-in) reached from a [`Scope`].
#[derive(Clone)]
pub struct Slot {
    kind: SlotKind,
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            SlotKind::Live(value) => f.debug_tuple("Slot").field(value).finish(),
            SlotKind::Recorded { .. } => f.write_str("Slot(<recorded>)"),
            SlotKind::Terminal(_) => f.write_str("Slot(<method result>)"),
        }
    }
}

impl Slot {
    fn live(value: Value) -> Self {
        Self {
            kind: SlotKind::Live(value),
        }
    }

    fn recorded(node: Rc<RecorderNode>, recording: Rc<Recording>) -> Self {
        Self {
            kind: SlotKind::Recorded { node, recording },
        }
    }

    fn terminal(recording: Rc<Recording>) -> Self {
        Self {
            kind: SlotKind::Terminal(recording),
        }
    }

    /// Read member `name`.
    pub fn get(&self, name: &str) -> Result<Slot, EvalError> {
        match &self.kind {
            SlotKind::Live(value) => read_member(value, name).map(Slot::live),
            SlotKind::Recorded { node, recording } => {
                Ok(Slot::recorded(node.access(name), Rc::clone(recording)))
            }
            SlotKind::Terminal(recording) => {
                recording.mark_dead_end(name);
                Err(EvalError::Unbindable {
                    property: name.to_string(),
                })
            }
        }
    }

    /// Invoke method `name`.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Slot, EvalError> {
        match &self.kind {
            SlotKind::Live(value) => invoke_on(value, name, args).map(Slot::live),
            SlotKind::Recorded { recording, .. } | SlotKind::Terminal(recording) => {
                Ok(Slot::terminal(Rc::clone(recording)))
            }
        }
    }

    /// The raw value. Recorded slots read as `Null`.
    #[must_use]
    pub fn value(&self) -> Value {
        match &self.kind {
            SlotKind::Live(value) => value.clone(),
            _ => Value::Null,
        }
    }

    /// The value with one level of property indirection removed.
    #[must_use]
    pub fn resolved(&self) -> Value {
        self.value().resolved()
    }

    #[must_use]
    pub fn is_recorded(&self) -> bool {
        !matches!(self.kind, SlotKind::Live(_))
    }

    fn convert<T>(
        &self,
        expected: &'static str,
        neutral: T,
        f: impl FnOnce(&Value) -> Option<T>,
    ) -> Result<T, EvalError> {
        if self.is_recorded() {
            return Ok(neutral);
        }
        let value = self.resolved();
        f(&value).ok_or(EvalError::TypeMismatch {
            expected,
            found: value.type_name(),
        })
    }

    pub fn as_int(&self) -> Result<i64, EvalError> {
        self.convert("int", 0, Value::as_int)
    }

    pub fn as_float(&self) -> Result<f64, EvalError> {
        self.convert("float", 0.0, Value::as_float)
    }

    pub fn as_bool(&self) -> Result<bool, EvalError> {
        self.convert("bool", false, Value::as_bool)
    }

    /// Display form of the resolved value. Never fails for live slots.
    pub fn as_string(&self) -> Result<String, EvalError> {
        self.convert("string", String::new(), |v| Some(v.to_string()))
    }

    pub fn as_object(&self) -> Result<Option<ObjectRef>, EvalError> {
        self.convert("object", None, |v| match v {
            Value::Object(o) => Some(Some(Rc::clone(o))),
            Value::Null => Some(None),
            _ => None,
        })
    }
}

// ---------------------------------------------------------------------------
// ExpressionScope: bind root
// ---------------------------------------------------------------------------

/// Host view of an expression's captures and context.
///
/// Captures shadow context members. A captured property is exposed as a
/// native property so it is watched directly; any other captured value is
/// a plain attribute.
struct ExpressionScope {
    captures: Rc<[(String, Value)]>,
    context: Option<Value>,
}

impl ExpressionScope {
    fn capture(&self, name: &str) -> Option<&Value> {
        self.captures
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    fn context_object(&self) -> Option<ObjectRef> {
        match self.context.as_ref()?.resolved() {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }
}

impl HostObject for ExpressionScope {
    fn type_name(&self) -> &str {
        "expression scope"
    }

    fn native_property(&self, name: &str) -> Option<PropertyRef> {
        match self.capture(name) {
            Some(value) => value.as_property().cloned(),
            None => self.context_object()?.native_property(name),
        }
    }

    fn bean_property(&self, name: &str) -> Option<PropertyRef> {
        if self.capture(name).is_some() {
            return None;
        }
        self.context_object()?.bean_property(name)
    }

    fn attribute(&self, name: &str) -> Option<Value> {
        match self.capture(name) {
            Some(value) => Some(value.clone()),
            None => self.context_object()?.attribute(name),
        }
    }

    fn invoke(&self, name: &str, args: &[Value]) -> Result<Value, EvalError> {
        match &self.context {
            Some(context) => invoke_on(context, name, args),
            None => Err(EvalError::NoSuchMethod {
                target: self.type_name().to_string(),
                name: name.to_string(),
            }),
        }
    }
}
