//! Host object model: named properties, bean adapters, attributes, methods.
//!
//! A [`HostObject`] answers three lookup questions for a member name, in the
//! order the resolution chain asks them:
//!
//! 1. Does it expose a **native** observable property with this name?
//! 2. Does it expose a **bean-style** observable adapter for this name?
//! 3. Does it hold a **plain attribute** with this name?
//!
//! and can invoke named methods. [`BeanObject`] is a ready-made
//! implementation backed by in-memory tables.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::EvalError;
use crate::observable::SimpleProperty;
use crate::property::PropertyRef;
use crate::value::Value;

/// Shared handle to a host object.
pub type ObjectRef = Rc<dyn HostObject>;

/// Callable method body.
pub type Method = Rc<dyn Fn(&[Value]) -> Result<Value, EvalError>>;

/// An object whose members can be looked up by name.
pub trait HostObject {
    /// Type name used in diagnostics.
    fn type_name(&self) -> &str;

    /// Native observable property named `name`.
    fn native_property(&self, _name: &str) -> Option<PropertyRef> {
        None
    }

    /// Bean-style observable adapter for `name`.
    fn bean_property(&self, _name: &str) -> Option<PropertyRef> {
        None
    }

    /// Plain attribute value named `name`.
    fn attribute(&self, _name: &str) -> Option<Value> {
        None
    }

    /// Invoke the method `name` with `args`.
    fn invoke(&self, name: &str, _args: &[Value]) -> Result<Value, EvalError> {
        Err(EvalError::NoSuchMethod {
            target: self.type_name().to_string(),
            name: name.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// BeanObject
// ---------------------------------------------------------------------------

struct Member<T> {
    name: String,
    handle: T,
}

struct ObservableMember {
    name: String,
    shared: PropertyRef,
    settable: Option<SimpleProperty>,
}

/// In-memory [`HostObject`] with native properties, bean fields, plain
/// attributes, and methods.
///
/// Properties and bean fields are [`SimpleProperty`] instances whose bean is
/// this object. Attributes are plain values: updating one does not notify.
pub struct BeanObject {
    type_name: String,
    properties: Vec<ObservableMember>,
    fields: Vec<ObservableMember>,
    attributes: RefCell<Vec<Member<Value>>>,
    methods: Vec<Member<Method>>,
}

impl fmt::Debug for BeanObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanObject")
            .field("type_name", &self.type_name)
            .field(
                "properties",
                &self.properties.iter().map(|m| &m.name).collect::<Vec<_>>(),
            )
            .field(
                "fields",
                &self.fields.iter().map(|m| &m.name).collect::<Vec<_>>(),
            )
            .field("attributes", &self.attributes.borrow().len())
            .field(
                "methods",
                &self.methods.iter().map(|m| &m.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl BeanObject {
    /// Start building an object of the given type name.
    #[must_use]
    pub fn builder(type_name: impl Into<String>) -> BeanObjectBuilder {
        BeanObjectBuilder {
            type_name: type_name.into(),
            properties: Vec::new(),
            shared: Vec::new(),
            fields: Vec::new(),
            attributes: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Settable handle of a native property.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<SimpleProperty> {
        self.properties
            .iter()
            .find(|m| m.name == name)
            .and_then(|m| m.settable.clone())
    }

    /// Settable handle of a bean field.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<SimpleProperty> {
        self.fields
            .iter()
            .find(|m| m.name == name)
            .and_then(|m| m.settable.clone())
    }

    /// Set a native property or, failing that, a bean field.
    ///
    /// Returns `Ok(true)` when the value changed and listeners were notified.
    /// A member added with [`BeanObjectBuilder::shared_property`] is
    /// [`EvalError::ReadOnly`] here; set it through its own handle.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<bool, EvalError> {
        if let Some(handle) = self.property(name).or_else(|| self.field(name)) {
            return Ok(handle.set(value));
        }
        let target = self.type_name.clone();
        let name = name.to_string();
        if self.properties.iter().any(|m| m.name == name) {
            Err(EvalError::ReadOnly { target, name })
        } else {
            Err(EvalError::NoSuchProperty { target, name })
        }
    }

    /// Replace a plain attribute value. No listener is notified.
    pub fn set_attribute(&self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        let mut attributes = self.attributes.borrow_mut();
        match attributes.iter_mut().find(|m| m.name == name) {
            Some(member) => member.handle = value,
            None => attributes.push(Member {
                name: name.to_string(),
                handle: value,
            }),
        }
    }
}

impl HostObject for BeanObject {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn native_property(&self, name: &str) -> Option<PropertyRef> {
        self.properties
            .iter()
            .find(|m| m.name == name)
            .map(|m| Rc::clone(&m.shared))
    }

    fn bean_property(&self, name: &str) -> Option<PropertyRef> {
        self.fields
            .iter()
            .find(|m| m.name == name)
            .map(|m| Rc::clone(&m.shared))
    }

    fn attribute(&self, name: &str) -> Option<Value> {
        self.attributes
            .borrow()
            .iter()
            .find(|m| m.name == name)
            .map(|m| m.handle.clone())
    }

    fn invoke(&self, name: &str, args: &[Value]) -> Result<Value, EvalError> {
        match self.methods.iter().find(|m| m.name == name) {
            Some(method) => (method.handle)(args),
            None => Err(EvalError::NoSuchMethod {
                target: self.type_name.clone(),
                name: name.to_string(),
            }),
        }
    }
}

/// Builder for [`BeanObject`].
pub struct BeanObjectBuilder {
    type_name: String,
    properties: Vec<(String, Value)>,
    shared: Vec<(String, PropertyRef)>,
    fields: Vec<(String, Value)>,
    attributes: Vec<Member<Value>>,
    methods: Vec<Member<Method>>,
}

impl BeanObjectBuilder {
    /// Add a native observable property with an initial value.
    #[must_use]
    pub fn property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.push((name.into(), value.into()));
        self
    }

    /// Expose an existing property (of any implementation) as a native
    /// property. The property's bean is left untouched, and
    /// [`BeanObject::set`] rejects the name with [`EvalError::ReadOnly`].
    #[must_use]
    pub fn shared_property(mut self, name: impl Into<String>, property: PropertyRef) -> Self {
        self.shared.push((name.into(), property));
        self
    }

    /// Add a bean-style field, reachable only through the bean adapter.
    #[must_use]
    pub fn bean_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Add a plain attribute.
    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.push(Member {
            name: name.into(),
            handle: value.into(),
        });
        self
    }

    /// Add a method.
    #[must_use]
    pub fn method(
        mut self,
        name: impl Into<String>,
        body: impl Fn(&[Value]) -> Result<Value, EvalError> + 'static,
    ) -> Self {
        self.methods.push(Member {
            name: name.into(),
            handle: Rc::new(body),
        });
        self
    }

    /// Finish the object. Native properties and bean fields get this object
    /// as their bean.
    #[must_use]
    pub fn build(self) -> Rc<BeanObject> {
        let Self {
            type_name,
            properties,
            shared,
            fields,
            attributes,
            methods,
        } = self;

        Rc::new_cyclic(|weak: &Weak<BeanObject>| {
            let bean: Weak<dyn HostObject> = weak.clone();
            let observable = |(name, value): (String, Value)| {
                let handle = SimpleProperty::named(name.clone(), value);
                handle.set_bean_weak(bean.clone());
                ObservableMember {
                    name,
                    shared: handle.to_property_ref(),
                    settable: Some(handle),
                }
            };

            let mut native: Vec<ObservableMember> = properties.into_iter().map(observable).collect();
            native.extend(shared.into_iter().map(|(name, shared)| ObservableMember {
                name,
                shared,
                settable: None,
            }));
            let fields = fields.into_iter().map(observable).collect();

            BeanObject {
                type_name,
                properties: native,
                fields,
                attributes: RefCell::new(attributes),
                methods,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::ObservableProperty;

    fn point() -> Rc<BeanObject> {
        BeanObject::builder("Point")
            .property("x", 1)
            .property("y", 2)
            .bean_field("label", "origin")
            .attribute("id", 9)
            .method("norm1", |_| Ok(Value::Int(3)))
            .build()
    }

    #[test]
    fn members_resolve_through_their_own_channel() {
        let p = point();
        assert!(p.native_property("x").is_some());
        assert!(p.native_property("label").is_none());
        assert!(p.bean_property("label").is_some());
        assert_eq!(p.attribute("id"), Some(Value::Int(9)));
        assert_eq!(p.attribute("x"), None);
    }

    #[test]
    fn native_property_bean_is_owner() {
        let p = point();
        let x = p.native_property("x").expect("x");
        let bean = x.bean().expect("bean alive");
        assert_eq!(bean.type_name(), "Point");
        assert_eq!(x.name().as_deref(), Some("x"));
    }

    #[test]
    fn set_notifies_through_shared_handle() {
        let p = point();
        let x = p.native_property("x").expect("x");
        assert!(p.set("x", 5).expect("settable"));
        assert_eq!(x.value(), Value::Int(5));
        assert!(p.set("label", "moved").expect("field"));
        assert!(p.set("nope", 1).is_err());
    }

    #[test]
    fn shared_property_is_read_only_through_owner() {
        let source = SimpleProperty::named("source", 1);
        let holder = BeanObject::builder("Holder")
            .shared_property("mirrored", source.to_property_ref())
            .build();
        let err = holder.set("mirrored", 2).expect_err("owner holds no settable handle");
        assert_eq!(
            err,
            EvalError::ReadOnly {
                target: "Holder".into(),
                name: "mirrored".into()
            }
        );
        assert_eq!(err.kind(), "ReadOnly");
        assert_eq!(source.get(), Value::Int(1));

        assert!(source.set(2));
        let mirrored = holder.native_property("mirrored").expect("exposed");
        assert_eq!(mirrored.value(), Value::Int(2));
        assert!(matches!(
            holder.set("absent", 1),
            Err(EvalError::NoSuchProperty { .. })
        ));
    }

    #[test]
    fn invoke_known_and_unknown_methods() {
        let p = point();
        assert_eq!(p.invoke("norm1", &[]), Ok(Value::Int(3)));
        assert!(matches!(
            p.invoke("fetch", &[]),
            Err(EvalError::NoSuchMethod { .. })
        ));
    }

    #[test]
    fn attributes_update_silently() {
        let p = point();
        p.set_attribute("id", 10);
        p.set_attribute("extra", "x");
        assert_eq!(p.attribute("id"), Some(Value::Int(10)));
        assert_eq!(p.attribute("extra"), Some(Value::from("x")));
    }
}
