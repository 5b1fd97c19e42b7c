//! Ordered property-resolution strategies.
//!
//! Resolving a member name on a value tries each [`ResolveStrategy`] in
//! order and stops at the first hit:
//!
//! 1. [`ResolveStrategy::NativeProperty`] asks the object for a native
//!    observable property.
//! 2. [`ResolveStrategy::BeanProperty`] asks for a bean-style adapter.
//! 3. [`ResolveStrategy::Attribute`] reads a plain attribute and wraps it in a
//!    [`ConstantProperty`]. An attribute that already holds a property
//!    resolves to that property.
//!
//! Only objects have members. Resolving on any other value yields `None`.

use std::rc::Rc;

use crate::error::EvalError;
use crate::object::ObjectRef;
use crate::observable::ConstantProperty;
use crate::property::PropertyRef;
use crate::value::Value;

/// Custom resolution hook.
pub type ResolveFn = fn(&ObjectRef, &str) -> Option<PropertyRef>;

/// One step of the resolution chain.
#[derive(Clone, Copy, Debug)]
pub enum ResolveStrategy {
    NativeProperty,
    BeanProperty,
    Attribute,
    /// Host-supplied strategy.
    Custom {
        label: &'static str,
        resolve: ResolveFn,
    },
}

impl ResolveStrategy {
    /// The standard chain.
    pub const DEFAULT_ORDER: [ResolveStrategy; 3] = [
        ResolveStrategy::NativeProperty,
        ResolveStrategy::BeanProperty,
        ResolveStrategy::Attribute,
    ];

    /// Stable label for logs and configuration files.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::NativeProperty => "native",
            Self::BeanProperty => "bean",
            Self::Attribute => "attribute",
            Self::Custom { label, .. } => *label,
        }
    }

    /// Parse a built-in strategy label.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "native" => Some(Self::NativeProperty),
            "bean" => Some(Self::BeanProperty),
            "attribute" => Some(Self::Attribute),
            _ => None,
        }
    }

    /// Apply this strategy to `object`.
    #[must_use]
    pub fn apply(&self, object: &ObjectRef, name: &str) -> Option<PropertyRef> {
        match self {
            Self::NativeProperty => object.native_property(name),
            Self::BeanProperty => object.bean_property(name),
            Self::Attribute => object.attribute(name).map(|value| match value {
                Value::Property(p) => p,
                plain => Rc::new(ConstantProperty::new(Some(name.to_string()), plain))
                    as PropertyRef,
            }),
            Self::Custom { resolve, .. } => resolve(object, name),
        }
    }
}

/// Resolve `name` on `target` with the given strategies, in order.
///
/// Returns the matching strategy alongside the property.
#[must_use]
pub fn resolve_property(
    strategies: &[ResolveStrategy],
    target: &Value,
    name: &str,
) -> Option<(ResolveStrategy, PropertyRef)> {
    let object = target.as_object()?;
    strategies
        .iter()
        .find_map(|strategy| strategy.apply(object, name).map(|p| (*strategy, p)))
}

/// Read the current value of member `name` on `target` for live evaluation.
///
/// Uses the default chain. A `Property` target is unwrapped once first.
pub fn read_member(target: &Value, name: &str) -> Result<Value, EvalError> {
    match target {
        Value::Null => Err(EvalError::NullTarget {
            name: name.to_string(),
        }),
        Value::Property(p) => read_member(&p.value(), name),
        Value::Object(_) => resolve_property(&ResolveStrategy::DEFAULT_ORDER, target, name)
            .map(|(_, property)| property.value())
            .ok_or_else(|| EvalError::NoSuchProperty {
                target: target.describe(),
                name: name.to_string(),
            }),
        other => Err(EvalError::NoSuchProperty {
            target: other.describe(),
            name: name.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::BeanObject;
    use crate::observable::SimpleProperty;

    fn target() -> Value {
        let inner = SimpleProperty::named("inner", 11);
        let obj: ObjectRef = BeanObject::builder("Thing")
            .property("a", 1)
            .bean_field("b", 2)
            .attribute("c", 3)
            .attribute("d", Value::Property(inner.to_property_ref()))
            .property("shadowed", "native")
            .attribute("shadowed", "attr")
            .build();
        Value::Object(obj)
    }

    #[test]
    fn chain_order_picks_first_hit() {
        let t = target();
        let chain = ResolveStrategy::DEFAULT_ORDER;
        let (s, _) = resolve_property(&chain, &t, "a").expect("a");
        assert_eq!(s.label(), "native");
        let (s, _) = resolve_property(&chain, &t, "b").expect("b");
        assert_eq!(s.label(), "bean");
        let (s, p) = resolve_property(&chain, &t, "c").expect("c");
        assert_eq!(s.label(), "attribute");
        assert_eq!(p.value(), Value::Int(3));
        let (s, p) = resolve_property(&chain, &t, "shadowed").expect("shadowed");
        assert_eq!(s.label(), "native");
        assert_eq!(p.value(), Value::from("native"));
    }

    #[test]
    fn attribute_holding_property_resolves_to_it() {
        let t = target();
        let (_, p) = resolve_property(&ResolveStrategy::DEFAULT_ORDER, &t, "d").expect("d");
        assert_eq!(p.name().as_deref(), Some("inner"));
        assert_eq!(p.value(), Value::Int(11));
    }

    #[test]
    fn restricted_chain_misses() {
        let t = target();
        assert!(resolve_property(&[ResolveStrategy::NativeProperty], &t, "c").is_none());
        assert!(resolve_property(&ResolveStrategy::DEFAULT_ORDER, &Value::Int(1), "a").is_none());
    }

    #[test]
    fn custom_strategy_runs() {
        fn always(_: &ObjectRef, name: &str) -> Option<PropertyRef> {
            Some(SimpleProperty::named(name, 0).to_property_ref())
        }
        let chain = [ResolveStrategy::Custom {
            label: "always",
            resolve: always,
        }];
        let (s, p) = resolve_property(&chain, &target(), "zzz").expect("custom");
        assert_eq!(s.label(), "always");
        assert_eq!(p.name().as_deref(), Some("zzz"));
    }

    #[test]
    fn read_member_errors() {
        assert!(matches!(
            read_member(&Value::Null, "a"),
            Err(EvalError::NullTarget { .. })
        ));
        assert!(matches!(
            read_member(&target(), "missing"),
            Err(EvalError::NoSuchProperty { .. })
        ));
        assert_eq!(read_member(&target(), "b"), Ok(Value::Int(2)));
    }

    #[test]
    fn labels_round_trip() {
        for s in ResolveStrategy::DEFAULT_ORDER {
            let parsed = ResolveStrategy::from_label(s.label()).expect("builtin");
            assert_eq!(parsed.label(), s.label());
        }
        assert!(ResolveStrategy::from_label("reflect").is_none());
    }
}
