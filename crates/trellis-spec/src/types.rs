//! Type identities and the descriptors providers register.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Identifiers of the built-in types.
pub mod builtin {
  pub const ANY: &str = "any";
  pub const TEXT: &str = "text";
  pub const BOOLEAN: &str = "boolean";
  pub const INTEGER: &str = "integer";
  pub const FLOAT: &str = "float";
  pub const CHARACTER: &str = "character";

  /// The built-in value types, in listing order.
  pub const VALUE_TYPES: [&str; 5] = [TEXT, BOOLEAN, INTEGER, FLOAT, CHARACTER];
}

/// Stable identity of a type.
///
/// Built-in types use the identifiers in [`builtin`]. Provider types are
/// free-form strings; [`TypeKey::of`] derives one from a Rust type name.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey(Arc<str>);

impl TypeKey {
  pub fn new(id: impl AsRef<str>) -> Self {
    Self(Arc::from(id.as_ref()))
  }

  /// Key for a Rust type, using its fully qualified type name.
  pub fn of<T: ?Sized + 'static>() -> Self {
    Self::new(std::any::type_name::<T>())
  }

  pub fn any() -> Self {
    Self::new(builtin::ANY)
  }

  pub fn text() -> Self {
    Self::new(builtin::TEXT)
  }

  pub fn boolean() -> Self {
    Self::new(builtin::BOOLEAN)
  }

  pub fn integer() -> Self {
    Self::new(builtin::INTEGER)
  }

  pub fn float() -> Self {
    Self::new(builtin::FLOAT)
  }

  pub fn character() -> Self {
    Self::new(builtin::CHARACTER)
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  pub fn is_any(&self) -> bool {
    &*self.0 == builtin::ANY
  }

  /// Whether this is one of the built-in value types.
  pub fn is_builtin_value(&self) -> bool {
    builtin::VALUE_TYPES.contains(&&*self.0)
  }
}

impl fmt::Debug for TypeKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "TypeKey({})", self.0)
  }
}

impl fmt::Display for TypeKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for TypeKey {
  fn from(id: &str) -> Self {
    Self::new(id)
  }
}

impl From<String> for TypeKey {
  fn from(id: String) -> Self {
    Self(Arc::from(id))
  }
}

impl From<&String> for TypeKey {
  fn from(id: &String) -> Self {
    Self::new(id)
  }
}

impl Serialize for TypeKey {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&self.0)
  }
}

impl<'de> Deserialize<'de> for TypeKey {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    String::deserialize(deserializer).map(TypeKey::from)
  }
}

/// A property of a compound type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDescriptor {
  pub name: String,
  pub target: TypeKey,
  pub multiple: bool,
}

impl PropertyDescriptor {
  pub fn new(name: impl Into<String>, target: impl Into<TypeKey>) -> Self {
    Self {
      name: name.into(),
      target: target.into(),
      multiple: false,
    }
  }

  pub fn multiple(mut self) -> Self {
    self.multiple = true;
    self
  }
}

/// The shape of a registered type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
  /// A built-in value type with a literal encoding.
  Value,
  /// A closed set of named literals.
  Enumeration { literals: Vec<String> },
  /// A record with named, typed properties.
  Compound { properties: Vec<PropertyDescriptor> },
  /// A type with no structure of its own, typically used as a common parent.
  Opaque,
}

/// What a provider declares about one of its types.
///
/// Descriptors are checked when the specification is built: property names
/// must be unique, enumerations must have at least one literal and every
/// referenced type must be registered or built in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
  pub key: TypeKey,
  pub kind: TypeKind,
  pub parents: Vec<TypeKey>,
}

impl TypeDescriptor {
  pub(crate) fn value(key: &str) -> Self {
    let kind = if key == builtin::BOOLEAN {
      TypeKind::Enumeration {
        literals: vec!["false".to_string(), "true".to_string()],
      }
    } else {
      TypeKind::Value
    };
    Self {
      key: TypeKey::new(key),
      kind,
      parents: Vec::new(),
    }
  }

  pub fn compound(key: impl Into<TypeKey>) -> Self {
    Self {
      key: key.into(),
      kind: TypeKind::Compound {
        properties: Vec::new(),
      },
      parents: Vec::new(),
    }
  }

  pub fn enumeration<I, S>(key: impl Into<TypeKey>, literals: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      key: key.into(),
      kind: TypeKind::Enumeration {
        literals: literals.into_iter().map(Into::into).collect(),
      },
      parents: Vec::new(),
    }
  }

  pub fn opaque(key: impl Into<TypeKey>) -> Self {
    Self {
      key: key.into(),
      kind: TypeKind::Opaque,
      parents: Vec::new(),
    }
  }

  /// Add a single-valued property. Only meaningful on compound types.
  pub fn property(self, name: impl Into<String>, target: impl Into<TypeKey>) -> Self {
    self.with_property(PropertyDescriptor::new(name, target))
  }

  pub fn with_property(mut self, property: PropertyDescriptor) -> Self {
    if let TypeKind::Compound { properties } = &mut self.kind {
      properties.push(property);
    }
    self
  }

  /// Declare an inheritance parent.
  pub fn extends(mut self, parent: impl Into<TypeKey>) -> Self {
    self.parents.push(parent.into());
    self
  }

  /// Every type this descriptor refers to.
  pub(crate) fn references(&self) -> Vec<TypeKey> {
    let mut refs = self.parents.clone();
    if let TypeKind::Compound { properties } = &self.kind {
      refs.extend(properties.iter().map(|p| p.target.clone()));
    }
    refs
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  struct Marker;

  #[test]
  fn test_key_of_rust_type() {
    let key = TypeKey::of::<Marker>();
    assert!(key.as_str().ends_with("Marker"));
    assert!(!key.is_builtin_value());
  }

  #[test]
  fn test_builtin_keys() {
    assert!(TypeKey::integer().is_builtin_value());
    assert!(TypeKey::any().is_any());
    assert!(!TypeKey::any().is_builtin_value());
  }

  #[test]
  fn test_key_serializes_as_string() {
    let json = serde_json::to_string(&TypeKey::text()).unwrap();
    assert_eq!(json, "\"text\"");
    let key: TypeKey = serde_json::from_str("\"demo.Pair\"").unwrap();
    assert_eq!(key, TypeKey::new("demo.Pair"));
  }

  #[test]
  fn test_compound_references() {
    let descriptor = TypeDescriptor::compound("demo.Pair")
      .property("text", builtin::TEXT)
      .with_property(PropertyDescriptor::new("numbers", builtin::INTEGER).multiple())
      .extends("demo.Base");
    let refs = descriptor.references();
    assert_eq!(
      refs,
      vec![
        TypeKey::new("demo.Base"),
        TypeKey::text(),
        TypeKey::integer()
      ]
    );
  }
}
