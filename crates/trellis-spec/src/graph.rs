//! The resolved type graph.
//!
//! Built once from every registered [`TypeDescriptor`] and converter. Each
//! type records two relations:
//!
//! - `ancestors`: inheritance only, used when checking runtime values
//! - `supertypes`: everything the type can stand in for, through any chain of
//!   inheritance and converter edges
//!
//! For every reachable pair the shortest converter chain is precomputed, so
//! the compiler only looks paths up. Inheritance steps cost nothing and
//! converter steps cost one call each.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::Arc;

use crate::callable::ConverterSpec;
use crate::error::ConfigurationError;
use crate::types::{TypeDescriptor, TypeKey, TypeKind};
use crate::value::Value;

/// A property of a compound type, possibly inherited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySpec {
  pub name: String,
  pub target: TypeKey,
  pub multiple: bool,
  /// The type that declared the property.
  pub declared_by: TypeKey,
}

/// A fully resolved type.
#[derive(Debug, Clone)]
pub struct TypeSpec {
  pub key: TypeKey,
  pub kind: TypeKind,
  pub parents: Vec<TypeKey>,
  /// Inheritance closure, excluding the type itself.
  pub ancestors: BTreeSet<TypeKey>,
  /// Inheritance and conversion closure, excluding the type itself.
  pub supertypes: BTreeSet<TypeKey>,
  /// Own and inherited properties.
  pub properties: BTreeMap<String, PropertySpec>,
}

impl TypeSpec {
  /// Built-in value types carry a literal encoding.
  pub fn is_value_type(&self) -> bool {
    self.key.is_builtin_value()
  }

  pub fn is_compound(&self) -> bool {
    matches!(self.kind, TypeKind::Compound { .. })
  }

  pub fn literals(&self) -> Option<&[String]> {
    match &self.kind {
      TypeKind::Enumeration { literals } => Some(literals),
      _ => None,
    }
  }

  pub fn property(&self, name: &str) -> Option<&PropertySpec> {
    self.properties.get(name)
  }
}

#[derive(Debug, Default)]
pub struct TypeGraph {
  types: BTreeMap<TypeKey, TypeSpec>,
  paths: HashMap<(TypeKey, TypeKey), Vec<Arc<ConverterSpec>>>,
}

impl TypeGraph {
  /// Validate descriptors and compute closures and conversion paths.
  ///
  /// `descriptors` must already contain the built-in types.
  pub(crate) fn build(
    descriptors: &BTreeMap<TypeKey, TypeDescriptor>,
    converters: &[Arc<ConverterSpec>],
  ) -> Result<Self, ConfigurationError> {
    for descriptor in descriptors.values() {
      validate_shape(descriptor)?;
      for referenced in descriptor.references() {
        if !descriptors.contains_key(&referenced) {
          return Err(ConfigurationError::UnknownType {
            type_key: referenced,
            referenced_by: format!("type '{}'", descriptor.key),
          });
        }
      }
    }
    detect_inheritance_cycle(descriptors)?;

    let any = TypeKey::any();
    let mut types = BTreeMap::new();
    for (key, descriptor) in descriptors {
      let mut ancestors = BTreeSet::new();
      collect_ancestors(key, descriptors, &mut ancestors);
      if !key.is_any() {
        ancestors.insert(any.clone());
      }

      let mut properties = BTreeMap::new();
      let lineage = std::iter::once(key).chain(ancestors.iter());
      for owner in lineage {
        if let Some(TypeKind::Compound { properties: declared }) =
          descriptors.get(owner).map(|d| &d.kind)
        {
          for property in declared {
            properties
              .entry(property.name.clone())
              .or_insert_with(|| PropertySpec {
                name: property.name.clone(),
                target: property.target.clone(),
                multiple: property.multiple,
                declared_by: owner.clone(),
              });
          }
        }
      }

      types.insert(
        key.clone(),
        TypeSpec {
          key: key.clone(),
          kind: descriptor.kind.clone(),
          parents: descriptor.parents.clone(),
          ancestors,
          supertypes: BTreeSet::new(),
          properties,
        },
      );
    }

    let mut by_input: HashMap<TypeKey, Vec<Arc<ConverterSpec>>> = HashMap::new();
    for converter in converters {
      by_input
        .entry(converter.from.clone())
        .or_default()
        .push(Arc::clone(converter));
    }

    let mut paths = HashMap::new();
    let keys: Vec<TypeKey> = types.keys().cloned().collect();
    for source in &keys {
      let reachable = shortest_paths(source, &types, &by_input);
      let supertypes = reachable
        .keys()
        .filter(|k| *k != source)
        .cloned()
        .collect();
      if let Some(spec) = types.get_mut(source) {
        spec.supertypes = supertypes;
      }
      for (target, path) in reachable {
        paths.insert((source.clone(), target), path);
      }
    }

    Ok(Self { types, paths })
  }

  pub fn get(&self, key: &TypeKey) -> Option<&TypeSpec> {
    self.types.get(key)
  }

  pub fn contains(&self, key: &TypeKey) -> bool {
    self.types.contains_key(key)
  }

  /// Every type, ordered by key.
  pub fn types(&self) -> impl Iterator<Item = &TypeSpec> {
    self.types.values()
  }

  /// Whether a `from` value can be used where `to` is expected without
  /// conversion.
  pub fn is_assignable(&self, from: &TypeKey, to: &TypeKey) -> bool {
    from == to
      || to.is_any()
      || self
        .types
        .get(from)
        .is_some_and(|spec| spec.ancestors.contains(to))
  }

  /// Whether `supertype` is reachable from `subtype` by inheritance or
  /// conversion.
  pub fn is_supertype(&self, supertype: &TypeKey, subtype: &TypeKey) -> bool {
    self
      .types
      .get(subtype)
      .is_some_and(|spec| spec.supertypes.contains(supertype))
  }

  /// Shortest converter chain turning a `from` value into a `to` value.
  ///
  /// Empty when `from` is assignable to `to`; `None` when unreachable.
  pub fn conversion_path(&self, from: &TypeKey, to: &TypeKey) -> Option<&[Arc<ConverterSpec>]> {
    self
      .paths
      .get(&(from.clone(), to.clone()))
      .map(Vec::as_slice)
  }

  pub fn property(&self, owner: &TypeKey, name: &str) -> Option<&PropertySpec> {
    self.types.get(owner).and_then(|spec| spec.property(name))
  }

  /// Whether `value` is an instance of `type_key`, or a list of instances
  /// when `multiple` is set. Null is accepted for every type.
  pub fn check_value(&self, value: &Value, type_key: &TypeKey, multiple: bool) -> bool {
    if multiple {
      return match value {
        Value::Null => true,
        Value::List(items) => items.iter().all(|v| self.check_value(v, type_key, false)),
        _ => false,
      };
    }
    match value {
      Value::Null => true,
      Value::List(_) => type_key.is_any(),
      Value::Enum(e) => {
        self.is_assignable(&e.type_key, type_key)
          && self
            .get(&e.type_key)
            .and_then(TypeSpec::literals)
            .is_some_and(|literals| literals.contains(&e.literal))
      }
      other => other
        .runtime_type()
        .is_some_and(|actual| self.is_assignable(&actual, type_key)),
    }
  }
}

fn validate_shape(descriptor: &TypeDescriptor) -> Result<(), ConfigurationError> {
  let malformed = |reason: String| ConfigurationError::MalformedType {
    type_key: descriptor.key.clone(),
    reason,
  };

  match &descriptor.kind {
    TypeKind::Value if !descriptor.key.is_builtin_value() => Err(malformed(
      "only built-in types have a value encoding".to_string(),
    )),
    TypeKind::Enumeration { literals } => {
      if literals.is_empty() {
        return Err(malformed("enumeration has no literals".to_string()));
      }
      let mut seen = BTreeSet::new();
      for literal in literals {
        if literal.is_empty() {
          return Err(malformed("enumeration literal is empty".to_string()));
        }
        if !seen.insert(literal) {
          return Err(malformed(format!("literal '{}' declared twice", literal)));
        }
      }
      Ok(())
    }
    TypeKind::Compound { properties } => {
      let mut seen = BTreeSet::new();
      for property in properties {
        if property.name.is_empty() {
          return Err(malformed("property with empty name".to_string()));
        }
        if !seen.insert(&property.name) {
          return Err(malformed(format!(
            "property '{}' declared twice",
            property.name
          )));
        }
      }
      Ok(())
    }
    _ => Ok(()),
  }
}

/// Reject inheritance cycles using DFS coloring.
fn detect_inheritance_cycle(
  descriptors: &BTreeMap<TypeKey, TypeDescriptor>,
) -> Result<(), ConfigurationError> {
  // 0 = unvisited, 1 = in progress, 2 = done
  let mut color: HashMap<&TypeKey, u8> = descriptors.keys().map(|k| (k, 0u8)).collect();

  fn dfs<'a>(
    key: &'a TypeKey,
    descriptors: &'a BTreeMap<TypeKey, TypeDescriptor>,
    color: &mut HashMap<&'a TypeKey, u8>,
  ) -> Option<&'a TypeKey> {
    color.insert(key, 1);
    if let Some(descriptor) = descriptors.get(key) {
      for parent in &descriptor.parents {
        match color.get(parent) {
          Some(1) => return Some(parent),
          Some(0) => {
            if let Some(found) = dfs(parent, descriptors, color) {
              return Some(found);
            }
          }
          _ => {}
        }
      }
    }
    color.insert(key, 2);
    None
  }

  for key in descriptors.keys() {
    if color.get(key) == Some(&0) {
      if let Some(found) = dfs(key, descriptors, &mut color) {
        return Err(ConfigurationError::InheritanceCycle {
          type_key: found.clone(),
        });
      }
    }
  }
  Ok(())
}

fn collect_ancestors(
  key: &TypeKey,
  descriptors: &BTreeMap<TypeKey, TypeDescriptor>,
  out: &mut BTreeSet<TypeKey>,
) {
  if let Some(descriptor) = descriptors.get(key) {
    for parent in &descriptor.parents {
      if out.insert(parent.clone()) {
        collect_ancestors(parent, descriptors, out);
      }
    }
  }
}

/// 0-1 BFS from `source`: ancestor edges are free, converter edges cost one.
fn shortest_paths(
  source: &TypeKey,
  types: &BTreeMap<TypeKey, TypeSpec>,
  by_input: &HashMap<TypeKey, Vec<Arc<ConverterSpec>>>,
) -> BTreeMap<TypeKey, Vec<Arc<ConverterSpec>>> {
  let mut best: BTreeMap<TypeKey, Vec<Arc<ConverterSpec>>> = BTreeMap::new();
  best.insert(source.clone(), Vec::new());
  let mut queue = VecDeque::from([source.clone()]);

  while let Some(current) = queue.pop_front() {
    let Some(path) = best.get(&current).cloned() else {
      continue;
    };

    if let Some(spec) = types.get(&current) {
      for ancestor in &spec.ancestors {
        if best.get(ancestor).is_none_or(|p| p.len() > path.len()) {
          best.insert(ancestor.clone(), path.clone());
          queue.push_front(ancestor.clone());
        }
      }
    }

    for converter in by_input.get(&current).into_iter().flatten() {
      let mut extended = path.clone();
      extended.push(Arc::clone(converter));
      if best.get(&converter.to).is_none_or(|p| p.len() > extended.len()) {
        best.insert(converter.to.clone(), extended);
        queue.push_back(converter.to.clone());
      }
    }
  }

  best
}
