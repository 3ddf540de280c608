// Strongly-typed GraphQL type IR. Mutable until lowered into async-graphql.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::request::RequestInfo;

pub const STRING: &str = "String";
pub const FLOAT: &str = "Float";
pub const INT: &str = "Int";
pub const BOOLEAN: &str = "Boolean";
pub const ID: &str = "ID";

const BUILTIN_SCALARS: [&str; 5] = [STRING, FLOAT, INT, BOOLEAN, ID];

// ------------------------------- TypeRef ---------------------------------- //

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Named(String),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self { TypeRef::Named(name.into()) }
    pub fn list(inner: TypeRef) -> Self { TypeRef::List(Box::new(inner)) }

    /// Wrap in NonNull unless already non-null.
    pub fn non_null(self) -> Self {
        match self {
            TypeRef::NonNull(_) => self,
            other => TypeRef::NonNull(Box::new(other)),
        }
    }

    pub fn is_non_null(&self) -> bool { matches!(self, TypeRef::NonNull(_)) }

    /// Innermost named type.
    pub fn base_name(&self) -> &str {
        match self {
            TypeRef::Named(name) => name,
            TypeRef::List(inner) | TypeRef::NonNull(inner) => inner.base_name(),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named(name) => f.write_str(name),
            TypeRef::List(inner) => write!(f, "[{inner}]"),
            TypeRef::NonNull(inner) => write!(f, "{inner}!"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid type reference `{0}`")]
pub struct TypeRefParseError(pub String);

impl FromStr for TypeRef {
    type Err = TypeRefParseError;

    fn from_str(src: &str) -> Result<Self, Self::Err> {
        let s = src.trim();
        if let Some(rest) = s.strip_suffix('!') {
            let inner = rest.parse::<TypeRef>().map_err(|_| TypeRefParseError(src.to_string()))?;
            if inner.is_non_null() {
                return Err(TypeRefParseError(src.to_string()));
            }
            return Ok(TypeRef::NonNull(Box::new(inner)));
        }
        if let Some(rest) = s.strip_prefix('[') {
            let Some(inner) = rest.strip_suffix(']') else {
                return Err(TypeRefParseError(src.to_string()));
            };
            let inner = inner.parse::<TypeRef>().map_err(|_| TypeRefParseError(src.to_string()))?;
            return Ok(TypeRef::List(Box::new(inner)));
        }
        if is_graphql_name(s) {
            Ok(TypeRef::Named(s.to_string()))
        } else {
            Err(TypeRefParseError(src.to_string()))
        }
    }
}

impl<'de> Deserialize<'de> for TypeRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

pub fn is_graphql_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

// ------------------------------ Resolvers --------------------------------- //

/// Field-level access rule for output fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Permission {
    /// Only the identity the record belongs to may read the field.
    #[serde(rename = "self")]
    SelfOnly,
    #[serde(rename = "loggedin")]
    LoggedIn,
}

/// Arguments handed to a custom resolver.
pub struct ResolveParams<'a> {
    pub field: &'a str,
    pub source: &'a Value,
    pub args: &'a Value,
    pub request: Option<&'a RequestInfo>,
}

pub type CustomResolver = Arc<dyn Fn(ResolveParams<'_>) -> Option<Value> + Send + Sync>;

#[derive(Clone, Default)]
pub enum Resolver {
    /// Read the field by name from the source record.
    #[default]
    Property,
    Permission(Permission),
    Custom(CustomResolver),
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolver::Property => f.write_str("Property"),
            Resolver::Permission(p) => f.debug_tuple("Permission").field(p).finish(),
            Resolver::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

// ------------------------------ Definitions ------------------------------- //

#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeRef,
    pub description: Option<String>,
    pub resolver: Resolver,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self { name: name.into(), ty, description: None, resolver: Resolver::Property }
    }
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
    pub fn resolver(mut self, resolver: Resolver) -> Self {
        self.resolver = resolver;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ObjectDef {
    pub name: String,
    pub description: Option<String>,
    pub fields: IndexMap<String, FieldDef>, // declaration order
}

impl ObjectDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), description: None, fields: IndexMap::new() }
    }
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputFieldDef {
    pub name: String,
    pub ty: TypeRef,
    pub description: Option<String>,
}

impl InputFieldDef {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self { name: name.into(), ty, description: None }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputObjectDef {
    pub name: String,
    pub description: Option<String>,
    pub fields: IndexMap<String, InputFieldDef>,
}

impl InputObjectDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), description: None, fields: IndexMap::new() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValueDef {
    pub key: String,
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDef {
    pub name: String,
    pub description: Option<String>,
    pub values: Vec<EnumValueDef>,
}

impl EnumDef {
    /// GraphQL key for a stored raw value.
    pub fn key_for(&self, raw: &str) -> Option<&str> {
        self.values.iter().find(|v| v.raw == raw).map(|v| v.key.as_str())
    }
    /// Stored raw value for a GraphQL key.
    pub fn raw_for(&self, key: &str) -> Option<&str> {
        self.values.iter().find(|v| v.key == key).map(|v| v.raw.as_str())
    }
}

/// Validation hook for custom scalars. Resolvers run it through
/// `lower::argument`, which reports the error text to the client.
pub type ScalarValidator = Arc<dyn Fn(&async_graphql::Value) -> Result<(), String> + Send + Sync>;

#[derive(Clone)]
pub struct ScalarDef {
    pub name: String,
    pub description: Option<String>,
    pub validator: Option<ScalarValidator>,
}

impl fmt::Debug for ScalarDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarDef")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub enum TypeDef {
    Scalar(ScalarDef),
    Enum(EnumDef),
    Object(ObjectDef),
    InputObject(InputObjectDef),
}

impl TypeDef {
    pub fn name(&self) -> &str {
        match self {
            TypeDef::Scalar(s) => &s.name,
            TypeDef::Enum(e) => &e.name,
            TypeDef::Object(o) => &o.name,
            TypeDef::InputObject(i) => &i.name,
        }
    }
}

impl From<ObjectDef> for TypeDef { fn from(v: ObjectDef) -> Self { TypeDef::Object(v) } }
impl From<InputObjectDef> for TypeDef { fn from(v: InputObjectDef) -> Self { TypeDef::InputObject(v) } }
impl From<EnumDef> for TypeDef { fn from(v: EnumDef) -> Self { TypeDef::Enum(v) } }
impl From<ScalarDef> for TypeDef { fn from(v: ScalarDef) -> Self { TypeDef::Scalar(v) } }

/// What a named type resolves to, builtins included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Scalar,
    Enum,
    Object,
    InputObject,
}

// ------------------------------- Registry --------------------------------- //

#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: IndexMap<String, TypeDef>,
}

impl TypeRegistry {
    pub fn new() -> Self { Self::default() }

    /// Insert or replace; returns the previous definition with that name.
    pub fn insert(&mut self, def: impl Into<TypeDef>) -> Option<TypeDef> {
        let def = def.into();
        self.types.insert(def.name().to_string(), def)
    }

    pub fn extend(&mut self, defs: impl IntoIterator<Item = TypeDef>) {
        for def in defs { self.insert(def); }
    }

    pub fn get(&self, name: &str) -> Option<&TypeDef> { self.types.get(name) }
    pub fn get_mut(&mut self, name: &str) -> Option<&mut TypeDef> { self.types.get_mut(name) }
    pub fn contains(&self, name: &str) -> bool { self.types.contains_key(name) }
    pub fn len(&self) -> usize { self.types.len() }
    pub fn is_empty(&self) -> bool { self.types.is_empty() }
    pub fn iter(&self) -> impl Iterator<Item = &TypeDef> { self.types.values() }

    pub fn object(&self, name: &str) -> Option<&ObjectDef> {
        match self.types.get(name) {
            Some(TypeDef::Object(o)) => Some(o),
            _ => None,
        }
    }

    pub fn input_object(&self, name: &str) -> Option<&InputObjectDef> {
        match self.types.get(name) {
            Some(TypeDef::InputObject(i)) => Some(i),
            _ => None,
        }
    }

    pub fn enum_def(&self, name: &str) -> Option<&EnumDef> {
        match self.types.get(name) {
            Some(TypeDef::Enum(e)) => Some(e),
            _ => None,
        }
    }

    pub fn kind_of(&self, name: &str) -> Option<TypeKind> {
        if BUILTIN_SCALARS.contains(&name) {
            return Some(TypeKind::Scalar);
        }
        self.types.get(name).map(|def| match def {
            TypeDef::Scalar(_) => TypeKind::Scalar,
            TypeDef::Enum(_) => TypeKind::Enum,
            TypeDef::Object(_) => TypeKind::Object,
            TypeDef::InputObject(_) => TypeKind::InputObject,
        })
    }

    pub fn into_types(self) -> impl Iterator<Item = TypeDef> { self.types.into_values() }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_refs_parse_and_print() {
        for src in ["String", "ID!", "[Float]", "[ID!]!", "[[Int]!]"] {
            let ty: TypeRef = src.parse().unwrap();
            assert_eq!(ty.to_string(), src);
        }
        let ty: TypeRef = "[ID!]!".parse().unwrap();
        assert_eq!(ty.base_name(), "ID");
        assert!(ty.is_non_null());
    }

    #[test]
    fn malformed_type_refs_are_rejected() {
        for src in ["", "[ID", "ID!!", "9Lives", "Foo.Bar"] {
            assert!(src.parse::<TypeRef>().is_err(), "{src} should not parse");
        }
    }

    #[test]
    fn non_null_is_idempotent() {
        let ty = TypeRef::named(STRING).non_null().non_null();
        assert_eq!(ty.to_string(), "String!");
    }

    #[test]
    fn registry_knows_builtin_and_declared_kinds() {
        let mut reg = TypeRegistry::new();
        reg.insert(ObjectDef::new("User"));
        reg.insert(InputObjectDef::new("UserInput"));
        assert_eq!(reg.kind_of(ID), Some(TypeKind::Scalar));
        assert_eq!(reg.kind_of("User"), Some(TypeKind::Object));
        assert_eq!(reg.kind_of("UserInput"), Some(TypeKind::InputObject));
        assert_eq!(reg.kind_of("Nope"), None);
    }
}
