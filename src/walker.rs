//! Document-schema walker.
//!
//! Walks a nested, declarative document schema (the ORM's JSON tree form) and
//! collects a flat registry of object-type and enum definitions. Nested and
//! enum types are referenced by name while walking and only resolved when the
//! result is materialized, so forward references are fine.
//!
//! Node forms, checked in this order:
//! - reserved keys (`__v`, `_id`, `id`, `idoptions`) are skipped;
//! - `[elem]` marks an array of `elem`;
//! - `{ "type": .., "enum": [..] }` produces an enum;
//! - `{ "$schema": {..} }`, `{ "$ref": "Name" }` or a plain object without
//!   `type` is an embedded subdocument;
//! - anything else is a scalar type token.
pub mod naming;

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::ir::{self, EnumDef, EnumValueDef, FieldDef, ObjectDef, TypeRef, TypeRegistry};
use crate::scalars;

use naming::{enum_key, enum_type_name, nested_type_name, root_type_name};

const RESERVED_KEYS: [&str; 4] = ["__v", "_id", "id", "idoptions"];
const SCHEMA_KEY: &str = "$schema";
const REF_KEY: &str = "$ref";

static NULL: Value = Value::Null;

// ------------------------------- Errors ----------------------------------- //

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalkError {
    #[error("unknown schema `{0}`")]
    UnknownSchema(String),
    #[error("schema `{0}` is not an object")]
    NotAnObject(String),
    #[error("cyclic schema reference: {}", .path.join(" -> "))]
    CyclicSchema { path: Vec<String> },
}

// ------------------------------- Catalog ---------------------------------- //

/// Named document schemas; `$ref` nodes resolve against it.
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    schemas: IndexMap<String, Value>,
}

impl SchemaCatalog {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, name: impl Into<String>, tree: Value) {
        self.schemas.insert(name.into(), tree);
    }

    /// `{ "User": {..}, "Post": {..} }`
    pub fn from_json(value: Value) -> Result<Self, WalkError> {
        let Value::Object(map) = value else {
            return Err(WalkError::NotAnObject("<catalog>".to_string()));
        };
        Ok(Self { schemas: map.into_iter().collect() })
    }

    pub fn get(&self, name: &str) -> Option<&Value> { self.schemas.get(name) }
    pub fn names(&self) -> impl Iterator<Item = &str> { self.schemas.keys().map(String::as_str) }
}

// ------------------------------- Output ----------------------------------- //

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldTarget {
    /// GraphQL scalar name.
    Scalar(String),
    /// Enum definition name, resolved at materialization.
    Enum(String),
    /// Object definition name, resolved at materialization.
    Nested(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkedField {
    pub description: String,
    pub target: FieldTarget,
    pub is_array: bool,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectTypeDef {
    pub name: String,
    pub description: String,
    pub fields: IndexMap<String, WalkedField>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkedSchema {
    pub root: String,
    pub object_type_defs: IndexMap<String, ObjectTypeDef>,
    pub enum_type_defs: IndexMap<String, Vec<String>>,
}

// ------------------------------- Walker ----------------------------------- //

struct Walker<'a> {
    catalog: &'a SchemaCatalog,
    out: WalkedSchema,
    /// Named schemas currently being expanded, outermost first.
    active: Vec<String>,
}

/// Walk a named model from the catalog. The root type is `<Model>Type`.
pub fn walk(catalog: &SchemaCatalog, model: &str) -> Result<WalkedSchema, WalkError> {
    let tree = catalog.get(model).ok_or_else(|| WalkError::UnknownSchema(model.to_string()))?;
    let tree = tree.as_object().ok_or_else(|| WalkError::NotAnObject(model.to_string()))?;
    let root = root_type_name(model);

    let mut walker = Walker {
        catalog,
        out: WalkedSchema { root: root.clone(), ..WalkedSchema::default() },
        active: vec![model.to_string()],
    };
    walker.parse_tree(tree, &root)?;
    tracing::debug!(
        model,
        objects = walker.out.object_type_defs.len(),
        enums = walker.out.enum_type_defs.len(),
        "walked document schema"
    );
    Ok(walker.out)
}

/// Walk a standalone tree with no named sub-schemas.
pub fn walk_tree(model: &str, tree: &Value) -> Result<WalkedSchema, WalkError> {
    let mut catalog = SchemaCatalog::new();
    catalog.insert(model, tree.clone());
    walk(&catalog, model)
}

fn is_reserved(key: &str) -> bool {
    let lower = key.to_lowercase();
    RESERVED_KEYS.contains(&lower.as_str())
}

/// `[elem]` → (`elem`, true). An empty array declares mixed content.
fn unwrap_array(node: &Value) -> (&Value, bool) {
    match node {
        Value::Array(items) => (items.first().unwrap_or(&NULL), true),
        other => (other, false),
    }
}

fn text(map: &Map<String, Value>, key: &str) -> String {
    map.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

fn flag(map: &Map<String, Value>, key: &str) -> bool {
    match map.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Null) | None => false,
        // `required: [true, "message"]` and friends
        Some(_) => true,
    }
}

impl<'a> Walker<'a> {
    fn ensure_object_type(&mut self, name: &str) -> &mut ObjectTypeDef {
        self.out.object_type_defs.entry(name.to_string()).or_insert_with(|| ObjectTypeDef {
            name: name.to_string(),
            description: format!("Generated GraphQL type for {name}"),
            fields: IndexMap::new(),
        })
    }

    fn set_field(&mut self, parent: &str, key: &str, field: WalkedField) {
        self.ensure_object_type(parent).fields.insert(key.to_string(), field);
    }

    fn parse_tree(&mut self, tree: &Map<String, Value>, parent: &str) -> Result<(), WalkError> {
        self.ensure_object_type(parent);
        for (key, node) in tree {
            if is_reserved(key) { continue }
            let (node, is_array) = unwrap_array(node);
            match node {
                Value::Object(map) if !map.contains_key("type") => {
                    let nested = self.parse_subdocument(map, parent, key)?;
                    // the keys are walked as subfields too
                    self.set_field(parent, key, WalkedField {
                        description: text(map, "description"),
                        target: FieldTarget::Nested(nested),
                        is_array,
                        required: flag(map, "required"),
                    });
                }
                Value::Object(map) => self.parse_field_definition(map, parent, key, is_array)?,
                token => {
                    self.set_field(parent, key, WalkedField {
                        description: String::new(),
                        target: FieldTarget::Scalar(map_native_type(token).to_string()),
                        is_array,
                        required: false,
                    });
                }
            }
        }
        Ok(())
    }

    /// A field declared with a `type` key.
    fn parse_field_definition(
        &mut self,
        def: &Map<String, Value>,
        parent: &str,
        key: &str,
        is_array: bool,
    ) -> Result<(), WalkError> {
        let description = text(def, "description");
        let required = flag(def, "required");
        let (inner, inner_array) = unwrap_array(def.get("type").unwrap_or(&NULL));
        let is_array = is_array || inner_array;

        // 1) explicit enum values
        if let Some(Value::Array(values)) = def.get("enum") {
            let name = enum_type_name(parent, key);
            let raw: Vec<String> = values
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect();
            self.out.enum_type_defs.entry(name.clone()).or_insert(raw);
            self.set_field(parent, key, WalkedField {
                description,
                target: FieldTarget::Enum(name),
                is_array,
                required,
            });
            return Ok(());
        }

        // 2) sub-schema or plain nested object
        if let Value::Object(map) = inner {
            if !map.contains_key("type") {
                let nested = self.parse_subdocument(map, parent, key)?;
                self.set_field(parent, key, WalkedField {
                    description,
                    target: FieldTarget::Nested(nested),
                    is_array,
                    required,
                });
                return Ok(());
            }
        }

        // 3) scalar
        self.set_field(parent, key, WalkedField {
            description,
            target: FieldTarget::Scalar(map_native_type(inner).to_string()),
            is_array,
            required,
        });
        Ok(())
    }

    /// Recurse into an embedded document and return its type name.
    fn parse_subdocument(
        &mut self,
        map: &Map<String, Value>,
        parent: &str,
        key: &str,
    ) -> Result<String, WalkError> {
        let nested = nested_type_name(parent, key);

        if let Some(reference) = map.get(REF_KEY).and_then(Value::as_str) {
            if self.active.iter().any(|s| s == reference) {
                let mut path = self.active.clone();
                path.push(reference.to_string());
                return Err(WalkError::CyclicSchema { path });
            }
            let catalog = self.catalog;
            let tree = catalog
                .get(reference)
                .ok_or_else(|| WalkError::UnknownSchema(reference.to_string()))?
                .as_object()
                .ok_or_else(|| WalkError::NotAnObject(reference.to_string()))?;
            self.active.push(reference.to_string());
            let result = self.parse_tree(tree, &nested);
            self.active.pop();
            result?;
            return Ok(nested);
        }

        let tree = match map.get(SCHEMA_KEY) {
            Some(Value::Object(inline)) => inline,
            _ => map,
        };
        self.parse_tree(tree, &nested)?;
        Ok(nested)
    }
}

/// Closest GraphQL scalar for a declared native type token.
pub fn map_native_type(token: &Value) -> &'static str {
    let Some(token) = token.as_str() else { return ir::STRING };
    match token.rsplit('.').next().unwrap_or(token) {
        "Number" | "Decimal128" | "Double" => ir::FLOAT,
        "String" => ir::STRING,
        "Boolean" => ir::BOOLEAN,
        "Date" => scalars::DATE,
        "ObjectId" | "ObjectID" => scalars::OBJECT_ID,
        _ => ir::STRING,
    }
}

// ---------------------------- Materialization ----------------------------- //

impl WalkedSchema {
    /// Concrete enum and object definitions, plus any custom scalars they use.
    pub fn materialize(&self) -> TypeRegistry {
        let mut registry = TypeRegistry::new();

        let mut used_scalars = BTreeSet::new();
        for def in self.object_type_defs.values() {
            for field in def.fields.values() {
                if let FieldTarget::Scalar(name) = &field.target {
                    used_scalars.insert(name.as_str());
                }
            }
        }
        for name in used_scalars {
            if let Some(def) = scalars::builtin(name) {
                registry.insert(def);
            }
        }

        for (name, raw_values) in &self.enum_type_defs {
            let mut values: Vec<EnumValueDef> = Vec::with_capacity(raw_values.len());
            for raw in raw_values {
                let key = enum_key(raw);
                if values.iter().any(|v| v.key == key) {
                    tracing::warn!(enum_name = %name, raw = %raw, key = %key, "duplicate enum key, keeping first");
                    continue;
                }
                values.push(EnumValueDef { key, raw: raw.clone() });
            }
            registry.insert(EnumDef { name: name.clone(), description: None, values });
        }

        for def in self.object_type_defs.values() {
            let mut object = ObjectDef::new(&def.name).description(&def.description);
            for (field_name, field) in &def.fields {
                let base = match &field.target {
                    FieldTarget::Scalar(n) | FieldTarget::Enum(n) | FieldTarget::Nested(n) => TypeRef::named(n),
                };
                let ty = if field.is_array { TypeRef::list(base) } else { base };
                let mut out = FieldDef::new(field_name, ty);
                if !field.description.is_empty() {
                    out.description = Some(field.description.clone());
                }
                object.fields.insert(field_name.clone(), out);
            }
            registry.insert(object);
        }

        registry
    }
}

// ------------------------------- Tests ------------------------------------ //
