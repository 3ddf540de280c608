//! Field definitions: shorthand or structured, normalized to one shape.

use std::fmt;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::ir::{CustomResolver, Permission, STRING, TypeRef};

// ------------------------------- Types ------------------------------------ //

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Input,
    Output,
    Update,
}

pub const ALL_VIEWS: [View; 3] = [View::Input, View::Output, View::Update];

#[derive(Debug, Clone, PartialEq)]
pub enum FieldTypes {
    /// One type shared by every view.
    Single(TypeRef),
    /// Per-view types; `update` falls back to `input`.
    Distinct {
        input: TypeRef,
        output: TypeRef,
        update: Option<TypeRef>,
    },
}

impl FieldTypes {
    pub fn for_view(&self, view: View) -> &TypeRef {
        match self {
            FieldTypes::Single(ty) => ty,
            FieldTypes::Distinct { input, output, update } => match view {
                View::Input => input,
                View::Output => output,
                View::Update => update.as_ref().unwrap_or(input),
            },
        }
    }
}

#[derive(Clone)]
pub struct FieldConfig {
    pub description: Option<String>,
    pub include: Vec<View>,
    pub required: Vec<View>,
    pub permission: Option<Permission>,
    pub resolve: Option<CustomResolver>,
    pub types: FieldTypes,
}

impl FieldConfig {
    pub fn new(types: FieldTypes) -> Self {
        Self {
            description: None,
            include: ALL_VIEWS.to_vec(),
            required: Vec::new(),
            permission: None,
            resolve: None,
            types,
        }
    }

    pub fn single(ty: TypeRef) -> Self { Self::new(FieldTypes::Single(ty)) }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
    pub fn include(mut self, views: &[View]) -> Self {
        self.include = views.to_vec();
        self
    }
    pub fn required(mut self, views: &[View]) -> Self {
        self.required = views.to_vec();
        self
    }
    pub fn permission(mut self, permission: Permission) -> Self {
        self.permission = Some(permission);
        self
    }
    pub fn resolve(mut self, resolve: CustomResolver) -> Self {
        self.resolve = Some(resolve);
        self
    }

    pub fn includes(&self, view: View) -> bool { self.include.contains(&view) }
    pub fn requires(&self, view: View) -> bool { self.required.contains(&view) }
}

impl fmt::Debug for FieldConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldConfig")
            .field("description", &self.description)
            .field("include", &self.include)
            .field("required", &self.required)
            .field("permission", &self.permission)
            .field("resolve", &self.resolve.as_ref().map(|_| ".."))
            .field("types", &self.types)
            .finish()
    }
}

impl PartialEq for FieldConfig {
    // custom resolvers compare by identity
    fn eq(&self, other: &Self) -> bool {
        let same_resolve = match (&self.resolve, &other.resolve) {
            (None, None) => true,
            (Some(a), Some(b)) => std::sync::Arc::ptr_eq(a, b),
            _ => false,
        };
        same_resolve
            && self.description == other.description
            && self.include == other.include
            && self.required == other.required
            && self.permission == other.permission
            && self.types == other.types
    }
}

/// A field as written by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSpec {
    Bare(TypeRef),
    Structured(FieldConfig),
}

impl From<TypeRef> for FieldSpec { fn from(ty: TypeRef) -> Self { FieldSpec::Bare(ty) } }
impl From<FieldConfig> for FieldSpec { fn from(c: FieldConfig) -> Self { FieldSpec::Structured(c) } }

pub type FieldDefinitions = IndexMap<String, FieldConfig>;

pub fn normalize(spec: FieldSpec) -> FieldConfig {
    match spec {
        FieldSpec::Bare(ty) => FieldConfig::single(ty),
        FieldSpec::Structured(config) => config,
    }
}

pub fn normalize_all<I, K>(specs: I) -> FieldDefinitions
where
    I: IntoIterator<Item = (K, FieldSpec)>,
    K: Into<String>,
{
    specs.into_iter().map(|(k, spec)| (k.into(), normalize(spec))).collect()
}

// ----------------------------- Deserialize -------------------------------- //

#[derive(Debug, thiserror::Error)]
pub enum FieldConfigError {
    #[error("field `{0}` declares both `type` and `distinctTypes`")]
    ConflictingTypes(String),
    #[error("field `{field}` at `{path}`: {message}")]
    Invalid { field: String, path: String, message: String },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct RawFieldConfig {
    description: Option<String>,
    include: Option<Vec<View>>,
    required: Option<Vec<View>>,
    permission: Option<Permission>,
    #[serde(rename = "type")]
    ty: Option<TypeRef>,
    distinct_types: Option<RawDistinctTypes>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDistinctTypes {
    input: TypeRef,
    output: TypeRef,
    update: Option<TypeRef>,
}

impl RawFieldConfig {
    fn into_config(self, name: &str) -> Result<FieldConfig, FieldConfigError> {
        let types = match (self.ty, self.distinct_types) {
            (Some(_), Some(_)) => return Err(FieldConfigError::ConflictingTypes(name.to_string())),
            (Some(ty), None) => FieldTypes::Single(ty),
            (None, Some(d)) => FieldTypes::Distinct { input: d.input, output: d.output, update: d.update },
            (None, None) => {
                tracing::warn!(field = name, "no `type` declared, treating as {STRING}");
                FieldTypes::Single(TypeRef::named(STRING))
            }
        };
        let mut config = FieldConfig::new(types);
        config.description = self.description;
        if let Some(include) = self.include { config.include = include; }
        config.required = self.required.unwrap_or_default();
        config.permission = self.permission;
        Ok(config)
    }
}

fn invalid(field: &str, err: serde_path_to_error::Error<serde_json::Error>) -> FieldConfigError {
    FieldConfigError::Invalid {
        field: field.to_string(),
        path: err.path().to_string(),
        message: err.into_inner().to_string(),
    }
}

/// One field: a type token, or a structured object.
fn field_spec(name: &str, value: serde_json::Value) -> Result<FieldSpec, FieldConfigError> {
    if value.is_object() {
        let raw: RawFieldConfig = serde_path_to_error::deserialize(value).map_err(|e| invalid(name, e))?;
        raw.into_config(name).map(FieldSpec::Structured)
    } else {
        serde_path_to_error::deserialize(value).map(FieldSpec::Bare).map_err(|e| invalid(name, e))
    }
}

/// Parse a JSON object of field definitions (`name -> type | {type, ...}`).
pub fn definitions_from_json(value: serde_json::Value) -> Result<FieldDefinitions, FieldConfigError> {
    let raw: IndexMap<String, serde_json::Value> = serde_json::from_value(value)?;
    let mut out = FieldDefinitions::with_capacity(raw.len());
    for (name, value) in raw {
        let spec = field_spec(&name, value)?;
        out.insert(name, normalize(spec));
    }
    Ok(out)
}

// ------------------------------- Tests ------------------------------------ //
