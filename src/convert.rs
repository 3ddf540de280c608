//! Output → input type conversion.
//!
//! Mirrors an object type's field shape as an input object: resolvers are
//! dropped, list/non-null wrappers are kept, scalars and enums pass through,
//! nested objects are converted recursively. Fields that cannot be expressed as
//! input are left out.
//!
//! Cycles terminate because a type is registered in the cache (empty) before
//! its fields are converted; a reference back to it resolves to that entry.

use indexmap::IndexMap;

use crate::ir::{InputFieldDef, InputObjectDef, ObjectDef, TypeDef, TypeKind, TypeRef, TypeRegistry};

/// Generated input types by name, for one top-level conversion.
#[derive(Debug, Clone, Default)]
pub struct InputTypeCache {
    types: IndexMap<String, InputObjectDef>,
}

impl InputTypeCache {
    pub fn new() -> Self { Self::default() }
    pub fn get(&self, name: &str) -> Option<&InputObjectDef> { self.types.get(name) }
    pub fn contains(&self, name: &str) -> bool { self.types.contains_key(name) }
    pub fn len(&self) -> usize { self.types.len() }
    pub fn is_empty(&self) -> bool { self.types.is_empty() }

    pub fn into_types(self) -> impl Iterator<Item = TypeDef> {
        self.types.into_values().map(TypeDef::InputObject)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputConversion {
    /// Name of the input type, registered in the cache.
    pub input_type: String,
    /// Fields converted by this call; empty when the type came from the cache.
    pub input_fields: IndexMap<String, InputFieldDef>,
}

pub fn input_type_name(base: &str) -> String { format!("{base}InputType") }

/// Convert `output` into an input type named `<name | output.name>InputType`.
pub fn to_input(
    registry: &TypeRegistry,
    output: &ObjectDef,
    name: Option<&str>,
    cache: &mut InputTypeCache,
) -> InputConversion {
    let input_name = input_type_name(name.unwrap_or(&output.name));

    if cache.contains(&input_name) {
        return InputConversion { input_type: input_name, input_fields: IndexMap::new() };
    }

    // placeholder first, so self references find it
    let mut placeholder = InputObjectDef::new(&input_name);
    placeholder.description = Some(format!("Input version of the {} type", output.name));
    cache.types.insert(input_name.clone(), placeholder);

    let mut input_fields = IndexMap::new();
    for (field_name, field) in &output.fields {
        match convert_type(registry, &field.ty, cache) {
            Some(ty) => {
                let converted = InputFieldDef { name: field_name.clone(), ty, description: field.description.clone() };
                input_fields.insert(field_name.clone(), converted);
            }
            None => tracing::trace!(type_name = %output.name, field = %field_name, "field has no input form, omitted"),
        }
    }

    if let Some(entry) = cache.types.get_mut(&input_name) {
        entry.fields = input_fields.clone();
    }

    InputConversion { input_type: input_name, input_fields }
}

fn convert_type(registry: &TypeRegistry, ty: &TypeRef, cache: &mut InputTypeCache) -> Option<TypeRef> {
    match ty {
        TypeRef::NonNull(inner) => convert_type(registry, inner, cache).map(TypeRef::non_null),
        TypeRef::List(inner) => convert_type(registry, inner, cache).map(TypeRef::list),
        TypeRef::Named(name) => match registry.kind_of(name)? {
            TypeKind::Scalar | TypeKind::Enum => Some(ty.clone()),
            TypeKind::Object => {
                let object = registry.object(name)?;
                let conversion = to_input(registry, object, Some(name), cache);
                Some(TypeRef::Named(conversion.input_type))
            }
            TypeKind::InputObject => None,
        },
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{FieldDef, ID, STRING};

    fn node_registry() -> TypeRegistry {
        let mut reg = TypeRegistry::new();
        reg.insert(
            ObjectDef::new("Node")
                .field(FieldDef::new("id", TypeRef::named(ID).non_null()))
                .field(FieldDef::new("parent", TypeRef::named("Node")))
                .field(FieldDef::new("children", TypeRef::list(TypeRef::named("Node").non_null())))
                .field(FieldDef::new("tag", TypeRef::named("Tag")))
                .field(FieldDef::new("weird", TypeRef::named("NodeFilter")))
                .field(FieldDef::new("ghost", TypeRef::named("Unknown"))),
        );
        reg.insert(ObjectDef::new("Tag").field(FieldDef::new("label", TypeRef::named(STRING))));
        reg.insert(InputObjectDef::new("NodeFilter"));
        reg
    }

    #[test]
    fn self_reference_terminates_with_one_shared_type() {
        let reg = node_registry();
        let mut cache = InputTypeCache::new();
        let out = to_input(&reg, reg.object("Node").unwrap(), None, &mut cache);

        assert_eq!(out.input_type, "NodeInputType");
        assert_eq!(out.input_fields["id"].ty.to_string(), "ID!");
        assert_eq!(out.input_fields["parent"].ty.to_string(), "NodeInputType");
        assert_eq!(out.input_fields["children"].ty.to_string(), "[NodeInputType!]");
        assert_eq!(out.input_fields["tag"].ty.to_string(), "TagInputType");

        // one entry per type, the self reference included
        assert_eq!(cache.len(), 2);
        let node = cache.get("NodeInputType").unwrap();
        assert_eq!(node.fields.len(), 4);
        assert_eq!(node.description.as_deref(), Some("Input version of the Node type"));
    }

    #[test]
    fn unconvertible_fields_are_omitted() {
        let reg = node_registry();
        let mut cache = InputTypeCache::new();
        let out = to_input(&reg, reg.object("Node").unwrap(), None, &mut cache);
        assert!(!out.input_fields.contains_key("weird"));
        assert!(!out.input_fields.contains_key("ghost"));
    }

    #[test]
    fn cache_hit_returns_same_name_without_fields() {
        let reg = node_registry();
        let mut cache = InputTypeCache::new();
        let first = to_input(&reg, reg.object("Tag").unwrap(), None, &mut cache);
        let second = to_input(&reg, reg.object("Tag").unwrap(), None, &mut cache);
        assert_eq!(first.input_type, second.input_type);
        assert!(second.input_fields.is_empty());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn explicit_name_overrides_type_name() {
        let reg = node_registry();
        let mut cache = InputTypeCache::new();
        let out = to_input(&reg, reg.object("Tag").unwrap(), Some("Label"), &mut cache);
        assert_eq!(out.input_type, "LabelInputType");
        assert_eq!(cache.into_types().count(), 1);
    }
}
