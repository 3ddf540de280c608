//! Build-time composition of type definitions.
//!
//! Fields are added to or removed from definitions while they are still in the
//! registry; once lowered into the GraphQL engine the types are frozen.
//! Misuse is logged and reported through the `bool` result, never panics.

use crate::ir::{FieldDef, TypeDef, TypeKind, TypeRegistry};

#[derive(Debug, Clone, Default)]
pub struct TypeComposer {
    registry: TypeRegistry,
}

impl TypeComposer {
    pub fn new(registry: TypeRegistry) -> Self { Self { registry } }

    pub fn registry(&self) -> &TypeRegistry { &self.registry }

    /// Add (or overwrite) a field on an object type.
    pub fn add_field(&mut self, type_name: &str, field: FieldDef) -> bool {
        if field.name.is_empty() {
            tracing::error!("Cannot add field: Field definition must include 'name' and 'type'.");
            return false;
        }
        match self.registry.kind_of(field.ty.base_name()) {
            Some(TypeKind::InputObject) => {
                tracing::error!(
                    "Cannot add field \"{}\": Provided type is not a valid output type.",
                    field.name
                );
                return false;
            }
            None => tracing::debug!(field = %field.name, ty = %field.ty, "field type not declared yet"),
            _ => {}
        }
        let Some(TypeDef::Object(object)) = self.registry.get_mut(type_name) else {
            tracing::error!("Cannot add field: Target type \"{type_name}\" is not an object type.");
            return false;
        };
        if object.fields.contains_key(&field.name) {
            tracing::warn!("Field \"{}\" already exists on type \"{type_name}\". Overwriting.", field.name);
        }
        tracing::debug!(field = %field.name, type_name, "added field");
        object.fields.insert(field.name.clone(), field);
        true
    }

    /// Remove a field from an object type; false when there was nothing to remove.
    pub fn remove_field(&mut self, type_name: &str, field_name: &str) -> bool {
        if field_name.is_empty() {
            tracing::error!("Cannot remove field: Field name must be provided.");
            return false;
        }
        let Some(TypeDef::Object(object)) = self.registry.get_mut(type_name) else {
            tracing::error!("Cannot remove field: Target type \"{type_name}\" is not an object type.");
            return false;
        };
        if object.fields.shift_remove(field_name).is_none() {
            tracing::warn!("Field \"{field_name}\" does not exist on type \"{type_name}\".");
            return false;
        }
        true
    }

    /// Wrap an input field's type in NonNull; false when the field is missing.
    pub fn make_input_field_required(&mut self, type_name: &str, field_name: &str) -> bool {
        let Some(TypeDef::InputObject(input)) = self.registry.get_mut(type_name) else {
            tracing::error!("Cannot make field required: \"{type_name}\" is not an input type.");
            return false;
        };
        let Some(field) = input.fields.get_mut(field_name) else {
            tracing::warn!("Field \"{field_name}\" not found in input fields. Cannot make required.");
            return false;
        };
        if field.ty.is_non_null() {
            tracing::info!("Input field \"{field_name}\" is already required.");
        } else {
            field.ty = field.ty.clone().non_null();
        }
        true
    }

    pub fn finish(self) -> TypeRegistry { self.registry }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{InputFieldDef, InputObjectDef, ObjectDef, TypeRef, ID, STRING};

    fn composer() -> TypeComposer {
        let mut reg = TypeRegistry::new();
        reg.insert(ObjectDef::new("User").field(FieldDef::new("name", TypeRef::named(STRING))));
        let mut input = InputObjectDef::new("UserInput");
        input.fields.insert("name".into(), InputFieldDef::new("name", TypeRef::named(STRING)));
        reg.insert(input);
        TypeComposer::new(reg)
    }

    #[test]
    fn add_and_remove_fields() {
        let mut c = composer();
        assert!(c.add_field("User", FieldDef::new("id", TypeRef::named(ID))));
        assert!(c.add_field("User", FieldDef::new("name", TypeRef::named(ID))));
        assert!(c.remove_field("User", "id"));
        assert!(!c.remove_field("User", "id"));
        let reg = c.finish();
        let user = reg.object("User").unwrap();
        assert_eq!(user.fields.len(), 1);
        assert_eq!(user.fields["name"].ty.to_string(), "ID");
    }

    #[test]
    fn misuse_returns_false() {
        let mut c = composer();
        assert!(!c.add_field("UserInput", FieldDef::new("x", TypeRef::named(STRING))));
        assert!(!c.add_field("Missing", FieldDef::new("x", TypeRef::named(STRING))));
        assert!(!c.add_field("User", FieldDef::new("", TypeRef::named(STRING))));
        assert!(!c.add_field("User", FieldDef::new("filter", TypeRef::named("UserInput"))));
        assert!(!c.remove_field("User", ""));
        assert!(!c.remove_field("UserInput", "name"));
    }

    #[test]
    fn input_fields_become_required_once() {
        let mut c = composer();
        assert!(c.make_input_field_required("UserInput", "name"));
        assert!(c.make_input_field_required("UserInput", "name"));
        assert!(!c.make_input_field_required("UserInput", "nope"));
        assert!(!c.make_input_field_required("User", "name"));
        let reg = c.finish();
        assert_eq!(reg.input_object("UserInput").unwrap().fields["name"].ty.to_string(), "String!");
    }
}
