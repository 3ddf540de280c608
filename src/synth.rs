//! Output / input / update views synthesized from one field-definition map.

use indexmap::IndexMap;

use crate::fields::{FieldDefinitions, View};
use crate::ir::{FieldDef, InputFieldDef, InputObjectDef, ObjectDef, Resolver, TypeDef, TypeRef};

#[derive(Debug, Clone)]
pub struct SynthesizedTypes {
    pub output: ObjectDef,
    pub input: InputObjectDef,
    pub update: InputObjectDef,
}

impl SynthesizedTypes {
    pub fn output_fields(&self) -> &IndexMap<String, FieldDef> { &self.output.fields }
    pub fn input_fields(&self) -> &IndexMap<String, InputFieldDef> { &self.input.fields }
    pub fn update_fields(&self) -> &IndexMap<String, InputFieldDef> { &self.update.fields }

    pub fn into_defs(self) -> [TypeDef; 3] {
        [self.output.into(), self.input.into(), self.update.into()]
    }
}

pub fn input_type_name(name: &str) -> String { format!("{name}Input") }
pub fn update_type_name(name: &str) -> String { format!("{name}UpdateInput") }

pub fn synthesize(name: &str, definitions: &FieldDefinitions) -> SynthesizedTypes {
    let mut output = ObjectDef::new(name).description(format!("{name} output type"));
    let mut input = InputObjectDef::new(input_type_name(name));
    input.description = Some(format!("Input type for creating a new {name}"));
    let mut update = InputObjectDef::new(update_type_name(name));
    update.description = Some(format!("Input type for updating an existing {name}"));

    for (field_name, config) in definitions {
        let view_type = |view: View| -> TypeRef {
            let ty = config.types.for_view(view).clone();
            if config.requires(view) { ty.non_null() } else { ty }
        };

        if config.includes(View::Output) {
            // a custom resolver wins over a permission gate
            let resolver = match (&config.resolve, config.permission) {
                (Some(custom), _) => Resolver::Custom(custom.clone()),
                (None, Some(permission)) => Resolver::Permission(permission),
                (None, None) => Resolver::Property,
            };
            let field = FieldDef {
                name: field_name.clone(),
                ty: view_type(View::Output),
                description: config.description.clone(),
                resolver,
            };
            output.fields.insert(field_name.clone(), field);
        }

        for (view, target) in [(View::Input, &mut input), (View::Update, &mut update)] {
            if !config.includes(view) { continue }
            let field = InputFieldDef {
                name: field_name.clone(),
                ty: view_type(view),
                description: config.description.clone(),
            };
            target.fields.insert(field_name.clone(), field);
        }
    }

    tracing::debug!(
        name,
        output = output.fields.len(),
        input = input.fields.len(),
        update = update.fields.len(),
        "synthesized types"
    );

    SynthesizedTypes { output, input, update }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{FieldConfig, FieldTypes};
    use crate::ir::{Permission, STRING};
    use std::sync::Arc;

    fn defs(entries: Vec<(&str, FieldConfig)>) -> FieldDefinitions {
        entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn output_only_required_field_is_absent_elsewhere() {
        let d = defs(vec![(
            "createdAt",
            FieldConfig::single(TypeRef::named(STRING)).include(&[View::Output]).required(&[View::Output]),
        )]);
        let t = synthesize("Client", &d);
        assert_eq!(t.output_fields()["createdAt"].ty.to_string(), "String!");
        assert!(t.input_fields().is_empty());
        assert!(t.update_fields().is_empty());
    }

    #[test]
    fn names_and_descriptions_follow_convention() {
        let t = synthesize("Client", &defs(vec![("name", FieldConfig::single(TypeRef::named(STRING)))]));
        assert_eq!(t.output.name, "Client");
        assert_eq!(t.input.name, "ClientInput");
        assert_eq!(t.update.name, "ClientUpdateInput");
        assert_eq!(t.output.description.as_deref(), Some("Client output type"));
        assert_eq!(t.update.description.as_deref(), Some("Input type for updating an existing Client"));
    }

    #[test]
    fn requiredness_is_per_view() {
        let d = defs(vec![(
            "name",
            FieldConfig::single(TypeRef::named(STRING)).required(&[View::Input]),
        )]);
        let t = synthesize("Client", &d);
        assert_eq!(t.input_fields()["name"].ty.to_string(), "String!");
        assert_eq!(t.update_fields()["name"].ty.to_string(), "String");
        assert_eq!(t.output_fields()["name"].ty.to_string(), "String");
    }

    #[test]
    fn distinct_types_pick_per_view() {
        let d = defs(vec![(
            "owner",
            FieldConfig::new(FieldTypes::Distinct {
                input: TypeRef::named("ID"),
                output: TypeRef::named("User"),
                update: Some(TypeRef::named("OwnerUpdate")),
            }),
        )]);
        let t = synthesize("Post", &d);
        assert_eq!(t.output_fields()["owner"].ty.to_string(), "User");
        assert_eq!(t.input_fields()["owner"].ty.to_string(), "ID");
        assert_eq!(t.update_fields()["owner"].ty.to_string(), "OwnerUpdate");
    }

    #[test]
    fn custom_resolver_takes_precedence_over_permission() {
        let custom: crate::ir::CustomResolver = Arc::new(|p: crate::ir::ResolveParams<'_>| p.source.get("x").cloned());
        let d = defs(vec![
            ("email", FieldConfig::single(TypeRef::named(STRING)).permission(Permission::SelfOnly)),
            (
                "x",
                FieldConfig::single(TypeRef::named(STRING)).permission(Permission::LoggedIn).resolve(custom),
            ),
        ]);
        let t = synthesize("User", &d);
        assert!(matches!(t.output_fields()["email"].resolver, Resolver::Permission(Permission::SelfOnly)));
        assert!(matches!(t.output_fields()["x"].resolver, Resolver::Custom(_)));
    }
}
