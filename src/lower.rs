//! Lower the type registry into `async_graphql::dynamic` types.
//!
//! Object values travel through the engine as owned `serde_json::Value`s; each
//! field resolver reads its key from the parent and wraps the result according
//! to the field's declared type (enum keys, nested objects, lists).

use std::sync::Arc;

use async_graphql::dynamic::{
    Enum, EnumItem, Field, FieldFuture, FieldValue, InputObject, InputValue, Object, ResolverContext, Scalar,
    Schema, SchemaBuilder, SchemaError, Type, TypeRef as DynTypeRef,
};
use async_graphql::{Name, Value as GqlValue};
use serde_json::Value;

use crate::ir::{
    EnumDef, FieldDef, InputObjectDef, ObjectDef, Permission, ResolveParams, Resolver, ScalarDef, TypeDef, TypeRef,
    TypeRegistry,
};
use crate::request::RequestInfo;

static NULL: Value = Value::Null;

pub fn type_ref(ty: &TypeRef) -> DynTypeRef {
    match ty {
        TypeRef::Named(name) => DynTypeRef::Named(name.clone().into()),
        TypeRef::List(inner) => DynTypeRef::List(Box::new(type_ref(inner))),
        TypeRef::NonNull(inner) => DynTypeRef::NonNull(Box::new(type_ref(inner))),
    }
}

// ------------------------------- Shapes ----------------------------------- //

/// How a raw JSON value is handed to the engine for a given output type.
#[derive(Debug, Clone)]
pub enum OutputShape {
    Leaf,
    Enum(Arc<EnumDef>),
    Object,
    List(Box<OutputShape>),
}

impl OutputShape {
    pub fn of(registry: &TypeRegistry, ty: &TypeRef) -> Self {
        match ty {
            TypeRef::NonNull(inner) => Self::of(registry, inner),
            TypeRef::List(inner) => OutputShape::List(Box::new(Self::of(registry, inner))),
            TypeRef::Named(name) => match registry.get(name) {
                Some(TypeDef::Enum(e)) => OutputShape::Enum(Arc::new(e.clone())),
                Some(TypeDef::Object(_)) => OutputShape::Object,
                _ => OutputShape::Leaf,
            },
        }
    }

    /// None for null, and for values that do not fit the shape.
    pub fn wrap<'a>(&self, value: Value) -> Option<FieldValue<'a>> {
        if value.is_null() {
            return None;
        }
        match self {
            OutputShape::Leaf => match GqlValue::from_json(value) {
                Ok(v) => Some(FieldValue::value(v)),
                Err(err) => {
                    tracing::warn!(%err, "value not representable in GraphQL");
                    None
                }
            },
            OutputShape::Enum(def) => {
                let raw = match &value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                match def.key_for(&raw) {
                    Some(key) => Some(FieldValue::value(GqlValue::Enum(Name::new(key)))),
                    None => {
                        tracing::warn!(enum_name = %def.name, raw, "stored value is not an enum member");
                        None
                    }
                }
            }
            OutputShape::Object => Some(FieldValue::owned_any(value)),
            OutputShape::List(inner) => match value {
                Value::Array(items) => Some(FieldValue::list(
                    items.into_iter().map(|item| inner.wrap(item).unwrap_or(FieldValue::NULL)),
                )),
                _ => None,
            },
        }
    }
}

// ------------------------------ Resolvers --------------------------------- //

fn permitted(permission: Permission, source: &Value, request: Option<&RequestInfo>) -> bool {
    match permission {
        Permission::SelfOnly => request.is_some_and(|r| r.owns(source)),
        Permission::LoggedIn => request.is_some_and(RequestInfo::is_logged_in),
    }
}

fn arguments_json(ctx: &ResolverContext<'_>) -> Value {
    let args = GqlValue::Object(ctx.args.as_index_map().clone());
    args.into_json().unwrap_or(Value::Null)
}

fn resolve_raw(field: &FieldDef, ctx: &ResolverContext<'_>) -> Option<Value> {
    let source = ctx.parent_value.downcast_ref::<Value>().unwrap_or(&NULL);
    let request = ctx.ctx.data_opt::<RequestInfo>();
    match &field.resolver {
        Resolver::Property => source.get(&field.name).cloned(),
        Resolver::Permission(permission) => {
            if permitted(*permission, source, request) {
                source.get(&field.name).cloned()
            } else {
                tracing::debug!(field = %field.name, ?permission, "permission denied, resolving to null");
                None
            }
        }
        Resolver::Custom(resolve) => {
            let args = arguments_json(ctx);
            resolve(ResolveParams { field: &field.name, source, args: &args, request })
        }
    }
}

fn lower_field(registry: &TypeRegistry, field: &FieldDef) -> Field {
    let shape = Arc::new(OutputShape::of(registry, &field.ty));
    let def = Arc::new(field.clone());
    let mut out = Field::new(field.name.clone(), type_ref(&field.ty), move |ctx| {
        let value = resolve_raw(&def, &ctx).and_then(|v| shape.wrap(v));
        FieldFuture::new(async move { Ok(value) })
    });
    if let Some(description) = &field.description {
        out = out.description(description.clone());
    }
    out
}

// ------------------------------ Arguments --------------------------------- //

/// Run the custom scalar validators reachable from `ty` over `value`,
/// descending into lists and registry input objects.
pub fn check_input(registry: &TypeRegistry, ty: &TypeRef, value: &GqlValue) -> Result<(), String> {
    match (ty, value) {
        (_, GqlValue::Null) => Ok(()),
        (TypeRef::NonNull(inner), _) => check_input(registry, inner, value),
        (TypeRef::List(inner), GqlValue::List(items)) => {
            items.iter().try_for_each(|item| check_input(registry, inner, item))
        }
        // a single value is coerced to a one-element list
        (TypeRef::List(inner), _) => check_input(registry, inner, value),
        (TypeRef::Named(name), _) => match registry.get(name) {
            Some(TypeDef::Scalar(ScalarDef { validator: Some(validator), .. })) => validator(value),
            Some(TypeDef::InputObject(def)) => match value {
                GqlValue::Object(fields) => def.fields.values().try_for_each(|field| {
                    match fields.get(field.name.as_str()) {
                        Some(v) => check_input(registry, &field.ty, v),
                        None => Ok(()),
                    }
                }),
                _ => Ok(()),
            },
            _ => Ok(()),
        },
    }
}

/// Read argument `name`, declared as `ty`, with custom scalars validated.
/// A rejected literal fails the field with the scalar's own message.
pub fn argument(
    ctx: &ResolverContext<'_>,
    registry: &TypeRegistry,
    name: &str,
    ty: &TypeRef,
) -> async_graphql::Result<Option<GqlValue>> {
    let Some(accessor) = ctx.args.get(name) else { return Ok(None) };
    let value = accessor.as_value();
    check_input(registry, ty, value).map_err(|message| {
        tracing::debug!(argument = name, %message, "argument rejected");
        async_graphql::Error::new(message)
    })?;
    Ok(Some(value.clone()))
}

// ------------------------------- Types ------------------------------------ //

fn lower_object(registry: &TypeRegistry, def: &ObjectDef) -> Object {
    let mut object = Object::new(def.name.clone());
    if let Some(description) = &def.description {
        object = object.description(description.clone());
    }
    for field in def.fields.values() {
        object = object.field(lower_field(registry, field));
    }
    object
}

fn lower_input(def: &InputObjectDef) -> InputObject {
    let mut input = InputObject::new(def.name.clone());
    if let Some(description) = &def.description {
        input = input.description(description.clone());
    }
    for field in def.fields.values() {
        let mut value = InputValue::new(field.name.clone(), type_ref(&field.ty));
        if let Some(description) = &field.description {
            value = value.description(description.clone());
        }
        input = input.field(value);
    }
    input
}

fn lower_enum(def: &EnumDef) -> Enum {
    let mut out = Enum::new(def.name.clone());
    if let Some(description) = &def.description {
        out = out.description(description.clone());
    }
    out.items(def.values.iter().map(|v| EnumItem::new(v.key.clone())))
}

// No engine-side validator: it can only answer yes/no, so a rejected literal
// would lose the scalar's message. `argument` checks it instead.
fn lower_scalar(def: &ScalarDef) -> Scalar {
    let mut scalar = Scalar::new(def.name.clone());
    if let Some(description) = &def.description {
        scalar = scalar.description(description.clone());
    }
    scalar
}

pub fn lower_type(registry: &TypeRegistry, def: &TypeDef) -> Type {
    match def {
        TypeDef::Scalar(s) => Type::Scalar(lower_scalar(s)),
        TypeDef::Enum(e) => Type::Enum(lower_enum(e)),
        TypeDef::Object(o) => Type::Object(lower_object(registry, o)),
        TypeDef::InputObject(i) => Type::InputObject(lower_input(i)),
    }
}

/// Every registry type, in registry order.
pub fn lower(registry: &TypeRegistry) -> Vec<Type> {
    registry.iter().map(|def| lower_type(registry, def)).collect()
}

pub fn register(mut builder: SchemaBuilder, registry: &TypeRegistry) -> SchemaBuilder {
    for ty in lower(registry) {
        builder = builder.register(ty);
    }
    builder
}

/// Schema whose query root is `query` (and mutation root, if given) with
/// every registry type registered alongside.
pub fn build_schema(
    registry: &TypeRegistry,
    query: Object,
    mutation: Option<Object>,
) -> Result<Schema, SchemaError> {
    let query_name = query.type_name().to_string();
    let mutation_name = mutation.as_ref().map(|m| m.type_name().to_string());
    let mut builder = Schema::build(&query_name, mutation_name.as_deref(), None).register(query);
    if let Some(mutation) = mutation {
        builder = builder.register(mutation);
    }
    register(builder, registry).finish()
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{EnumValueDef, InputFieldDef, STRING};
    use crate::scalars::{DATE, ScalarRegistry};
    use serde_json::json;

    fn registry() -> TypeRegistry {
        let mut reg = TypeRegistry::new();
        reg.insert(EnumDef {
            name: "UserRoleEnum".into(),
            description: None,
            values: vec![EnumValueDef { key: "SUPER_ADMIN".into(), raw: "super-admin".into() }],
        });
        reg.insert(ObjectDef::new("User").field(FieldDef::new("name", TypeRef::named(STRING))));
        reg
    }

    #[test]
    fn type_refs_keep_wrapping() {
        let ty: TypeRef = "[User!]!".parse().unwrap();
        assert_eq!(type_ref(&ty).to_string(), "[User!]!");
    }

    #[test]
    fn shapes_follow_registry_kinds() {
        let reg = registry();
        assert!(matches!(OutputShape::of(&reg, &TypeRef::named("User").non_null()), OutputShape::Object));
        assert!(matches!(OutputShape::of(&reg, &TypeRef::named("UserRoleEnum")), OutputShape::Enum(_)));
        assert!(matches!(
            OutputShape::of(&reg, &TypeRef::list(TypeRef::named(STRING))),
            OutputShape::List(inner) if matches!(*inner, OutputShape::Leaf)
        ));
    }

    #[test]
    fn wrapping_drops_null_and_foreign_values() {
        let reg = registry();
        let role = OutputShape::of(&reg, &TypeRef::named("UserRoleEnum"));
        assert!(role.wrap(json!(null)).is_none());
        assert!(role.wrap(json!("nobody")).is_none());
        assert!(role.wrap(json!("super-admin")).is_some());
        let list = OutputShape::of(&reg, &TypeRef::list(TypeRef::named(STRING)));
        assert!(list.wrap(json!("not a list")).is_none());
    }

    #[test]
    fn input_checks_reach_nested_scalars() {
        let mut scalars = ScalarRegistry::new();
        let rating = scalars.int_range(1, 5);
        let mut reg = TypeRegistry::new();
        reg.extend(scalars.definitions());
        let mut review = InputObjectDef::new("ReviewInput");
        review.fields.insert("stars".into(), InputFieldDef::new("stars", rating.clone().non_null()));
        review.fields.insert("on".into(), InputFieldDef::new("on", TypeRef::named(DATE)));
        reg.insert(review);
        let reviews = TypeRef::list(TypeRef::named("ReviewInput"));

        let ok = GqlValue::from_json(json!([{"stars": 4, "on": "2024-01-31"}, {"stars": 1}])).unwrap();
        assert_eq!(check_input(&reg, &reviews, &ok), Ok(()));
        let bad = GqlValue::from_json(json!([{"stars": 4}, {"stars": 9}])).unwrap();
        assert_eq!(check_input(&reg, &reviews, &bad), Err("Value must be between 1 and 5".to_string()));
        let bad_date = GqlValue::from_json(json!({"stars": 2, "on": "31/01/2024"})).unwrap();
        assert_eq!(
            check_input(&reg, &reviews, &bad_date),
            Err("Expected a date string (YYYY-MM-DD)".to_string())
        );
        assert_eq!(check_input(&reg, &rating, &GqlValue::Null), Ok(()));
    }

    #[test]
    fn permissions() {
        let owner = RequestInfo {
            id: 1,
            user: Some(crate::request::Identity(json!({"email": "a@x.io"}).as_object().cloned().unwrap())),
        };
        let record = json!({"email": "a@x.io"});
        assert!(permitted(Permission::SelfOnly, &record, Some(&owner)));
        assert!(!permitted(Permission::SelfOnly, &json!({"email": "b@x.io"}), Some(&owner)));
        assert!(permitted(Permission::LoggedIn, &record, Some(&owner)));
        assert!(!permitted(Permission::LoggedIn, &record, Some(&RequestInfo::anonymous())));
        assert!(!permitted(Permission::LoggedIn, &record, None));
    }
}
