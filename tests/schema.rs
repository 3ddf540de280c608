use async_graphql::dynamic::{Field, FieldFuture, FieldValue, InputValue, Object, Schema, TypeRef as DynTypeRef};
use async_graphql::{Request, Variables};
use serde_json::{Value, json};

use doc_gql::fields::definitions_from_json;
use doc_gql::ir::{TypeRef, TypeRegistry};
use doc_gql::lower::{OutputShape, argument, build_schema};
use doc_gql::pagination::paginate;
use doc_gql::populate::populate;
use doc_gql::request::{Identity, RequestInfo};
use doc_gql::scalars::{DATE, OBJECT_ID, ScalarRegistry};
use doc_gql::selection::requested_fields_in;
use doc_gql::store::{Document, MemoryDatabase};
use doc_gql::synth::synthesize;
use doc_gql::walker::walk_tree;

fn doc(v: Value) -> Document {
    v.as_object().cloned().unwrap()
}

async fn seeded() -> MemoryDatabase {
    let db = MemoryDatabase::new();
    db.collection("users")
        .insert_many([doc(json!({"_id": "u7", "name": "Ada", "email": "ada@example.com"}))])
        .await;
    db.collection("posts")
        .insert_many([
            doc(json!({"_id": "p1", "title": "first", "userId": "u7"})),
            doc(json!({"_id": "p2", "title": "second", "userId": "u7"})),
        ])
        .await;
    db.declare_reference("posts", "userId", "users").await;
    db
}

fn registry() -> TypeRegistry {
    let users = definitions_from_json(json!({
        "_id": "ID!",
        "name": "String",
        "email": {"type": "String", "permission": "self"},
    }))
    .unwrap();
    let posts = definitions_from_json(json!({
        "_id": {"type": "ID", "include": ["output"], "required": ["output"]},
        "title": {"type": "String", "required": ["input"]},
        "userId": "ID",
        "user": {"type": "User", "include": ["output"]},
    }))
    .unwrap();
    let mut registry = TypeRegistry::new();
    registry.extend(synthesize("User", &users).into_defs());
    registry.extend(synthesize("Post", &posts).into_defs());
    registry
}

fn schema(db: MemoryDatabase) -> Schema {
    let registry = registry();
    let posts_type: TypeRef = "[Post!]!".parse().unwrap();
    let shape = OutputShape::of(&registry, &posts_type);

    let query = Object::new("Query").field(
        Field::new("posts", doc_gql::lower::type_ref(&posts_type), move |ctx| {
            let db = db.clone();
            let shape = shape.clone();
            FieldFuture::new(async move {
                let requested = requested_fields_in(&ctx);
                let limit = ctx.args.get("limit").map(|v| v.i64()).transpose()?;
                let mut query = db.collection("posts").find(Document::new());
                paginate(&mut query, limit, None)?;
                let result = populate(query, &requested, &["user"]).await?;
                Ok(shape.wrap(result))
            })
        })
        .argument(InputValue::new("limit", DynTypeRef::named(DynTypeRef::INT))),
    );

    build_schema(&registry, query, None).unwrap()
}

async fn run(schema: &Schema, query: &str, info: RequestInfo) -> Value {
    let response = schema.execute(Request::new(query).data(info)).await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    response.data.into_json().unwrap()
}

#[tokio::test]
async fn requested_references_are_populated() {
    let schema = schema(seeded().await);
    let data = run(&schema, "{ posts(limit: 1) { title userId user { name } } }", RequestInfo::anonymous()).await;
    assert_eq!(data, json!({"posts": [{"title": "first", "userId": "u7", "user": {"name": "Ada"}}]}));
}

#[tokio::test]
async fn self_permission_hides_fields_from_others() {
    let schema = schema(seeded().await);
    let query = "{ posts(limit: 1) { user { name email } } }";

    let anonymous = run(&schema, query, RequestInfo::anonymous()).await;
    assert_eq!(anonymous["posts"][0]["user"], json!({"name": "Ada", "email": null}));

    let stranger = RequestInfo::new(Some(Identity(doc(json!({"_id": "u9", "email": "eve@example.com"})))));
    let data = run(&schema, query, stranger).await;
    assert_eq!(data["posts"][0]["user"]["email"], Value::Null);

    let owner = RequestInfo::new(Some(Identity(doc(json!({"_id": "u7", "email": "ada@example.com"})))));
    let data = run(&schema, query, owner).await;
    assert_eq!(data["posts"][0]["user"]["email"], json!("ada@example.com"));
}

#[tokio::test]
async fn pagination_errors_reach_the_client() {
    let schema = schema(seeded().await);
    let response = schema.execute(Request::new("{ posts(limit: 25) { title } }").data(RequestInfo::anonymous())).await;
    assert_eq!(response.errors.len(), 1);
    assert_eq!(response.errors[0].message, "Invalid limit");
}

#[tokio::test]
async fn walked_document_schemas_execute() {
    let walked = walk_tree(
        "Client",
        &json!({
            "name": "String",
            "status": {"type": "String", "enum": ["on-hold", "active"]},
            "address": {"city": "String"},
        }),
    )
    .unwrap();
    let registry = walked.materialize();
    let client_type = TypeRef::named(walked.root.clone());
    let shape = OutputShape::of(&registry, &client_type);

    let query = Object::new("Query").field(Field::new("client", doc_gql::lower::type_ref(&client_type), move |_| {
        let shape = shape.clone();
        FieldFuture::new(async move {
            Ok(shape.wrap(json!({"name": "Acme", "status": "on-hold", "address": {"city": "Oslo"}})))
        })
    }));
    let schema = build_schema(&registry, query, None).unwrap();

    let data = run(&schema, "{ client { name status address { city } } }", RequestInfo::anonymous()).await;
    assert_eq!(data, json!({"client": {"name": "Acme", "status": "ON_HOLD", "address": {"city": "Oslo"}}}));
}

/// `echo(<arg>: <type>)` for each scalar, returning the checked literal.
fn scalar_schema() -> Schema {
    let mut scalars = ScalarRegistry::new();
    let rating = scalars.int_range(1, 10);
    let mut registry = TypeRegistry::new();
    registry.extend(scalars.definitions());

    let mut query = Object::new("Query");
    for (field, ty, out) in [
        ("rate", rating, DynTypeRef::INT),
        ("day", TypeRef::named(DATE), DynTypeRef::STRING),
        ("record", TypeRef::named(OBJECT_ID), DynTypeRef::STRING),
    ] {
        let reg = registry.clone();
        let arg_ty = ty.clone();
        query = query.field(
            Field::new(field, DynTypeRef::named(out), move |ctx| {
                let checked = argument(&ctx, &reg, "value", &arg_ty);
                FieldFuture::new(async move { Ok(checked?.map(FieldValue::value)) })
            })
            .argument(InputValue::new("value", doc_gql::lower::type_ref(&ty))),
        );
    }
    build_schema(&registry, query, None).unwrap()
}

async fn scalar_errors(schema: &Schema, query: &str) -> Vec<String> {
    let response = schema.execute(Request::new(query)).await;
    response.errors.into_iter().map(|e| e.message).collect()
}

#[tokio::test]
async fn int_range_messages_reach_the_client() {
    let schema = scalar_schema();
    assert_eq!(scalar_errors(&schema, "{ rate(value: 25) }").await, ["Value must be between 1 and 10"]);
    assert_eq!(scalar_errors(&schema, r#"{ rate(value: "x") }"#).await, ["Expected an integer value"]);
    let from_variable = schema
        .execute(
            Request::new("query($v: IntRangeType1_10) { rate(value: $v) }")
                .variables(Variables::from_json(json!({"v": 25}))),
        )
        .await;
    assert_eq!(from_variable.errors[0].message, "Value must be between 1 and 10");

    let response = schema.execute(Request::new("{ rate(value: 7) }")).await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    assert_eq!(response.data.into_json().unwrap(), json!({"rate": 7}));
}

#[tokio::test]
async fn date_and_object_id_literals_are_checked() {
    let schema = scalar_schema();
    assert_eq!(
        scalar_errors(&schema, r#"{ day(value: "2023-02-29") }"#).await,
        ["Expected a date string (YYYY-MM-DD)"]
    );
    assert_eq!(
        scalar_errors(&schema, r#"{ record(value: "123") }"#).await,
        ["Expected a 24 character hex ObjectID"]
    );

    let response = schema
        .execute(Request::new(r#"{ day(value: "2024-02-29") record(value: "507f1f77bcf86cd799439011") }"#))
        .await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    assert_eq!(
        response.data.into_json().unwrap(),
        json!({"day": "2024-02-29", "record": "507f1f77bcf86cd799439011"})
    );
}
