use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use engine::{
    execute, parse_query, Config, ConstValue, Error, ErrorCode, ExecutionParams, FieldDefinition, FieldValue,
    InputValueDefinition, InterfaceType, ObjectType, Resolution, ResolverResult, Response, Schema, UnionType,
    Variables,
};
use indoc::indoc;
use pretty_assertions::assert_eq;
use serde_json::json;

async fn run(schema: &Schema, query: &str) -> Response {
    run_with(schema, query, ExecutionParams::new()).await
}

async fn run_with(schema: &Schema, query: &str, params: ExecutionParams) -> Response {
    let document = parse_query(query).unwrap();
    execute(schema, &document, params).await
}

#[tokio::test]
async fn non_null_error_nulls_the_nearest_nullable_ancestor() {
    let schema = Schema::build("Query", None, None)
        .register(
            ObjectType::new("Query")
                .field(FieldDefinition::new("a", "A!").resolver(|_| Resolution::ok(FieldValue::from_json(json!({}))))),
        )
        .register(
            ObjectType::new("A")
                .field(FieldDefinition::new("b", "String!").resolver(|_| Resolution::err(Error::new("b failed")))),
        )
        .finish()
        .unwrap();

    let response = run(&schema, "{ a { b } }").await;
    insta::assert_json_snapshot!(response, @r#"
    {
      "data": null,
      "errors": [
        {
          "message": "b failed",
          "locations": [
            {
              "line": 1,
              "column": 7
            }
          ],
          "path": [
            "a",
            "b"
          ],
          "extensions": {
            "code": "RESOLVER_ERROR"
          }
        }
      ]
    }
    "#);
}

#[tokio::test]
async fn failing_sibling_does_not_affect_the_others() {
    let schema = Schema::build("Query", None, None)
        .register(
            ObjectType::new("Query")
                .field(FieldDefinition::new("a", "String").resolver(|_| Resolution::ok("x")))
                .field(FieldDefinition::new("b", "String").resolver(|_| Resolution::err(Error::new("b failed")))),
        )
        .finish()
        .unwrap();

    let response = run(&schema, "{ a b }").await;
    insta::assert_json_snapshot!(response, @r#"
    {
      "data": {
        "a": "x",
        "b": null
      },
      "errors": [
        {
          "message": "b failed",
          "locations": [
            {
              "line": 1,
              "column": 5
            }
          ],
          "path": [
            "b"
          ],
          "extensions": {
            "code": "RESOLVER_ERROR"
          }
        }
      ]
    }
    "#);
    assert_eq!(response.status_code(), http::StatusCode::OK);
}

#[tokio::test]
async fn list_items_are_completed_against_the_item_type() {
    let items = || FieldValue::list([Some(1), None, Some(3)]);
    let schema = Schema::build("Query", None, None)
        .register(
            ObjectType::new("Query")
                .field(FieldDefinition::new("nullable", "[Int]").resolver(move |_| Resolution::ok(items())))
                .field(FieldDefinition::new("strict", "[Int!]").resolver(move |_| Resolution::ok(items()))),
        )
        .finish()
        .unwrap();

    let response = run(&schema, "{ nullable }").await;
    insta::assert_json_snapshot!(response, @r#"
    {
      "data": {
        "nullable": [
          1,
          null,
          3
        ]
      }
    }
    "#);

    let response = run(&schema, "{ strict }").await;
    insta::assert_json_snapshot!(response, @r#"
    {
      "data": {
        "strict": null
      },
      "errors": [
        {
          "message": "Cannot return null for non-nullable field Query.strict.",
          "locations": [
            {
              "line": 1,
              "column": 3
            }
          ],
          "path": [
            "strict",
            1
          ],
          "extensions": {
            "code": "VALUE_COMPLETION_ERROR"
          }
        }
      ]
    }
    "#);
}

fn sorted_error_paths(response: &Response) -> Vec<serde_json::Value> {
    let json = response.to_json();
    let mut paths = json["errors"]
        .as_array()
        .map(|errors| errors.iter().map(|error| error["path"].clone()).collect::<Vec<_>>())
        .unwrap_or_default();
    paths.sort_by_key(|path| path.to_string());
    paths
}

#[tokio::test]
async fn every_failing_non_null_sibling_is_recorded() {
    let schema = Schema::build("Query", None, None)
        .register(
            ObjectType::new("Query")
                .field(FieldDefinition::new("a", "A").resolver(|_| Resolution::ok(FieldValue::from_json(json!({}))))),
        )
        .register(
            ObjectType::new("A")
                .field(FieldDefinition::new("x", "String!").resolver(|_| Resolution::err(Error::new("x failed"))))
                .field(
                    FieldDefinition::new("y", "String!")
                        .resolver(|_| Resolution::from_future(async { Err::<FieldValue, _>(Error::new("y failed")) })),
                ),
        )
        .finish()
        .unwrap();

    let response = run(&schema, "{ a { x y } }").await;
    assert_eq!(response.to_json()["data"], json!({"a": null}));
    assert_eq!(response.errors.len(), 2);
    assert_eq!(sorted_error_paths(&response), [json!(["a", "x"]), json!(["a", "y"])]);
}

#[tokio::test]
async fn every_null_item_of_a_non_null_list_is_recorded() {
    let schema = Schema::build("Query", None, None)
        .register(ObjectType::new("Query").field(
            FieldDefinition::new("l", "[Int!]").resolver(|_| Resolution::ok(FieldValue::list([Some(1), None, None]))),
        ))
        .finish()
        .unwrap();

    let response = run(&schema, "{ l }").await;
    assert_eq!(response.to_json()["data"], json!({"l": null}));
    assert_eq!(response.errors.len(), 2);
    assert!(response
        .errors
        .iter()
        .all(|error| error.code == ErrorCode::ValueCompletionError));
    assert_eq!(sorted_error_paths(&response), [json!(["l", 1]), json!(["l", 2])]);
}

#[tokio::test]
async fn arguments_defaults_and_required() {
    let calls = Arc::new(AtomicUsize::new(0));
    let schema = Schema::build("Query", None, None)
        .register(
            ObjectType::new("Query")
                .field(
                    FieldDefinition::new("greet", "String")
                        .argument(InputValueDefinition::new("name", "String").default_value("world"))
                        .resolver(|ctx| match ctx.arg("name") {
                            Some(ConstValue::String(name)) => Resolution::ok(format!("hello {name}")),
                            _ => Resolution::null(),
                        }),
                )
                .field(
                    FieldDefinition::new("required", "String")
                        .argument(InputValueDefinition::new("id", "ID!"))
                        .resolver({
                            let calls = calls.clone();
                            move |_| {
                                calls.fetch_add(1, Ordering::SeqCst);
                                Resolution::ok("called")
                            }
                        }),
                ),
        )
        .finish()
        .unwrap();

    let response = run(&schema, r#"{ greet other: greet(name: "Ada") }"#).await;
    assert_eq!(response.to_json(), json!({"data": {"greet": "hello world", "other": "hello Ada"}}));

    let response = run(&schema, "{ required }").await;
    insta::assert_json_snapshot!(response, @r#"
    {
      "data": {
        "required": null
      },
      "errors": [
        {
          "message": "Argument 'id' of required type ID! was not provided.",
          "locations": [
            {
              "line": 1,
              "column": 3
            }
          ],
          "path": [
            "required"
          ],
          "extensions": {
            "code": "ARGUMENT_ERROR"
          }
        }
      ]
    }
    "#);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let response = run(&schema, r#"{ required(id: "1") }"#).await;
    assert_eq!(response.to_json(), json!({"data": {"required": "called"}}));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

fn respond(asynchronous: bool, result: ResolverResult) -> Resolution<'static> {
    if asynchronous {
        Resolution::from_future(async move {
            tokio::task::yield_now().await;
            result
        })
    } else {
        Resolution::Ready(result)
    }
}

fn blog_schema(asynchronous: bool) -> Schema {
    Schema::build("Query", None, None)
        .register(
            ObjectType::new("Query").field(FieldDefinition::new("posts", "[Post!]!").resolver(move |_| {
                respond(
                    asynchronous,
                    Ok(FieldValue::list([
                        FieldValue::from_json(json!({"id": 1, "title": "First"})),
                        FieldValue::from_json(json!({"id": 2, "title": "Second"})),
                    ])),
                )
            })),
        )
        .register(
            ObjectType::new("Post")
                .field(FieldDefinition::new("id", "Int!"))
                .field(FieldDefinition::new("title", "String").resolver(move |ctx| {
                    let title = ctx.parent.field("title").unwrap_or_default();
                    respond(asynchronous, Ok(title))
                }))
                .field(FieldDefinition::new("author", "String").resolver(move |ctx| {
                    let result = match ctx.parent.field("id").and_then(|id| id.as_value().cloned()) {
                        Some(ConstValue::Number(id)) if id.as_i64() == Some(2) => Err(Error::new("author is gone")),
                        _ => Ok(FieldValue::from("Ada")),
                    };
                    respond(asynchronous, result)
                })),
        )
        .finish()
        .unwrap()
}

#[tokio::test]
async fn synchronous_and_asynchronous_resolvers_are_equivalent() {
    let document = parse_query("{ posts { id title author } }").unwrap();

    let sync_schema = blog_schema(false);
    let execution = execute(&sync_schema, &document, ExecutionParams::new());
    assert!(execution.is_ready());
    let Ok(sync_response) = execution.into_ready() else {
        unreachable!("every resolver is synchronous");
    };

    let async_schema = blog_schema(true);
    let execution = execute(&async_schema, &document, ExecutionParams::new());
    assert!(!execution.is_ready());
    let async_response = execution.await;

    assert_eq!(sync_response, async_response);
    insta::assert_json_snapshot!(async_response, @r#"
    {
      "data": {
        "posts": [
          {
            "id": 1,
            "title": "First",
            "author": "Ada"
          },
          {
            "id": 2,
            "title": "Second",
            "author": null
          }
        ]
      },
      "errors": [
        {
          "message": "author is gone",
          "locations": [
            {
              "line": 1,
              "column": 20
            }
          ],
          "path": [
            "posts",
            1,
            "author"
          ],
          "extensions": {
            "code": "RESOLVER_ERROR"
          }
        }
      ]
    }
    "#);
}

#[tokio::test]
async fn repeated_executions_are_identical() {
    let schema = blog_schema(true);
    let first = run(&schema, "{ posts { title author } }").await;
    let second = run(&schema, "{ posts { title author } }").await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn fragments_and_conditional_selections() {
    let schema = Schema::build("Query", None, None)
        .register(
            ObjectType::new("Query").field(
                FieldDefinition::new("user", "User")
                    .resolver(|_| Resolution::ok(FieldValue::from_json(json!({"id": "1", "name": "Ada"})))),
            ),
        )
        .register(
            ObjectType::new("User")
                .field(FieldDefinition::new("id", "ID!"))
                .field(FieldDefinition::new("name", "String")),
        )
        .finish()
        .unwrap();

    let query = indoc! {r#"
        query User($withName: Boolean!) {
            user {
                ...UserFields
                id @skip(if: true)
                ... on User @include(if: $withName) {
                    name
                }
                alias: name @skip(if: $withName)
            }
        }

        fragment UserFields on User {
            __typename
            id
        }
    "#};

    let response = run_with(
        &schema,
        query,
        ExecutionParams::new().variables(Variables::from_json(json!({"withName": true}))),
    )
    .await;
    assert_eq!(
        response.to_json(),
        json!({"data": {"user": {"__typename": "User", "id": "1", "name": "Ada"}}})
    );

    let response = run_with(
        &schema,
        query,
        ExecutionParams::new().variables(Variables::from_json(json!({"withName": false}))),
    )
    .await;
    assert_eq!(
        response.to_json(),
        json!({"data": {"user": {"__typename": "User", "id": "1", "alias": "Ada"}}})
    );
}

fn search_schema() -> Schema {
    Schema::build("Query", None, None)
        .register(
            ObjectType::new("Query")
                .field(FieldDefinition::new("node", "Node").resolver(|_| {
                    Resolution::ok(FieldValue::from_json(
                        json!({"__typename": "User", "id": "1", "name": "Ada"}),
                    ))
                }))
                .field(FieldDefinition::new("search", "[SearchResult!]!").resolver(|_| {
                    Resolution::ok(FieldValue::list([
                        FieldValue::from_json(json!({"id": "1", "name": "Ada"})).with_type("User"),
                        FieldValue::from_json(json!({"id": "2", "title": "Hello"})).with_type("Post"),
                    ]))
                }))
                .field(
                    FieldDefinition::new("unknown", "Node")
                        .resolver(|_| Resolution::ok(FieldValue::from_json(json!({"id": "3"})))),
                ),
        )
        .register(InterfaceType::new("Node").field(FieldDefinition::new("id", "ID!")))
        .register(UnionType::new("SearchResult").member("User").member("Post"))
        .register(
            ObjectType::new("User")
                .implements("Node")
                .field(FieldDefinition::new("id", "ID!"))
                .field(FieldDefinition::new("name", "String")),
        )
        .register(
            ObjectType::new("Post")
                .implements("Node")
                .field(FieldDefinition::new("id", "ID!"))
                .field(FieldDefinition::new("title", "String")),
        )
        .finish()
        .unwrap()
}

#[tokio::test]
async fn abstract_types_resolve_to_their_runtime_object() {
    let schema = search_schema();
    let query = indoc! {"
        {
            node { __typename id ... on User { name } }
            search {
                __typename
                ... on User { name }
                ... on Post { title }
            }
        }
    "};

    let response = run(&schema, query).await;
    assert_eq!(
        response.to_json(),
        json!({
            "data": {
                "node": {"__typename": "User", "id": "1", "name": "Ada"},
                "search": [
                    {"__typename": "User", "name": "Ada"},
                    {"__typename": "Post", "title": "Hello"}
                ]
            }
        })
    );
}

#[tokio::test]
async fn unresolvable_abstract_type() {
    let schema = search_schema();
    let response = run(&schema, "{ unknown { id } }").await;

    assert_eq!(response.to_json()["data"], json!({"unknown": null}));
    assert_eq!(response.errors.len(), 1);
    assert_eq!(response.errors[0].code, ErrorCode::TypeResolutionError);
    assert_eq!(response.errors[0].path.as_ref().map(ToString::to_string).as_deref(), Some("unknown"));
}

fn timed_schema(log: Arc<Mutex<Vec<String>>>) -> Schema {
    let field = |name: &'static str, delay: u64| {
        let log = log.clone();
        FieldDefinition::new(name, "Int").resolver(move |_| {
            log.lock().unwrap().push(format!("{name} start"));
            let log = log.clone();
            Resolution::from_future(async move {
                tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
                log.lock().unwrap().push(format!("{name} end"));
                Ok::<_, Error>(1)
            })
        })
    };
    Schema::build("Query", Some("Mutation"), None)
        .register(ObjectType::new("Query").field(field("first", 30)).field(field("second", 0)))
        .register(ObjectType::new("Mutation").field(field("first", 30)).field(field("second", 0)))
        .finish()
        .unwrap()
}

#[tokio::test]
async fn mutation_root_fields_run_serially() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let schema = timed_schema(log.clone());

    let response = run(&schema, "mutation { first second }").await;
    assert_eq!(response.to_json(), json!({"data": {"first": 1, "second": 1}}));
    assert_eq!(
        *log.lock().unwrap(),
        ["first start", "first end", "second start", "second end"]
    );

    log.lock().unwrap().clear();
    let response = run(&schema, "{ first second }").await;
    assert_eq!(response.to_json(), json!({"data": {"first": 1, "second": 1}}));
    assert_eq!(
        *log.lock().unwrap(),
        ["first start", "second start", "second end", "first end"]
    );
}

#[tokio::test]
#[allow(clippy::panic)]
async fn panicking_resolver_becomes_a_field_error() {
    let schema = Schema::build("Query", None, None)
        .register(
            ObjectType::new("Query")
                .field(FieldDefinition::new("ok", "Int").resolver(|_| Resolution::ok(1)))
                .field(FieldDefinition::new("boom", "Int").resolver(|_| panic!("boom"))),
        )
        .finish()
        .unwrap();

    let response = run(&schema, "{ ok boom }").await;
    insta::assert_json_snapshot!(response, @r#"
    {
      "data": {
        "ok": 1,
        "boom": null
      },
      "errors": [
        {
          "message": "Resolver panicked",
          "locations": [
            {
              "line": 1,
              "column": 6
            }
          ],
          "path": [
            "boom"
          ],
          "extensions": {
            "code": "RESOLVER_ERROR"
          }
        }
      ]
    }
    "#);
}

#[tokio::test]
async fn undefined_field_is_reported_and_nulled() {
    let schema = Schema::build("Query", None, None)
        .register(ObjectType::new("Query").field(FieldDefinition::new("ok", "Int").resolver(|_| Resolution::ok(1))))
        .finish()
        .unwrap();

    let response = run(&schema, "{ ok missing }").await;
    assert_eq!(response.to_json()["data"], json!({"ok": 1, "missing": null}));
    assert_eq!(response.errors[0].message, "Field 'missing' is not defined on type 'Query'.");
    assert_eq!(response.status_code(), http::StatusCode::OK);
}

#[tokio::test]
async fn error_causes_are_exposed_in_debug_mode() {
    let schema = Schema::build("Query", None, None)
        .config(Config::default().with_exposed_error_causes())
        .register(
            ObjectType::new("Query")
                .field(FieldDefinition::new("number", "Int").resolver(|_| Resolution::from("nope".parse::<i32>()))),
        )
        .finish()
        .unwrap();

    let response = run(&schema, "{ number }").await;
    assert_eq!(
        response.to_json()["errors"][0]["extensions"],
        json!({"cause": "invalid digit found in string", "code": "RESOLVER_ERROR"})
    );
}
