use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use engine::{
    execute, parse_query, ExecutionParams, FieldDefinition, FieldMiddleware, FieldResolver, FieldValue, Interceptor,
    MiddlewareManager, Next, ObjectType, Resolution, ResolverContext, Schema,
};
use pretty_assertions::assert_eq;
use serde_json::json;

type Log = Arc<Mutex<Vec<String>>>;

fn logging(name: &'static str, log: Log) -> Interceptor {
    Interceptor::from_fn(move |next, ctx| {
        log.lock().unwrap().push(format!("{name} before"));
        let log = log.clone();
        next.run(ctx).map(move |result| {
            log.lock().unwrap().push(format!("{name} after"));
            result
        })
    })
}

fn schema(log: Log) -> Schema {
    let field = |name: &'static str| {
        let log = log.clone();
        FieldDefinition::new(name, "String").resolver(move |_| {
            log.lock().unwrap().push(format!("resolve {name}"));
            Resolution::ok("x")
        })
    };
    Schema::build("Query", None, None)
        .register(ObjectType::new("Query").field(field("a")).field(field("b")).field(field("c")))
        .finish()
        .unwrap()
}

#[tokio::test]
async fn first_interceptor_is_outermost() {
    let log = Log::default();
    let schema = schema(log.clone());
    let document = parse_query("{ a }").unwrap();

    let params =
        ExecutionParams::new().interceptors(vec![logging("logA", log.clone()), logging("logB", log.clone())]);
    let response = execute(&schema, &document, params).await;

    assert_eq!(response.to_json(), json!({"data": {"a": "x"}}));
    assert_eq!(
        *log.lock().unwrap(),
        ["logA before", "logB before", "resolve a", "logB after", "logA after"]
    );
}

struct Uppercase;

impl FieldMiddleware for Uppercase {
    fn resolve<'r>(&self, next: Next, ctx: ResolverContext<'r>) -> Resolution<'r> {
        next.run(ctx).map(|result| {
            result.map(|value| match value.as_str() {
                Some(s) => FieldValue::from(s.to_uppercase()),
                None => value,
            })
        })
    }
}

#[tokio::test]
async fn field_keys_win_over_type_keys() {
    let log = Log::default();
    let schema = schema(log.clone());
    let document = parse_query("{ a b c }").unwrap();

    let exclaim = Interceptor::from_fn(|next, ctx| {
        next.run(ctx).map(|result| {
            result.map(|value| FieldValue::from(format!("{}!", value.as_str().unwrap_or_default())))
        })
    });
    let middleware = MiddlewareManager::builder()
        .for_key("Query", [Interceptor::new(Uppercase)])
        .for_key("Query.b", [exclaim])
        .exclude("Query.c")
        .build();

    let response = execute(&schema, &document, ExecutionParams::new().middleware(middleware)).await;
    assert_eq!(response.to_json(), json!({"data": {"a": "X", "b": "x!", "c": "x"}}));
}

#[tokio::test]
async fn interceptors_can_short_circuit() {
    let log = Log::default();
    let schema = schema(log.clone());
    let document = parse_query("{ a b }").unwrap();

    let deny = Interceptor::from_fn(|next, ctx| {
        if ctx.info.field_name == "b" {
            Resolution::err(engine::Error::new("Forbidden"))
        } else {
            next.run(ctx)
        }
    });

    let response = execute(&schema, &document, ExecutionParams::new().interceptors(vec![deny])).await;
    assert_eq!(response.to_json()["data"], json!({"a": "x", "b": null}));
    assert_eq!(response.errors[0].message, "Forbidden");
    assert_eq!(*log.lock().unwrap(), ["resolve a"]);
}

#[tokio::test]
async fn shared_manager_wraps_every_list_item() {
    let schema = Schema::build("Query", None, None)
        .register(ObjectType::new("Query").field(
            FieldDefinition::new("users", "[User!]!").resolver(|_| {
                Resolution::ok(FieldValue::list(
                    ["Ada", "Grace", "Alan"].map(|name| FieldValue::from_json(json!({"name": name}))),
                ))
            }),
        ))
        .register(ObjectType::new("User").field(FieldDefinition::new("name", "String")))
        .finish()
        .unwrap();
    let document = parse_query("{ users { name } }").unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let counting = {
        let calls = calls.clone();
        Interceptor::from_fn(move |next, ctx| {
            calls.fetch_add(1, Ordering::SeqCst);
            next.run(ctx)
        })
    };
    let middleware = Arc::new(MiddlewareManager::builder().for_key("User.name", [counting]).build());

    for _ in 0..2 {
        let response = execute(&schema, &document, ExecutionParams::new().middleware(middleware.clone())).await;
        assert_eq!(
            response.to_json(),
            json!({"data": {"users": [{"name": "Ada"}, {"name": "Grace"}, {"name": "Alan"}]}})
        );
    }
    assert_eq!(calls.load(Ordering::SeqCst), 6);
}

#[tokio::test]
async fn wrapped_resolvers_at_build_time() {
    let schema = Schema::build("Query", None, None)
        .register(
            ObjectType::new("Query")
                .field(FieldDefinition::new("greeting", "String").resolver(|_| Resolution::ok("hello"))),
        )
        .wrap_resolver("Query", "greeting", |resolver| {
            engine::FieldResolver::new(move |ctx| {
                resolver.call(ctx).map(|result| {
                    result.map(|value| FieldValue::from(format!("{}, world", value.as_str().unwrap_or_default())))
                })
            })
        })
        .finish()
        .unwrap();
    let document = parse_query("{ greeting }").unwrap();

    let response = execute(&schema, &document, ExecutionParams::new()).await;
    assert_eq!(response.to_json(), json!({"data": {"greeting": "hello, world"}}));
}

#[tokio::test]
async fn request_resolvers_do_not_outlive_their_execution() {
    let schema = Schema::build("Query", None, None)
        .register(ObjectType::new("Query").field(FieldDefinition::new("name", "String")))
        .finish()
        .unwrap();
    let document = parse_query("{ name }").unwrap();
    let middleware = Arc::new(MiddlewareManager::from(vec![Interceptor::from_fn(|next, ctx| next.run(ctx))]));

    let marker = Arc::new(());
    for _ in 0..100 {
        let resolver = {
            let marker = marker.clone();
            FieldResolver::new(move |_| {
                let _ = &marker;
                Resolution::ok("Ada")
            })
        };
        let params = ExecutionParams::new()
            .middleware(middleware.clone())
            .field_resolver(resolver);
        let response = execute(&schema, &document, params).await;
        assert_eq!(response.to_json(), json!({"data": {"name": "Ada"}}));
    }

    assert_eq!(Arc::strong_count(&marker), 1);
    assert_eq!(Arc::strong_count(&middleware), 1);
}
