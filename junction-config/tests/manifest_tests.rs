use junction_config::{ConfigError, FileFormat, FunctionRegistry, RouteManifest};
use junction_core::{Error, HttpMethod, HttpRequest, HttpResponse, from_fn, handler_fn, not_found};
use serde_json::json;

fn registry() -> FunctionRegistry {
    FunctionRegistry::new()
        .with(
            "tag",
            from_fn(|req, next| async move {
                next(req).await.map(|res| res.with_header("X-Tagged", "1"))
            }),
        )
        .with(
            "deny",
            from_fn(|_req, _next| async { Ok(HttpResponse::unauthorized()) }),
        )
        .with(
            "show_user",
            handler_fn(|req| async move {
                let id = req.param("id").unwrap_or_default().to_string();
                Ok(HttpResponse::text(id))
            }),
        )
        .with(
            "echo_method",
            handler_fn(|req| async move { Ok(HttpResponse::text(req.method)) }),
        )
}

fn route_error(result: Result<junction_core::Dispatcher, ConfigError>) -> Error {
    match result {
        Err(ConfigError::Route(err)) => err,
        Err(other) => panic!("expected a route error, got {:?}", other),
        Ok(_) => panic!("expected a route error, got a dispatcher"),
    }
}

#[tokio::test]
async fn test_apply_builds_working_dispatcher() {
    let manifest = RouteManifest::from_value(&json!({
        "middleware": ["tag"],
        "routes": [
            { "path": "/users/:id", "handler": "show_user" },
            { "path": "/users/:id", "method": "DELETE", "middleware": ["deny"], "handler": "show_user" },
            { "path": "/echo", "method": "PATCH", "handlers": ["echo_method"] }
        ]
    }))
    .unwrap();

    let dispatcher = manifest.apply(&registry()).unwrap();
    assert_eq!(dispatcher.middleware_count(), 1);

    let res = dispatcher
        .dispatch(HttpRequest::new("GET", "/users/42"), not_found())
        .await
        .unwrap();
    assert_eq!(res.body_str(), Some("42"));
    assert_eq!(res.headers.get("X-Tagged").map(String::as_str), Some("1"));

    let res = dispatcher
        .dispatch(HttpRequest::new("DELETE", "/users/42"), not_found())
        .await
        .unwrap();
    assert_eq!(res.status, 401);

    let res = dispatcher
        .dispatch(HttpRequest::new("PATCH", "/echo"), not_found())
        .await
        .unwrap();
    assert_eq!(res.body_str(), Some("PATCH"));

    let routes = dispatcher.routes();
    assert_eq!(routes.len(), 2);
    assert_eq!(routes[1].methods, vec![HttpMethod::GET, HttpMethod::DELETE]);
}

#[tokio::test]
async fn test_toml_manifest() {
    let manifest = RouteManifest::parse(
        r#"
            [[routes]]
            path = "/api/v4/**"
            method = "POST"
            handler = "echo_method"
        "#,
        FileFormat::Toml,
    )
    .unwrap();

    let dispatcher = manifest.apply(&registry()).unwrap();
    let res = dispatcher
        .dispatch(HttpRequest::new("POST", "/api/v4/a/b"), not_found())
        .await
        .unwrap();
    assert_eq!(res.body_str(), Some("POST"));
}

#[test]
fn test_load_from_file() {
    let path = std::env::temp_dir().join(format!("junction-manifest-{}.json", std::process::id()));
    std::fs::write(
        &path,
        r#"{ "routes": [ { "path": "/health", "handler": "echo_method" } ] }"#,
    )
    .unwrap();

    let manifest = RouteManifest::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(manifest.routes.len(), 1);
    assert_eq!(manifest.routes[0].path, "/health");
}

#[test]
fn test_unknown_names_are_rejected() {
    let registry = registry();

    let manifest = RouteManifest::from_value(&json!({
        "routes": [{ "path": "/a", "middleware": ["missing"], "handler": "show_user" }]
    }))
    .unwrap();
    assert!(matches!(
        route_error(manifest.apply(&registry)),
        Error::InvalidMiddlewareFunction(_)
    ));

    let manifest = RouteManifest::from_value(&json!({
        "routes": [{ "path": "/a", "handler": "missing" }]
    }))
    .unwrap();
    assert!(matches!(
        route_error(manifest.apply(&registry)),
        Error::InvalidHandlerFunction(_)
    ));

    let manifest = RouteManifest::from_value(&json!({
        "middleware": ["missing"],
        "routes": []
    }))
    .unwrap();
    assert!(matches!(
        route_error(manifest.apply(&registry)),
        Error::InvalidMiddlewareFunction(_)
    ));
}

#[test]
fn test_registration_rules_are_checked() {
    let registry = registry();
    let apply = |value| RouteManifest::from_value(&value).unwrap().apply(&registry);

    assert!(matches!(
        route_error(apply(json!({ "routes": [{ "path": "/a" }] }))),
        Error::MissingHandler
    ));
    assert!(matches!(
        route_error(apply(json!({ "routes": [{ "path": "/a", "handlers": [] }] }))),
        Error::EmptyHandlerList
    ));
    assert!(matches!(
        route_error(apply(json!({ "routes": [{ "path": "/a", "method": "BREW", "handler": "show_user" }] }))),
        Error::UnsupportedMethod(m) if m == "BREW"
    ));
    assert!(matches!(
        route_error(apply(json!({ "routes": [{ "path": "a", "handler": "show_user" }] }))),
        Error::InvalidPattern(_)
    ));
    assert!(matches!(
        route_error(apply(json!({ "routes": [
            { "path": "/u/:id", "handler": "show_user" },
            { "path": "/u/:name", "handler": "show_user" }
        ] }))),
        Error::RouteConflict(_)
    ));
}

#[test]
fn test_whole_manifest_is_validated_first() {
    let manifest = RouteManifest::from_value(&json!({
        "routes": [
            { "path": "/good", "handler": "show_user" },
            { "path": "/bad", "handler": "missing" }
        ]
    }))
    .unwrap();

    let registry = registry();
    assert!(manifest.validate(&registry).is_err());
    assert!(manifest.apply(&registry).is_err());

    let fixed = RouteManifest::from_value(&json!({
        "routes": [{ "path": "/good", "handler": "show_user" }]
    }))
    .unwrap();
    assert!(fixed.validate(&registry).is_ok());
}
