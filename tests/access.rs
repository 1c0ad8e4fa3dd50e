//! Access manager gate tests.

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use kiln::errors::ErrorKind;
use kiln::security::RoleAccessManager;
use kiln::{App, Context};

use common::{body_text, router, send};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Role {
    Reader,
    Writer,
    Admin,
}

fn caller_roles(ctx: &Context) -> Vec<Role> {
    ctx.header("x-roles")
        .unwrap_or_default()
        .split(',')
        .filter_map(|role| match role.trim() {
            "reader" => Some(Role::Reader),
            "writer" => Some(Role::Writer),
            "admin" => Some(Role::Admin),
            _ => None,
        })
        .collect()
}

fn request(path: &str, roles: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(path).header("Accept", "text/plain");
    if let Some(roles) = roles {
        builder = builder.header("x-roles", roles);
    }
    builder.body(Body::empty()).unwrap()
}

fn app(ran: Arc<AtomicBool>) -> App<Role> {
    let mut app = App::with_roles(common::config());
    app.access_manager(RoleAccessManager::new(caller_roles));
    app.routes(|api| {
        api.get("/public", |ctx| {
            ctx.result("public");
            Ok(())
        });
        api.get_with_roles(
            "/docs",
            move |ctx| {
                ran.store(true, Ordering::SeqCst);
                ctx.result("docs");
                Ok(())
            },
            [Role::Reader, Role::Writer],
        );
    });
    app
}

#[tokio::test]
async fn test_denied_request_never_runs_handler() {
    let ran = Arc::new(AtomicBool::new(false));
    let router = router(app(Arc::clone(&ran)));

    let response = send(&router, request("/docs", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_text(response).await, "Unauthorized");
    assert!(!ran.load(Ordering::SeqCst));

    let response = send(&router, request("/docs", Some("admin"))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(!ran.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_any_permitted_role_grants() {
    let ran = Arc::new(AtomicBool::new(false));
    let router = router(app(Arc::clone(&ran)));

    let response = send(&router, request("/docs", Some("admin, writer"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "docs");
    assert!(ran.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_unrestricted_route_needs_no_roles() {
    let router = router(app(Arc::new(AtomicBool::new(false))));
    let response = send(&router, request("/public", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_no_access_manager_grants_everything() {
    let mut app: App<Role> = App::with_roles(common::config());
    app.add_route(
        axum::http::Method::GET,
        "/admin",
        |ctx| {
            ctx.result("open");
            Ok(())
        },
        [Role::Admin],
    );
    let router = router(app);

    let response = send(&router, request("/admin", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "open");
}

#[tokio::test]
async fn test_closure_gate_can_short_circuit_with_status() {
    let mut app: App<Role> = App::with_roles(common::config());
    app.access_manager_fn(|handler, ctx, permitted| {
        if permitted.contains(&Role::Admin) && ctx.header("x-admin-token") != Some("letmein") {
            ctx.set_status(StatusCode::FORBIDDEN).result("token required");
            return Ok(());
        }
        handler.handle(ctx)
    });
    app.routes(|api| {
        api.delete_with_roles(
            "/things/:id",
            |ctx| {
                ctx.set_status(StatusCode::NO_CONTENT);
                Ok(())
            },
            [Role::Admin],
        );
    });
    let router = router(app);

    let denied = Request::delete("/things/1").body(Body::empty()).unwrap();
    let response = send(&router, denied).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_text(response).await, "token required");

    let granted = Request::delete("/things/1")
        .header("x-admin-token", "letmein")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&router, granted).await.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_denial_kind_and_override() {
    let mut app: App<Role> = App::with_roles(common::config());
    app.access_manager(RoleAccessManager::new(caller_roles).deny_with(ErrorKind::Forbidden));
    app.routes(|api| {
        api.get_with_roles("/vault", |_| Ok(()), [Role::Admin]);
    });
    app.exception(ErrorKind::Forbidden, |_, ctx| {
        ctx.set_status(StatusCode::NOT_FOUND).result("Not found");
    });
    let router = router(app);

    let response = send(&router, request("/vault", Some("reader"))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_text(response).await, "Not found");
}
