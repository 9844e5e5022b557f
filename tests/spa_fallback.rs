//! Static files and SPA shell fallback for unrouted requests.

use axum::http::StatusCode;

mod common;

async fn gateway() -> common::TestGateway {
    let api = common::start_echo_backend().await;
    let uc = common::start_echo_backend().await;
    let git = common::start_echo_backend().await;
    let mut config = common::gateway_config(api, uc, git);
    config.shell.features.insert("newNav".into(), serde_json::Value::Bool(true));
    common::start_gateway(config).await
}

#[tokio::test]
async fn test_extensionless_path_serves_shell() {
    let gateway = gateway().await;

    let res = common::client().get(gateway.url("/dashboard")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers().get("cache-control").unwrap(), "no-store");
    assert_eq!(
        res.headers().get("content-type").unwrap(),
        "text/html; charset=utf-8"
    );
    let body = res.text().await.unwrap();
    assert!(body.contains("<script>window.__RUNTIME_ENV__ = {"));
    assert!(body.contains("\"newNav\":true"));
    assert!(!body.contains("<!-- runtime-env -->"));
}

#[tokio::test]
async fn test_unknown_extension_is_plain_404() {
    let gateway = gateway().await;

    let res = common::client()
        .get(gateway.url("/app.unknownext"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert!(res.headers().get("cache-control").is_none());
    let body = res.text().await.unwrap();
    assert_eq!(body, "Not Found");
}

#[tokio::test]
async fn test_static_file_served() {
    let gateway = gateway().await;

    let res = common::client()
        .get(gateway.url("/assets/app.js"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "console.log('app');");
}

#[tokio::test]
async fn test_template_never_served_raw() {
    let gateway = gateway().await;
    let client = common::client();

    for path in ["/index.html", "/index.generated.html", "/"] {
        let res = client.get(gateway.url(path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK, "path {}", path);
        assert_eq!(res.headers().get("cache-control").unwrap(), "no-store");
        let body = res.text().await.unwrap();
        assert!(body.contains("window.__RUNTIME_ENV__"), "path {}", path);
    }
}

#[tokio::test]
async fn test_repository_deep_link_serves_shell() {
    let gateway = gateway().await;

    let res = common::client()
        .get(gateway.url("/acme/dop/projects/7/apps/3/repo/tree/master/src/main.rs"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers().get("cache-control").unwrap(), "no-store");
}

#[tokio::test]
async fn test_generated_shell_written_next_to_template() {
    let gateway = gateway().await;

    let generated = std::fs::read_to_string(gateway.static_dir.path().join("index.generated.html"))
        .unwrap();
    let res = common::client().get(gateway.url("/orgs/acme")).send().await.unwrap();

    assert_eq!(res.text().await.unwrap(), generated);
}
