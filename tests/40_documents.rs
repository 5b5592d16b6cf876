mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};

use common::{public_vertices, test_app, DbCall, ADMIN_TOKEN};

fn ndjson(keys: &[&str]) -> String {
    keys.iter()
        .map(|key| format!("{{\"_key\": \"{}\", \"is_public\": true}}", key))
        .collect::<Vec<_>>()
        .join("\n")
}

#[tokio::test]
async fn admin_imports_documents() -> Result<()> {
    let app = test_app(vec![]);

    let (status, body) = app
        .send(
            Method::PUT,
            "/api/v2/documents?collection=test_vertex",
            Some(ADMIN_TOKEN),
            Some(ndjson(&["a", "b", "c"])),
        )
        .await?;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["created"], 3);
    assert!(body.get("details").is_none());
    assert_eq!(app.database.documents().len(), 3);
    Ok(())
}

#[tokio::test]
async fn overwrite_replaces_the_collection_contents() -> Result<()> {
    let app = test_app(public_vertices(5));

    let (status, _) = app
        .send(
            Method::PUT,
            "/api/v2/documents?collection=test_vertex&overwrite=true&on_duplicate=update",
            Some(ADMIN_TOKEN),
            Some(ndjson(&["only"])),
        )
        .await?;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(app.database.documents().len(), 1);
    assert!(matches!(
        app.database.calls().last(),
        Some(DbCall::Import { overwrite: true, count: 1, .. })
    ));
    Ok(())
}

#[tokio::test]
async fn display_errors_keeps_import_details() -> Result<()> {
    let app = test_app(vec![]);

    let (status, body) = app
        .send(
            Method::PUT,
            "/api/v2/documents?collection=test_vertex&display_errors=1",
            Some(ADMIN_TOKEN),
            Some(ndjson(&["a"])),
        )
        .await?;

    assert_eq!(status, StatusCode::CREATED);
    assert!(body["details"].is_array());
    Ok(())
}

#[tokio::test]
async fn collection_must_have_a_schema() -> Result<()> {
    let app = test_app(vec![]);

    let (status, body) = app
        .send(
            Method::PUT,
            "/api/v2/documents?collection=not_a_schema",
            Some(ADMIN_TOKEN),
            Some(ndjson(&["a"])),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Schema does not exist.");

    let (status, body) = app
        .send(Method::PUT, "/api/v2/documents", Some(ADMIN_TOKEN), Some(ndjson(&["a"])))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_PARAMETERS");

    assert!(app.database.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn rejects_bad_options_and_bad_documents() -> Result<()> {
    let app = test_app(vec![]);

    let (status, body) = app
        .send(
            Method::PUT,
            "/api/v2/documents?collection=test_vertex&on_duplicate=merge",
            Some(ADMIN_TOKEN),
            Some(ndjson(&["a"])),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap_or_default().contains("on_duplicate"));

    let (status, body) = app
        .send(
            Method::PUT,
            "/api/v2/documents?collection=test_vertex",
            Some(ADMIN_TOKEN),
            Some("{\"_key\": \"a\"}\nnot json".to_string()),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap_or_default().contains("line 2"));

    assert!(app.database.calls().is_empty());
    Ok(())
}
