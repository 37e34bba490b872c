mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn posts_paginate_newest_first() {
    let app = TestApp::new();
    let (_, cook) = app.user("cook@example.com");

    let (status, body) = app.post("/posts", Some(&cook), json!({ "content": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Content is required");

    for i in 0..3 {
        let (status, _) = app
            .post("/posts", Some(&cook), json!({ "content": format!("post {i}") }))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, page) = app.get("/posts?page=1&limit=2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["posts"].as_array().unwrap().len(), 2);
    assert_eq!(page["posts"][0]["content"], "post 2");
    assert_eq!(page["pagination"]["total"], 3);
    assert_eq!(page["pagination"]["total_pages"], 2);

    let (_, page) = app.get("/posts?page=2&limit=2", None).await;
    assert_eq!(page["posts"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn reaction_toggle_twice_nets_zero() {
    let app = TestApp::new();
    let (_, cook) = app.user("cook@example.com");
    let (_, post) = app.post("/posts", Some(&cook), json!({ "content": "Lasagna night" })).await;
    let uri = format!("/posts/{}/reactions", post["id"].as_str().unwrap());

    let (_, body) = app.post(&uri, Some(&cook), json!({ "emoji": "😋" })).await;
    assert_eq!(body, json!({ "success": true, "action": "added" }));
    let (_, groups) = app.get(&uri, None).await;
    assert_eq!(groups[0]["emoji"], "😋");
    assert_eq!(groups[0]["count"], 1);

    let (_, body) = app.post(&uri, Some(&cook), json!({ "emoji": "😋" })).await;
    assert_eq!(body["action"], "removed");
    let (_, groups) = app.get(&uri, None).await;
    assert!(groups.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn likes_toggle() {
    let app = TestApp::new();
    let (_, cook) = app.user("cook@example.com");
    let (_, post) = app.post("/posts", Some(&cook), json!({ "content": "Ramen" })).await;
    let uri = format!("/posts/{}/like", post["id"].as_str().unwrap());

    let (_, body) = app.post(&uri, Some(&cook), json!({})).await;
    assert_eq!(body["liked"], true);
    let (_, body) = app.post(&uri, Some(&cook), json!({})).await;
    assert_eq!(body["liked"], false);

    let (status, _) = app.post("/posts/missing/like", Some(&cook), json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn authors_and_admins_delete() {
    let app = TestApp::new();
    let (_, author) = app.user("author@example.com");
    let (_, other) = app.user("other@example.com");
    let (_, admin) = app.admin("admin@example.com");

    let (_, post) = app.post("/posts", Some(&author), json!({ "content": "Curry" })).await;
    let post_id = post["id"].as_str().unwrap();
    let (status, comment) = app
        .post(
            &format!("/posts/{post_id}/comments"),
            Some(&author),
            json!({ "content": "Extra spicy" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let comment_uri = format!("/posts/{post_id}/comments/{}", comment["id"].as_str().unwrap());

    let (status, body) = app.request(Method::DELETE, &comment_uri, Some(&other), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "You do not have permission to delete this comment");
    let (status, _) = app.request(Method::DELETE, &comment_uri, Some(&author), None).await;
    assert_eq!(status, StatusCode::OK);

    let post_uri = format!("/posts/{post_id}");
    let (status, _) = app.request(Method::DELETE, &post_uri, Some(&other), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.request(Method::DELETE, &post_uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, page) = app.get("/posts", None).await;
    assert!(page["posts"].as_array().unwrap().is_empty());
}
