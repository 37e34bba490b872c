mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use chrono::Utc;
use common::TestApp;
use hmac::{Hmac, Mac};
use pepperpot_db::models::RecipeRow;
use pepperpot_types::models::PurchaseStatus;
use serde_json::{Value, json};
use sha2::Sha256;

// -- Speech --

#[tokio::test]
async fn speech_narrates_steps() {
    let app = TestApp::new();

    let (status, body) = app.post("/tts/generate", None, json!({ "text": " " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Text is required");

    let (status, body) = app
        .post("/tts/generate", None, json!({ "text": "Whisk the eggs", "step_number": 2 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["provider"], "fake");
    // "Step 2. Whisk the eggs" base64-encoded by the fake synthesizer.
    assert_eq!(
        body["audio"],
        "data:audio/mpeg;base64,U3RlcCAyLiBXaGlzayB0aGUgZWdncw=="
    );
}

#[tokio::test]
async fn speech_is_rate_limited_per_client() {
    let app = TestApp::builder().tts_limit(2).build();

    let call = |ip: &'static str| {
        Request::builder()
            .method(Method::POST)
            .uri("/tts/generate")
            .header("content-type", "application/json")
            .header("x-forwarded-for", ip)
            .body(Body::from(r#"{"text":"Season to taste"}"#))
            .unwrap()
    };

    assert_eq!(app.send(call("198.51.100.1")).await.0, StatusCode::OK);
    assert_eq!(app.send(call("198.51.100.1")).await.0, StatusCode::OK);
    let (status, body) = app.send(call("198.51.100.1")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "Rate limit exceeded. Try again later.");

    assert_eq!(app.send(call("198.51.100.2")).await.0, StatusCode::OK);
}

// -- Recipes --

fn recipe(slug: &str, category: &str, cuisine: &str) -> RecipeRow {
    RecipeRow {
        id: slug.into(),
        title: slug.into(),
        slug: slug.into(),
        category: Some(category.into()),
        cuisine: Some(cuisine.into()),
        occasion: None,
        summary: None,
        image_url: None,
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn recipe_detail_by_slug() {
    let app = TestApp::new();
    app.db().insert_recipe(&recipe("pad-thai", "Dinner", "Thai")).unwrap();

    let (status, body) = app.get("/recipes/pad-thai", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recipe"]["slug"], "pad-thai");
    assert_eq!(body["recipe"]["cuisine"], "Thai");

    let (status, body) = app.get("/recipes/ragu", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Recipe not found");

    // The static filter route still wins over the slug route.
    let (status, body) = app.get("/recipes/filter?cuisine=thai", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "database");
}

#[tokio::test]
async fn recipe_filter_prefers_local_results() {
    let app = TestApp::new();
    for i in 0..2 {
        app.db()
            .insert_recipe(&recipe(&format!("ragu-{i}"), "Dinner", "Italian"))
            .unwrap();
    }

    let (status, body) = app.get("/recipes/filter?cuisine=italian&limit=4", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "database");
    assert_eq!(body["recipes"].as_array().unwrap().len(), 2);
    assert!(body.get("breakdown").is_none());
    assert!(app.recipes.queries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn recipe_filter_tops_up_from_external_search() {
    let app = TestApp::new();
    app.db().insert_recipe(&recipe("pad-thai", "Dinner", "Thai")).unwrap();

    let (_, body) = app
        .get("/recipes/filter?category=dinner&cuisine=thai&limit=6", None)
        .await;
    assert_eq!(body["source"], "mixed");
    assert_eq!(body["breakdown"], json!({ "database": 1, "external": 5 }));
    assert_eq!(body["total"], 6);
    assert_eq!(
        app.recipes.queries.lock().unwrap().as_slice(),
        &[("dinner thai".to_string(), 5)]
    );

    let (_, body) = app.get("/recipes/filter?cuisine=korean&limit=2", None).await;
    assert_eq!(body["source"], "external");

    // Occasion alone gives the provider nothing to search by.
    let (_, body) = app.get("/recipes/filter?occasion=picnic", None).await;
    assert_eq!(body["source"], "external");
    assert_eq!(body["breakdown"], json!({ "database": 0, "external": 0 }));
}

#[tokio::test]
async fn only_admins_create_recipes() {
    let app = TestApp::new();
    let (_, cook) = app.user("cook@example.com");
    let (_, admin) = app.admin("admin@example.com");
    let body = json!({ "title": "Shakshuka", "category": "Breakfast" });

    let (status, _) = app.post("/recipes", Some(&cook), body.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, created) = app.post("/recipes", Some(&admin), body).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["slug"], "shakshuka");

    let (_, page) = app.get("/recipes", None).await;
    assert_eq!(page["pagination"]["total"], 1);
}

// -- Payments --

const PAYMENT_SECRET: &str = "whsec_test";

fn signed_payment(event: &Value, timestamp: i64) -> Request<Body> {
    let raw = event.to_string();
    let mut mac = Hmac::<Sha256>::new_from_slice(PAYMENT_SECRET.as_bytes()).unwrap();
    mac.update(format!("{timestamp}.{raw}").as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/webhooks/payments")
        .header("payment-signature", format!("t={timestamp},v1={signature}"))
        .body(Body::from(raw))
        .unwrap()
}

fn checkout(metadata: Value) -> Value {
    json!({
        "id": "evt_1",
        "type": "checkout.session.completed",
        "data": { "object": {
            "id": "cs_1",
            "payment_intent": "pi_1",
            "amount_total": 1500,
            "metadata": metadata
        } }
    })
}

#[tokio::test]
async fn payment_webhook_records_purchases() {
    let app = TestApp::builder().payment_secret(PAYMENT_SECRET).build();
    let (user_id, _) = app.user("buyer@example.com");
    let now = Utc::now().timestamp();

    let event = checkout(json!({ "user_id": user_id, "document_id": "doc-1" }));
    let (status, body) = app.send(signed_payment(&event, now)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body, json!({ "received": true }));
    let purchase = app.db().get_purchase(&user_id, "doc-1").unwrap().unwrap();
    assert_eq!(purchase.status, PurchaseStatus::Completed);
    assert_eq!(purchase.amount, 1500);

    let failed = json!({
        "id": "evt_2",
        "type": "payment_intent.payment_failed",
        "data": { "object": { "id": "pi_1" } }
    });
    let (status, _) = app.send(signed_payment(&failed, now)).await;
    assert_eq!(status, StatusCode::OK);
    let purchase = app.db().get_purchase(&user_id, "doc-1").unwrap().unwrap();
    assert_eq!(purchase.status, PurchaseStatus::Failed);

    let other = json!({ "id": "evt_3", "type": "customer.created", "data": { "object": {} } });
    let (status, _) = app.send(signed_payment(&other, now)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn payment_webhook_rejects_bad_requests() {
    let app = TestApp::builder().payment_secret(PAYMENT_SECRET).build();
    let now = Utc::now().timestamp();

    let event = checkout(json!({ "user_id": "u1" }));
    let (status, body) = app.send(signed_payment(&event, now)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing metadata");

    let event = checkout(json!({ "user_id": "u1", "document_id": "d1" }));
    let (status, _) = app.send(signed_payment(&event, now - 600)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let unsigned = Request::builder()
        .method(Method::POST)
        .uri("/webhooks/payments")
        .body(Body::from(event.to_string()))
        .unwrap();
    let (status, body) = app.send(unsigned).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing signature");
}
