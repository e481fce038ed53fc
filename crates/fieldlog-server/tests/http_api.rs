//! HTTP round trips against the app served over a file backend.

mod common;

use chrono::Duration;
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde_json::{Value, json};

use fieldlog_core::{FederatedIdentity, Role, TokenIssuer, UserProfile, UserStatus};
use fieldlog_file::FileIdentity;

use common::{SECRET, create_log, log_form, photo, register, start_server};

fn urls(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

// ============================================================================
// Field logs
// ============================================================================

#[tokio::test]
async fn healthz_responds() {
    let server = start_server().await;
    let resp = server.client.get(server.url("/healthz")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    server.stop().await;
}

#[tokio::test]
async fn create_then_get_and_list() {
    let server = start_server().await;

    let data = json!({
        "location": "Laguna Verde",
        "collectedSpecies": [{"scientificName": "Salmo trutta", "count": 2}]
    });
    let created = create_log(&server, &data, &["site.jpg"], &["fish.jpg"]).await;
    let id = created["id"].as_str().unwrap();

    assert_eq!(created["status"], json!(true));
    assert_eq!(urls(&created["sitePhotos"]).len(), 1);
    assert_eq!(urls(&created["collectedSpecies"][0]["photos"]).len(), 1);
    assert!(urls(&created["sitePhotos"])[0].starts_with("http://blobs.test/site-photos/"));

    let resp = server
        .client
        .get(server.url(&format!("/api/log/field-logs/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched: Value = resp.json().await.unwrap();
    assert_eq!(fetched["location"], "Laguna Verde");
    assert_eq!(fetched["collectedSpecies"][0]["count"], 2);

    let list: Value = server
        .client
        .get(server.url("/api/log/field-logs"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["id"], id);

    server.stop().await;
}

#[tokio::test]
async fn create_without_data_is_bad_request() {
    let server = start_server().await;

    let form = Form::new().part("sitePhotos", photo("site.jpg"));
    let resp = server
        .client
        .post(server.url("/api/log/new-field-logs"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], json!(false));

    server.stop().await;
}

#[tokio::test]
async fn update_appends_photos_to_the_right_species() {
    let server = start_server().await;

    let created = create_log(
        &server,
        &json!({"collectedSpecies": [{"scientificName": "Alpha"}]}),
        &["s1.jpg"],
        &["u1.jpg"],
    )
    .await;
    let id = created["id"].as_str().unwrap().to_string();
    let s1 = urls(&created["sitePhotos"]);
    let u1 = urls(&created["collectedSpecies"][0]["photos"]);

    let edit = json!({
        "notes": "second visit",
        "collectedSpecies": [
            {"scientificName": "Alpha"},
            {"scientificName": "Beta"}
        ]
    });
    let resp = server
        .client
        .post(server.url(&format!("/api/log/update-field-logs/{id}")))
        .multipart(log_form(&edit, &["s2.jpg"], &["v1.jpg", "v2.jpg"]))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.unwrap();
    let log = &body["data"];

    let site = urls(&log["sitePhotos"]);
    assert_eq!(site.len(), 2);
    assert_eq!(site[0], s1[0]);
    assert!(site[1].ends_with("s2.jpg"));

    assert_eq!(urls(&log["collectedSpecies"][0]["photos"]), u1);
    let beta = urls(&log["collectedSpecies"][1]["photos"]);
    assert_eq!(beta.len(), 2);
    assert!(beta[0].ends_with("v1.jpg"));
    assert!(beta[1].ends_with("v2.jpg"));

    assert_eq!(log["notes"], "second visit");
    assert_eq!(log["createdAt"], created["createdAt"]);

    server.stop().await;
}

#[tokio::test]
async fn update_of_missing_log_is_forbidden() {
    let server = start_server().await;

    let resp = server
        .client
        .post(server.url("/api/log/update-field-logs/nope"))
        .multipart(log_form(
            &json!({"collectedSpecies": []}),
            &["s.jpg"],
            &[],
        ))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    // Nothing was uploaded for the missing log.
    assert!(!server.data.path().join("blobs").exists());

    server.stop().await;
}

#[tokio::test]
async fn update_with_malformed_data_is_bad_request() {
    let server = start_server().await;
    let created = create_log(&server, &json!({"collectedSpecies": []}), &[], &[]).await;
    let id = created["id"].as_str().unwrap();

    let resp = server
        .client
        .post(server.url(&format!("/api/log/update-field-logs/{id}")))
        .multipart(Form::new().text("data", "{not json"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    server.stop().await;
}

#[tokio::test]
async fn too_many_site_photos_is_bad_request() {
    let server = start_server().await;

    let names: Vec<String> = (0..11).map(|i| format!("s{i}.jpg")).collect();
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    let resp = server
        .client
        .post(server.url("/api/log/new-field-logs"))
        .multipart(log_form(&json!({"collectedSpecies": []}), &names, &[]))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    server.stop().await;
}

#[tokio::test]
async fn oversized_photo_is_rejected() {
    let server = start_server().await;

    let big = Part::bytes(vec![0u8; 5 * 1024 * 1024 + 1])
        .file_name("big.jpg")
        .mime_str("image/jpeg")
        .unwrap();
    let form = Form::new()
        .text("data", json!({"collectedSpecies": []}).to_string())
        .part("sitePhotos", big);

    let resp = server
        .client
        .post(server.url("/api/log/new-field-logs"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    server.stop().await;
}

#[tokio::test]
async fn unknown_file_field_is_bad_request() {
    let server = start_server().await;

    let form = Form::new()
        .text("data", json!({"collectedSpecies": []}).to_string())
        .part("avatar", photo("me.jpg"));
    let resp = server
        .client
        .post(server.url("/api/log/new-field-logs"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    server.stop().await;
}

#[tokio::test]
async fn early_rejections_still_answer_with_json() {
    let server = start_server().await;

    let bulky = || {
        Part::bytes(vec![7u8; 4 * 1024 * 1024])
            .file_name("bulky.jpg")
            .mime_str("image/jpeg")
            .unwrap()
    };

    let mut unexpected = Form::new()
        .text("data", json!({"collectedSpecies": []}).to_string())
        .part("avatar", photo("me.jpg"));
    let mut too_many = Form::new().text("data", json!({"collectedSpecies": []}).to_string());
    for i in 0..10 {
        too_many = too_many.part("sitePhotos", photo(&format!("s{i}.jpg")));
    }
    for _ in 0..5 {
        unexpected = unexpected.part("sitePhotos", bulky());
        too_many = too_many.part("sitePhotos", bulky());
    }

    for form in [unexpected, too_many] {
        let resp = server
            .client
            .post(server.url("/api/log/new-field-logs"))
            .multipart(form)
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["success"], json!(false));
    }
    server.stop().await;
}

#[tokio::test]
async fn soft_delete_hides_log_from_list() {
    let server = start_server().await;
    let created = create_log(&server, &json!({"collectedSpecies": []}), &[], &[]).await;
    let id = created["id"].as_str().unwrap();

    let resp = server
        .client
        .delete(server.url(&format!("/api/log/delete-log/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let list: Value = server
        .client
        .get(server.url("/api/log/field-logs"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list, json!([]));

    // Still readable directly, marked inactive.
    let fetched: Value = server
        .client
        .get(server.url(&format!("/api/log/field-logs/{id}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["status"], json!(false));

    let resp = server
        .client
        .delete(server.url("/api/log/delete-log/missing"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    server.stop().await;
}

#[tokio::test]
async fn missing_log_is_not_found() {
    let server = start_server().await;
    let resp = server
        .client
        .get(server.url("/api/log/field-logs/missing"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    server.stop().await;
}

#[tokio::test]
async fn comments_require_a_session() {
    let server = start_server().await;
    let created = create_log(&server, &json!({"collectedSpecies": []}), &[], &[]).await;
    let id = created["id"].as_str().unwrap();
    let comments_url = server.url(&format!("/api/log/field-logs/{id}/comments"));

    let resp = server
        .client
        .post(&comments_url)
        .json(&json!({"text": "hello"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let (uid, token) = register(&server, "ada@example.com").await;

    let resp = server
        .client
        .post(&comments_url)
        .bearer_auth(&token)
        .json(&json!({"text": "  first  "}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["text"], "first");
    assert_eq!(body["data"]["authorUid"], uid.as_str());
    assert_eq!(body["data"]["authorName"], "Ada Lovelace");

    server
        .client
        .post(&comments_url)
        .bearer_auth(&token)
        .json(&json!({"text": "second"}))
        .send()
        .await
        .unwrap();

    let resp = server
        .client
        .post(&comments_url)
        .bearer_auth(&token)
        .json(&json!({"text": "   "}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let list: Value = server
        .client
        .get(&comments_url)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let texts: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["text"].as_str().unwrap())
        .collect();
    assert_eq!(texts, vec!["first", "second"]);

    let resp = server
        .client
        .post(server.url("/api/log/field-logs/missing/comments"))
        .bearer_auth(&token)
        .json(&json!({"text": "hello"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    server.stop().await;
}

// ============================================================================
// Accounts
// ============================================================================

#[tokio::test]
async fn register_login_and_me() {
    let server = start_server().await;

    let resp = server
        .client
        .post(server.url("/api/user/register"))
        .multipart(common::registration_form("ada@example.com", "Investigador"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["user"]["role"], "investigador");
    assert_eq!(body["user"]["status"], "active");
    assert!(body["user"]["photoURL"].as_str().unwrap().ends_with("/profile.jpg"));
    assert!(body["expirationDate"].as_i64().unwrap() > 0);

    let resp = server
        .client
        .post(server.url("/api/user/login"))
        .json(&json!({"email": "ada@example.com", "password": "hunter22"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let session: Value = resp.json().await.unwrap();
    let token = session["token"].as_str().unwrap();

    let me: Value = server
        .client
        .get(server.url("/api/user/me"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["email"], "ada@example.com");
    assert_eq!(me["firstName"], "Ada");
    assert_eq!(me["role"], "investigador");

    let resp = server.client.get(server.url("/api/user/me")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    server.stop().await;
}

#[tokio::test]
async fn register_requires_every_field() {
    let server = start_server().await;

    let form = Form::new()
        .text("firstName", "Ada")
        .text("email", "ada@example.com");
    let resp = server
        .client
        .post(server.url("/api/user/register"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = server
        .client
        .post(server.url("/api/user/register"))
        .multipart(common::registration_form("ada@example.com", "superuser"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    server.stop().await;
}

#[tokio::test]
async fn duplicate_email_is_bad_request() {
    let server = start_server().await;
    register(&server, "ada@example.com").await;

    let resp = server
        .client
        .post(server.url("/api/user/register"))
        .multipart(common::registration_form("ada@example.com", "Colaborador"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    server.stop().await;
}

#[tokio::test]
async fn login_failures() {
    let server = start_server().await;
    let (uid, _) = register(&server, "ada@example.com").await;

    let resp = server
        .client
        .post(server.url("/api/user/login"))
        .json(&json!({"email": "ada@example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = server
        .client
        .post(server.url("/api/user/login"))
        .json(&json!({"email": "ada@example.com", "password": "wrong-password"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = server
        .client
        .put(server.url(&format!("/api/user/update-user/{uid}")))
        .json(&json!({"status": "inactive"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = server
        .client
        .post(server.url("/api/user/login"))
        .json(&json!({"email": "ada@example.com", "password": "hunter22"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    server.stop().await;
}

#[tokio::test]
async fn verify_token_outcomes() {
    let server = start_server().await;
    let (uid, token) = register(&server, "ada@example.com").await;
    let verify = server.url("/api/user/verify-token");

    let body: Value = server
        .client
        .post(&verify)
        .json(&json!({"token": token}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["isValid"], json!(true));
    assert_eq!(body["userData"]["email"], "ada@example.com");

    let resp = server.client.post(&verify).json(&json!({})).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = server
        .client
        .post(&verify)
        .json(&json!({"token": "garbage"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["isValid"], json!(false));
    assert_eq!(body["message"], "Invalid token");

    let expired_issuer = TokenIssuer::new(SECRET, Duration::seconds(-60));
    let profile = UserProfile {
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        email: Some("ada@example.com".into()),
        photo_url: None,
        role: Role::Investigador,
        status: UserStatus::Active,
        extra: Default::default(),
    };
    let expired = expired_issuer.issue(&uid, None, &profile).unwrap();
    let resp = server
        .client
        .post(&verify)
        .json(&json!({"token": expired.token.as_str()}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Token expired");

    server.stop().await;
}

#[tokio::test]
async fn federated_login_creates_profile_once() {
    let server = start_server().await;

    let id_token = FileIdentity::mint_id_token(&FederatedIdentity {
        uid: "google-1".into(),
        name: Some("Grace Brewster Hopper".into()),
        email: Some("grace@example.com".into()),
        picture: Some("https://img/grace.png".into()),
    });

    for _ in 0..2 {
        let resp = server
            .client
            .post(server.url("/api/user/google-login"))
            .json(&json!({"idToken": id_token}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["user"]["uid"], "google-1");
        assert_eq!(body["user"]["firstName"], "Grace");
        assert_eq!(body["user"]["lastName"], "Brewster Hopper");
        assert_eq!(body["user"]["role"], "colaborador");
    }

    let resp = server
        .client
        .post(server.url("/api/user/github-login"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = server
        .client
        .post(server.url("/api/user/twitter-login"))
        .json(&json!({"accessToken": "not a token"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    server.stop().await;
}

#[tokio::test]
async fn list_search_update_and_delete_users() {
    let server = start_server().await;

    let resp = server.client.get(server.url("/api/user/users")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let (ada, _) = register(&server, "ada@example.com").await;
    register(&server, "charles@example.com").await;

    let users: Value = server
        .client
        .get(server.url("/api/user/users"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(users.as_array().unwrap().len(), 2);

    let found: Value = server
        .client
        .get(server.url("/api/user/search?q=CHARLES"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(found.as_array().unwrap().len(), 1);
    assert_eq!(found[0]["email"], "charles@example.com");

    let resp = server
        .client
        .put(server.url(&format!("/api/user/update-user/{ada}")))
        .json(&json!({"role": "Administrador", "uid": "hijack"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["user"]["role"], "administrador");
    assert_eq!(body["user"]["uid"], ada.as_str());

    let resp = server
        .client
        .put(server.url(&format!("/api/user/update-user/{ada}")))
        .json(&json!({"role": "emperor"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = server
        .client
        .delete(server.url(&format!("/api/user/delete-user/{ada}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = server
        .client
        .post(server.url("/api/user/login"))
        .json(&json!({"email": "ada@example.com", "password": "hunter22"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    server.stop().await;
}

#[tokio::test]
async fn reset_password_requires_email() {
    let server = start_server().await;

    let resp = server
        .client
        .post(server.url("/api/user/reset-password"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = server
        .client
        .post(server.url("/api/user/reset-password"))
        .json(&json!({"email": "ada@example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    server.stop().await;
}
