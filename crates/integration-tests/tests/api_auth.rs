use axum::http::{header, StatusCode};
use domains::view::{ListQuery, DATASET_ADMIN_VIEW};
use integration_tests::{
    body_text, dataset_fields, location, session_cookie, Multipart, TestApp, ADMIN_PASSWORD, ADMIN_USER,
};

#[tokio::test]
async fn anonymous_admin_requests_redirect_to_login_with_next() {
    let app = TestApp::new().await;

    let resp = app.get("/admin/datasets?q=flood", None).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/admin/login?next=%2Fadmin%2Fdatasets%3Fq%3Dflood");

    let resp = app.get("/admin/login?next=%2Fadmin%2Fdatasets", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_text(resp).await;
    assert!(html.contains(r#"name="next""#));
}

#[tokio::test]
async fn wrong_password_is_rejected_without_a_session() {
    let app = TestApp::new().await;

    let resp = app
        .post_form("/admin/login", &[("username", ADMIN_USER), ("password", "guess")], None)
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().get(header::SET_COOKIE).is_none());
    assert!(body_text(resp).await.contains("Invalid username or password."));

    let resp = app
        .post_form("/admin/login", &[("username", "nobody"), ("password", ADMIN_PASSWORD)], None)
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_sets_a_hardened_cookie_and_follows_next() {
    let app = TestApp::new().await;

    let resp = app
        .post_form(
            "/admin/login",
            &[("username", ADMIN_USER), ("password", ADMIN_PASSWORD), ("next", "/admin/feedback")],
            None,
        )
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/admin/feedback");

    let raw = resp.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(raw.starts_with("nadbench_session="));
    assert!(raw.contains("HttpOnly"));
    assert!(raw.contains("SameSite=Lax"));

    let cookie = session_cookie(&resp).unwrap();
    let resp = app.get("/admin/datasets", Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains(ADMIN_USER));
}

#[tokio::test]
async fn offsite_next_targets_are_ignored() {
    let app = TestApp::new().await;

    for next in ["https://evil.example/", "//evil.example/", "/\\evil.example"] {
        let resp = app
            .post_form(
                "/admin/login",
                &[("username", ADMIN_USER), ("password", ADMIN_PASSWORD), ("next", next)],
                None,
            )
            .await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/admin", "next = {next}");
    }
}

#[tokio::test]
async fn logged_in_admins_skip_the_login_page() {
    let app = TestApp::new().await;
    let cookie = app.login().await;

    let resp = app.get("/admin/login", Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/admin");

    let resp = app.get("/admin", Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/admin/datasets");
}

#[tokio::test]
async fn tampered_cookies_are_treated_as_anonymous() {
    let app = TestApp::new().await;
    let cookie = app.login().await;

    let (name, value) = cookie.split_once('=').unwrap();
    let (id, mac) = value.rsplit_once('.').unwrap();
    let forged = format!("{name}={id}x.{mac}");
    let resp = app.get("/admin/datasets", Some(&forged)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert!(location(&resp).starts_with("/admin/login"));

    let unsigned = format!("{name}={id}");
    let resp = app.get("/admin/datasets", Some(&unsigned)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn logout_destroys_the_session() {
    let app = TestApp::new().await;
    let cookie = app.login().await;

    let resp = app.post_form("/admin/logout", &[], Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/admin/login");
    let cleared = resp.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(cleared.contains("Max-Age=0"));

    // The old cookie is still correctly signed but its session is gone.
    let resp = app.get("/admin/datasets", Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert!(location(&resp).starts_with("/admin/login"));
}

#[tokio::test]
async fn sessions_expire_after_their_ttl() {
    let app = TestApp::new().await;
    let cookie = app.login().await;

    app.clock.advance(chrono::Duration::minutes(59));
    assert_eq!(app.get("/admin/datasets", Some(&cookie)).await.status(), StatusCode::OK);

    app.clock.advance(chrono::Duration::minutes(2));
    let resp = app.get("/admin/datasets", Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert!(location(&resp).starts_with("/admin/login"));
}

#[tokio::test]
async fn login_outcomes_are_counted() {
    let app = TestApp::new().await;
    app.login().await;
    app.post_form("/admin/login", &[("username", ADMIN_USER), ("password", "nope")], None)
        .await;

    let metrics = body_text(app.get("/metrics", None).await).await;
    assert!(metrics.contains(r#"nadbench_logins_total{outcome="success"} 1"#));
    assert!(metrics.contains(r#"nadbench_logins_total{outcome="failure"} 1"#));
}

#[tokio::test]
async fn anonymous_writes_redirect_and_change_nothing() {
    let app = TestApp::new().await;
    let existing = app.seed_dataset("Flood Maps", true).await;

    let form = Multipart::new().fields(&dataset_fields("Intruder Set"));
    let resp = app.post_multipart("/admin/datasets", form, None).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert!(location(&resp).starts_with("/admin/login"));

    let form = Multipart::new().text("name", "Defaced").text("approved", "on");
    let resp = app
        .post_multipart(&format!("/admin/datasets/{}", existing.id), form, None)
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert!(location(&resp).starts_with("/admin/login"));

    let resp = app
        .post_form(&format!("/admin/datasets/{}/delete", existing.id), &[], None)
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert!(location(&resp).starts_with("/admin/login"));

    let page = app
        .state
        .datasets
        .list(&DATASET_ADMIN_VIEW, &ListQuery::new(10))
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0], existing);
}

#[tokio::test]
async fn logout_only_accepts_post() {
    let app = TestApp::new().await;
    let cookie = app.login().await;

    let resp = app.get("/admin/logout", Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);

    // A stray link or prefetch leaves the session intact.
    assert_eq!(app.get("/admin/datasets", Some(&cookie)).await.status(), StatusCode::OK);
}
