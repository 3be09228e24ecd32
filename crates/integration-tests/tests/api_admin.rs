use axum::http::StatusCode;
use domains::error::DomainError;
use domains::models::Feedback;
use domains::ports::MockMediaStorage;
use domains::record::FieldInput;
use domains::view::{ListQuery, DATASET_ADMIN_VIEW, FEEDBACK_ADMIN_VIEW};
use integration_tests::{body_json, body_text, dataset_fields, location, start_time, Multipart, TestApp};

const PNG: &[u8] = b"\x89PNG\r\n\x1a\nnot-really-pixels";

async fn all_datasets(app: &TestApp) -> Vec<domains::models::Dataset> {
    app.state
        .datasets
        .list(&DATASET_ADMIN_VIEW, &ListQuery::new(100))
        .await
        .unwrap()
        .items
}

#[tokio::test]
async fn creating_a_dataset_derives_its_slug() {
    let app = TestApp::new().await;
    let cookie = app.login().await;

    let form = Multipart::new().fields(&dataset_fields("Flood Maps 2020")).text("approved", "on");
    let resp = app.post_multipart("/admin/datasets", form, Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/admin/datasets?notice=created");

    let saved = all_datasets(&app).await;
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].slug, "flood-maps-2020");
    assert_eq!(saved[0].task_type, vec!["segmentation", "classification"]);
    assert!(saved[0].approved);
    assert!(saved[0].image_url.is_none());

    let resp = app.get("/admin/datasets?notice=created", Some(&cookie)).await;
    let html = body_text(resp).await;
    assert!(html.contains("Record was successfully created."));
    assert!(html.contains("Flood Maps 2020"));
}

#[tokio::test]
async fn a_slug_cannot_be_forced_through_the_form() {
    let app = TestApp::new().await;
    let cookie = app.login().await;

    let form = Multipart::new().fields(&dataset_fields("Storm Tracks")).text("slug", "custom");
    let resp = app.post_multipart("/admin/datasets", form, Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(all_datasets(&app).await[0].slug, "storm-tracks");
}

#[tokio::test]
async fn missing_required_fields_rerender_the_form() {
    let app = TestApp::new().await;
    let cookie = app.login().await;

    let form = Multipart::new().text("name", "Half Filled").text("topic", "floods");
    let resp = app.post_multipart("/admin/datasets", form, Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let html = body_text(resp).await;
    assert!(html.contains("This field is required."));
    // Submitted values survive the round trip.
    assert!(html.contains("Half Filled"));
    assert!(all_datasets(&app).await.is_empty());
}

#[tokio::test]
async fn duplicate_names_are_rejected() {
    let app = TestApp::new().await;
    let cookie = app.login().await;
    app.seed_dataset("Flood Maps", true).await;

    let form = Multipart::new().fields(&dataset_fields("Flood Maps"));
    let resp = app.post_multipart("/admin/datasets", form, Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(resp).await.contains("is already taken"));
    assert_eq!(all_datasets(&app).await.len(), 1);
}

#[tokio::test]
async fn renaming_a_dataset_recomputes_the_slug() {
    let app = TestApp::new().await;
    let cookie = app.login().await;
    let existing = app.seed_dataset("Flood Maps", false).await;

    let form = Multipart::new().text("name", "Flood Maps v2").text("approved", "on");
    let resp = app
        .post_multipart(&format!("/admin/datasets/{}", existing.id), form, Some(&cookie))
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/admin/datasets?notice=saved");

    let saved = app.state.datasets.get(existing.id).await.unwrap();
    assert_eq!(saved.name, "Flood Maps v2");
    assert_eq!(saved.slug, "flood-maps-v2");
    assert!(saved.approved);
    // Fields absent from the submission are left alone.
    assert_eq!(saved.description, existing.description);
}

#[tokio::test]
async fn unchecked_flags_are_cleared_on_update() {
    let app = TestApp::new().await;
    let cookie = app.login().await;
    let existing = app.seed_dataset("Quake Catalog", true).await;

    let form = Multipart::new().text("name", "Quake Catalog");
    app.post_multipart(&format!("/admin/datasets/{}", existing.id), form, Some(&cookie))
        .await;
    assert!(!app.state.datasets.get(existing.id).await.unwrap().approved);
}

#[tokio::test]
async fn preview_uploads_set_the_image_url() {
    let app = TestApp::new().await;
    let cookie = app.login().await;

    let form = Multipart::new()
        .fields(&dataset_fields("Hurricane Imagery"))
        .file("image_url_file", "preview.png", "image/png", PNG);
    let resp = app.post_multipart("/admin/datasets", form, Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let url = all_datasets(&app).await[0].image_url.clone().unwrap();
    assert!(url.starts_with("https://media.test/previews/"), "{url}");
    assert!(url.ends_with(".png"));
}

#[tokio::test]
async fn non_image_previews_are_rejected() {
    let app = TestApp::new().await;
    let cookie = app.login().await;

    let form = Multipart::new()
        .fields(&dataset_fields("Hurricane Imagery"))
        .file("image_url_file", "notes.txt", "text/plain", b"hello");
    let resp = app.post_multipart("/admin/datasets", form, Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(resp).await.contains("Preview must be a PNG"));
    assert!(all_datasets(&app).await.is_empty());
}

#[tokio::test]
async fn storage_failures_save_nothing() {
    let mut media = MockMediaStorage::new();
    media
        .expect_upload()
        .times(1)
        .returning(|_, _, _| Err(DomainError::Storage("bucket unreachable".into())));
    let app = TestApp::with_media(media).await;
    let cookie = app.login().await;

    let form = Multipart::new()
        .fields(&dataset_fields("Tsunami Runup"))
        .file("image_url_file", "runup.png", "image/png", PNG);
    let resp = app.post_multipart("/admin/datasets", form, Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(resp).await.contains("Upload failed"));
    assert!(all_datasets(&app).await.is_empty());
}

#[tokio::test]
async fn deleted_records_are_gone() {
    let app = TestApp::new().await;
    let cookie = app.login().await;
    let dataset = app.seed_dataset("Drought Index", true).await;

    let resp = app
        .post_form(&format!("/admin/datasets/{}/delete", dataset.id), &[], Some(&cookie))
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/admin/datasets?notice=deleted");

    let resp = app
        .get(&format!("/admin/datasets/{}/edit", dataset.id), Some(&cookie))
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app
        .post_form(&format!("/admin/datasets/{}/delete", dataset.id), &[], Some(&cookie))
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_filters_and_search_narrow_the_rows() {
    let app = TestApp::new().await;
    let cookie = app.login().await;
    app.seed_dataset("Flood Maps", true).await;
    app.seed_dataset("Wildfire Smoke", false).await;

    let html = body_text(app.get("/admin/datasets?flt_approved_eq=no", Some(&cookie)).await).await;
    assert!(html.contains("Wildfire Smoke"));
    assert!(!html.contains("Flood Maps"));

    let html = body_text(app.get("/admin/datasets?q=flood", Some(&cookie)).await).await;
    assert!(html.contains("Flood Maps"));
    assert!(!html.contains("Wildfire Smoke"));

    // Empty inputs from the filter form mean "no filter".
    let html = body_text(app.get("/admin/datasets?q=&flt_topic_eq=", Some(&cookie)).await).await;
    assert!(html.contains("Flood Maps") && html.contains("Wildfire Smoke"));
}

#[tokio::test]
async fn invalid_filters_are_reported_and_ignored() {
    let app = TestApp::new().await;
    let cookie = app.login().await;
    app.seed_dataset("Flood Maps", true).await;

    let resp = app.get("/admin/datasets?flt_slug_eq=flood-maps", Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_text(resp).await;
    assert!(html.contains("Filtering on this field is not allowed."));
    assert!(html.contains("Flood Maps"));
}

#[tokio::test]
async fn lists_are_paginated() {
    let app = TestApp::new().await;
    let cookie = app.login().await;
    for i in 0..7 {
        app.seed_dataset(&format!("Dataset {i}"), true).await;
    }

    let html = body_text(app.get("/admin/datasets", Some(&cookie)).await).await;
    assert!(html.contains("Dataset 4"));
    assert!(!html.contains("Dataset 5"));
    assert!(html.contains("page=2"));

    let html = body_text(app.get("/admin/datasets?page=2", Some(&cookie)).await).await;
    assert!(html.contains("Dataset 5") && html.contains("Dataset 6"));
    assert!(!html.contains("Dataset 0"));
}

#[tokio::test]
async fn editing_feedback_restamps_it() {
    let app = TestApp::new().await;
    let cookie = app.login().await;
    let created = app
        .state
        .feedback
        .create(&vec![
            ("first_name", FieldInput::Text("Ada".into())),
            ("email", FieldInput::Text("ada@example.org".into())),
            ("message", FieldInput::Text("Please add the xBD dataset.".into())),
        ])
        .await
        .unwrap();
    assert_eq!(created.timestamp, Some(start_time()));

    app.clock.advance(chrono::Duration::days(1));
    let form = Multipart::new()
        .text("response", "Added, thanks!")
        .text("replied", "on");
    let resp = app
        .post_multipart(&format!("/admin/feedback/{}", created.id), form, Some(&cookie))
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let saved: Feedback = app.state.feedback.get(created.id).await.unwrap();
    assert_eq!(saved.response.as_deref(), Some("Added, thanks!"));
    assert!(saved.replied);
    assert_eq!(saved.timestamp, Some(start_time() + chrono::Duration::days(1)));
    assert_eq!(saved.first_name, "Ada");

    let page = app
        .state
        .feedback
        .list(&FEEDBACK_ADMIN_VIEW, &ListQuery::new(10))
        .await
        .unwrap();
    assert_eq!(page.total, 1);
}

#[tokio::test]
async fn malformed_ids_are_not_found() {
    let app = TestApp::new().await;
    let cookie = app.login().await;
    app.seed_dataset("Drought Index", true).await;

    let resp = app
        .post_form("/admin/datasets/not-a-uuid/delete", &[], Some(&cookie))
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let html = body_text(resp).await;
    assert!(html.contains("Dataset not found."), "{html}");
    assert!(!html.contains("UUID"));

    let resp = app.get("/admin/datasets/not-a-uuid/edit", Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let form = Multipart::new().text("name", "Renamed");
    let resp = app
        .post_multipart("/admin/feedback/12345", form, Some(&cookie))
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    assert_eq!(all_datasets(&app).await.len(), 1);
}

#[tokio::test]
async fn approving_a_dataset_publishes_it() {
    let app = TestApp::new().await;
    let cookie = app.login().await;

    let form = Multipart::new().fields(&dataset_fields("Flood Maps 2020"));
    let resp = app.post_multipart("/admin/datasets", form, Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let id = all_datasets(&app).await[0].id;

    let html = body_text(app.get("/", None).await).await;
    assert!(!html.contains("Flood Maps 2020"));
    assert_eq!(body_json(app.get("/api/datasets", None).await).await["total"], 0);
    assert_eq!(
        app.get("/datasets/flood-maps-2020", None).await.status(),
        StatusCode::NOT_FOUND
    );

    let form = Multipart::new().text("name", "Flood Maps 2020").text("approved", "on");
    let resp = app
        .post_multipart(&format!("/admin/datasets/{id}"), form, Some(&cookie))
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let html = body_text(app.get("/", None).await).await;
    assert!(html.contains("Flood Maps 2020"));
    assert!(html.contains("/datasets/flood-maps-2020"));
    assert_eq!(
        app.get("/datasets/flood-maps-2020", None).await.status(),
        StatusCode::OK
    );
    let json = body_json(app.get("/api/datasets", None).await).await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["items"][0]["slug"], "flood-maps-2020");
}
