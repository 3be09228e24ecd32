//! # Domain Models
//!
//! The three independent collections of the catalog. Field names are the
//! wire contract of the document store and the JSON API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::hooks::{DeriveSlug, PreSaveHook, StampTimestamp};
use crate::ports::PasswordHasher;
use crate::record::{non_blank, FieldInput, FieldKind, FieldSpec, FieldValue, Record};

/// A benchmark dataset for machine learning on natural disasters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: Uuid,
    /// Unique display name
    pub name: String,
    /// Always `slugify(name)` as of the last save
    #[serde(default)]
    pub slug: String,
    /// e.g. image, text, audio, video, numerical
    pub data_type: String,
    /// Disaster phases covered, e.g. prevention, response, recovery
    pub phases: String,
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub data_source: String,
    pub size: String,
    pub timespan: String,
    pub geo_coverage: String,
    /// Free-text publication date
    pub published: String,
    /// ML task types (regression, classification, segmentation, ...)
    #[serde(default)]
    pub task_type: Vec<String>,
    /// e.g. natural disaster, climate change
    pub topic: String,
    /// Models or benchmarks evaluated on the dataset
    #[serde(default)]
    pub evaluated_on: Vec<String>,
    #[serde(default)]
    pub metrics: Vec<String>,
    /// MAE, RMSE, ...
    pub results: String,
    pub paper_url: String,
    #[serde(default)]
    pub dataset_url: Option<String>,
    pub reference: String,
    #[serde(default)]
    pub approved: bool,
}

static DATASET_HOOKS: &[&dyn PreSaveHook<Dataset>] = &[&DeriveSlug];

impl Record for Dataset {
    const COLLECTION: &'static str = "datasets";
    const KIND: &'static str = "Dataset";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::required("name", "Name", FieldKind::Text),
        FieldSpec::optional("slug", "Slug", FieldKind::Derived),
        FieldSpec::required("data_type", "Data Type", FieldKind::Text),
        FieldSpec::required("phases", "Phases", FieldKind::Text),
        FieldSpec::required("description", "Description", FieldKind::LongText),
        FieldSpec::optional("image_url", "Image", FieldKind::Image),
        FieldSpec::required("data_source", "Data Source", FieldKind::Text),
        FieldSpec::required("size", "Size", FieldKind::Text),
        FieldSpec::required("timespan", "Timespan", FieldKind::Text),
        FieldSpec::required("geo_coverage", "Geographical Coverage", FieldKind::Text),
        FieldSpec::required("published", "Published", FieldKind::Text),
        FieldSpec::optional("task_type", "Task Type", FieldKind::Tags),
        FieldSpec::required("topic", "Topic", FieldKind::Text),
        FieldSpec::optional("evaluated_on", "Evaluated On", FieldKind::Tags),
        FieldSpec::optional("metrics", "Metrics", FieldKind::Tags),
        FieldSpec::required("results", "Results", FieldKind::LongText),
        FieldSpec::required("paper_url", "Paper URL", FieldKind::Text),
        FieldSpec::optional("dataset_url", "Dataset URL", FieldKind::Text),
        FieldSpec::required("reference", "Reference", FieldKind::LongText),
        FieldSpec::optional("approved", "Approved", FieldKind::Flag),
    ];

    fn blank() -> Self {
        Self {
            id: Uuid::new_v4(),
            name: String::new(),
            slug: String::new(),
            data_type: String::new(),
            phases: String::new(),
            description: String::new(),
            image_url: None,
            data_source: String::new(),
            size: String::new(),
            timespan: String::new(),
            geo_coverage: String::new(),
            published: String::new(),
            task_type: Vec::new(),
            topic: String::new(),
            evaluated_on: Vec::new(),
            metrics: Vec::new(),
            results: String::new(),
            paper_url: String::new(),
            dataset_url: None,
            reference: String::new(),
            approved: false,
        }
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn value(&self, field: &str) -> FieldValue<'_> {
        match field {
            "name" => FieldValue::Text(&self.name),
            "slug" => FieldValue::Text(&self.slug),
            "data_type" => FieldValue::Text(&self.data_type),
            "phases" => FieldValue::Text(&self.phases),
            "description" => FieldValue::Text(&self.description),
            "image_url" => FieldValue::Text(self.image_url.as_deref().unwrap_or_default()),
            "data_source" => FieldValue::Text(&self.data_source),
            "size" => FieldValue::Text(&self.size),
            "timespan" => FieldValue::Text(&self.timespan),
            "geo_coverage" => FieldValue::Text(&self.geo_coverage),
            "published" => FieldValue::Text(&self.published),
            "task_type" => FieldValue::Tags(&self.task_type),
            "topic" => FieldValue::Text(&self.topic),
            "evaluated_on" => FieldValue::Tags(&self.evaluated_on),
            "metrics" => FieldValue::Tags(&self.metrics),
            "results" => FieldValue::Text(&self.results),
            "paper_url" => FieldValue::Text(&self.paper_url),
            "dataset_url" => FieldValue::Text(self.dataset_url.as_deref().unwrap_or_default()),
            "reference" => FieldValue::Text(&self.reference),
            "approved" => FieldValue::Flag(self.approved),
            _ => FieldValue::Absent,
        }
    }

    fn assign(&mut self, field: &str, input: FieldInput) {
        match field {
            "name" => self.name = input.into_text(),
            "data_type" => self.data_type = input.into_text(),
            "phases" => self.phases = input.into_text(),
            "description" => self.description = input.into_text(),
            "image_url" => self.image_url = non_blank(input.into_text()),
            "data_source" => self.data_source = input.into_text(),
            "size" => self.size = input.into_text(),
            "timespan" => self.timespan = input.into_text(),
            "geo_coverage" => self.geo_coverage = input.into_text(),
            "published" => self.published = input.into_text(),
            "task_type" => self.task_type = input.into_tags(),
            "topic" => self.topic = input.into_text(),
            "evaluated_on" => self.evaluated_on = input.into_tags(),
            "metrics" => self.metrics = input.into_tags(),
            "results" => self.results = input.into_text(),
            "paper_url" => self.paper_url = input.into_text(),
            "dataset_url" => self.dataset_url = non_blank(input.into_text()),
            "reference" => self.reference = input.into_text(),
            "approved" => self.approved = input.into_flag(),
            // slug is derived on save and never assigned directly
            _ => {}
        }
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        vec![("name", self.name.clone()), ("slug", self.slug.clone())]
    }

    fn pre_save_hooks() -> &'static [&'static dyn PreSaveHook<Self>] {
        DATASET_HOOKS
    }
}

/// A message left by a visitor through the public feedback form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: Uuid,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    pub email: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub message: String,
    /// Time of the last save; stamped on inserts and edits alike
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// Reply written by an administrator
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub replied: bool,
}

static FEEDBACK_HOOKS: &[&dyn PreSaveHook<Feedback>] = &[&StampTimestamp];

impl Record for Feedback {
    const COLLECTION: &'static str = "feedback";
    const KIND: &'static str = "Feedback";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::optional("timestamp", "Time", FieldKind::Timestamp),
        FieldSpec::required("first_name", "First Name", FieldKind::Text),
        FieldSpec::optional("last_name", "Last Name", FieldKind::Text),
        FieldSpec::required("email", "Email", FieldKind::Text),
        FieldSpec::optional("subject", "Subject", FieldKind::Text),
        FieldSpec::required("message", "Message", FieldKind::LongText),
        FieldSpec::optional("response", "Response", FieldKind::LongText),
        FieldSpec::optional("replied", "Replied", FieldKind::Flag),
    ];

    fn blank() -> Self {
        Self {
            id: Uuid::new_v4(),
            first_name: String::new(),
            last_name: None,
            email: String::new(),
            subject: None,
            message: String::new(),
            timestamp: None,
            response: None,
            replied: false,
        }
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn value(&self, field: &str) -> FieldValue<'_> {
        match field {
            "first_name" => FieldValue::Text(&self.first_name),
            "last_name" => FieldValue::Text(self.last_name.as_deref().unwrap_or_default()),
            "email" => FieldValue::Text(&self.email),
            "subject" => FieldValue::Text(self.subject.as_deref().unwrap_or_default()),
            "message" => FieldValue::Text(&self.message),
            "timestamp" => FieldValue::Time(self.timestamp),
            "response" => FieldValue::Text(self.response.as_deref().unwrap_or_default()),
            "replied" => FieldValue::Flag(self.replied),
            _ => FieldValue::Absent,
        }
    }

    fn assign(&mut self, field: &str, input: FieldInput) {
        match field {
            "first_name" => self.first_name = input.into_text(),
            "last_name" => self.last_name = non_blank(input.into_text()),
            "email" => self.email = input.into_text(),
            "subject" => self.subject = non_blank(input.into_text()),
            "message" => self.message = input.into_text(),
            "response" => self.response = non_blank(input.into_text()),
            "replied" => self.replied = input.into_flag(),
            _ => {}
        }
    }

    fn pre_save_hooks() -> &'static [&'static dyn PreSaveHook<Self>] {
        FEEDBACK_HOOKS
    }
}

/// An administrator allowed into the admin console.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminUser {
    pub id: Uuid,
    pub username: String,
    /// Salted one-way hash (PHC string); the plaintext is never stored.
    pub password: String,
}

impl std::fmt::Debug for AdminUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminUser")
            .field("id", &self.id)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl AdminUser {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            password: String::new(),
        }
    }

    /// Replaces the stored hash with a fresh salted hash of `plaintext`.
    pub fn set_password(&mut self, hasher: &dyn PasswordHasher, plaintext: &str) -> Result<()> {
        self.password = hasher.hash(plaintext)?;
        Ok(())
    }

    pub fn check_password(&self, hasher: &dyn PasswordHasher, plaintext: &str) -> bool {
        !self.password.is_empty() && hasher.verify(&self.password, plaintext)
    }
}

impl Record for AdminUser {
    const COLLECTION: &'static str = "admin_users";
    const KIND: &'static str = "AdminUser";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::required("username", "Username", FieldKind::Text),
        FieldSpec::required("password", "Password", FieldKind::Secret),
    ];

    fn blank() -> Self {
        Self::new("")
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn value(&self, field: &str) -> FieldValue<'_> {
        match field {
            "username" => FieldValue::Text(&self.username),
            "password" => FieldValue::Text(&self.password),
            _ => FieldValue::Absent,
        }
    }

    fn assign(&mut self, field: &str, input: FieldInput) {
        if field == "username" {
            self.username = input.into_text();
        }
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        vec![("username", self.username.clone())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DomainError;
    use crate::ports::MockPasswordHasher;

    #[test]
    fn new_dataset_is_not_approved() {
        let dataset = Dataset::blank();
        assert!(!dataset.approved);
        assert!(dataset.slug.is_empty());
    }

    #[test]
    fn missing_description_fails_validation() {
        let mut dataset = Dataset::blank();
        dataset.apply(&vec![
            ("name", FieldInput::Text("Flood Maps 2020".into())),
            ("data_type", FieldInput::Text("image".into())),
        ]);
        let err = dataset.validate().unwrap_err();
        let fields: Vec<String> = err.field_errors().into_iter().map(|e| e.field).collect();
        assert!(fields.contains(&"description".to_string()));
        assert!(!fields.contains(&"name".to_string()));
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn slug_cannot_be_assigned() {
        let mut dataset = Dataset::blank();
        dataset.assign("slug", FieldInput::Text("custom".into()));
        assert!(dataset.slug.is_empty());
    }

    #[test]
    fn feedback_defaults_to_not_replied() {
        let feedback = Feedback::blank();
        assert!(!feedback.replied);
        assert!(feedback.response.is_none());
        assert!(feedback.timestamp.is_none());
    }

    #[test]
    fn optional_feedback_fields_become_none_when_blank() {
        let mut feedback = Feedback::blank();
        feedback.assign("last_name", FieldInput::Text("  ".into()));
        assert_eq!(feedback.last_name, None);
    }

    #[test]
    fn password_is_hashed_through_the_port() {
        let mut hasher = MockPasswordHasher::new();
        hasher
            .expect_hash()
            .returning(|p| Ok(format!("hashed:{p}")));
        hasher
            .expect_verify()
            .returning(|hash, p| hash == format!("hashed:{p}"));

        let mut user = AdminUser::new("admin");
        user.set_password(&hasher, "s3cret").unwrap();
        assert_ne!(user.password, "s3cret");
        assert!(user.check_password(&hasher, "s3cret"));
        assert!(!user.check_password(&hasher, "wrong"));
    }

    #[test]
    fn debug_output_hides_password_hash() {
        let mut user = AdminUser::new("admin");
        user.password = "$argon2id$secret".into();
        assert!(!format!("{user:?}").contains("argon2"));
    }
}
