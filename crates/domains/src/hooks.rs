//! # Pre-save hooks
//!
//! Save-time side effects, run in the fixed order returned by
//! `Record::pre_save_hooks` before validation and persistence.

use chrono::{DateTime, Utc};

use crate::error::FieldError;
use crate::models::{Dataset, Feedback};
use crate::slug::slugify;

/// Facts about the save in progress.
#[derive(Debug, Clone, Copy)]
pub struct SaveContext {
    pub now: DateTime<Utc>,
}

/// A side effect applied to a record right before it is saved.
pub trait PreSaveHook<R>: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, record: &mut R, ctx: &SaveContext) -> Result<(), FieldError>;
}

/// Recomputes `Dataset.slug` from `Dataset.name`, overwriting any prior slug.
pub struct DeriveSlug;

impl PreSaveHook<Dataset> for DeriveSlug {
    fn name(&self) -> &'static str {
        "derive_slug"
    }

    fn apply(&self, dataset: &mut Dataset, _ctx: &SaveContext) -> Result<(), FieldError> {
        dataset.slug = slugify(&dataset.name);
        // A blank name is reported by required-field validation instead.
        if dataset.slug.is_empty() && !dataset.name.trim().is_empty() {
            return Err(FieldError::new(
                "name",
                "Name must contain at least one letter or digit.",
            ));
        }
        Ok(())
    }
}

/// Sets `Feedback.timestamp` to the save time, on edits as well as inserts.
pub struct StampTimestamp;

impl PreSaveHook<Feedback> for StampTimestamp {
    fn name(&self) -> &'static str {
        "stamp_timestamp"
    }

    fn apply(&self, feedback: &mut Feedback, ctx: &SaveContext) -> Result<(), FieldError> {
        feedback.timestamp = Some(ctx.now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;
    use chrono::TimeZone;

    fn dataset_named(name: &str) -> Dataset {
        let mut dataset = Dataset::blank();
        dataset.name = name.to_string();
        dataset
    }

    fn ctx() -> SaveContext {
        SaveContext {
            now: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn slug_overwrites_any_previous_value() {
        let mut dataset = dataset_named("Flood Maps 2020");
        dataset.slug = "something-else".into();
        DeriveSlug.apply(&mut dataset, &ctx()).unwrap();
        assert_eq!(dataset.slug, "flood-maps-2020");
    }

    #[test]
    fn non_ascii_names_get_a_slug() {
        let mut dataset = dataset_named("Inondations à Montréal");
        DeriveSlug.apply(&mut dataset, &ctx()).unwrap();
        assert_eq!(dataset.slug, "inondations-a-montreal");
    }

    #[test]
    fn unsluggable_name_is_rejected() {
        let mut dataset = dataset_named("???");
        let err = DeriveSlug.apply(&mut dataset, &ctx()).unwrap_err();
        assert_eq!(err.field, "name");
    }

    #[test]
    fn timestamp_is_stamped_on_edit_too() {
        let mut feedback = Feedback::blank();
        feedback.timestamp = Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
        StampTimestamp.apply(&mut feedback, &ctx()).unwrap();
        assert_eq!(feedback.timestamp, Some(ctx().now));
    }
}
