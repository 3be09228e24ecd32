//! Prometheus counters exposed at `/metrics`.

use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct SaveLabels {
    pub collection: String,
    pub outcome: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct LoginLabels {
    pub outcome: String,
}

pub struct Metrics {
    registry: Registry,
    record_saves: Family<SaveLabels, Counter>,
    feedback_submissions: Counter,
    logins: Family<LoginLabels, Counter>,
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();
        let record_saves = Family::<SaveLabels, Counter>::default();
        let feedback_submissions = Counter::default();
        let logins = Family::<LoginLabels, Counter>::default();

        registry.register(
            "nadbench_record_saves",
            "Record saves through forms, by collection and outcome",
            record_saves.clone(),
        );
        registry.register(
            "nadbench_feedback_submissions",
            "Feedback accepted from the public form",
            feedback_submissions.clone(),
        );
        registry.register(
            "nadbench_logins",
            "Admin login attempts by outcome",
            logins.clone(),
        );

        Self {
            registry,
            record_saves,
            feedback_submissions,
            logins,
        }
    }

    pub fn record_save(&self, collection: &str, saved: bool) {
        self.record_saves
            .get_or_create(&SaveLabels {
                collection: collection.to_string(),
                outcome: if saved { "saved" } else { "rejected" }.to_string(),
            })
            .inc();
    }

    pub fn feedback_submitted(&self) {
        self.feedback_submissions.inc();
    }

    pub fn login(&self, success: bool) {
        self.logins
            .get_or_create(&LoginLabels {
                outcome: if success { "success" } else { "failure" }.to_string(),
            })
            .inc();
    }

    /// OpenMetrics text exposition.
    pub fn render(&self) -> Result<String, std::fmt::Error> {
        let mut out = String::new();
        encode(&mut out, &self.registry)?;
        Ok(out)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
