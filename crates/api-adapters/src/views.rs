//! Askama templates and the view models they render.
//!
//! Templates only see plain strings, flags and lists; everything that
//! depends on field metadata is worked out here.

use askama::Template;
use domains::error::FieldError;
use domains::models::Dataset;
use domains::record::{FieldKind, Record};
use domains::view::{CollectionView, Page};
use uuid::Uuid;

use crate::forms::FILE_SUFFIX;

// ── View models ──────────────────────────────────────────────────────────────

/// One input of a rendered form.
#[derive(Debug, Clone)]
pub struct FormField {
    pub name: String,
    pub label: String,
    /// text | textarea | tags | checkbox | readonly | image
    pub widget: &'static str,
    pub value: String,
    pub required: bool,
    pub checked: bool,
    /// Name of the companion file input for image fields
    pub file_input: String,
    pub error: String,
}

#[derive(Debug, Clone)]
pub struct NavLink {
    pub label: String,
    pub url: String,
    pub active: bool,
}

/// A filter control on an admin list page.
#[derive(Debug, Clone)]
pub struct FilterInput {
    pub name: String,
    pub label: String,
    /// text | flag | date
    pub widget: &'static str,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct ListRow {
    pub cells: Vec<String>,
    pub edit_url: String,
    pub delete_url: String,
}

#[derive(Debug, Clone, Default)]
pub struct Pager {
    pub label: String,
    pub prev_url: String,
    pub next_url: String,
}

#[derive(Debug, Clone)]
pub struct Choice {
    pub value: String,
    pub selected: bool,
}

#[derive(Debug, Clone)]
pub struct DatasetCard {
    pub name: String,
    pub url: String,
    pub summary: String,
    pub data_type: String,
    pub topic: String,
    pub published: String,
    pub image_url: String,
}

// ── Public templates ─────────────────────────────────────────────────────────

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorPage {
    pub title: String,
    pub status: u16,
    pub message: String,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct CatalogPage {
    pub title: String,
    pub search: String,
    pub topics: Vec<Choice>,
    pub data_types: Vec<Choice>,
    pub cards: Vec<DatasetCard>,
    pub total: usize,
    pub pager: Pager,
}

#[derive(Template)]
#[template(path = "dataset.html")]
pub struct DatasetPage<'a> {
    pub title: String,
    pub dataset: &'a Dataset,
    pub image_url: String,
    pub dataset_url: String,
}

#[derive(Template)]
#[template(path = "feedback.html")]
pub struct FeedbackPage {
    pub title: String,
    pub sent: bool,
    pub fields: Vec<FormField>,
    pub errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "about.html")]
pub struct AboutPage {
    pub title: String,
}

// ── Admin templates ──────────────────────────────────────────────────────────

#[derive(Template)]
#[template(path = "admin/login.html")]
pub struct LoginPage {
    pub title: String,
    pub next: String,
    pub username: String,
    pub error: String,
}

#[derive(Template)]
#[template(path = "admin/list.html")]
pub struct AdminListPage {
    pub title: String,
    pub username: String,
    pub nav: Vec<NavLink>,
    pub heading: String,
    pub list_url: String,
    pub new_url: String,
    pub notice: String,
    pub errors: Vec<String>,
    pub search: String,
    pub filters: Vec<FilterInput>,
    pub headers: Vec<String>,
    pub rows: Vec<ListRow>,
    pub total: usize,
    pub pager: Pager,
}

#[derive(Template)]
#[template(path = "admin/form.html")]
pub struct AdminFormPage {
    pub title: String,
    pub username: String,
    pub nav: Vec<NavLink>,
    pub heading: String,
    pub action: String,
    pub cancel_url: String,
    pub delete_url: String,
    pub fields: Vec<FormField>,
    pub errors: Vec<String>,
}

// ── Builders ─────────────────────────────────────────────────────────────────

pub fn admin_nav(views: &[&CollectionView], active: &str) -> Vec<NavLink> {
    views
        .iter()
        .map(|v| NavLink {
            label: v.label.to_string(),
            url: format!("/admin/{}", v.slug),
            active: v.slug == active,
        })
        .collect()
}

/// Form inputs for `record`, restricted to `include`. Errors that belong to
/// no rendered input are returned separately.
pub fn form_fields<R: Record>(
    record: &R,
    include: impl Fn(&str) -> bool,
    errors: &[FieldError],
) -> (Vec<FormField>, Vec<String>) {
    let fields: Vec<FormField> = R::FIELDS
        .iter()
        .filter(|spec| spec.kind != FieldKind::Secret && include(spec.name))
        .map(|spec| {
            let value = record.value(spec.name);
            let widget = match spec.kind {
                FieldKind::Text | FieldKind::Secret => "text",
                FieldKind::LongText => "textarea",
                FieldKind::Tags => "tags",
                FieldKind::Flag => "checkbox",
                FieldKind::Timestamp | FieldKind::Derived => "readonly",
                FieldKind::Image => "image",
            };
            let error = errors
                .iter()
                .filter(|e| e.field == spec.name)
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            FormField {
                name: spec.name.to_string(),
                label: spec.label.to_string(),
                widget,
                checked: matches!(value, domains::record::FieldValue::Flag(true)),
                value: value.display(),
                required: spec.required,
                file_input: format!("{}{}", spec.name, FILE_SUFFIX),
                error,
            }
        })
        .collect();

    let general = errors
        .iter()
        .filter(|e| !fields.iter().any(|f| f.name == e.field))
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect();
    (fields, general)
}

/// Filter controls for every filterable field, pre-filled from `params`.
pub fn filter_inputs<R: Record>(view: &CollectionView, params: &[(String, String)]) -> Vec<FilterInput> {
    let current = |name: &str| {
        params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
            .unwrap_or_default()
    };
    let mut inputs = Vec::new();
    for field in view.filterable {
        let Some(spec) = R::field(field) else { continue };
        let mut push = |op: &str, label: String, widget: &'static str| {
            let name = format!("flt_{field}_{op}");
            inputs.push(FilterInput {
                value: current(&name),
                name,
                label,
                widget,
            });
        };
        match spec.kind {
            FieldKind::Flag => push("eq", spec.label.to_string(), "flag"),
            FieldKind::Timestamp => {
                push("gt", format!("{} after", spec.label), "date");
                push("lt", format!("{} before", spec.label), "date");
            }
            _ => push("contains", format!("{} contains", spec.label), "text"),
        }
    }
    inputs
}

pub fn list_rows<R: Record>(view: &CollectionView, page: &Page<R>) -> Vec<ListRow> {
    page.items
        .iter()
        .map(|record| {
            let id: Uuid = record.id();
            ListRow {
                cells: view
                    .columns
                    .iter()
                    .map(|c| {
                        let text = record.value(c).display();
                        truncate(&text, 80)
                    })
                    .collect(),
                edit_url: format!("/admin/{}/{}/edit", view.slug, id),
                delete_url: format!("/admin/{}/{}/delete", view.slug, id),
            }
        })
        .collect()
}

pub fn column_headers<R: Record>(view: &CollectionView) -> Vec<String> {
    view.columns
        .iter()
        .map(|c| R::field(c).map(|s| s.label).unwrap_or(c).to_string())
        .collect()
}

/// Previous/next links that keep every other query parameter.
pub fn pager<T>(base: &str, params: &[(String, String)], page: &Page<T>) -> Pager {
    let link = |index: usize| {
        let mut kept: Vec<(String, String)> = params
            .iter()
            .filter(|(k, _)| k != "page" && k != "notice")
            .cloned()
            .collect();
        kept.push(("page".into(), (index + 1).to_string()));
        format!("{base}?{}", query_string(&kept))
    };
    Pager {
        label: format!("Page {} of {}", page.page + 1, page.page_count()),
        prev_url: if page.has_previous() { link(page.page - 1) } else { String::new() },
        next_url: if page.has_next() { link(page.page + 1) } else { String::new() },
    }
}

pub fn query_string(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

pub fn dataset_card(d: &Dataset) -> DatasetCard {
    DatasetCard {
        name: d.name.clone(),
        url: format!("/datasets/{}", d.slug),
        summary: truncate(&d.description, 220),
        data_type: d.data_type.clone(),
        topic: d.topic.clone(),
        published: d.published.clone(),
        image_url: d.image_url.clone().unwrap_or_default(),
    }
}

pub fn choices(mut values: Vec<String>, selected: &str) -> Vec<Choice> {
    values.sort_by_key(|v| v.to_lowercase());
    values.dedup_by(|a, b| a.eq_ignore_ascii_case(b));
    values
        .into_iter()
        .filter(|v| !v.trim().is_empty())
        .map(|v| Choice {
            selected: v.eq_ignore_ascii_case(selected),
            value: v,
        })
        .collect()
}

pub fn notice_text(code: &str) -> &'static str {
    match code {
        "created" => "Record was successfully created.",
        "saved" => "Record was successfully saved.",
        "deleted" => "Record was successfully deleted.",
        _ => "",
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", text[..cut].trim_end()),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::models::Feedback;
    use domains::view::{DATASET_ADMIN_VIEW, FEEDBACK_ADMIN_VIEW};

    #[test]
    fn form_fields_attach_errors_and_skip_hidden() {
        let mut d = Dataset::blank();
        d.approved = true;
        let errors = vec![
            FieldError::new("name", "This field is required."),
            FieldError::new("slug", "taken"),
        ];
        let (fields, general) = form_fields(&d, |f| !DATASET_ADMIN_VIEW.is_hidden(f), &errors);

        assert!(fields.iter().all(|f| f.name != "slug"));
        let name = fields.iter().find(|f| f.name == "name").unwrap();
        assert_eq!(name.error, "This field is required.");
        let approved = fields.iter().find(|f| f.name == "approved").unwrap();
        assert!(approved.checked);
        assert_eq!(fields.iter().find(|f| f.name == "image_url").unwrap().file_input, "image_url_file");
        assert_eq!(general, vec!["slug: taken".to_string()]);
    }

    #[test]
    fn timestamp_is_read_only_in_feedback_form() {
        let (fields, _) = form_fields(&Feedback::blank(), |_| true, &[]);
        assert_eq!(fields[0].name, "timestamp");
        assert_eq!(fields[0].widget, "readonly");
    }

    #[test]
    fn filter_controls_per_kind() {
        let params = vec![("flt_topic_contains".to_string(), "flood".to_string())];
        let inputs = filter_inputs::<Feedback>(&FEEDBACK_ADMIN_VIEW, &params);
        assert!(inputs.iter().any(|i| i.name == "flt_timestamp_gt" && i.widget == "date"));
        assert!(inputs.iter().any(|i| i.name == "flt_timestamp_lt"));

        let inputs = filter_inputs::<Dataset>(&DATASET_ADMIN_VIEW, &params);
        let topic = inputs.iter().find(|i| i.name == "flt_topic_contains").unwrap();
        assert_eq!(topic.value, "flood");
        assert!(inputs.iter().any(|i| i.name == "flt_approved_eq" && i.widget == "flag"));
    }

    #[test]
    fn pager_keeps_filters_and_drops_notice() {
        let page = Page { items: vec![(); 2], page: 1, per_page: 2, total: 6 };
        let params = vec![
            ("q".to_string(), "flood maps".to_string()),
            ("page".to_string(), "2".to_string()),
            ("notice".to_string(), "saved".to_string()),
        ];
        let p = pager("/admin/datasets", &params, &page);
        assert_eq!(p.label, "Page 2 of 3");
        assert_eq!(p.prev_url, "/admin/datasets?q=flood%20maps&page=1");
        assert_eq!(p.next_url, "/admin/datasets?q=flood%20maps&page=3");
    }

    #[test]
    fn choices_are_sorted_and_deduplicated() {
        let c = choices(vec!["text".into(), "Image".into(), "image".into(), "".into()], "IMAGE");
        let values: Vec<&str> = c.iter().map(|c| c.value.as_str()).collect();
        assert_eq!(values, vec!["Image", "text"]);
        assert!(c[0].selected);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate("ééééé", 3), "ééé…");
        assert_eq!(truncate("short", 10), "short");
    }
}
