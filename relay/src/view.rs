use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use http::header::LOCATION;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;
use validator::{Validate, ValidationErrors};

pub const SERVICE_FAILURE_DETAIL: &str = "API call failed.";

/// Validation messages attached to a rendered form or list.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelState {
    pub field_errors: BTreeMap<String, Vec<String>>,
    pub errors: Vec<String>,
}

impl ModelState {
    pub fn validate<M: Validate>(model: &M) -> Self {
        match model.validate() {
            Ok(()) => Self::default(),
            Err(errors) => Self::from(&errors),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.field_errors.is_empty() && self.errors.is_empty()
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn add_field_error(&mut self, field: &str, message: impl Into<String>) {
        self.field_errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }
}

/// Message that survives the redirect back to a list page. The query string
/// only names one of these; the text itself is always built server-side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flash {
    DeleteFailed,
}

impl Flash {
    pub const ALL: [Flash; 1] = [Flash::DeleteFailed];

    pub const fn key(&self) -> &'static str {
        match self {
            Flash::DeleteFailed => "deleteFailed",
        }
    }

    /// Unknown keys are ignored rather than rejected.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|flash| flash.key() == key)
    }

    pub fn message(&self, display_name: &str) -> String {
        match self {
            Flash::DeleteFailed => format!("Failed to delete {display_name} via API."),
        }
    }
}

impl From<&ValidationErrors> for ModelState {
    fn from(errors: &ValidationErrors) -> Self {
        let field_errors = errors
            .field_errors()
            .into_iter()
            .map(|(field, errors)| {
                let messages = errors
                    .iter()
                    .map(|error| match &error.message {
                        Some(message) => message.to_string(),
                        None => format!("The {field} field is invalid."),
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect();

        Self {
            field_errors,
            errors: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SelectItem {
    pub value: String,
    pub text: String,
    pub selected: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SelectList {
    pub items: Vec<SelectItem>,
}

impl SelectList {
    /// Builds a list from `(value, text)` pairs, marking the item whose value
    /// equals `selected`.
    pub fn new<I, V, T>(options: I, selected: Option<&str>) -> Self
    where
        I: IntoIterator<Item = (V, T)>,
        V: Into<String>,
        T: Into<String>,
    {
        let items = options
            .into_iter()
            .map(|(value, text)| {
                let value = value.into();
                SelectItem {
                    selected: selected == Some(value.as_str()),
                    value,
                    text: text.into(),
                }
            })
            .collect();

        Self { items }
    }

    /// Static vocabulary where the display text is the value itself.
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>, selected: Option<&str>) -> Self {
        Self::new(names.into_iter().map(|name| (name, name)), selected)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn selected(&self) -> Option<&SelectItem> {
        self.items.iter().find(|item| item.selected)
    }
}

/// Dropdown data for a form, keyed by the name the form refers to it by.
pub type Lookups = IndexMap<&'static str, SelectList>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct View<M> {
    #[serde(rename = "view")]
    pub name: &'static str,
    pub model: M,
    pub lookups: Lookups,
    pub model_state: ModelState,
}

#[derive(Debug)]
pub enum ViewOutcome<M> {
    View(View<M>),
    /// Always targets a list route.
    Redirect {
        location: String,
        flash: Option<Flash>,
    },
    NotFound,
    ServiceFailure,
}

impl<M> ViewOutcome<M> {
    pub fn view(name: &'static str, model: M) -> Self {
        Self::View(View {
            name,
            model,
            lookups: Lookups::new(),
            model_state: ModelState::default(),
        })
    }

    pub fn form(name: &'static str, model: M, lookups: Lookups, model_state: ModelState) -> Self {
        Self::View(View {
            name,
            model,
            lookups,
            model_state,
        })
    }

    pub fn redirect(location: impl Into<String>) -> Self {
        Self::Redirect {
            location: location.into(),
            flash: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ViewOutcome::View(_) => StatusCode::OK,
            ViewOutcome::Redirect { .. } => StatusCode::FOUND,
            ViewOutcome::NotFound => StatusCode::NOT_FOUND,
            ViewOutcome::ServiceFailure => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct Problem {
    status: u16,
    detail: &'static str,
}

fn flash_location(location: &str, flash: Option<Flash>) -> String {
    match flash {
        Some(flash) => format!("{location}?flash={}", flash.key()),
        None => location.to_string(),
    }
}

impl<M: Serialize> IntoResponse for ViewOutcome<M> {
    fn into_response(self) -> Response {
        match self {
            ViewOutcome::View(view) => (StatusCode::OK, Json(view)).into_response(),
            ViewOutcome::Redirect { location, flash } => (
                StatusCode::FOUND,
                [(LOCATION, flash_location(&location, flash))],
            )
                .into_response(),
            ViewOutcome::NotFound => StatusCode::NOT_FOUND.into_response(),
            ViewOutcome::ServiceFailure => {
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                let problem = Problem {
                    status: status.as_u16(),
                    detail: SERVICE_FAILURE_DETAIL,
                };
                (status, Json(problem)).into_response()
            }
        }
    }
}
