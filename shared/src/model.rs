//! Entities owned by the resource API and relayed to the browser.
//!
//! These types travel as JSON between the relay and the resource API, with
//! camelCase field names. Browser forms bind into the relay's own text-only
//! inputs first.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

pub type EntityId = i64;

/// Ties an entity type to its API collection and identifier.
pub trait Resource:
    Clone + fmt::Debug + Serialize + DeserializeOwned + Validate + Send + Sync + 'static
{
    /// Path segment shared by `/api/{collection}` and the browser-facing routes.
    const COLLECTION: &'static str;
    /// Lower-case singular name used in user-facing messages.
    const DISPLAY_NAME: &'static str;

    fn id(&self) -> EntityId;

    fn set_id(&mut self, id: EntityId);

    fn collection_path() -> String {
        format!("/api/{}", Self::COLLECTION)
    }

    fn item_path(id: EntityId) -> String {
        format!("/api/{}/{id}", Self::COLLECTION)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Manager,
    Employee,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Manager, Role::Employee];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Manager => "Manager",
            Role::Employee => "Employee",
        }
    }

    /// Inverse of `as_str`.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|value| value.as_str() == name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|value| value.as_str() == name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
    Blocked,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::NotStarted,
        Status::InProgress,
        Status::Completed,
        Status::Blocked,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Status::NotStarted => "Not Started",
            Status::InProgress => "In Progress",
            Status::Completed => "Completed",
            Status::Blocked => "Blocked",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|value| value.as_str() == name)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    #[serde(default)]
    pub employee_id: EntityId,
    #[serde(default)]
    #[validate(length(min = 1, message = "The Name field is required."))]
    pub name: String,
    #[serde(default)]
    #[validate(email(message = "The Email field is not a valid e-mail address."))]
    pub email: String,
    pub role: Role,
}

impl Resource for Employee {
    const COLLECTION: &'static str = "employees";
    const DISPLAY_NAME: &'static str = "employee";

    fn id(&self) -> EntityId {
        self.employee_id
    }

    fn set_id(&mut self, id: EntityId) {
        self.employee_id = id;
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default)]
    pub project_id: EntityId,
    #[serde(default)]
    #[validate(length(min = 1, message = "The Name field is required."))]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Expected to reference an employee with the Manager role. Only the
    /// manager dropdown enforces this; the store does not.
    pub manager_id: EntityId,
}

impl Resource for Project {
    const COLLECTION: &'static str = "projects";
    const DISPLAY_NAME: &'static str = "project";

    fn id(&self) -> EntityId {
        self.project_id
    }

    fn set_id(&mut self, id: EntityId) {
        self.project_id = id;
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TaskItem {
    #[serde(default)]
    pub task_id: EntityId,
    #[serde(default)]
    #[validate(length(min = 1, message = "The Name field is required."))]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub project_id: EntityId,
    pub assigned_employee_id: EntityId,
    pub priority: Priority,
    pub status: Status,
}

impl Resource for TaskItem {
    const COLLECTION: &'static str = "task-items";
    const DISPLAY_NAME: &'static str = "task";

    fn id(&self) -> EntityId {
        self.task_id
    }

    fn set_id(&mut self, id: EntityId) {
        self.task_id = id;
    }
}
