//! Dropdown data needed to render the create and edit forms.
//!
//! A failed reference fetch never fails the page: the affected list renders
//! empty and the form is shown anyway. Only the primary entity fetch in the
//! controller can produce a page-level failure.

use crate::client::{ApiClient, ForwardedCookie};
use crate::form::{EmployeeForm, FormInput, ProjectForm, TaskItemForm};
use crate::metrics_defs::LOOKUP_DEGRADED;
use crate::view::{Lookups, SelectList};
use async_trait::async_trait;
use shared::counter;
use shared::model::{Employee, Priority, Project, Resource, Role, Status, TaskItem};

#[async_trait]
pub trait FormResource: Resource {
    type Input: FormInput<Entity = Self>;

    /// `selected` holds the values being edited or re-rendered; they are
    /// pre-selected in every list even when they did not convert.
    async fn load_lookups(
        client: &ApiClient,
        cookie: &ForwardedCookie,
        selected: Option<&Self::Input>,
    ) -> Lookups;
}

/// Fetches a whole collection for a dropdown, degrading to an empty list.
async fn fetch_or_empty<T: Resource>(
    client: &ApiClient,
    cookie: &ForwardedCookie,
    lookup: &'static str,
) -> Vec<T> {
    let path = T::collection_path();
    let result = match client.get(&path, cookie).await {
        Ok(response) if response.is_success() => response.json::<Vec<T>>(),
        Ok(response) => {
            tracing::warn!(lookup, status = %response.status, "Lookup fetch rejected, rendering empty list");
            counter!(LOOKUP_DEGRADED, "lookup" => lookup).increment(1);
            return Vec::new();
        }
        Err(e) => Err(e),
    };

    match result {
        Ok(items) => items.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(lookup, error = %e, "Lookup fetch failed, rendering empty list");
            counter!(LOOKUP_DEGRADED, "lookup" => lookup).increment(1);
            Vec::new()
        }
    }
}

#[async_trait]
impl FormResource for Employee {
    type Input = EmployeeForm;

    async fn load_lookups(
        _client: &ApiClient,
        _cookie: &ForwardedCookie,
        selected: Option<&EmployeeForm>,
    ) -> Lookups {
        let roles = SelectList::from_names(
            Role::ALL.iter().map(Role::as_str),
            selected.map(|form| form.role.as_str()),
        );

        Lookups::from([("Roles", roles)])
    }
}

#[async_trait]
impl FormResource for Project {
    type Input = ProjectForm;

    async fn load_lookups(
        client: &ApiClient,
        cookie: &ForwardedCookie,
        selected: Option<&ProjectForm>,
    ) -> Lookups {
        // The API has no role filter; managers are picked out here.
        let managers = fetch_or_empty::<Employee>(client, cookie, "ManagerList")
            .await
            .into_iter()
            .filter(|employee| employee.role == Role::Manager)
            .map(|employee| (employee.employee_id.to_string(), employee.name));

        let selected_manager = selected.map(|form| form.manager_id.as_str());
        let manager_list = SelectList::new(managers, selected_manager);

        Lookups::from([("ManagerList", manager_list)])
    }
}

#[async_trait]
impl FormResource for TaskItem {
    type Input = TaskItemForm;

    async fn load_lookups(
        client: &ApiClient,
        cookie: &ForwardedCookie,
        selected: Option<&TaskItemForm>,
    ) -> Lookups {
        let (projects, employees) = tokio::join!(
            fetch_or_empty::<Project>(client, cookie, "ProjectList"),
            fetch_or_empty::<Employee>(client, cookie, "EmployeeList"),
        );

        let project_list = SelectList::new(
            projects
                .into_iter()
                .map(|project| (project.project_id.to_string(), project.name)),
            selected.map(|form| form.project_id.as_str()),
        );
        let employee_list = SelectList::new(
            employees
                .into_iter()
                .map(|employee| (employee.employee_id.to_string(), employee.name)),
            selected.map(|form| form.assigned_employee_id.as_str()),
        );
        let priority_list = SelectList::from_names(
            Priority::ALL.iter().map(Priority::as_str),
            selected.map(|form| form.priority.as_str()),
        );
        let status_list = SelectList::from_names(
            Status::ALL.iter().map(Status::as_str),
            selected.map(|form| form.status.as_str()),
        );

        Lookups::from([
            ("ProjectList", project_list),
            ("EmployeeList", employee_list),
            ("PriorityList", priority_list),
            ("StatusList", status_list),
        ])
    }
}
