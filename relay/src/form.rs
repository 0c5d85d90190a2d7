//! Form bodies posted by the browser.
//!
//! Every field arrives as text and extraction never fails on a blank or
//! malformed value. Conversion into the entity happens afterwards, and each
//! value that does not convert becomes a field error on the re-rendered form.

use crate::view::ModelState;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shared::model::{Employee, EntityId, Priority, Project, Role, Status, TaskItem};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

pub trait FormInput:
    Clone + Default + fmt::Debug + Serialize + DeserializeOwned + Validate + Send + Sync + 'static
{
    type Entity;

    /// Values shown when an existing entity is edited.
    fn from_entity(entity: &Self::Entity) -> Self;

    /// Identifier posted back by the edit form, if it is a number.
    fn id(&self) -> Option<EntityId>;

    /// Converts the submitted text. Records a field error for every value
    /// that cannot be converted and returns `None` if there was any.
    fn bind(&self, model_state: &mut ModelState) -> Option<Self::Entity>;
}

fn convert<T>(
    model_state: &mut ModelState,
    field: &str,
    label: &str,
    value: &str,
    parse: impl FnOnce(&str) -> Option<T>,
) -> Option<T> {
    let value = value.trim();
    if value.is_empty() {
        model_state.add_field_error(field, format!("The {label} field is required."));
        return None;
    }

    let converted = parse(value);
    if converted.is_none() {
        model_state.add_field_error(field, format!("The value '{value}' is not valid for {label}."));
    }
    converted
}

fn parse<T: FromStr>(value: &str) -> Option<T> {
    value.parse().ok()
}

fn parse_id(value: &str) -> Option<EntityId> {
    value.trim().parse().ok()
}

fn optional_text(value: &str) -> Option<String> {
    match value.trim().is_empty() {
        true => None,
        false => Some(value.to_string()),
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct EmployeeForm {
    pub employee_id: String,
    #[validate(length(min = 1, message = "The Name field is required."))]
    pub name: String,
    #[validate(email(message = "The Email field is not a valid e-mail address."))]
    pub email: String,
    pub role: String,
}

impl FormInput for EmployeeForm {
    type Entity = Employee;

    fn from_entity(employee: &Employee) -> Self {
        Self {
            employee_id: employee.employee_id.to_string(),
            name: employee.name.clone(),
            email: employee.email.clone(),
            role: employee.role.as_str().to_string(),
        }
    }

    fn id(&self) -> Option<EntityId> {
        parse_id(&self.employee_id)
    }

    fn bind(&self, model_state: &mut ModelState) -> Option<Employee> {
        let role = convert(model_state, "role", "Role", &self.role, Role::from_name)?;

        Some(Employee {
            employee_id: self.id().unwrap_or_default(),
            name: self.name.clone(),
            email: self.email.clone(),
            role,
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectForm {
    pub project_id: String,
    #[validate(length(min = 1, message = "The Name field is required."))]
    pub name: String,
    pub description: String,
    pub start_date: String,
    pub end_date: String,
    pub manager_id: String,
}

impl FormInput for ProjectForm {
    type Entity = Project;

    fn from_entity(project: &Project) -> Self {
        Self {
            project_id: project.project_id.to_string(),
            name: project.name.clone(),
            description: project.description.clone().unwrap_or_default(),
            start_date: project.start_date.to_string(),
            end_date: project.end_date.to_string(),
            manager_id: project.manager_id.to_string(),
        }
    }

    fn id(&self) -> Option<EntityId> {
        parse_id(&self.project_id)
    }

    fn bind(&self, model_state: &mut ModelState) -> Option<Project> {
        let start_date = convert(
            model_state,
            "startDate",
            "StartDate",
            &self.start_date,
            parse::<NaiveDate>,
        );
        let end_date = convert(
            model_state,
            "endDate",
            "EndDate",
            &self.end_date,
            parse::<NaiveDate>,
        );
        let manager_id = convert(
            model_state,
            "managerId",
            "ManagerId",
            &self.manager_id,
            parse::<EntityId>,
        );

        Some(Project {
            project_id: self.id().unwrap_or_default(),
            name: self.name.clone(),
            description: optional_text(&self.description),
            start_date: start_date?,
            end_date: end_date?,
            manager_id: manager_id?,
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskItemForm {
    pub task_id: String,
    #[validate(length(min = 1, message = "The Name field is required."))]
    pub name: String,
    pub description: String,
    pub project_id: String,
    pub assigned_employee_id: String,
    pub priority: String,
    pub status: String,
}

impl FormInput for TaskItemForm {
    type Entity = TaskItem;

    fn from_entity(task: &TaskItem) -> Self {
        Self {
            task_id: task.task_id.to_string(),
            name: task.name.clone(),
            description: task.description.clone().unwrap_or_default(),
            project_id: task.project_id.to_string(),
            assigned_employee_id: task.assigned_employee_id.to_string(),
            priority: task.priority.as_str().to_string(),
            status: task.status.as_str().to_string(),
        }
    }

    fn id(&self) -> Option<EntityId> {
        parse_id(&self.task_id)
    }

    fn bind(&self, model_state: &mut ModelState) -> Option<TaskItem> {
        let project_id = convert(
            model_state,
            "projectId",
            "ProjectId",
            &self.project_id,
            parse::<EntityId>,
        );
        let assigned_employee_id = convert(
            model_state,
            "assignedEmployeeId",
            "AssignedEmployeeId",
            &self.assigned_employee_id,
            parse::<EntityId>,
        );
        let priority = convert(
            model_state,
            "priority",
            "Priority",
            &self.priority,
            Priority::from_name,
        );
        let status = convert(model_state, "status", "Status", &self.status, Status::from_name);

        Some(TaskItem {
            task_id: self.id().unwrap_or_default(),
            name: self.name.clone(),
            description: optional_text(&self.description),
            project_id: project_id?,
            assigned_employee_id: assigned_employee_id?,
            priority: priority?,
            status: status?,
        })
    }
}
