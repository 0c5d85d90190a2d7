use serde::Deserialize;
use shared::model::{Employee, Project, TaskItem};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Listener and admin listener cannot share {0}")]
    SharedListener(String),
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Listener for the `/api` routes
    pub listener: Listener,
    /// Admin listener for health and readiness probes
    pub admin_listener: Listener,
    /// Rows loaded into the store at startup
    #[serde(default)]
    pub seed: Seed,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;

        if self.listener == self.admin_listener {
            return Err(ValidationError::SharedListener(format!(
                "{}:{}",
                self.listener.host, self.listener.port
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    pub host: String,
    pub port: u16,
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

/// Seed rows use the same camelCase field names as the API. A non-zero id is
/// kept so later rows can refer to it.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Seed {
    pub employees: Vec<Employee>,
    pub projects: Vec<Project>,
    pub task_items: Vec<TaskItem>,
}
