//! In-memory relational store.
//!
//! Every write holds the lock across its reference checks, so a check and the
//! write it guards always see the same rows. Deletes are restricted: a row
//! that is still referenced is never removed and nothing cascades.

use crate::config::Seed;
use crate::metrics_defs::STORE_ROWS;
use parking_lot::RwLock;
use shared::gauge;
use shared::model::{Employee, EntityId, Project, Resource, TaskItem};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum StoreError {
    #[error("{collection} {id} not found")]
    NotFound {
        collection: &'static str,
        id: EntityId,
    },

    #[error("{field} references missing {collection} {id}")]
    MissingReference {
        field: &'static str,
        collection: &'static str,
        id: EntityId,
    },

    #[error("{collection} {id} is still referenced by {referenced_by}")]
    Restricted {
        collection: &'static str,
        id: EntityId,
        referenced_by: &'static str,
    },

    #[error("{collection} {id} already exists")]
    DuplicateId {
        collection: &'static str,
        id: EntityId,
    },

    #[error("{collection} id {id} is out of range")]
    InvalidId {
        collection: &'static str,
        id: EntityId,
    },
}

pub struct Table<R> {
    rows: BTreeMap<EntityId, R>,
    next_id: EntityId,
}

impl<R> Default for Table<R> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl<R: Resource> Table<R> {
    fn contains(&self, id: EntityId) -> bool {
        self.rows.contains_key(&id)
    }

    fn allocate_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Keeps an explicit id and moves the allocator past it. The id must be
    /// positive, unused and leave room for the allocator.
    fn reserve_id(&mut self, id: EntityId) -> Result<(), StoreError> {
        let next = match id.checked_add(1) {
            Some(next) if id > 0 => next,
            _ => {
                return Err(StoreError::InvalidId {
                    collection: R::COLLECTION,
                    id,
                });
            }
        };
        if self.contains(id) {
            return Err(StoreError::DuplicateId {
                collection: R::COLLECTION,
                id,
            });
        }

        self.next_id = self.next_id.max(next);
        Ok(())
    }
}

#[derive(Default)]
pub struct Tables {
    employees: Table<Employee>,
    projects: Table<Project>,
    task_items: Table<TaskItem>,
}

/// Table access and foreign keys for a stored entity.
pub trait StoredResource: Resource {
    fn table(tables: &Tables) -> &Table<Self>;

    fn table_mut(tables: &mut Tables) -> &mut Table<Self>;

    fn check_references(&self, tables: &Tables) -> Result<(), StoreError>;

    /// The first collection that still references row `id`, if any.
    fn referenced_by(id: EntityId, tables: &Tables) -> Option<&'static str>;
}

fn require<R: Resource>(
    table: &Table<R>,
    field: &'static str,
    id: EntityId,
) -> Result<(), StoreError> {
    match table.contains(id) {
        true => Ok(()),
        false => Err(StoreError::MissingReference {
            field,
            collection: R::COLLECTION,
            id,
        }),
    }
}

impl StoredResource for Employee {
    fn table(tables: &Tables) -> &Table<Self> {
        &tables.employees
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.employees
    }

    fn check_references(&self, _tables: &Tables) -> Result<(), StoreError> {
        Ok(())
    }

    fn referenced_by(id: EntityId, tables: &Tables) -> Option<&'static str> {
        if tables.projects.rows.values().any(|p| p.manager_id == id) {
            return Some(Project::COLLECTION);
        }
        if tables
            .task_items
            .rows
            .values()
            .any(|t| t.assigned_employee_id == id)
        {
            return Some(TaskItem::COLLECTION);
        }
        None
    }
}

impl StoredResource for Project {
    fn table(tables: &Tables) -> &Table<Self> {
        &tables.projects
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.projects
    }

    // The manager's role is not checked, only that the employee exists.
    fn check_references(&self, tables: &Tables) -> Result<(), StoreError> {
        require(&tables.employees, "managerId", self.manager_id)
    }

    fn referenced_by(id: EntityId, tables: &Tables) -> Option<&'static str> {
        tables
            .task_items
            .rows
            .values()
            .any(|t| t.project_id == id)
            .then_some(TaskItem::COLLECTION)
    }
}

impl StoredResource for TaskItem {
    fn table(tables: &Tables) -> &Table<Self> {
        &tables.task_items
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.task_items
    }

    fn check_references(&self, tables: &Tables) -> Result<(), StoreError> {
        require(&tables.projects, "projectId", self.project_id)?;
        require(&tables.employees, "assignedEmployeeId", self.assigned_employee_id)
    }

    fn referenced_by(_id: EntityId, _tables: &Tables) -> Option<&'static str> {
        None
    }
}

#[derive(Clone, Default)]
pub struct Store {
    tables: Arc<RwLock<Tables>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list<R: StoredResource>(&self) -> Vec<R> {
        let tables = self.tables.read();
        R::table(&tables).rows.values().cloned().collect()
    }

    pub fn get<R: StoredResource>(&self, id: EntityId) -> Option<R> {
        let tables = self.tables.read();
        R::table(&tables).rows.get(&id).cloned()
    }

    /// Any id on `model` is replaced by a freshly allocated one.
    pub fn insert<R: StoredResource>(&self, mut model: R) -> Result<R, StoreError> {
        let mut tables = self.tables.write();
        model.check_references(&tables)?;

        let table = R::table_mut(&mut tables);
        model.set_id(table.allocate_id());
        table.rows.insert(model.id(), model.clone());
        record_rows(table);

        Ok(model)
    }

    pub fn update<R: StoredResource>(&self, id: EntityId, mut model: R) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        if !R::table(&tables).contains(id) {
            return Err(StoreError::NotFound {
                collection: R::COLLECTION,
                id,
            });
        }
        model.check_references(&tables)?;

        model.set_id(id);
        R::table_mut(&mut tables).rows.insert(id, model);
        Ok(())
    }

    pub fn delete<R: StoredResource>(&self, id: EntityId) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        if !R::table(&tables).contains(id) {
            return Err(StoreError::NotFound {
                collection: R::COLLECTION,
                id,
            });
        }
        if let Some(referenced_by) = R::referenced_by(id, &tables) {
            return Err(StoreError::Restricted {
                collection: R::COLLECTION,
                id,
                referenced_by,
            });
        }

        let table = R::table_mut(&mut tables);
        table.rows.remove(&id);
        record_rows(table);
        Ok(())
    }

    /// Loads seed rows in dependency order. Rows with a non-zero id keep it so
    /// that later seed rows can reference them; a duplicate or negative id
    /// fails the seed.
    pub fn seed(&self, seed: &Seed) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        seed_rows(&mut tables, &seed.employees)?;
        seed_rows(&mut tables, &seed.projects)?;
        seed_rows(&mut tables, &seed.task_items)?;
        Ok(())
    }
}

fn seed_rows<R: StoredResource>(tables: &mut Tables, rows: &[R]) -> Result<(), StoreError> {
    for row in rows {
        row.check_references(tables)?;

        let table = R::table_mut(tables);
        let mut row = row.clone();
        match row.id() {
            0 => row.set_id(table.allocate_id()),
            id => table.reserve_id(id)?,
        }
        table.rows.insert(row.id(), row);
        record_rows(table);
    }
    Ok(())
}

fn record_rows<R: Resource>(table: &Table<R>) {
    gauge!(STORE_ROWS, "collection" => R::COLLECTION).set(table.rows.len() as f64);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use shared::model::{Priority, Role, Status};

    fn employee(name: &str, role: Role) -> Employee {
        Employee {
            employee_id: 0,
            name: name.into(),
            email: format!("{}@example.com", name.to_lowercase()),
            role,
        }
    }

    fn project(manager_id: EntityId) -> Project {
        Project {
            project_id: 0,
            name: "Apollo".into(),
            description: None,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            manager_id,
        }
    }

    fn task(project_id: EntityId, assigned_employee_id: EntityId) -> TaskItem {
        TaskItem {
            task_id: 0,
            name: "Launch".into(),
            description: Some("Go".into()),
            project_id,
            assigned_employee_id,
            priority: Priority::Low,
            status: Status::NotStarted,
        }
    }

    #[test]
    fn test_insert_allocates_ids() {
        let store = Store::new();
        let mut submitted = employee("Ada", Role::Manager);
        submitted.employee_id = 42;

        let first = store.insert(submitted).unwrap();
        let second = store.insert(employee("Bob", Role::Employee)).unwrap();
        assert_eq!(first.employee_id, 1);
        assert_eq!(second.employee_id, 2);
        assert_eq!(store.get::<Employee>(1), Some(first));
        assert_eq!(store.list::<Employee>().len(), 2);
    }

    #[test]
    fn test_references_must_exist() {
        let store = Store::new();
        assert_eq!(
            store.insert(project(9)).unwrap_err(),
            StoreError::MissingReference {
                field: "managerId",
                collection: "employees",
                id: 9,
            }
        );

        let manager = store.insert(employee("Ada", Role::Manager)).unwrap();
        let project = store.insert(project(manager.employee_id)).unwrap();
        assert!(matches!(
            store.insert(task(project.project_id, 77)).unwrap_err(),
            StoreError::MissingReference {
                field: "assignedEmployeeId",
                ..
            }
        ));
    }

    #[test]
    fn test_manager_role_not_enforced() {
        let store = Store::new();
        let worker = store.insert(employee("Bob", Role::Employee)).unwrap();
        assert!(store.insert(project(worker.employee_id)).is_ok());
    }

    #[test]
    fn test_update() {
        let store = Store::new();
        let ada = store.insert(employee("Ada", Role::Manager)).unwrap();

        let mut renamed = ada.clone();
        renamed.name = "Ada L.".into();
        store.update(ada.employee_id, renamed.clone()).unwrap();
        assert_eq!(store.get::<Employee>(ada.employee_id), Some(renamed.clone()));

        assert!(matches!(
            store.update(99, renamed).unwrap_err(),
            StoreError::NotFound { id: 99, .. }
        ));
    }

    #[test]
    fn test_delete_is_restricted() {
        let store = Store::new();
        let manager = store.insert(employee("Ada", Role::Manager)).unwrap();
        let worker = store.insert(employee("Bob", Role::Employee)).unwrap();
        let project = store.insert(project(manager.employee_id)).unwrap();
        let task = store
            .insert(task(project.project_id, worker.employee_id))
            .unwrap();

        assert_eq!(
            store.delete::<Employee>(manager.employee_id).unwrap_err(),
            StoreError::Restricted {
                collection: "employees",
                id: manager.employee_id,
                referenced_by: "projects",
            }
        );
        assert!(matches!(
            store.delete::<Employee>(worker.employee_id).unwrap_err(),
            StoreError::Restricted {
                referenced_by: "task-items",
                ..
            }
        ));
        assert!(matches!(
            store.delete::<Project>(project.project_id).unwrap_err(),
            StoreError::Restricted { .. }
        ));

        // Nothing cascaded.
        assert_eq!(store.list::<TaskItem>().len(), 1);

        store.delete::<TaskItem>(task.task_id).unwrap();
        store.delete::<Project>(project.project_id).unwrap();
        store.delete::<Employee>(manager.employee_id).unwrap();
        assert!(matches!(
            store.delete::<Employee>(manager.employee_id).unwrap_err(),
            StoreError::NotFound { .. }
        ));
    }

    #[test]
    fn test_seed_keeps_explicit_ids() {
        let mut manager = employee("Ada", Role::Manager);
        manager.employee_id = 10;
        let mut apollo = project(10);
        apollo.project_id = 3;

        let seed = Seed {
            employees: vec![manager, employee("Bob", Role::Employee)],
            projects: vec![apollo],
            task_items: vec![task(3, 10)],
        };

        let store = Store::new();
        store.seed(&seed).unwrap();

        let ids: Vec<_> = store
            .list::<Employee>()
            .iter()
            .map(|e| e.employee_id)
            .collect();
        assert_eq!(ids, vec![10, 11]);
        assert_eq!(store.list::<TaskItem>()[0].task_id, 1);

        let next = store.insert(employee("Cy", Role::Admin)).unwrap();
        assert_eq!(next.employee_id, 12);
    }

    #[test]
    fn test_seed_rejects_duplicate_ids() {
        let mut manager = employee("Ada", Role::Manager);
        manager.employee_id = 1;
        let mut impostor = employee("Eve", Role::Admin);
        impostor.employee_id = 1;

        let seed = Seed {
            employees: vec![manager, impostor],
            ..Seed::default()
        };
        assert_eq!(
            Store::new().seed(&seed).unwrap_err(),
            StoreError::DuplicateId {
                collection: "employees",
                id: 1
            }
        );

        // An allocated id is taken just like an explicit one.
        let mut late = employee("Bob", Role::Employee);
        late.employee_id = 1;
        let seed = Seed {
            employees: vec![employee("Ada", Role::Manager), late],
            ..Seed::default()
        };
        assert!(matches!(
            Store::new().seed(&seed).unwrap_err(),
            StoreError::DuplicateId { id: 1, .. }
        ));
    }

    #[test]
    fn test_seed_rejects_out_of_range_ids() {
        for id in [-3, EntityId::MAX] {
            let mut row = employee("Ada", Role::Manager);
            row.employee_id = id;
            let seed = Seed {
                employees: vec![row],
                ..Seed::default()
            };

            let store = Store::new();
            assert_eq!(
                store.seed(&seed).unwrap_err(),
                StoreError::InvalidId {
                    collection: "employees",
                    id
                }
            );
            assert!(store.list::<Employee>().is_empty());
        }
    }
}
