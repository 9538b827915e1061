//! In-memory department store and an in-process remote call backed by it.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::departments::types::{Department, DepartmentDto, NewDepartment};
use crate::remote::{RemoteCall, RemoteError};

#[derive(Debug)]
pub struct DepartmentStore {
    next_id: AtomicI64,
    rows: DashMap<i64, Department>,
}

impl DepartmentStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            rows: DashMap::new(),
        }
    }

    pub fn save_department(&self, department: NewDepartment) -> Department {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let saved = Department {
            id,
            department_name: department.department_name,
            department_address: department.department_address,
            department_code: department.department_code,
        };
        self.rows.insert(id, saved.clone());
        saved
    }

    pub fn get_department_by_id(&self, id: i64) -> Option<Department> {
        self.rows.get(&id).map(|row| row.value().clone())
    }

    /// All departments ordered by id.
    pub fn get_departments(&self) -> Vec<Department> {
        let mut all: Vec<_> = self.rows.iter().map(|row| row.value().clone()).collect();
        all.sort_by_key(|d| d.id);
        all
    }
}

impl Default for DepartmentStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Serves department lookups straight from a store, answering like the
/// HTTP endpoint would (400 for a non-numeric key, 404 for a missing id).
#[derive(Debug, Clone)]
pub struct LocalDepartments {
    store: Arc<DepartmentStore>,
}

impl LocalDepartments {
    pub fn new(store: Arc<DepartmentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RemoteCall for LocalDepartments {
    type Payload = DepartmentDto;

    async fn invoke(
        &self,
        _resource: &str,
        key: &str,
        _timeout: Duration,
    ) -> Result<DepartmentDto, RemoteError> {
        let id: i64 = key.parse().map_err(|_| RemoteError::Status(400))?;
        self.store
            .get_department_by_id(id)
            .map(DepartmentDto::from)
            .ok_or(RemoteError::Status(404))
    }
}
