//! Department entity and its wire representation.

use serde::{Deserialize, Serialize};

/// A department as stored by the department service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: i64,
    pub department_name: String,
    pub department_address: String,
    pub department_code: String,
}

/// Fields supplied when creating a department; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDepartment {
    pub department_name: String,
    pub department_address: String,
    pub department_code: String,
}

/// Department as the user service receives it over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentDto {
    pub id: i64,
    pub department_name: String,
    pub department_address: String,
    pub department_code: String,
}

impl From<Department> for DepartmentDto {
    fn from(department: Department) -> Self {
        Self {
            id: department.id,
            department_name: department.department_name,
            department_address: department.department_address,
            department_code: department.department_code,
        }
    }
}
