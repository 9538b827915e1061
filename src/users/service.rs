//! User service: users are stored locally, departments are fetched from the
//! department service through the resilient client.

use std::sync::Arc;

use futures_util::future::join_all;
use thiserror::Error;

use crate::departments::{DepartmentDto, DepartmentFallback};
use crate::remote::RemoteCall;
use crate::resilience::{CallRequest, ResilientClient, Response};
use crate::users::repository::UserRepository;
use crate::users::types::{NewUser, ResponseDto, User, UserDto};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UserError {
    #[error("User {0} not found")]
    NotFound(i64),
}

pub struct UserService<C> {
    users: Arc<dyn UserRepository>,
    departments: Arc<ResilientClient<C, DepartmentFallback>>,
    resource: String,
}

impl<C> UserService<C>
where
    C: RemoteCall<Payload = DepartmentDto>,
{
    /// `resource` names the department dependency in the resilience config.
    pub fn new(
        users: Arc<dyn UserRepository>,
        departments: Arc<ResilientClient<C, DepartmentFallback>>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            users,
            departments,
            resource: resource.into(),
        }
    }

    pub async fn save_user(&self, user: NewUser) -> User {
        let saved = self.users.save(user).await;
        tracing::info!(user_id = saved.id, "User saved");
        saved
    }

    /// Look up a user and attach their department. Only a missing user is
    /// an error; department failures resolve to a fallback department.
    pub async fn get_user(&self, id: i64) -> Result<ResponseDto, UserError> {
        let user = self.users.find_by_id(id).await.ok_or(UserError::NotFound(id))?;
        let department = self
            .departments
            .fetch(&self.resource, &user.department_id.to_string())
            .await;

        Ok(ResponseDto {
            user: UserDto::from(&user),
            department,
        })
    }

    /// Fire `attempts` concurrent department lookups and return every
    /// response in issue order.
    pub async fn probe_department(
        &self,
        department_id: i64,
        attempts: usize,
    ) -> Vec<Response<DepartmentDto>> {
        let key = department_id.to_string();
        let calls = (0..attempts).map(|_| {
            self.departments
                .call(CallRequest::new(self.resource.as_str(), key.as_str()))
        });
        let responses = join_all(calls).await;

        let rejected = responses.iter().filter(|r| r.used_fallback()).count();
        tracing::info!(attempts, rejected, "Department probe finished");
        responses
    }
}
