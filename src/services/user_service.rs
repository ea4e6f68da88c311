use std::sync::Arc;

use validator::Validate;

use crate::{
    error::{AppError, Result},
    models::{CreateUserRequest, UpdateUserRequest, User},
    repository::UserRepository,
    services::Creation,
};

pub struct UserService {
    users: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// Creates the user, or returns every user whose nickname or email is
    /// already taken.
    pub async fn create_user(
        &self,
        nickname: &str,
        request: CreateUserRequest,
    ) -> Result<Creation<User, Vec<User>>> {
        request.validate()?;

        let clashing = self
            .users
            .get_users_by_email_or_nickname(&request.email, nickname)
            .await?;
        if !clashing.is_empty() {
            tracing::warn!("User {} clashes with {} existing users", nickname, clashing.len());
            return Ok(Creation::Exists(clashing));
        }

        let user = request.into_user(nickname.to_string());
        match self.users.create_user(&user).await {
            Ok(()) => Ok(Creation::Created(user)),
            // Lost a race with a concurrent insert of the same nickname or email
            Err(AppError::Conflict(_)) => Ok(Creation::Exists(
                self.users
                    .get_users_by_email_or_nickname(&user.email, &user.nickname)
                    .await?,
            )),
            Err(e) => Err(e),
        }
    }

    pub async fn get_user(&self, nickname: &str) -> Result<User> {
        self.users
            .get_user_by_nickname(nickname)
            .await?
            .ok_or_else(|| AppError::user_not_found(nickname))
    }

    pub async fn update_user(&self, nickname: &str, request: UpdateUserRequest) -> Result<User> {
        request.validate()?;

        let current = self.get_user(nickname).await?;
        let updated = request.apply_to(current);

        self.users
            .update_user(&updated)
            .await?
            .ok_or_else(|| AppError::user_not_found(nickname))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryStore;

    fn service() -> UserService {
        UserService::new(Arc::new(MemoryStore::new()))
    }

    fn request(email: &str) -> CreateUserRequest {
        CreateUserRequest {
            fullname: "Jane Doe".into(),
            about: String::new(),
            email: email.into(),
        }
    }

    #[tokio::test]
    async fn duplicate_nickname_or_email_returns_existing() {
        let users = service();
        let created = users.create_user("jane", request("jane@example.com")).await.unwrap();
        assert!(matches!(created, Creation::Created(_)));

        let clash = users.create_user("janet", request("jane@example.com")).await.unwrap();
        match clash {
            Creation::Exists(existing) => {
                assert_eq!(existing.len(), 1);
                assert_eq!(existing[0].nickname, "jane");
            }
            other => panic!("expected clash, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn update_rejects_taken_email() {
        let users = service();
        users.create_user("jane", request("jane@example.com")).await.unwrap();
        users.create_user("john", request("john@example.com")).await.unwrap();

        let err = users
            .update_user(
                "john",
                UpdateUserRequest {
                    email: Some("jane@example.com".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let err = users
            .update_user("nobody", UpdateUserRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
