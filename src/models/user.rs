use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub nickname: String,
    pub fullname: String,
    pub about: String,
    pub email: String,
}

// Create user request; the nickname comes from the path
#[derive(Debug, Validate, Deserialize)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 100))]
    pub fullname: String,
    #[serde(default)]
    pub about: String,
    #[validate(email)]
    pub email: String,
}

impl CreateUserRequest {
    pub fn into_user(self, nickname: String) -> User {
        User {
            nickname,
            fullname: self.fullname,
            about: self.about,
            email: self.email,
        }
    }
}

// Update user request; absent or empty fields keep their stored value
#[derive(Debug, Default, Validate, Deserialize)]
pub struct UpdateUserRequest {
    pub fullname: Option<String>,
    pub about: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
}

impl UpdateUserRequest {
    /// Returns `user` with every non-empty field of the request applied.
    pub fn apply_to(&self, mut user: User) -> User {
        if let Some(fullname) = non_empty(&self.fullname) {
            user.fullname = fullname.to_string();
        }
        if let Some(about) = non_empty(&self.about) {
            user.about = about.to_string();
        }
        if let Some(email) = non_empty(&self.email) {
            user.email = email.to_string();
        }
        user
    }
}

pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> User {
        User {
            nickname: "alice".into(),
            fullname: "Alice A".into(),
            about: "hi".into(),
            email: "alice@example.com".into(),
        }
    }

    #[test]
    fn update_keeps_fields_that_are_blank() {
        let request = UpdateUserRequest {
            fullname: Some("  ".into()),
            about: Some("new about".into()),
            email: None,
        };
        let updated = request.apply_to(sample());
        assert_eq!(updated.fullname, "Alice A");
        assert_eq!(updated.about, "new about");
        assert_eq!(updated.email, "alice@example.com");
    }

    #[test]
    fn create_request_rejects_bad_email() {
        let request = CreateUserRequest {
            fullname: "Bob".into(),
            about: String::new(),
            email: "not-an-email".into(),
        };
        assert!(request.validate().is_err());
    }
}
