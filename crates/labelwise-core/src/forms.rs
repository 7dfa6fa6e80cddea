//! Client-side validation for account, user, and project forms.
//!
//! The backend validates again; these checks only catch mistakes before a
//! round trip.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::defaults::{PASSWORD_MAX_LEN, PASSWORD_MIN_LEN, PROJECT_FIELD_MAX_LEN};
use crate::error::{Error, Result};
use crate::models::{
    ProjectCreate, UpdatePassword, UserCreate, UserPublic, UserRegister, UserUpdate, UserUpdateMe,
};

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

fn invalid(message: impl Into<String>) -> Error {
    Error::InvalidInput(message.into())
}

pub fn validate_email(email: &str) -> Result<()> {
    if EMAIL.is_match(email.trim()) {
        Ok(())
    } else {
        Err(invalid(format!("Invalid email address '{}'", email)))
    }
}

pub fn validate_password(password: &str) -> Result<()> {
    let len = password.chars().count();
    if len < PASSWORD_MIN_LEN {
        return Err(invalid(format!(
            "Password must be at least {} characters",
            PASSWORD_MIN_LEN
        )));
    }
    if len > PASSWORD_MAX_LEN {
        return Err(invalid(format!(
            "Password must be at most {} characters",
            PASSWORD_MAX_LEN
        )));
    }
    Ok(())
}

/// Password change form of the settings page.
#[derive(Debug, Clone, Default)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

impl PasswordChange {
    pub fn validate(&self) -> Result<UpdatePassword> {
        if self.current_password.is_empty() || self.new_password.is_empty() {
            return Err(invalid("Current and new password are required"));
        }
        if self.new_password != self.confirm_password {
            return Err(invalid("New password and confirmation do not match"));
        }
        validate_password(&self.new_password)?;
        Ok(UpdatePassword {
            current_password: self.current_password.clone(),
            new_password: self.new_password.clone(),
        })
    }
}

/// Fields that differ from the current profile. Returns `None` when nothing
/// changed, in which case no request is sent.
pub fn profile_changes(
    current: &UserPublic,
    full_name: Option<&str>,
    email: Option<&str>,
) -> Result<Option<UserUpdateMe>> {
    let mut update = UserUpdateMe::default();

    if let Some(name) = full_name {
        if current.full_name.as_deref() != Some(name) {
            update.full_name = Some(name.to_string());
        }
    }
    if let Some(email) = email {
        if current.email != email {
            validate_email(email)?;
            update.email = Some(email.to_string());
        }
    }

    Ok(if update.is_empty() { None } else { Some(update) })
}

/// Admin create/edit user dialog.
#[derive(Debug, Clone)]
pub struct UserForm {
    pub email: String,
    pub full_name: String,
    /// Required on create; on edit an empty value keeps the old password.
    pub password: Option<String>,
    pub is_active: bool,
    pub is_superuser: bool,
}

impl UserForm {
    fn validate_common(&self) -> Result<()> {
        validate_email(&self.email)?;
        if self.full_name.trim().is_empty() {
            return Err(invalid("Full name is required"));
        }
        Ok(())
    }

    fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }

    pub fn to_create(&self) -> Result<UserCreate> {
        self.validate_common()?;
        let password = self
            .password()
            .ok_or_else(|| invalid("Password is required for new users"))?;
        validate_password(password)?;
        Ok(UserCreate {
            email: self.email.trim().to_string(),
            password: password.to_string(),
            full_name: Some(self.full_name.trim().to_string()),
            is_active: self.is_active,
            is_superuser: self.is_superuser,
        })
    }

    /// Every editable field is sent; the password only when one was entered.
    pub fn to_update(&self) -> Result<UserUpdate> {
        self.validate_common()?;
        if let Some(password) = self.password() {
            validate_password(password)?;
        }
        Ok(UserUpdate {
            email: Some(self.email.trim().to_string()),
            password: self.password().map(str::to_string),
            full_name: Some(self.full_name.trim().to_string()),
            is_active: Some(self.is_active),
            is_superuser: Some(self.is_superuser),
        })
    }
}

/// Self-service registration.
pub fn signup_request(email: &str, password: &str, full_name: Option<&str>) -> Result<UserRegister> {
    validate_email(email)?;
    validate_password(password)?;
    Ok(UserRegister {
        email: email.trim().to_string(),
        password: password.to_string(),
        full_name: full_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string),
    })
}

/// New project dialog.
pub fn project_create(name: &str, description: Option<&str>, url: &str) -> Result<ProjectCreate> {
    let name = name.trim();
    if name.is_empty() {
        return Err(invalid("Project name is required"));
    }
    if name.chars().count() > PROJECT_FIELD_MAX_LEN {
        return Err(invalid(format!(
            "Project name must be at most {} characters",
            PROJECT_FIELD_MAX_LEN
        )));
    }
    let description = description.map(str::trim).filter(|d| !d.is_empty());
    if let Some(desc) = description {
        if desc.chars().count() > PROJECT_FIELD_MAX_LEN {
            return Err(invalid(format!(
                "Description must be at most {} characters",
                PROJECT_FIELD_MAX_LEN
            )));
        }
    }
    let url = url.trim();
    if url.chars().count() > PROJECT_FIELD_MAX_LEN {
        return Err(invalid(format!(
            "URL must be at most {} characters",
            PROJECT_FIELD_MAX_LEN
        )));
    }
    reqwest::Url::parse(url).map_err(|e| invalid(format!("Invalid URL '{}': {}", url, e)))?;

    Ok(ProjectCreate {
        name: name.to_string(),
        description: description.map(str::to_string),
        url: url.to_string(),
    })
}
