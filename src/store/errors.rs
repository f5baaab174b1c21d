use thiserror::Error;
use uuid::Uuid;

use crate::api::RemoteError;
use crate::types::{
    CATEGORY_NAME_MAX_LENGTH, CategoryId, DESCRIPTION_MAX_LENGTH, TASK_NAME_MAX_LENGTH,
};

#[derive(Debug, Clone, Error, Eq, PartialEq)]
pub enum ValidationError {
    #[error("task name is required")]
    EmptyName,

    #[error("task name should be less than or equal to {max} characters (got {actual})")]
    NameTooLong { max: usize, actual: usize },

    #[error("description should be less than or equal to {max} characters (got {actual})")]
    DescriptionTooLong { max: usize, actual: usize },

    #[error("category name is required")]
    CategoryNameEmpty,

    #[error("category name should be less than or equal to {max} characters (got {actual})")]
    CategoryNameTooLong { max: usize, actual: usize },
}

impl ValidationError {
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::EmptyName | ValidationError::NameTooLong { .. } => "name",
            ValidationError::DescriptionTooLong { .. } => "description",
            ValidationError::CategoryNameEmpty | ValidationError::CategoryNameTooLong { .. } => {
                "category_name"
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("task {0} not found")]
    TaskNotFound(Uuid),

    #[error("task '{0}' not found")]
    UnknownTask(String),

    #[error("task id prefix '{selector}' matches {count} tasks; use a longer id")]
    AmbiguousTask { selector: String, count: usize },

    #[error("category '{0}' not found")]
    CategoryNotFound(String),
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Validation(_) => "VALIDATION_FAILED",
            StoreError::Remote(err) => err.code(),
            StoreError::TaskNotFound(_) | StoreError::UnknownTask(_) => "TASK_NOT_FOUND",
            StoreError::AmbiguousTask { .. } => "TASK_ID_AMBIGUOUS",
            StoreError::CategoryNotFound(_) => "CATEGORY_NOT_FOUND",
        }
    }

    pub fn category_not_found(id: &CategoryId) -> Self {
        StoreError::CategoryNotFound(id.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

pub fn validate_task_fields(name: &str, description: Option<&str>) -> Result<(), ValidationError> {
    let name_len = name.chars().count();
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if name_len > TASK_NAME_MAX_LENGTH {
        return Err(ValidationError::NameTooLong {
            max: TASK_NAME_MAX_LENGTH,
            actual: name_len,
        });
    }

    let description_len = description.map_or(0, |value| value.chars().count());
    if description_len > DESCRIPTION_MAX_LENGTH {
        return Err(ValidationError::DescriptionTooLong {
            max: DESCRIPTION_MAX_LENGTH,
            actual: description_len,
        });
    }

    Ok(())
}

pub fn validate_category_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::CategoryNameEmpty);
    }
    let len = name.chars().count();
    if len > CATEGORY_NAME_MAX_LENGTH {
        return Err(ValidationError::CategoryNameTooLong {
            max: CATEGORY_NAME_MAX_LENGTH,
            actual: len,
        });
    }
    Ok(())
}
