use thiserror::Error;

use crate::animation::ActionName;

/// Configuration failures raised while assembling a controller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LocomotionError {
    #[error("animation action `{0}` is missing from the clip set")]
    MissingAction(ActionName),
    #[error("invalid locomotion config: {0}")]
    InvalidConfig(String),
}

pub type LocomotionResult<T> = Result<T, LocomotionError>;
