pub mod code_generator;
pub mod error;
pub mod exmr_service;
pub mod he_service;
pub mod policy;
pub mod user_service;

pub use code_generator::{generate_child_code, next_child_code, GeneratedCode, MAX_SEQUENCE};
pub use error::{ServiceError, ServiceResult};
pub use exmr_service::{ExmrRename, ExmrService, ExmrTransfer, NewExmr};
pub use he_service::{HeService, NewHe};
pub use user_service::{IssuedToken, LoginRequest, RegisterUser, UserService};

/// Trimmed value, or `None` when missing or blank
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
