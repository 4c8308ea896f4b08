pub mod exmr;
pub mod he;
pub mod user;

pub use exmr::{Exmr, ExmrFilter, ExmrRelocation};
pub use he::{He, HeFilter, HePatch};
pub use user::User;
