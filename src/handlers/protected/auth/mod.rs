pub mod account;
pub mod register;

pub use account::profile as profile_get;
pub use account::users as users_get;
pub use register::post as register_post;
