pub mod login;
pub mod logout;

pub use login::post as login_post;
pub use logout::post as logout_post;
