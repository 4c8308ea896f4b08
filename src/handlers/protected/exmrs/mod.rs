pub mod exmr;

pub use exmr::add as exmr_add;
pub use exmr::delete as exmr_delete;
pub use exmr::search as exmr_search;
pub use exmr::transfer as exmr_transfer;
pub use exmr::update as exmr_update;
