pub mod he;

pub use he::add as he_add;
pub use he::delete as he_delete;
pub use he::search as he_search;
pub use he::update as he_update;
