pub mod model;
pub mod placement;
pub mod subtree;
