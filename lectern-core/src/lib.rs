pub mod model;
pub mod router;

pub use model::*;
pub use router::Route;
