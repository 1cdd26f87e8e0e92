mod table;
mod usage;

pub use table::*;
pub use usage::*;
