mod pager;
mod source;

pub use pager::*;
pub use source::*;
