mod album;
mod filter;
mod media;

pub use album::*;
pub use filter::*;
pub use media::*;
