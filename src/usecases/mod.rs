mod get_albums;
mod get_media;

pub use get_albums::*;
pub use get_media::*;
