mod gateway;
mod pool;
pub mod queries;
pub mod schema;

pub use gateway::*;
pub use pool::*;
pub use schema::init_media_store;
