mod repository;
mod schema;

pub use repository::{PostRecord, Repository};
