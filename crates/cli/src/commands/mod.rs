pub mod catalogs;
pub mod objects;
pub mod output;
pub mod query;
