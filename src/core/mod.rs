pub mod db;
pub mod errors;
pub mod helpers;
pub mod kv;
pub mod memory;
pub mod query_params;
pub mod store;
