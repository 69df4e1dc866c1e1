pub mod http_client;
pub mod in_memory_catalog;
pub mod sqlite_catalog;
