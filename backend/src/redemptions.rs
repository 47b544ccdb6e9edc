pub(crate) mod db;
pub(crate) mod errors;
pub(crate) mod handler;
pub(crate) mod models;
pub(crate) mod orchestrator;
pub(crate) mod traits;
pub(crate) mod types;

#[cfg(test)]
pub(crate) mod testing;
