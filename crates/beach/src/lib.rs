pub mod adapters;
pub mod agent;
pub mod catalog;
pub mod compose;
pub mod errors;
pub mod intent;
pub mod memory;
pub mod models;
pub mod prompt_template;
pub mod providers;
pub mod systems;

#[cfg(test)]
pub(crate) mod testing;
