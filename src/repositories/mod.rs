pub mod flat_file_repo;
pub mod key_value_store;
