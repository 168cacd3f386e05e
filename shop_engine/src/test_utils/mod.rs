//! Helpers for tests that need a real, migrated database.
mod prepare_env;

pub use prepare_env::{create_database, new_test_db, prepare_test_env, random_db_path, run_migrations};
