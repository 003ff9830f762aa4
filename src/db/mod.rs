mod connection;
mod helpers;
mod migrations;
pub mod models;
mod repositories;

pub use connection::Database;

#[cfg(test)]
pub(crate) use connection::tests::temp_database;
