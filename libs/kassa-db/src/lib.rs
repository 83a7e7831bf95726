pub mod db;
pub mod error;
pub mod ledger;
pub mod memory;
pub mod models;
pub mod repositories;

pub use db::init_db;
pub use error::DbError;
pub use sqlx;
