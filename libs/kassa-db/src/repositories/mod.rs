pub mod ledger_repo;
pub mod settings_repo;
pub mod user_repo;

pub use ledger_repo::PgLedger;
pub use settings_repo::SettingsRepository;
pub use user_repo::UserRepository;
