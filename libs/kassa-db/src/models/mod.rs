pub mod money;
pub mod provider;
pub mod receipt;
pub mod user;

pub use money::Amount;
pub use provider::ProviderKind;
pub use receipt::{CreditOutcome, NewReceipt, NewRefill, Receipt, Refill};
pub use user::User;
