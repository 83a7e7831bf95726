pub mod pay_service;
pub mod payment;
pub mod referral_service;
pub mod settings_service;
pub mod sync_service;
