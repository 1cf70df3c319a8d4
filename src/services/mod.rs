pub mod balance_service;
pub mod consolidation;
pub mod transfer_service;
