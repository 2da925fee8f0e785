pub mod cascade;
pub mod error;
pub mod ledger;
pub mod milestone;
pub mod placement;
pub mod rank;
pub mod repurchase;
pub mod storage;
pub mod walk;
