pub mod candidate;
pub mod event;
pub mod pending_transaction;
pub mod token_transaction;
pub mod vote;
pub mod wallet;
