pub mod activity;
pub mod bot;
pub mod engine;
pub mod ledger;
pub mod state;
