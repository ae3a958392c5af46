pub mod adherence;
pub mod config;
pub mod intake;
pub mod med;
pub mod patient;
pub mod status;

mod context;
