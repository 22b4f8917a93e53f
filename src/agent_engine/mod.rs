pub mod action;
pub mod engine;
pub mod interpreter;
pub mod journal;
pub mod session;
