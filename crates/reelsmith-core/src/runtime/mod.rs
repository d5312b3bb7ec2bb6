pub mod cancel;
pub mod downloads;
pub mod orchestrator;
pub mod parse;
pub mod storage;
pub mod types;
