pub mod config;
pub mod logging;

pub mod archive;
pub mod control;
pub mod dedup;
pub mod executor;
pub mod export;
pub mod fetch;
pub mod job;
pub mod progress;
pub mod retry;
pub mod scheduler;
pub mod sniff;
pub mod storage;
