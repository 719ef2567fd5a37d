pub mod config;
pub mod logging;

// Pipeline: crawler → queue → worker/materializer
pub mod crawler;
pub mod extract;
pub mod fetcher;
pub mod item;
pub mod materializer;
pub mod patch;
pub mod queue;
pub mod retry;
pub mod storage;
pub mod url_model;
pub mod worker;
