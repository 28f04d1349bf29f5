pub mod decision;
pub mod event_stream;
pub mod history;
pub mod provider;
pub mod providers;
pub mod registry;
pub mod schema;
pub mod sse_parser;
pub mod types;
