pub mod api_log;
pub mod catalog;
