pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod image_processing;
pub mod inference;
pub mod router;
pub mod state;
pub mod storage;
pub mod store;
pub mod url_validation;
pub mod web_pages;
