pub mod auth;
pub mod data;
pub mod flash;
pub mod forms;
pub mod models;
pub mod pages;
pub mod responses;
pub mod router;
pub mod state;
pub mod storage;
pub mod templates;
pub mod uploads;

pub use state::AppState;
