pub mod api;
pub mod canvas;
pub mod chat;
pub mod models;
