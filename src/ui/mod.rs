pub mod auth;
pub mod command;
pub mod home;
pub mod render;
pub mod shell;
