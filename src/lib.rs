/*
 * Responsibility
 * - モジュール構成の公開 (bin と tests/ から使う)
 */
pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod repos;
pub mod services;
pub mod state;
pub mod ui;
