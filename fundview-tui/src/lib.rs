//! Fundview TUI: terminal front end for the fund management dashboard.
//!
//! One screen at a time, driven by the core `Session`:
//! - Login, department choice and research login
//! - Dashboard and asset report stock tables
//! - Beta calculation with a weighted portfolio
//! - SVM analysis as a table or a signal chart
//! - Data import, model training and the notification center

pub mod app;
pub mod input;
pub mod persistence;
pub mod theme;
pub mod ui;

pub use app::AppState;
pub use theme::Theme;
