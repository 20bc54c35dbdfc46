pub mod auth;
pub mod clear;
pub mod run;
pub mod ui;
