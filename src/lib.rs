pub mod api;
pub mod app;
pub mod config;
pub mod db;
pub mod events;
pub mod geo;
pub mod heading;
pub mod location;
pub mod logging;
pub mod models;
pub mod orientation;
pub mod path;
pub mod throttle;
pub mod tracker;
pub mod ui;
pub mod validator;
pub mod view;
