mod app;
mod backend;
mod config;
mod core;
mod key_binds;
mod menu;
mod models;
mod nav;
mod pages;
mod utils;

use crate::core::settings;

fn main() -> cosmic::iced::Result {
    settings::init();
    cosmic::app::run::<app::Cosmicpack>(settings::settings(), settings::flags())
}
