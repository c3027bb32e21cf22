use cosmic::cosmic_config::{self, CosmicConfigEntry};

use crate::app;
use crate::config::{Config, CONFIG_VERSION};
use crate::core::i18n;

pub fn settings() -> cosmic::app::Settings {
    cosmic::app::Settings::default().size_limits(
        cosmic::iced::Limits::NONE
            .min_width(360.0)
            .min_height(180.0),
    )
}

pub fn flags() -> app::Flags {
    let config_handler = cosmic_config::Config::new(app::APPID, CONFIG_VERSION).ok();
    let config = config_handler
        .as_ref()
        .map(|handler| {
            Config::get_entry(handler).unwrap_or_else(|(errors, config)| {
                log::warn!("errors loading config: {errors:?}");
                config
            })
        })
        .unwrap_or_default();

    app::Flags {
        config_handler,
        config,
    }
}

pub fn init() {
    i18n::localize();

    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "warn");
    }
    pretty_env_logger::init();
}
