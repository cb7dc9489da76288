pub mod config_store;
pub mod settings;

pub use config_store::ConfigStore;
pub use settings::TypingDefaults;
