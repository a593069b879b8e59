pub mod config;
pub mod manager;

#[cfg(test)]
mod tests;

pub use config::Settings;
pub use manager::SettingsManager;
