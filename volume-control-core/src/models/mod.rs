pub mod audio_models;
pub mod config;
pub mod device_state;
pub mod error;
pub mod event;
pub mod hotkey;
pub mod target;
