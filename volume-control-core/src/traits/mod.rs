pub mod action_provider;
pub mod audio_delegate;
pub mod native_gateway;
