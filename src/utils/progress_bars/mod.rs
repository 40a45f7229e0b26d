pub mod progress_config;
