mod config;

pub use config::{env_var_overrides, load, GlobalConfig};
