pub(crate) mod config;
pub(crate) mod config_runtime;
pub(crate) mod runtime;
pub(crate) mod terminal;
