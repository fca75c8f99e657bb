pub mod check_config;
pub mod classify;
pub mod init_config;
pub mod inspect;
pub mod label;
