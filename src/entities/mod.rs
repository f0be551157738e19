pub mod catalog;
pub mod order_build_configuration;
