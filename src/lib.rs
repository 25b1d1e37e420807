pub mod assistant;
pub mod backend;
pub mod config;
pub mod dom;
pub mod fields;
pub mod host;
pub mod indicator;
pub mod otp;
pub mod site;
