pub mod conf;
pub mod keys;
pub mod quick;
