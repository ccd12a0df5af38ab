// UDO session client - library root

pub mod auth;
pub mod config;
pub mod error;
pub mod http_client;
pub mod page;
pub mod resolver;
pub mod storage;
