pub mod client;
pub mod installation;
pub mod jwt;
pub mod models;
pub mod settings;
