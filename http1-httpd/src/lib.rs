pub mod access_log;
pub mod authorization;
pub mod cgi;
pub mod config;
pub mod counting_writer;
pub mod dispatcher;
pub mod resource;
pub mod server;

pub use dispatcher::Dispatcher;
pub use server::Server;

//
//
//
pub use http1_wire;
