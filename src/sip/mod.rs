//! SIP proxy core: codec, header accessors, registrar, Via transforms,
//! dispatcher, and the UDP front end.

pub mod handler;
pub mod headers;
pub mod message;
pub mod registrar;
pub mod server;
pub mod via;

pub use handler::Proxy;
pub use message::{decode, encode, Method, StartLine};
pub use registrar::{Binding, Registrar};
pub use server::ProxyServer;
pub use via::ProxyIdentity;
