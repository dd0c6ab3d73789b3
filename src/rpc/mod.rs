//! gRPC surface of the home service.
//!
//! `proto` holds the wire messages and the generated `Home` service glue;
//! `service` implements the service on top of the atmosphere engine and the
//! AC status store.

pub mod proto;
pub mod service;

pub use proto::home_client::HomeClient;
pub use proto::home_server::HomeServer;
pub use service::HomeService;
