//! OAuth connection lifecycle: state tokens, consent URLs, provider
//! exchanges, stored connections and their status.

pub mod authorize;
pub mod disconnect;
pub mod exchange;
pub mod repository;
pub mod service;
pub mod state;
pub mod status;

pub use authorize::AuthUrlBuilder;
pub use disconnect::DisconnectHandler;
pub use exchange::{ExchangeOutcome, TokenExchangeClient};
pub use repository::ConnectionRepository;
pub use service::ConnectionService;
pub use state::StateTokenStore;
pub use status::{ConnectionState, ConnectionStatus};
