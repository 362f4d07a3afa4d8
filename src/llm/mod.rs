pub mod gateway;
pub mod provider;
pub mod types;

pub use gateway::GatewayClient;
pub use provider::CompletionBackend;
pub use types::ChatMessage;
