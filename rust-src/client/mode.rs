//! Pick the client flavour from [`ClientConfig::mode`].

use super::{BlockingClient, Client};
use crate::config::{ClientConfig, Credentials, ExecutionMode};
use crate::error::Result;


/// A client built in whichever execution mode the configuration asks for.
pub enum Facade {
    Blocking(BlockingClient),
    Concurrent(Client),
}


impl Facade {
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        match config.mode {
            ExecutionMode::Blocking => Ok(Facade::Blocking(BlockingClient::from_config(config)?)),
            ExecutionMode::Concurrent => Ok(Facade::Concurrent(Client::from_config(config)?)),
        }
    }

    pub fn mode(&self) -> ExecutionMode {
        match self {
            Facade::Blocking(_) => ExecutionMode::Blocking,
            Facade::Concurrent(_) => ExecutionMode::Concurrent,
        }
    }

    pub fn with_credentials(self, credentials: Credentials) -> Self {
        match self {
            Facade::Blocking(client) => Facade::Blocking(client.with_credentials(credentials)),
            Facade::Concurrent(client) => Facade::Concurrent(client.with_credentials(credentials)),
        }
    }

    /// The async client, for calls that never touch the network.
    pub fn client(&self) -> &Client {
        match self {
            Facade::Blocking(client) => client.get_ref(),
            Facade::Concurrent(client) => client,
        }
    }
}
