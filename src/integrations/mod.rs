//! External service integrations.

pub mod cep_client {
    pub use crate::cep_client::*;
}

pub mod bin_client {
    pub use crate::bin_client::*;
}

pub mod order_store {
    pub use crate::order_store::*;
}
