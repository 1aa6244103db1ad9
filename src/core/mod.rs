// Domain-layer modules and shared errors/models
pub mod checkout {
    pub use crate::checkout::*;
}

pub mod card {
    pub use crate::card::*;
}

pub mod validators {
    pub use crate::validators::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
