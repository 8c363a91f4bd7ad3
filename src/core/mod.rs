// Widget-side modules and shared errors/models
pub mod validation {
    pub use crate::validation::*;
}

pub mod session {
    pub use crate::session::*;
}

pub mod orchestrator {
    pub use crate::orchestrator::*;
}

pub mod zip_resolution {
    pub use crate::zip_resolution::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
