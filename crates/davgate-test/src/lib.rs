//! davgate - integration test support.
//!
//! Re-exports the workspace crates so integration tests can use `davgate_test::` paths.

pub mod component {
    pub use davgate_core::{config, constants};
    pub use davgate_service::{auth, cors, engine, gate};

    pub mod error {
        pub use davgate_core::error::*;
        pub use davgate_service::error::*;
    }
}

pub mod app {
    pub use davgate_app::*;
}
