//! Commands - the surface consumed by the UI layer

mod connection;
mod settings;
mod sync;

pub use connection::*;
pub use settings::*;
pub use sync::*;
