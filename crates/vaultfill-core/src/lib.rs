pub mod dom;
pub mod error;
pub mod filter;
pub mod location;
pub mod messages;
pub mod settings;

pub use dom::{Document, NodeId};
pub use error::{Error, Result};
pub use location::PageLocation;
pub use settings::Settings;
