pub mod classifier;
pub mod container;
pub mod error;
pub mod form;
pub mod locator;
pub mod scoring;
pub mod submit;
pub mod visibility;

pub use classifier::FieldClassifier;
pub use container::ContainerResolver;
pub use error::{Error, Result};
pub use form::{DetectedForm, FormOrigin};
pub use locator::FormLocator;
pub use scoring::{ContainerSignals, ScoringRule, CONTAINER_RULES};
pub use submit::SubmitLocator;
pub use visibility::Visibility;
