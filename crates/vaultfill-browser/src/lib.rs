//! Live side of login form detection: watches a page, answers host commands
//! and writes credentials. Pages are reached through the [`PageSource`] and
//! [`FieldDriver`] seams, implemented in memory by [`StaticPage`] and over
//! the Chrome DevTools Protocol by [`CdpPage`].

mod agent;
mod cdp_session;
mod chrome_finder;
mod error;
mod generator;
mod launcher;
mod overlay;
mod page;
mod profile;
mod watcher;
mod writer;

pub use agent::{
    CommandRequest, ContentAgent, FILLED_NOTICE, GENERATED_NOTICE, NO_FIELDS_NOTICE, NO_FORM_NOTICE,
    WRITE_FAILED_NOTICE,
};
pub use cdp_session::{CdpAttachment, CdpConnection, CdpPage, CdpSession};
pub use chrome_finder::ChromeFinder;
pub use error::{Error, Result};
pub use generator::{PasswordGenerator, PasswordOptions, MAX_LENGTH, MIN_LENGTH};
pub use launcher::{ChromeLauncher, ChromeProcess, DEFAULT_DEBUGGING_PORT};
pub use overlay::{FieldRole, Overlay, OverlayIndex, OverlayPosition};
pub use page::{ChannelHost, FieldDriver, HostChannel, PageSource, StaticPage};
pub use profile::ProfileManager;
pub use watcher::{MutationWatcher, PageChange, Reconciled, WatchState};
pub use writer::FieldWriter;
