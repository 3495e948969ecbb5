use crate::{Error, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;
use vaultfill_core::dom::SyntheticEvent;
use vaultfill_core::messages::HostMessage;
use vaultfill_core::{Document, NodeId};

/// Something that can capture the current state of a page
#[async_trait]
pub trait PageSource: Send {
    async fn snapshot(&mut self) -> Result<Document>;

    /// Current page URL
    async fn url(&mut self) -> Result<String> {
        Ok(self.snapshot().await?.url().to_string())
    }
}

/// Low-level field operations, addressed by the ids of the last snapshot
#[async_trait]
pub trait FieldDriver: Send {
    async fn focus(&mut self, field: NodeId) -> Result<()>;

    /// Write through the platform's native value setter, bypassing any
    /// setter a page framework installed on the element
    async fn set_native_value(&mut self, field: NodeId, value: &str) -> Result<()>;

    async fn dispatch(&mut self, field: NodeId, event: SyntheticEvent, bubbles: bool) -> Result<()>;

    async fn blur(&mut self, field: NodeId) -> Result<()>;
}

/// Fire-and-forget delivery to the host collaborator
#[async_trait]
pub trait HostChannel: Send {
    async fn send(&mut self, message: HostMessage) -> Result<()>;
}

/// A page backed by an in-memory [`Document`]
///
/// Writes land in the document and are recorded in its event log.
#[derive(Debug, Clone)]
pub struct StaticPage {
    document: Document,
}

impl StaticPage {
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    fn check(&self, ok: bool, field: NodeId, action: &str) -> Result<()> {
        if ok {
            Ok(())
        } else {
            Err(Error::Write(format!("cannot {} {}", action, field)))
        }
    }
}

#[async_trait]
impl PageSource for StaticPage {
    async fn snapshot(&mut self) -> Result<Document> {
        Ok(self.document.clone())
    }
}

#[async_trait]
impl FieldDriver for StaticPage {
    async fn focus(&mut self, field: NodeId) -> Result<()> {
        let ok = self.document.focus(field);
        self.check(ok, field, "focus")
    }

    async fn set_native_value(&mut self, field: NodeId, value: &str) -> Result<()> {
        let ok = self.document.set_value(field, value);
        self.check(ok, field, "set value of")
    }

    async fn dispatch(&mut self, field: NodeId, event: SyntheticEvent, bubbles: bool) -> Result<()> {
        let ok = self.document.dispatch(field, event, bubbles);
        self.check(ok, field, "dispatch on")
    }

    async fn blur(&mut self, field: NodeId) -> Result<()> {
        let ok = self.document.blur(field);
        self.check(ok, field, "blur")
    }
}

/// Host channel over a tokio mpsc queue
#[derive(Debug, Clone)]
pub struct ChannelHost {
    sender: mpsc::UnboundedSender<HostMessage>,
}

impl ChannelHost {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<HostMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl HostChannel for ChannelHost {
    async fn send(&mut self, message: HostMessage) -> Result<()> {
        self.sender
            .send(message)
            .map_err(|_| Error::Channel("no listener".to_string()))
    }
}
