use crate::page::{FieldDriver, PageSource};
use crate::watcher::PageChange;
use crate::{Error, Result};
use async_trait::async_trait;
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::dom::{
    EnableParams, EventAttributeModified, EventChildNodeInserted, EventChildNodeRemoved,
    EventDocumentUpdated, GetDocumentParams,
};
use chromiumoxide::cdp::browser_protocol::page::EventFrameNavigated;
use chromiumoxide::Page;
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use vaultfill_core::dom::{FlatSnapshot, SyntheticEvent};
use vaultfill_core::{Document, NodeId};

const CONNECT_ATTEMPTS: u32 = 5;
const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Serializes the live DOM, open shadow roots included, into a flat
/// snapshot. Node references are kept in `window.__vaultfillNodes` so that
/// snapshot indices address the same nodes in later field operations.
const SNAPSHOT_JS: &str = r#"(() => {
  const nodes = [];
  const refs = [];
  const stack = [[document, null]];
  while (stack.length > 0) {
    const [node, parent] = stack.pop();
    const index = nodes.length;
    if (node.nodeType === Node.DOCUMENT_NODE) {
      nodes.push({ kind: "document" });
    } else if (node.nodeType === Node.DOCUMENT_FRAGMENT_NODE) {
      nodes.push({ kind: "shadowRoot", parent });
    } else if (node.nodeType === Node.TEXT_NODE) {
      if (!node.nodeValue || !node.nodeValue.trim()) continue;
      nodes.push({ kind: "text", parent, text: node.nodeValue });
      refs.push(node);
      continue;
    } else if (node.nodeType === Node.ELEMENT_NODE) {
      const attributes = {};
      for (const attr of node.attributes) attributes[attr.name] = attr.value;
      let style = {};
      let rect = null;
      try {
        const s = getComputedStyle(node);
        style = { display: s.display, visibility: s.visibility, opacity: s.opacity };
        const r = node.getBoundingClientRect();
        rect = { left: r.left, top: r.top, width: r.width, height: r.height };
      } catch (e) {}
      nodes.push({
        kind: "element", parent, tag: node.tagName.toLowerCase(), attributes, style, rect,
        value: typeof node.value === "string" ? node.value : "",
      });
    } else {
      continue;
    }
    refs.push(node);
    const children = Array.from(node.childNodes);
    for (let i = children.length - 1; i >= 0; i--) stack.push([children[i], index]);
    if (node.shadowRoot) stack.push([node.shadowRoot, index]);
  }
  window.__vaultfillNodes = refs;
  return JSON.stringify({
    url: location.href,
    viewport: { width: innerWidth, height: innerHeight, scrollX: scrollX, scrollY: scrollY },
    nodes,
  });
})"#;

/// Field operations on a node from the last snapshot
const FIELD_JS: &str = r#"((index, op, arg) => {
  const field = (window.__vaultfillNodes || [])[index];
  if (!field || !field.isConnected) return false;
  switch (op) {
    case "focus":
      field.focus();
      return true;
    case "blur":
      field.blur();
      return true;
    case "value": {
      const proto = field instanceof HTMLTextAreaElement
        ? HTMLTextAreaElement.prototype
        : HTMLInputElement.prototype;
      const descriptor = Object.getOwnPropertyDescriptor(proto, "value");
      if (descriptor && descriptor.set) descriptor.set.call(field, arg);
      else field.value = arg;
      return true;
    }
    case "event": {
      const init = { bubbles: arg.bubbles };
      const event = arg.interface === "InputEvent"
        ? new InputEvent(arg.type, init)
        : new Event(arg.type, init);
      field.dispatchEvent(event);
      return true;
    }
  }
  return false;
})"#;

/// Chrome DevTools Protocol connection settings
pub struct CdpSession {
    debugging_port: u16,
}

/// A page attached over CDP, with its change stream
pub struct CdpAttachment {
    pub page: CdpPage,
    pub changes: mpsc::UnboundedReceiver<PageChange>,
    pub connection: CdpConnection,
}

/// Background tasks of an attachment; aborted on drop
pub struct CdpConnection {
    _browser: Browser,
    handler_task: JoinHandle<()>,
    forwarder_task: JoinHandle<()>,
}

impl Drop for CdpConnection {
    fn drop(&mut self) {
        self.forwarder_task.abort();
        self.handler_task.abort();
    }
}

impl CdpSession {
    pub fn new(debugging_port: u16) -> Self {
        Self { debugging_port }
    }

    pub fn debugging_port(&self) -> u16 {
        self.debugging_port
    }

    /// Connect to Chrome, pick its first page (opening `url` when given) and
    /// start forwarding DOM changes
    pub async fn attach(&self, url: Option<&str>) -> Result<CdpAttachment> {
        let (browser, handler_task) = self.connect().await?;

        // Chrome may still be creating its initial tab
        tokio::time::sleep(CONNECT_RETRY_DELAY).await;
        let page = match browser.pages().await?.into_iter().next() {
            Some(page) => {
                tracing::debug!("CDP: using existing page");
                page
            }
            None => {
                tracing::debug!("CDP: no existing pages, opening one");
                browser.new_page("about:blank").await?
            }
        };

        if let Some(url) = url {
            tracing::info!("Navigating to {}", url);
            page.goto(url).await?;
        }

        page.execute(EnableParams::default()).await?;
        request_document(&page).await?;

        let (sender, changes) = mpsc::unbounded_channel();
        let forwarder_task = tokio::spawn(forward_changes(page.clone(), sender));

        Ok(CdpAttachment {
            page: CdpPage::new(page),
            changes,
            connection: CdpConnection {
                _browser: browser,
                handler_task,
                forwarder_task,
            },
        })
    }

    async fn connect(&self) -> Result<(Browser, JoinHandle<()>)> {
        let endpoint = format!("http://localhost:{}", self.debugging_port);
        let mut attempts_left = CONNECT_ATTEMPTS;

        let (browser, mut handler) = loop {
            tracing::debug!("Attempting CDP connection to {}", endpoint);
            match Browser::connect(&endpoint).await {
                Ok(connected) => {
                    tracing::info!("CDP connection established on port {}", self.debugging_port);
                    break connected;
                }
                Err(e) => {
                    attempts_left -= 1;
                    if attempts_left == 0 {
                        return Err(Error::Cdp(format!(
                            "Failed to connect to Chrome after {} attempts: {}",
                            CONNECT_ATTEMPTS, e
                        )));
                    }
                    tracing::info!("CDP connection failed, retrying ({} left)", attempts_left);
                    tokio::time::sleep(CONNECT_RETRY_DELAY).await;
                }
            }
        };

        // The handler must be polled for any command to complete
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("CDP handler event error (continuing): {}", e);
                }
            }
        });

        Ok((browser, handler_task))
    }
}

/// DOM events only flow for nodes the client has requested
async fn request_document(page: &Page) -> Result<()> {
    page.execute(GetDocumentParams {
        depth: Some(-1),
        pierce: Some(true),
    })
    .await?;
    Ok(())
}

async fn forward_changes(page: Page, sender: mpsc::UnboundedSender<PageChange>) {
    let streams = async {
        Ok::<_, Error>((
            page.event_listener::<EventChildNodeInserted>().await?,
            page.event_listener::<EventChildNodeRemoved>().await?,
            page.event_listener::<EventAttributeModified>().await?,
            page.event_listener::<EventDocumentUpdated>().await?,
            page.event_listener::<EventFrameNavigated>().await?,
        ))
    };
    let (mut inserted, mut removed, mut attributes, mut updated, mut navigated) = match streams.await {
        Ok(streams) => streams,
        Err(e) => {
            tracing::warn!("Could not subscribe to DOM events: {}", e);
            return;
        }
    };

    loop {
        let change = tokio::select! {
            Some(_) = inserted.next() => PageChange::ChildList,
            Some(_) = removed.next() => PageChange::ChildList,
            Some(event) = attributes.next() => PageChange::Attribute { name: event.name.clone() },
            Some(_) = updated.next() => {
                if let Err(e) = request_document(&page).await {
                    tracing::debug!("Could not re-request document: {}", e);
                }
                continue;
            }
            Some(event) = navigated.next() => {
                if event.frame.parent_id.is_some() {
                    continue;
                }
                PageChange::Navigated
            }
            else => break,
        };

        if sender.send(change).is_err() {
            tracing::debug!("Change receiver dropped, stopping forwarder");
            break;
        }
    }
}

/// A live Chrome page
#[derive(Clone)]
pub struct CdpPage {
    page: Page,
}

impl CdpPage {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    async fn field_op(&self, field: NodeId, op: &str, arg: serde_json::Value) -> Result<()> {
        let expression = format!(
            "{}({}, {}, {})",
            FIELD_JS,
            field.index(),
            serde_json::Value::from(op),
            arg
        );
        let applied: bool = self
            .page
            .evaluate(expression)
            .await?
            .into_value()
            .map_err(|e| Error::Cdp(e.to_string()))?;

        if applied {
            Ok(())
        } else {
            Err(Error::Write(format!("{} is gone or not addressable", field)))
        }
    }
}

#[async_trait]
impl PageSource for CdpPage {
    async fn snapshot(&mut self) -> Result<Document> {
        let json: String = self
            .page
            .evaluate(format!("{}()", SNAPSHOT_JS))
            .await?
            .into_value()
            .map_err(|e| Error::Cdp(e.to_string()))?;

        let snapshot: FlatSnapshot =
            serde_json::from_str(&json).map_err(vaultfill_core::Error::from)?;
        tracing::debug!("Captured {} nodes from {}", snapshot.nodes.len(), snapshot.url);
        Ok(Document::from_flat(snapshot)?)
    }

    async fn url(&mut self) -> Result<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }
}

#[async_trait]
impl FieldDriver for CdpPage {
    async fn focus(&mut self, field: NodeId) -> Result<()> {
        self.field_op(field, "focus", serde_json::Value::Null).await
    }

    async fn set_native_value(&mut self, field: NodeId, value: &str) -> Result<()> {
        self.field_op(field, "value", serde_json::Value::from(value))
            .await
    }

    async fn dispatch(&mut self, field: NodeId, event: SyntheticEvent, bubbles: bool) -> Result<()> {
        let arg = serde_json::json!({
            "type": event.event_type(),
            "interface": event.interface(),
            "bubbles": bubbles,
        });
        self.field_op(field, "event", arg).await
    }

    async fn blur(&mut self, field: NodeId) -> Result<()> {
        self.field_op(field, "blur", serde_json::Value::Null).await
    }
}
