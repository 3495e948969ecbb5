use crate::generator::{PasswordGenerator, PasswordOptions};
use crate::overlay::OverlayIndex;
use crate::page::{FieldDriver, HostChannel, PageSource};
use crate::watcher::{MutationWatcher, PageChange};
use crate::writer::FieldWriter;
use crate::Result;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};
use vaultfill_core::filter::SiteFilter;
use vaultfill_core::messages::{CommandResponse, HostCommand, HostMessage, NoticeKind};
use vaultfill_core::{Document, PageLocation, Settings};
use vaultfill_detectors::{DetectedForm, FormLocator, SubmitLocator};

pub const NO_FORM_NOTICE: &str = "No login form found on this page";
pub const NO_FIELDS_NOTICE: &str = "No fillable fields found on this page";
pub const FILLED_NOTICE: &str = "Credentials filled successfully";
pub const GENERATED_NOTICE: &str = "Generated password filled";
pub const WRITE_FAILED_NOTICE: &str = "Could not fill the login form on this page";
const GENERATOR_FAILED_NOTICE: &str = "Error generating password";

/// A host command together with the slot for its reply
#[derive(Debug)]
pub struct CommandRequest {
    pub command: HostCommand,
    pub reply: oneshot::Sender<CommandResponse>,
}

impl CommandRequest {
    pub fn new(command: HostCommand) -> (Self, oneshot::Receiver<CommandResponse>) {
        let (reply, receiver) = oneshot::channel();
        (Self { command, reply }, receiver)
    }
}

/// Runs detection and autofill against one page
///
/// Owns the watcher (and through it the overlays) so every scan, timer and
/// command is handled by a single logical thread of control.
pub struct ContentAgent<P, H> {
    page: P,
    host: H,
    settings: Settings,
    filter: SiteFilter,
    writer: FieldWriter,
    generator: PasswordGenerator,
    watcher: MutationWatcher,
    picker_domain: Option<String>,
}

impl<P, H> ContentAgent<P, H>
where
    P: PageSource + FieldDriver,
    H: HostChannel,
{
    pub fn new(page: P, host: H, settings: Settings) -> Result<Self> {
        let filter = settings.site_filter()?;
        Ok(Self {
            page,
            host,
            writer: FieldWriter::new(settings.blur_delay()),
            watcher: MutationWatcher::new(settings.debounce()),
            filter,
            settings,
            generator: PasswordGenerator::new(),
            picker_domain: None,
        })
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn page_mut(&mut self) -> &mut P {
        &mut self.page
    }

    pub fn watcher(&self) -> &MutationWatcher {
        &self.watcher
    }

    pub fn overlays(&self) -> &OverlayIndex {
        self.watcher.overlays()
    }

    /// Domain recorded by the last credential picker request
    pub fn picker_domain(&self) -> Option<&str> {
        self.picker_domain.as_deref()
    }

    pub async fn handle_command(&mut self, command: HostCommand) -> CommandResponse {
        tracing::debug!("Host command: {}", command.action());

        match command {
            HostCommand::FillCredentials { username, password } => {
                let success = self
                    .fill_credentials(username.as_deref(), password.as_deref())
                    .await;
                CommandResponse::Done { success }
            }
            HostCommand::ShowCredentialPicker { domain } => {
                let domain = match domain {
                    Some(d) => PageLocation::normalize_host(&d),
                    None => self.page_hostname().await,
                };
                self.picker_domain = Some(domain.clone());
                CommandResponse::Picker {
                    success: true,
                    domain,
                }
            }
            HostCommand::ShowPasswordGenerator => {
                match self.generator.generate(&PasswordOptions::default()) {
                    Ok(password) => CommandResponse::Generated {
                        success: true,
                        password,
                    },
                    Err(e) => {
                        tracing::warn!("Password generation failed: {}", e);
                        self.notice(GENERATOR_FAILED_NOTICE, NoticeKind::Error).await;
                        CommandResponse::Done { success: false }
                    }
                }
            }
            HostCommand::CheckContentScriptActive => CommandResponse::Active { active: true },
        }
    }

    /// Fill the first detected form that has a field for a supplied value.
    /// Empty values count as absent. Exactly one notice is sent either way.
    pub async fn fill_credentials(&mut self, username: Option<&str>, password: Option<&str>) -> bool {
        let username = username.filter(|u| !u.is_empty());
        let password = password.filter(|p| !p.is_empty());

        let (doc, forms) = match self.scan().await {
            Ok(scan) => scan,
            Err(e) => {
                tracing::warn!("Could not capture page for autofill: {}", e);
                self.notice(NO_FORM_NOTICE, NoticeKind::Error).await;
                return false;
            }
        };

        if forms.is_empty() {
            tracing::info!("No login forms found on page");
            self.notice(NO_FORM_NOTICE, NoticeKind::Error).await;
            return false;
        }

        for form in &forms {
            let username_pair = form.username_field.zip(username);
            let password_pair = password.map(|p| (form.password_field, p));
            if username_pair.is_none() && password_pair.is_none() {
                continue;
            }

            let mut written = 0;
            for (field, value) in username_pair.into_iter().chain(password_pair) {
                if self.writer.set_field_value(&mut self.page, field, value).await {
                    written += 1;
                }
            }

            // Only one form is ever attempted, even when its writes fail
            if written == 0 {
                tracing::warn!(
                    "No field of the {} form at {} accepted a value",
                    form.origin.as_str(),
                    doc.describe(form.boundary)
                );
                self.notice(WRITE_FAILED_NOTICE, NoticeKind::Error).await;
                return false;
            }

            if let Some(submit) = SubmitLocator::find_submit_button(&doc, form.boundary) {
                if let Err(e) = self.page.focus(submit).await {
                    tracing::debug!("Could not focus submit control: {}", e);
                }
            }

            tracing::info!("Filled {} form at {}", form.origin.as_str(), doc.describe(form.boundary));
            self.notice(FILLED_NOTICE, NoticeKind::Success).await;
            self.watcher.overlays_mut().clear();
            return true;
        }

        self.notice(NO_FIELDS_NOTICE, NoticeKind::Error).await;
        false
    }

    /// Write a fresh password into the first detected password field that
    /// is still empty. Returns the password when one was written.
    pub async fn fill_generated_password(&mut self, options: &PasswordOptions) -> Option<String> {
        let (doc, forms) = match self.scan().await {
            Ok(scan) => scan,
            Err(e) => {
                tracing::warn!("Could not capture page for password generation: {}", e);
                self.notice(NO_FORM_NOTICE, NoticeKind::Error).await;
                return None;
            }
        };

        if forms.is_empty() {
            self.notice(NO_FORM_NOTICE, NoticeKind::Error).await;
            return None;
        }

        let empty_field = forms
            .iter()
            .map(|form| form.password_field)
            .find(|&field| doc.value(field).is_some_and(str::is_empty));
        let Some(field) = empty_field else {
            tracing::info!("Every detected password field already has a value");
            self.notice(NO_FIELDS_NOTICE, NoticeKind::Error).await;
            return None;
        };

        let password = match self.generator.generate(options) {
            Ok(password) => password,
            Err(e) => {
                tracing::warn!("Password generation failed: {}", e);
                self.notice(GENERATOR_FAILED_NOTICE, NoticeKind::Error).await;
                return None;
            }
        };

        if !self.writer.set_field_value(&mut self.page, field, &password).await {
            self.notice(WRITE_FAILED_NOTICE, NoticeKind::Error).await;
            return None;
        }
        tracing::info!("Generated password written to {}", doc.describe(field));
        self.notice(GENERATED_NOTICE, NoticeKind::Success).await;
        Some(password)
    }

    /// Capture the page and locate its login forms
    pub async fn scan(&mut self) -> Result<(Document, Vec<DetectedForm>)> {
        let doc = self.page.snapshot().await?;
        let forms = FormLocator::find_login_forms(&doc);
        Ok((doc, forms))
    }

    /// First scan after load: start from a clean overlay set
    pub async fn initial_scan(&mut self) -> usize {
        self.watcher.overlays_mut().clear();
        self.scan_and_notify().await
    }

    /// Scan, track the found fields and tell the host about them
    pub async fn scan_and_notify(&mut self) -> usize {
        let (doc, forms) = match self.scan().await {
            Ok(scan) => scan,
            Err(e) => {
                tracing::warn!("Scan failed: {}", e);
                return 0;
            }
        };

        if !forms.is_empty() {
            let domain = PageLocation::parse(doc.url())
                .map(|l| l.hostname().to_string())
                .unwrap_or_default();
            self.send(HostMessage::LoginFormDetected {
                forms_count: forms.len(),
                url: doc.url().to_string(),
                domain,
            })
            .await;
        }
        self.watcher.apply_scan(&doc, &forms);

        forms.len()
    }

    /// Polling safety net; skipped while a triggered scan is pending
    pub async fn poll_scan(&mut self) {
        if self.watcher.is_pending() {
            tracing::trace!("Scan pending, skipping poll");
            return;
        }

        match self.scan().await {
            Ok((doc, forms)) => {
                let outcome = self.watcher.reconcile(&doc, &forms);
                tracing::debug!("Poll found {} form(s): {:?}", forms.len(), outcome);
            }
            Err(e) => tracing::warn!("Poll scan failed: {}", e),
        }
    }

    /// Start or stop the watcher depending on the current page's host
    pub async fn refresh_site(&mut self) -> bool {
        let url = match self.page.url().await {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Could not read page URL: {}", e);
                String::new()
            }
        };

        if self.filter.allows_url(&url) {
            self.watcher.start();
            true
        } else {
            tracing::info!("Site excluded, not scanning {}", url);
            self.watcher.stop();
            false
        }
    }

    /// Feed a page change into the watcher
    pub async fn on_change(&mut self, change: PageChange) {
        if change == PageChange::Navigated {
            tracing::debug!("Page navigated, resetting watcher");
            self.watcher.stop();
            self.picker_domain = None;
            self.refresh_site().await;
        } else {
            self.watcher.on_change(&change, Instant::now());
        }
    }

    /// Drive the agent until `shutdown` fires or its sender is dropped
    pub async fn run(
        &mut self,
        mut changes: mpsc::UnboundedReceiver<PageChange>,
        mut commands: mpsc::Receiver<CommandRequest>,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        self.refresh_site().await;

        let initial_delay = self.settings.initial_scan_delay();
        let mut initial_at = Some(Instant::now() + initial_delay);

        let poll_every = self.settings.poll_interval().max(Duration::from_millis(1));
        let mut poll = tokio::time::interval_at(Instant::now() + poll_every, poll_every);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let pending = self.watcher.deadline();

            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Agent shutting down");
                    break;
                }
                _ = tokio::time::sleep_until(initial_at.unwrap_or_else(Instant::now)), if initial_at.is_some() => {
                    initial_at = None;
                    if self.watcher.is_running() {
                        let found = self.initial_scan().await;
                        tracing::info!("Initial scan found {} login form(s)", found);
                    }
                }
                _ = tokio::time::sleep_until(pending.unwrap_or_else(Instant::now)), if pending.is_some() => {
                    if self.watcher.on_timer(Instant::now()) {
                        self.scan_and_notify().await;
                    }
                }
                _ = poll.tick() => {
                    if self.watcher.is_running() {
                        self.poll_scan().await;
                    }
                }
                Some(change) = changes.recv() => {
                    let navigated = change == PageChange::Navigated;
                    self.on_change(change).await;
                    if navigated {
                        initial_at = Some(Instant::now() + initial_delay);
                    }
                }
                Some(request) = commands.recv() => {
                    let response = self.handle_command(request.command).await;
                    if request.reply.send(response).is_err() {
                        tracing::debug!("Command reply dropped by host");
                    }
                }
            }
        }

        self.watcher.stop();
    }

    async fn page_hostname(&mut self) -> String {
        match self.page.url().await {
            Ok(url) => PageLocation::parse(&url)
                .map(|l| l.hostname().to_string())
                .unwrap_or_default(),
            Err(e) => {
                tracing::warn!("Could not read page URL: {}", e);
                String::new()
            }
        }
    }

    async fn notice(&mut self, message: &str, kind: NoticeKind) {
        self.send(HostMessage::Notice {
            message: message.to_string(),
            kind,
        })
        .await;
    }

    /// Fire-and-forget: delivery failures are logged and dropped
    async fn send(&mut self, message: HostMessage) {
        if let Err(e) = self.host.send(message).await {
            tracing::warn!("Host message not delivered: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{ChannelHost, StaticPage};
    use crate::Error;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use vaultfill_core::dom::{Element, NodeSnapshot, PageSnapshot, Rect, SyntheticEvent};
    use vaultfill_core::NodeId;

    fn login_doc(url: &str) -> Document {
        let root = NodeSnapshot::new("html").child(NodeSnapshot::new("body").child(
            NodeSnapshot::new("form").id("login").children([
                NodeSnapshot::input("email").id("email").rect(10.0, 10.0, 200.0, 30.0),
                NodeSnapshot::input("password").id("pw").rect(10.0, 50.0, 200.0, 30.0),
                NodeSnapshot::new("button").id("go").attr("type", "submit").text("Sign in"),
            ]),
        ));
        Document::from_snapshot(&PageSnapshot::new(url, root))
    }

    fn agent(
        doc: Document,
    ) -> (
        ContentAgent<StaticPage, ChannelHost>,
        mpsc::UnboundedReceiver<HostMessage>,
    ) {
        let (host, messages) = ChannelHost::new();
        let agent = ContentAgent::new(StaticPage::new(doc), host, Settings::default()).unwrap();
        (agent, messages)
    }

    fn drain(messages: &mut mpsc::UnboundedReceiver<HostMessage>) -> Vec<HostMessage> {
        let mut out = Vec::new();
        while let Ok(m) = messages.try_recv() {
            out.push(m);
        }
        out
    }

    fn notice(message: &str, kind: NoticeKind) -> HostMessage {
        HostMessage::Notice {
            message: message.to_string(),
            kind,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fill_credentials() {
        let (mut agent, mut messages) = agent(login_doc("https://example.com/login"));

        assert!(agent.fill_credentials(Some("alice@example.com"), Some("s3cret")).await);

        let doc = agent.page().document();
        let email = doc.element_by_id("email").unwrap();
        let pw = doc.element_by_id("pw").unwrap();
        assert_eq!(doc.value(email), Some("alice@example.com"));
        assert_eq!(doc.value(pw), Some("s3cret"));
        assert_eq!(doc.dispatched_types(pw), vec!["input", "change", "input", "blur"]);
        assert_eq!(doc.focused(), doc.element_by_id("go"));
        assert_eq!(
            drain(&mut messages),
            vec![notice(FILLED_NOTICE, NoticeKind::Success)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_fill_password_only() {
        let (mut agent, _messages) = agent(login_doc("https://example.com/login"));

        assert!(agent.fill_credentials(Some(""), Some("pw")).await);
        let doc = agent.page().document();
        assert_eq!(doc.value(doc.element_by_id("email").unwrap()), Some(""));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fill_without_forms() {
        let root = NodeSnapshot::new("html").child(NodeSnapshot::new("body"));
        let doc = Document::from_snapshot(&PageSnapshot::new("https://example.com", root));
        let (mut agent, mut messages) = agent(doc);

        assert!(!agent.fill_credentials(Some("alice"), Some("pw")).await);
        assert_eq!(
            drain(&mut messages),
            vec![notice(NO_FORM_NOTICE, NoticeKind::Error)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_fill_without_matching_values() {
        let (mut agent, mut messages) = agent(login_doc("https://example.com/login"));

        assert!(!agent.fill_credentials(None, Some("")).await);
        assert_eq!(
            drain(&mut messages),
            vec![notice(NO_FIELDS_NOTICE, NoticeKind::Error)]
        );
        assert!(agent.page().document().events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fill_clears_overlays() {
        let (mut agent, _messages) = agent(login_doc("https://example.com/login"));
        agent.initial_scan().await;
        assert_eq!(agent.overlays().len(), 2);

        agent.fill_credentials(Some("a"), Some("b")).await;
        assert!(agent.overlays().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_generated_password_goes_to_empty_field() {
        let (mut agent, mut messages) = agent(login_doc("https://example.com/signup"));

        let password = agent
            .fill_generated_password(&PasswordOptions::default())
            .await
            .unwrap();

        let doc = agent.page().document();
        let pw = doc.element_by_id("pw").unwrap();
        assert_eq!(password.len(), 16);
        assert_eq!(doc.value(pw), Some(password.as_str()));
        assert_eq!(doc.value(doc.element_by_id("email").unwrap()), Some(""));
        assert_eq!(
            drain(&mut messages),
            vec![notice(GENERATED_NOTICE, NoticeKind::Success)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_generated_password_skips_filled_fields() {
        let (mut agent, mut messages) = agent(login_doc("https://example.com/signup"));
        agent.fill_credentials(None, Some("existing")).await;
        drain(&mut messages);

        assert!(agent
            .fill_generated_password(&PasswordOptions::default())
            .await
            .is_none());
        assert_eq!(
            drain(&mut messages),
            vec![notice(NO_FIELDS_NOTICE, NoticeKind::Error)]
        );
    }

    /// A page that can be read but rejects every field operation
    struct ReadOnlyPage {
        document: Document,
    }

    #[async_trait]
    impl PageSource for ReadOnlyPage {
        async fn snapshot(&mut self) -> Result<Document> {
            Ok(self.document.clone())
        }
    }

    #[async_trait]
    impl FieldDriver for ReadOnlyPage {
        async fn focus(&mut self, field: NodeId) -> Result<()> {
            Err(Error::Write(format!("focus {} rejected", field)))
        }

        async fn set_native_value(&mut self, field: NodeId, _value: &str) -> Result<()> {
            Err(Error::Write(format!("set value of {} rejected", field)))
        }

        async fn dispatch(&mut self, field: NodeId, _event: SyntheticEvent, _bubbles: bool) -> Result<()> {
            Err(Error::Write(format!("dispatch on {} rejected", field)))
        }

        async fn blur(&mut self, field: NodeId) -> Result<()> {
            Err(Error::Write(format!("blur {} rejected", field)))
        }
    }

    fn read_only_agent() -> (
        ContentAgent<ReadOnlyPage, ChannelHost>,
        mpsc::UnboundedReceiver<HostMessage>,
    ) {
        let page = ReadOnlyPage {
            document: login_doc("https://example.com/login"),
        };
        let (host, messages) = ChannelHost::new();
        let agent = ContentAgent::new(page, host, Settings::default()).unwrap();
        (agent, messages)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fill_fails_when_no_write_sticks() {
        let (mut agent, mut messages) = read_only_agent();
        agent.initial_scan().await;
        drain(&mut messages);

        assert!(!agent.fill_credentials(Some("alice"), Some("s3cret")).await);
        assert_eq!(
            drain(&mut messages),
            vec![notice(WRITE_FAILED_NOTICE, NoticeKind::Error)]
        );
        // Nothing was filled, so the indicators stay
        assert_eq!(agent.overlays().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_generated_password_fails_when_write_rejected() {
        let (mut agent, mut messages) = read_only_agent();

        assert!(agent
            .fill_generated_password(&PasswordOptions::default())
            .await
            .is_none());
        assert_eq!(
            drain(&mut messages),
            vec![notice(WRITE_FAILED_NOTICE, NoticeKind::Error)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_command_reports_failed_write() {
        let (mut agent, _messages) = read_only_agent();
        let response = agent
            .handle_command(HostCommand::FillCredentials {
                username: None,
                password: Some("pw".to_string()),
            })
            .await;
        assert_eq!(response, CommandResponse::Done { success: false });
    }

    #[tokio::test(start_paused = true)]
    async fn test_rescan_after_nodes_shift() {
        let (mut agent, mut messages) = agent(login_doc("https://example.com/login"));
        agent.initial_scan().await;

        // The page re-renders with new nodes ahead of the form
        let form = NodeSnapshot::new("form").id("login").children([
            NodeSnapshot::input("email").id("email").rect(10.0, 10.0, 200.0, 30.0),
            NodeSnapshot::input("password").id("pw").rect(10.0, 50.0, 200.0, 30.0),
        ]);
        let body = NodeSnapshot::new("body")
            .child(NodeSnapshot::new("div").child(NodeSnapshot::new("span")))
            .child(form);
        let root = NodeSnapshot::new("html").child(body);
        *agent.page_mut().document_mut() =
            Document::from_snapshot(&PageSnapshot::new("https://example.com/login", root));

        assert_eq!(agent.scan_and_notify().await, 1);
        agent.poll_scan().await;

        let doc = agent.page().document();
        let tracked: Vec<String> = agent.overlays().iter().map(|o| doc.describe(o.field)).collect();
        assert_eq!(tracked, vec!["input#email[type=email]", "input#pw[type=password]"]);
        assert_eq!(drain(&mut messages).len(), 2);
    }

    #[tokio::test]
    async fn test_command_dispatch() {
        let (mut agent, _messages) = agent(login_doc("https://Shop.Example.com/login"));

        assert_eq!(
            agent.handle_command(HostCommand::CheckContentScriptActive).await,
            CommandResponse::Active { active: true }
        );

        let response = agent
            .handle_command(HostCommand::ShowCredentialPicker { domain: None })
            .await;
        assert_eq!(
            response,
            CommandResponse::Picker {
                success: true,
                domain: "shop.example.com".to_string()
            }
        );

        agent
            .handle_command(HostCommand::ShowCredentialPicker {
                domain: Some(" Other.Example ".to_string()),
            })
            .await;
        assert_eq!(agent.picker_domain(), Some("other.example"));

        match agent.handle_command(HostCommand::ShowPasswordGenerator).await {
            CommandResponse::Generated { success, password } => {
                assert!(success);
                assert_eq!(password.len(), 16);
            }
            other => panic!("unexpected response {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_detection_notice() {
        let (mut agent, mut messages) = agent(login_doc("https://Example.com/login"));

        assert_eq!(agent.initial_scan().await, 1);
        assert_eq!(
            drain(&mut messages),
            vec![HostMessage::LoginFormDetected {
                forms_count: 1,
                url: "https://Example.com/login".to_string(),
                domain: "example.com".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_closed_host_channel_is_not_fatal() {
        let (mut agent, messages) = agent(login_doc("https://example.com/login"));
        drop(messages);

        assert_eq!(agent.initial_scan().await, 1);
        assert_eq!(agent.overlays().len(), 2);
    }

    #[tokio::test]
    async fn test_excluded_site_is_not_watched() {
        let (host, _messages) = ChannelHost::new();
        let settings = Settings {
            excluded_hosts: vec!["*.example.com".to_string()],
            ..Settings::default()
        };
        let mut agent = ContentAgent::new(
            StaticPage::new(login_doc("https://bank.example.com/")),
            host,
            settings,
        )
        .unwrap();

        assert!(!agent.refresh_site().await);
        agent.on_change(PageChange::ChildList).await;
        assert!(!agent.watcher().is_pending());
    }

    /// A page whose document can change while the agent runs
    #[derive(Clone)]
    struct SharedPage {
        document: Arc<Mutex<Document>>,
        snapshots: Arc<Mutex<usize>>,
    }

    #[async_trait]
    impl PageSource for SharedPage {
        async fn snapshot(&mut self) -> Result<Document> {
            *self.snapshots.lock().unwrap() += 1;
            Ok(self.document.lock().unwrap().clone())
        }

        async fn url(&mut self) -> Result<String> {
            Ok(self.document.lock().unwrap().url().to_string())
        }
    }

    #[async_trait]
    impl FieldDriver for SharedPage {
        async fn focus(&mut self, field: NodeId) -> Result<()> {
            self.document.lock().unwrap().focus(field);
            Ok(())
        }

        async fn set_native_value(&mut self, field: NodeId, value: &str) -> Result<()> {
            self.document.lock().unwrap().set_value(field, value);
            Ok(())
        }

        async fn dispatch(&mut self, field: NodeId, event: SyntheticEvent, bubbles: bool) -> Result<()> {
            self.document.lock().unwrap().dispatch(field, event, bubbles);
            Ok(())
        }

        async fn blur(&mut self, field: NodeId) -> Result<()> {
            self.document.lock().unwrap().blur(field);
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_injected_field_detected_by_one_scan() {
        let root = NodeSnapshot::new("html").child(NodeSnapshot::new("body").child(NodeSnapshot::new("div")));
        let doc = Document::from_snapshot(&PageSnapshot::new("https://example.com/", root));
        let page = SharedPage {
            document: Arc::new(Mutex::new(doc)),
            snapshots: Arc::new(Mutex::new(0)),
        };
        let settings = Settings {
            initial_scan_delay_ms: 0,
            ..Settings::default()
        };
        let (host, mut messages) = ChannelHost::new();
        let mut agent = ContentAgent::new(page.clone(), host, settings).unwrap();

        let (change_tx, change_rx) = mpsc::unbounded_channel();
        let (_command_tx, command_rx) = mpsc::channel(8);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            agent.run(change_rx, command_rx, shutdown_rx).await;
            agent
        });

        tokio::time::sleep(Duration::from_millis(600)).await;
        {
            let mut doc = page.document.lock().unwrap();
            let div = doc.elements_by_tag(doc.root(), "div").next().unwrap();
            let mut input = Element::new("input");
            input.attributes.insert("type".to_string(), "password".to_string());
            input.rect = Some(Rect::new(10.0, 10.0, 200.0, 30.0));
            doc.push_element(div, input);
        }
        // A burst of churn from the same insertion
        for _ in 0..3 {
            change_tx.send(PageChange::ChildList).unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        tokio::time::sleep(Duration::from_millis(600)).await;
        let detected: Vec<HostMessage> = drain(&mut messages);
        assert_eq!(
            detected,
            vec![HostMessage::LoginFormDetected {
                forms_count: 1,
                url: "https://example.com/".to_string(),
                domain: "example.com".to_string(),
            }]
        );
        // The initial scan plus exactly one debounced scan
        assert_eq!(*page.snapshots.lock().unwrap(), 2);

        shutdown_tx.send(()).unwrap();
        let agent = task.await.unwrap();
        assert!(!agent.watcher().is_running());
        assert!(agent.overlays().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_commands_through_run_loop() {
        let (host, _messages) = ChannelHost::new();
        let mut agent = ContentAgent::new(
            StaticPage::new(login_doc("https://example.com/login")),
            host,
            Settings::default(),
        )
        .unwrap();

        let (_change_tx, change_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::channel(8);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            agent.run(change_rx, command_rx, shutdown_rx).await;
            agent
        });

        let (request, reply) = CommandRequest::new(HostCommand::FillCredentials {
            username: Some("alice".to_string()),
            password: Some("pw".to_string()),
        });
        command_tx.send(request).await.unwrap();
        assert_eq!(reply.await.unwrap(), CommandResponse::Done { success: true });

        shutdown_tx.send(()).unwrap();
        let agent = task.await.unwrap();
        let doc = agent.page().document();
        assert_eq!(doc.value(doc.element_by_id("pw").unwrap()), Some("pw"));
    }
}
