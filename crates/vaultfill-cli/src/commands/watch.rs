use crate::OutputFormat;
use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use vaultfill_browser::{
    CdpAttachment, CdpSession, ChannelHost, ChromeFinder, ChromeLauncher, CommandRequest,
    ContentAgent, ProfileManager,
};
use vaultfill_core::messages::{HostCommand, HostMessage, NoticeKind};
use vaultfill_core::Settings;

/// Browser and autofill choices for `vaultfill watch`
#[derive(Debug, Clone, Default)]
pub struct WatchOptions {
    pub url: Option<String>,
    pub chrome_path: Option<PathBuf>,
    pub port: u16,
    pub profile: Option<String>,
    pub headless: bool,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl WatchOptions {
    fn autofill(&self) -> bool {
        self.username.as_deref().is_some_and(|u| !u.is_empty())
            || self.password.as_deref().is_some_and(|p| !p.is_empty())
    }
}

pub fn execute(options: WatchOptions, settings: Settings, format: OutputFormat) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let result = runtime.block_on(watch(options, settings, format));

    // Blocking CDP reads must not keep the process alive
    runtime.shutdown_timeout(Duration::from_millis(100));

    result
}

async fn watch(options: WatchOptions, settings: Settings, format: OutputFormat) -> Result<()> {
    let chrome = ChromeFinder::new(options.chrome_path.clone()).find()?;

    let profile = match &options.profile {
        Some(name) => ProfileManager::named(name)?,
        None => ProfileManager::temporary()?,
    };
    tracing::info!("Using profile at {}", profile.path().display());

    let process = ChromeLauncher::new(chrome, profile.path().to_path_buf())
        .with_url(options.url.clone())
        .with_port(options.port)
        .headless(options.headless)
        .launch()?;
    tracing::debug!("Chrome running as pid {}", process.id());

    let spinner = if format.is_machine_readable() {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.set_message("Connecting to Chrome...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    let attached = CdpSession::new(options.port).attach(None).await;
    spinner.finish_and_clear();

    let CdpAttachment {
        page,
        changes,
        connection,
    } = attached?;

    match format {
        OutputFormat::Pretty => println!("👀 Watching for login forms. Press Ctrl-C to stop."),
        OutputFormat::Table => println!("Event,Count,Domain,Detail"),
        OutputFormat::Json => {}
    }

    let (host, mut messages) = ChannelHost::new();
    let mut agent = ContentAgent::new(page, host, settings)?;
    let (command_tx, command_rx) = mpsc::channel(8);
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let agent_task = tokio::spawn(async move {
        agent.run(changes, command_rx, shutdown_rx).await;
    });

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    // One autofill attempt per page URL
    let mut filled_url: Option<String> = None;

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::info!("Interrupted, shutting down");
                break;
            }
            message = messages.recv() => {
                let Some(message) = message else { break };
                println!("{}", render(&message, format)?);

                if let HostMessage::LoginFormDetected { url, .. } = &message {
                    if options.autofill() && filled_url.as_deref() != Some(url.as_str()) {
                        filled_url = Some(url.clone());
                        request_fill(&command_tx, &options).await;
                    }
                }
            }
        }
    }

    let _ = shutdown_tx.send(());
    if let Err(e) = agent_task.await {
        tracing::warn!("Agent task ended abnormally: {}", e);
    }

    drop(connection);
    drop(process);
    drop(profile);
    Ok(())
}

async fn request_fill(commands: &mpsc::Sender<CommandRequest>, options: &WatchOptions) {
    let (request, reply) = CommandRequest::new(HostCommand::FillCredentials {
        username: options.username.clone(),
        password: options.password.clone(),
    });

    if commands.send(request).await.is_err() {
        tracing::warn!("Agent stopped, cannot autofill");
        return;
    }

    // The outcome also arrives as a notice; the reply is only logged
    tokio::spawn(async move {
        match reply.await {
            Ok(response) => tracing::debug!("Autofill success: {}", response.success()),
            Err(_) => tracing::debug!("Autofill reply dropped"),
        }
    });
}

fn render(message: &HostMessage, format: OutputFormat) -> Result<String> {
    use console::style;

    let line = match (format, message) {
        (OutputFormat::Json, _) => serde_json::to_string(message)?,
        (
            OutputFormat::Table,
            HostMessage::LoginFormDetected {
                forms_count,
                url,
                domain,
            },
        ) => format!("loginFormDetected,{},{},{}", forms_count, domain, url),
        (OutputFormat::Table, HostMessage::Notice { message, kind }) => {
            format!("notice,,,{}: {}", kind_label(*kind), message)
        }
        (
            OutputFormat::Pretty,
            HostMessage::LoginFormDetected {
                forms_count,
                url,
                domain,
            },
        ) => format!(
            "🔐 {} on {}\n   {}",
            style(format!("{} login form(s) detected", forms_count))
                .bold()
                .cyan(),
            style(domain).bold(),
            style(url).dim()
        ),
        (OutputFormat::Pretty, HostMessage::Notice { message, kind }) => match kind {
            NoticeKind::Success => format!("✅ {}", style(message).green()),
            NoticeKind::Error => format!("❌ {}", style(message).red()),
            NoticeKind::Info => format!("ℹ️  {}", message),
        },
    };

    Ok(line)
}

fn kind_label(kind: NoticeKind) -> &'static str {
    match kind {
        NoticeKind::Success => "success",
        NoticeKind::Error => "error",
        NoticeKind::Info => "info",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detected() -> HostMessage {
        HostMessage::LoginFormDetected {
            forms_count: 2,
            url: "https://shop.example.com/login".to_string(),
            domain: "shop.example.com".to_string(),
        }
    }

    #[test]
    fn test_json_lines_use_wire_names() {
        let line = render(&detected(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["action"], "loginFormDetected");
        assert_eq!(value["formsCount"], 2);
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_table_rows() {
        assert_eq!(
            render(&detected(), OutputFormat::Table).unwrap(),
            "loginFormDetected,2,shop.example.com,https://shop.example.com/login"
        );

        let notice = HostMessage::Notice {
            message: "No login form found on this page".to_string(),
            kind: NoticeKind::Error,
        };
        assert_eq!(
            render(&notice, OutputFormat::Table).unwrap(),
            "notice,,,error: No login form found on this page"
        );
    }

    #[test]
    fn test_autofill_needs_a_value() {
        let mut options = WatchOptions::default();
        assert!(!options.autofill());

        options.password = Some(String::new());
        assert!(!options.autofill());

        options.username = Some("alice".to_string());
        assert!(options.autofill());
    }
}
