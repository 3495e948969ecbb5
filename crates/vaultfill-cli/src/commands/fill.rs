use crate::OutputFormat;
use anyhow::Result;
use serde::Serialize;
use std::path::Path;
use vaultfill_browser::{ChannelHost, ContentAgent, PasswordOptions, StaticPage};
use vaultfill_core::dom::{DomEvent, SnapshotReader};
use vaultfill_core::messages::{HostMessage, NoticeKind};
use vaultfill_core::{Document, Settings};

/// Outcome of autofilling a page snapshot
#[derive(Debug, Serialize)]
pub struct FillReport {
    pub url: String,
    pub filled: bool,
    pub notices: Vec<Notice>,
    /// Fields that received a value, in write order
    pub fields: Vec<String>,
    /// Element holding focus afterwards (the submit control when one was found)
    pub focused: Option<String>,
    /// Password written by `--generate`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated: Option<String>,
    #[serde(skip)]
    pub document: Document,
}

#[derive(Debug, Serialize)]
pub struct Notice {
    pub message: String,
    pub kind: NoticeKind,
}

/// What goes into the page
#[derive(Debug, Clone)]
pub enum FillSource<'a> {
    Credentials {
        username: Option<&'a str>,
        password: Option<&'a str>,
    },
    /// A fresh password for the first empty password field
    Generated(PasswordOptions),
}

/// Fill credentials into a snapshot the way the page agent would on a live page
pub fn fill_snapshot(
    file: &Path,
    username: Option<&str>,
    password: Option<&str>,
    settings: &Settings,
) -> Result<FillReport> {
    fill_snapshot_with(file, FillSource::Credentials { username, password }, settings)
}

pub fn fill_snapshot_with(
    file: &Path,
    source: FillSource<'_>,
    settings: &Settings,
) -> Result<FillReport> {
    tracing::debug!("Reading page snapshot: {}", file.display());

    let snapshot = SnapshotReader::from_file(file)?;
    SnapshotReader::validate(&snapshot)?;
    let page = StaticPage::new(Document::from_snapshot(&snapshot));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let result = runtime.block_on(async {
        let (host, mut messages) = ChannelHost::new();
        let mut agent = ContentAgent::new(page, host, settings.clone())?;
        let (filled, generated) = match source {
            FillSource::Credentials { username, password } => {
                (agent.fill_credentials(username, password).await, None)
            }
            FillSource::Generated(options) => {
                let generated = agent.fill_generated_password(&options).await;
                (generated.is_some(), generated)
            }
        };

        let mut notices = Vec::new();
        while let Ok(message) = messages.try_recv() {
            if let HostMessage::Notice { message, kind } = message {
                notices.push(Notice { message, kind });
            }
        }

        let document = agent.page().document().clone();
        Ok::<_, anyhow::Error>((filled, generated, notices, document))
    });

    runtime.shutdown_timeout(std::time::Duration::from_millis(100));
    let (filled, generated, notices, document) = result?;

    let mut fields: Vec<String> = Vec::new();
    let mut seen = Vec::new();
    for event in document.events() {
        if let DomEvent::ValueSet { target } = event {
            if !seen.contains(target) {
                seen.push(*target);
                fields.push(document.describe(*target));
            }
        }
    }

    Ok(FillReport {
        url: document.url().to_string(),
        filled,
        notices,
        fields,
        focused: document.focused().map(|f| document.describe(f)),
        generated,
        document,
    })
}

pub fn execute(
    file: &Path,
    username: Option<&str>,
    password: Option<&str>,
    generate: bool,
    output: Option<&Path>,
    settings: &Settings,
    format: OutputFormat,
) -> Result<()> {
    tracing::info!("Filling credentials into: {}", file.display());

    let source = if generate {
        if username.is_some() || password.is_some() {
            tracing::debug!("--generate set, ignoring the given credentials");
        }
        FillSource::Generated(PasswordOptions::default())
    } else {
        FillSource::Credentials { username, password }
    };
    let report = fill_snapshot_with(file, source, settings)?;

    if !report.filled {
        let message = report
            .notices
            .last()
            .map(|n| n.message.clone())
            .unwrap_or_else(|| "Autofill failed".to_string());
        anyhow::bail!(message);
    }

    if let Some(output) = output {
        let snapshot = report
            .document
            .to_snapshot()
            .ok_or_else(|| anyhow::anyhow!("Filled page has no root element"))?;
        SnapshotReader::to_file(&snapshot, output)?;
        tracing::info!("Filled snapshot written to {}", output.display());
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Table => output_table(&report),
        OutputFormat::Pretty => output_pretty(&report),
    }

    Ok(())
}

fn output_pretty(report: &FillReport) {
    use console::style;

    for notice in &report.notices {
        println!("✅ {}", style(&notice.message).green().bold());
    }
    println!("  Page:      {}", report.url);
    for field in &report.fields {
        println!("  Filled:    {}", field);
    }
    if let Some(focused) = &report.focused {
        println!("  Focused:   {}", focused);
    }
    if let Some(generated) = &report.generated {
        println!("  Generated: {}", style(generated).bold());
    }
}

fn output_table(report: &FillReport) {
    println!("Field,Role");
    for field in &report.fields {
        println!("{},filled", field);
    }
    if let Some(focused) = &report.focused {
        println!("{},focused", focused);
    }
    if let Some(generated) = &report.generated {
        println!("{},generated", generated);
    }
}
