use crate::OutputFormat;
use anyhow::Result;
use serde::Serialize;
use std::path::Path;
use vaultfill_core::dom::SnapshotReader;
use vaultfill_core::{Document, PageLocation, Settings};
use vaultfill_detectors::{DetectedForm, FormLocator, SubmitLocator};

/// Login forms found in one page snapshot
#[derive(Debug, Serialize)]
pub struct DetectionReport {
    pub url: String,
    pub domain: String,
    pub site: String,
    pub excluded: bool,
    pub forms: Vec<FormReport>,
}

#[derive(Debug, Serialize)]
pub struct FormReport {
    pub origin: String,
    pub boundary: String,
    pub username: Option<String>,
    pub password: String,
    pub submit: Option<String>,
}

impl FormReport {
    fn new(doc: &Document, form: &DetectedForm) -> Self {
        Self {
            origin: form.origin.as_str().to_string(),
            boundary: doc.describe(form.boundary),
            username: form.username_field.map(|f| doc.describe(f)),
            password: doc.describe(form.password_field),
            submit: SubmitLocator::find_submit_button(doc, form.boundary).map(|s| doc.describe(s)),
        }
    }
}

/// Run detection against a snapshot file. Excluded sites are reported but
/// never scanned.
pub fn detect_forms(file: &Path, settings: &Settings) -> Result<DetectionReport> {
    tracing::debug!("Reading page snapshot: {}", file.display());

    let snapshot = SnapshotReader::from_file(file)?;
    SnapshotReader::validate(&snapshot)?;
    let doc = Document::from_snapshot(&snapshot);

    let location = PageLocation::parse(doc.url()).ok();
    let excluded = !settings.site_filter()?.allows_url(doc.url());

    let forms = if excluded {
        tracing::info!("Site excluded, skipping scan of {}", doc.url());
        Vec::new()
    } else {
        FormLocator::find_login_forms(&doc)
            .iter()
            .map(|form| FormReport::new(&doc, form))
            .collect()
    };

    Ok(DetectionReport {
        url: doc.url().to_string(),
        domain: location
            .as_ref()
            .map(|l| l.hostname().to_string())
            .unwrap_or_default(),
        site: location
            .as_ref()
            .map(|l| l.registrable_domain())
            .unwrap_or_default(),
        excluded,
        forms,
    })
}

pub fn execute(file: &Path, settings: &Settings, format: OutputFormat) -> Result<()> {
    tracing::info!("Detecting login forms in: {}", file.display());

    let report = detect_forms(file, settings)?;

    match format {
        OutputFormat::Json => output_json(&report)?,
        OutputFormat::Table => output_table(&report),
        OutputFormat::Pretty => output_pretty(&report),
    }

    Ok(())
}

fn output_pretty(report: &DetectionReport) {
    use console::style;

    println!("\n{}", style("Login Form Detection").bold().cyan());
    println!("{}", style("====================").cyan());

    println!("\n{}", style("Page:").bold());
    println!("  URL:     {}", report.url);
    println!("  Domain:  {}", report.domain);
    println!("  Site:    {}", report.site);

    if report.excluded {
        println!("\n{}", style("Site is excluded, page was not scanned").yellow());
        return;
    }

    if report.forms.is_empty() {
        println!("\n{}", style("No login forms found").yellow());
        return;
    }

    println!(
        "\n{}",
        style(format!("Forms ({}):", report.forms.len())).bold()
    );
    for (index, form) in report.forms.iter().enumerate() {
        println!(
            "\n  {} {}",
            style(format!("#{}", index + 1)).green().bold(),
            style(&form.origin).green()
        );
        println!("    Boundary: {}", form.boundary);
        println!(
            "    Username: {}",
            form.username.as_deref().unwrap_or("(none)")
        );
        println!("    Password: {}", form.password);
        println!(
            "    Submit:   {}",
            form.submit.as_deref().unwrap_or("(none)")
        );
    }
    println!();
}

fn output_json(report: &DetectionReport) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

fn output_table(report: &DetectionReport) {
    println!("Form,Origin,Boundary,Username,Password,Submit");
    for (index, form) in report.forms.iter().enumerate() {
        println!(
            "{},{},{},{},{},{}",
            index + 1,
            form.origin,
            form.boundary,
            form.username.as_deref().unwrap_or(""),
            form.password,
            form.submit.as_deref().unwrap_or("")
        );
    }
}
