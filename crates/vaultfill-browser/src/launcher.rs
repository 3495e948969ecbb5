use crate::{Error, Result};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

pub const DEFAULT_DEBUGGING_PORT: u16 = 9222;

/// Starts a browser with remote debugging enabled
pub struct ChromeLauncher {
    chrome_path: PathBuf,
    profile_path: PathBuf,
    initial_url: Option<String>,
    debugging_port: u16,
    headless: bool,
}

/// A launched browser, killed when dropped
pub struct ChromeProcess {
    child: Child,
}

impl ChromeProcess {
    pub fn id(&self) -> u32 {
        self.child.id()
    }
}

impl Drop for ChromeProcess {
    fn drop(&mut self) {
        if let Err(e) = self.child.kill() {
            tracing::debug!("Browser process already gone: {}", e);
        }
        let _ = self.child.wait();
    }
}

impl ChromeLauncher {
    pub fn new(chrome_path: PathBuf, profile_path: PathBuf) -> Self {
        Self {
            chrome_path,
            profile_path,
            initial_url: None,
            debugging_port: DEFAULT_DEBUGGING_PORT,
            headless: false,
        }
    }

    pub fn with_url(mut self, url: Option<String>) -> Self {
        self.initial_url = url;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.debugging_port = port;
        self
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn launch(&self) -> Result<ChromeProcess> {
        tracing::info!(
            "Launching {} with debugging port {}",
            self.chrome_path.display(),
            self.debugging_port
        );

        let child = Command::new(&self.chrome_path)
            .args(self.build_args())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::Browser(format!("Failed to launch Chrome: {}", e)))?;

        Ok(ChromeProcess { child })
    }

    fn build_args(&self) -> Vec<String> {
        let mut args = vec![
            format!("--remote-debugging-port={}", self.debugging_port),
            "--no-first-run".to_string(),
            "--no-default-browser-check".to_string(),
            format!("--user-data-dir={}", self.profile_path.display()),
        ];

        if self.headless {
            args.push("--headless=new".to_string());
        }

        args.push(match &self.initial_url {
            Some(url) if url.contains("://") || url.starts_with("about:") => url.clone(),
            Some(url) => format!("https://{}", url),
            None => "about:blank".to_string(),
        });

        args
    }

    pub fn debugging_port(&self) -> u16 {
        self.debugging_port
    }
}
