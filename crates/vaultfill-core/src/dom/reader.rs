use super::snapshot::{NodeSnapshot, PageSnapshot};
use crate::{Error, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub struct SnapshotReader;

impl SnapshotReader {
    /// Read and parse a page snapshot from the given path
    pub fn from_file(path: &Path) -> Result<PageSnapshot> {
        tracing::debug!("Reading page snapshot from: {}", path.display());

        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let snapshot: PageSnapshot = serde_json::from_reader(reader)?;

        tracing::info!("Parsed page snapshot for {}", snapshot.url);

        Ok(snapshot)
    }

    /// Parse a page snapshot from a JSON string
    pub fn from_str(content: &str) -> Result<PageSnapshot> {
        tracing::debug!("Parsing page snapshot from string");

        let snapshot: PageSnapshot = serde_json::from_str(content)?;
        Ok(snapshot)
    }

    /// Write a snapshot as pretty JSON
    pub fn to_file(snapshot: &PageSnapshot, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(snapshot)?;
        std::fs::write(path, json)?;
        tracing::debug!("Wrote page snapshot to {}", path.display());
        Ok(())
    }

    /// Validate that a snapshot is well-formed
    pub fn validate(snapshot: &PageSnapshot) -> Result<()> {
        tracing::debug!("Validating page snapshot");

        if snapshot.url.trim().is_empty() {
            return Err(Error::InvalidSnapshot("Missing page URL".to_string()));
        }

        if snapshot.viewport.width <= 0.0 || snapshot.viewport.height <= 0.0 {
            return Err(Error::InvalidSnapshot(format!(
                "Viewport must have a positive size, got {}x{}",
                snapshot.viewport.width, snapshot.viewport.height
            )));
        }

        let mut stack: Vec<&NodeSnapshot> = vec![&snapshot.root];
        let mut count = 0usize;
        while let Some(node) = stack.pop() {
            count += 1;
            if node.tag.trim().is_empty() {
                return Err(Error::InvalidSnapshot(format!(
                    "Element {} has an empty tag name",
                    count
                )));
            }
            stack.extend(node.children.iter());
            if let Some(shadow) = &node.shadow_root {
                stack.extend(shadow.iter());
            }
        }

        tracing::debug!("Page snapshot is valid ({} elements)", count);
        Ok(())
    }
}
