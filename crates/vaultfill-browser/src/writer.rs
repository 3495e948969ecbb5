use crate::page::FieldDriver;
use crate::Result;
use std::time::Duration;
use vaultfill_core::dom::SyntheticEvent;
use vaultfill_core::NodeId;

/// Events dispatched after the value is written, in order, all bubbling
const WRITE_EVENTS: [SyntheticEvent; 4] = [
    SyntheticEvent::Input,
    SyntheticEvent::Change,
    SyntheticEvent::InputEvent,
    SyntheticEvent::Blur,
];

/// Writes values into page fields so host frameworks register them
#[derive(Debug, Clone, Copy)]
pub struct FieldWriter {
    blur_delay: Duration,
}

impl FieldWriter {
    pub fn new(blur_delay: Duration) -> Self {
        Self { blur_delay }
    }

    /// Focus, write natively, announce the change and blur after a short
    /// delay. Any failure along the way is logged and reported as `false`.
    pub async fn set_field_value<D>(&self, driver: &mut D, field: NodeId, value: &str) -> bool
    where
        D: FieldDriver + ?Sized,
    {
        match self.write(driver, field, value).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to set value of {}: {}", field, e);
                false
            }
        }
    }

    async fn write<D>(&self, driver: &mut D, field: NodeId, value: &str) -> Result<()>
    where
        D: FieldDriver + ?Sized,
    {
        driver.focus(field).await?;
        driver.set_native_value(field, value).await?;

        for event in WRITE_EVENTS {
            driver.dispatch(field, event, true).await?;
        }

        tokio::time::sleep(self.blur_delay).await;
        driver.blur(field).await?;

        tracing::debug!("Wrote {} chars into {}", value.chars().count(), field);
        Ok(())
    }
}

impl Default for FieldWriter {
    fn default() -> Self {
        Self::new(Duration::from_millis(50))
    }
}
