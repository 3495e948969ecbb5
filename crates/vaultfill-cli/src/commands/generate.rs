use crate::OutputFormat;
use anyhow::Result;
use serde::Serialize;
use vaultfill_browser::{PasswordGenerator, PasswordOptions};

#[derive(Debug, Serialize)]
pub struct GeneratedPasswords {
    pub length: usize,
    pub passwords: Vec<String>,
}

pub fn generate_passwords(options: &PasswordOptions, count: usize) -> Result<GeneratedPasswords> {
    let generator = PasswordGenerator::new();
    let passwords = (0..count)
        .map(|_| generator.generate(options))
        .collect::<vaultfill_browser::Result<Vec<_>>>()?;

    Ok(GeneratedPasswords {
        length: options.clamped_length(),
        passwords,
    })
}

pub fn execute(options: PasswordOptions, count: usize, format: OutputFormat) -> Result<()> {
    if options.length != options.clamped_length() {
        tracing::info!(
            "Length {} out of range, using {}",
            options.length,
            options.clamped_length()
        );
    }

    let generated = generate_passwords(&options, count)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&generated)?),
        OutputFormat::Table => {
            println!("Index,Password");
            for (index, password) in generated.passwords.iter().enumerate() {
                println!("{},{}", index + 1, password);
            }
        }
        OutputFormat::Pretty => {
            for password in &generated.passwords {
                println!("{}", password);
            }
        }
    }

    Ok(())
}
