//! List command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::vector_store::create_vector_store;
use anyhow::Result;

/// Run the list command.
pub async fn run_list(settings: Settings) -> Result<()> {
    let store = create_vector_store(&settings)?;

    match store.list_sources().await {
        Ok(sources) => {
            if sources.is_empty() {
                Output::info("Nothing indexed yet. Use 'mosaic ingest <file>' or 'mosaic populate' to add content.");
            } else {
                Output::header(&format!("Indexed Sources ({})", sources.len()));
                println!();

                for source in &sources {
                    Output::source_info(source);
                }

                let text: u32 = sources.iter().map(|s| s.text_units).sum();
                let images: u32 = sources.iter().map(|s| s.image_units).sum();
                println!();
                Output::kv("Total sources", &sources.len().to_string());
                Output::kv("Text units", &text.to_string());
                Output::kv("Image units", &images.to_string());
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to list sources: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
