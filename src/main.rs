use std::env;

use anyhow::anyhow;
use tokio::sync::mpsc;

use lectern::core::library::title_from_filename;
use lectern::{PlaybackEvent, Reader, ReaderConfig, StopReason};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let mut args = env::args();
    let _ = args.next();
    let path = args
        .next()
        .ok_or_else(|| anyhow!("Usage: lectern <text-file>"))?;
    if let Some(extra) = args.next() {
        anyhow::bail!("Unexpected argument '{extra}'");
    }

    let text = tokio::fs::read_to_string(&path).await?;
    let title = title_from_filename(&path);

    let config = ReaderConfig::from_env()?;
    let reader = Reader::with_gemini(&config)?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    reader.on_event(move |event| {
        let tx = tx.clone();
        Box::pin(async move {
            let _ = tx.send(event);
        })
    });

    reader.import_text(title.clone(), &text).await?;
    let total = reader.paragraph_count();
    println!("Reading '{title}' ({total} paragraphs)");

    reader.play().await?;

    while let Some(event) = rx.recv().await {
        match event {
            PlaybackEvent::Paragraph { index } => {
                let text = reader
                    .active_content()
                    .and_then(|c| c.paragraph(index).map(str::to_string))
                    .unwrap_or_default();
                println!("[{}/{}] {}", index + 1, total, text);
            }
            PlaybackEvent::Buffering { index } => {
                println!("  ... buffering paragraph {}", index + 1);
            }
            PlaybackEvent::BufferingEnded { .. } => {}
            PlaybackEvent::Stopped { reason } => {
                match reason {
                    StopReason::EndOfContent => println!("Done."),
                    StopReason::LoadFailed { index } => {
                        eprintln!("Failed to load audio for paragraph {}", index + 1)
                    }
                    StopReason::Requested => println!("Stopped."),
                }
                break;
            }
        }
    }

    Ok(())
}
