//! # Receiptsmith CLI
//!
//! Command-line interface for the receipt builder engine.
//!
//! ## Usage
//!
//! ```bash
//! # Render the example receipt to a PNG
//! receiptsmith demo --output receipt.png
//!
//! # Render a saved template config
//! receiptsmith preview --config walmart.json --output walmart.png
//!
//! # Export at a print quality (watermarked when not subscribed)
//! receiptsmith export --config walmart.json --quality hd --output walmart-hd.png
//!
//! # Serve the HTTP API
//! receiptsmith serve --listen 0.0.0.0:8080
//! ```

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use receiptsmith::{
    editor::EditorSession,
    export::{self, ExportOutcome, Quality},
    render::render_receipt,
    server::{serve, ServerConfig},
    template::TemplateConfig,
    ReceiptError,
};

/// Receiptsmith - receipt builder and export utility
#[derive(Parser, Debug)]
#[command(name = "receiptsmith")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render the built-in example receipt
    Demo {
        /// Output PNG path
        #[arg(long, default_value = "receipt.png")]
        output: PathBuf,
    },
    /// Render a template config to a preview PNG
    Preview {
        /// Template config JSON file
        #[arg(long)]
        config: PathBuf,

        /// Output PNG path
        #[arg(long, default_value = "preview.png")]
        output: PathBuf,
    },
    /// Export a template config at a quality preset
    Export {
        /// Template config JSON file
        #[arg(long)]
        config: PathBuf,

        /// Quality preset: preview, standard, hd
        #[arg(long, default_value = "preview")]
        quality: String,

        /// Treat the export as subscribed (no watermark, PRO presets allowed)
        #[arg(long)]
        subscribed: bool,

        /// Output PNG path
        #[arg(long, default_value = "export.png")]
        output: PathBuf,
    },
    /// Serve the HTTP preview/export API
    Serve {
        /// Listen address
        #[arg(long, default_value = "0.0.0.0:8080")]
        listen: String,
    },
}

#[tokio::main]
async fn main() {
    env_logger::init();
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), ReceiptError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Demo { output } => {
            let mut session = EditorSession::new();
            session.load_defaults();
            let png = render_receipt(session.sections(), session.current_receipt_width)?;
            fs::write(&output, png)?;
            println!("Wrote {}", output.display());
        }
        Commands::Preview { config, output } => {
            let session = load_session(&config)?;
            let png = render_receipt(session.sections(), session.current_receipt_width)?;
            fs::write(&output, png)?;
            println!("Wrote {}", output.display());
        }
        Commands::Export {
            config,
            quality,
            subscribed,
            output,
        } => {
            let quality = Quality::parse(&quality)
                .ok_or_else(|| ReceiptError::Validation(vec![format!("unknown quality '{}'", quality)]))?;
            let session = load_session(&config)?;
            match export::export_image(
                session.sections(),
                session.current_receipt_width,
                quality,
                subscribed,
            )? {
                ExportOutcome::Image(png) => {
                    fs::write(&output, png)?;
                    println!("Wrote {}", output.display());
                }
                ExportOutcome::RedirectToPricing => {
                    eprintln!("{:?} quality needs a subscription; pass --subscribed", quality);
                    std::process::exit(2);
                }
                ExportOutcome::Pdf(_) => unreachable!("image export never yields a PDF"),
            }
        }
        Commands::Serve { listen } => {
            serve(ServerConfig {
                listen_addr: listen,
            })
            .await?;
        }
    }

    Ok(())
}

fn load_session(path: &PathBuf) -> Result<EditorSession, ReceiptError> {
    let raw = fs::read_to_string(path)?;
    let config: TemplateConfig = serde_json::from_str(&raw)?;
    let mut session = EditorSession::new();
    session.load_template(&config);
    Ok(session)
}
