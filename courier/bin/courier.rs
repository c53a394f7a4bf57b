//! Command-line front end for sending a single message
//!
//! ```text
//! courier send --to a@example.com --subject "Hello" --raw "Hi there"
//! courier send --to a@example.com --subject "Welcome" \
//!     --view emails.welcome --text-view emails.welcome_text \
//!     --data '{"name": "Ada"}'
//! ```

use std::{path::PathBuf, sync::Arc};

use clap::{Args, Parser, Subcommand};
use courier::{
    Address, ContentSpec, MailConfig, Mailer, Renderer, TeraRenderer, ViewData, logging,
};

/// Send mail through the configured driver
#[derive(Parser, Debug)]
#[command(name = "courier")]
#[command(about = "Send mail through SMTP, sendmail, HTTP APIs or a log file", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the configuration file (defaults to COURIER_CONFIG, then
    /// ./courier.config.ron, then /etc/courier/courier.config.ron)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send one message
    Send(SendArgs),
}

#[derive(Args, Debug)]
struct SendArgs {
    /// Recipient, may be given more than once
    #[arg(long, required = true)]
    to: Vec<String>,

    #[arg(long)]
    subject: String,

    /// Send this text as is
    #[arg(long, conflicts_with_all = ["view", "text_view"], required_unless_present = "view")]
    raw: Option<String>,

    /// HTML view
    #[arg(long)]
    view: Option<String>,

    /// Plain text view sent alongside the HTML view
    #[arg(long, requires = "view")]
    text_view: Option<String>,

    /// View data, as a JSON object
    #[arg(long)]
    data: Option<String>,

    /// Driver to use instead of the configured one
    #[arg(long)]
    driver: Option<String>,
}

impl SendArgs {
    fn content(&self) -> anyhow::Result<ContentSpec> {
        match (&self.raw, &self.view, &self.text_view) {
            (Some(raw), _, _) => Ok(ContentSpec::raw(raw.clone())),
            (None, Some(view), Some(text)) => Ok(ContentSpec::from((view.clone(), text.clone()))),
            (None, Some(view), None) => Ok(ContentSpec::from(view.clone())),
            (None, None, _) => anyhow::bail!("Either --raw or --view is required"),
        }
    }

    fn data(&self) -> anyhow::Result<ViewData> {
        self.data.as_deref().map_or_else(
            || Ok(ViewData::new()),
            |data| {
                serde_json::from_str(data)
                    .map_err(|err| anyhow::anyhow!("--data must be a JSON object: {err}"))
            },
        )
    }

    fn recipients(&self) -> anyhow::Result<Vec<Address>> {
        self.to
            .iter()
            .map(|to| {
                to.parse::<Address>()
                    .map_err(|err| anyhow::anyhow!("Invalid recipient '{to}': {err}"))
            })
            .collect()
    }
}

fn renderer(config: &MailConfig) -> anyhow::Result<Arc<dyn Renderer>> {
    Ok(match &config.views {
        Some(dir) => Arc::new(TeraRenderer::new(dir)?),
        None => Arc::new(TeraRenderer::default()),
    })
}

async fn send(config: MailConfig, args: SendArgs) -> anyhow::Result<()> {
    let content = args.content()?;
    let data = args.data()?;
    let recipients = args.recipients()?;

    let renderer = renderer(&config)?;
    let mailer = Mailer::from_config(config, renderer);
    if let Some(driver) = &args.driver {
        mailer.set_driver(driver.clone());
    }

    let subject = args.subject;
    let failed = mailer
        .send(content, data, move |message| {
            for recipient in recipients {
                message.to_address(recipient);
            }
            message.subject(subject);
        })
        .await?;

    if failed.is_empty() {
        println!("Sent via {}", mailer.driver());
        return Ok(());
    }

    eprintln!("The following recipients were rejected:");
    for address in &failed {
        eprintln!("  - {address}");
    }
    anyhow::bail!("{} recipient(s) rejected", failed.len())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init();

    let config = match &cli.config {
        Some(path) => MailConfig::from_file(path)?,
        None => MailConfig::load()?,
    };

    match cli.command {
        Commands::Send(args) => send(config, args).await,
    }
}
