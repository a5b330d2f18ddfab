//! Skywrite command line
//!
//! Posts text, with optional images, to a Bluesky PDS.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Parser;
use skywrite::pds_client::DEFAULT_PDS;
use skywrite::{Client, ImageAttachment};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// PDS host to talk to
    #[arg(long, env = "SKYWRITE_PDS", default_value = DEFAULT_PDS)]
    pds: String,

    /// Handle or email to log in with
    #[arg(long, env = "SKYWRITE_IDENTIFIER", requires = "password")]
    identifier: Option<String>,

    /// App password for the account
    #[arg(long, env = "SKYWRITE_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Resume from a refresh JWT instead of logging in
    #[arg(
        long,
        env = "SKYWRITE_REFRESH_JWT",
        hide_env_values = true,
        conflicts_with = "identifier"
    )]
    refresh_jwt: Option<String>,

    /// Image to attach; may be given up to four times
    #[arg(long = "image", value_name = "PATH")]
    images: Vec<PathBuf>,

    /// Alt text for the image at the same position
    #[arg(long = "alt", value_name = "TEXT")]
    alts: Vec<String>,

    /// Post text
    text: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if cli.alts.len() > cli.images.len() {
        bail!(
            "{} alt texts given for {} images",
            cli.alts.len(),
            cli.images.len()
        );
    }

    let images = cli
        .images
        .iter()
        .enumerate()
        .map(|(i, path)| {
            let alt = cli.alts.get(i).cloned().unwrap_or_default();
            load_image(path).map(|image| image.with_alt(alt))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let mut client = match (&cli.refresh_jwt, &cli.identifier, &cli.password) {
        (Some(refresh_jwt), _, _) => Client::from_refresh_jwt(refresh_jwt, Some(&cli.pds))
            .await
            .context("failed to resume session")?,
        (None, Some(identifier), Some(password)) => {
            Client::from_app_password(identifier, password, Some(&cli.pds))
                .await
                .context("failed to log in")?
        }
        _ => bail!("either --refresh-jwt or --identifier with --password is required"),
    };
    info!(handle = %client.handle(), pds = %client.pds(), "logged in");

    let post = client
        .post(&cli.text, images)
        .await
        .context("failed to create post")?;

    println!("{}", post.http_uri());
    println!("refresh_jwt: {}", client.refresh_jwt());

    Ok(())
}

/// Read an image file and sniff its media type from the content
fn load_image(path: &Path) -> anyhow::Result<ImageAttachment> {
    let data = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;

    let kind = infer::get(&data)
        .with_context(|| format!("unknown file type: {}", path.display()))?;
    if kind.matcher_type() != infer::MatcherType::Image {
        bail!("{} is {}, not an image", path.display(), kind.mime_type());
    }

    Ok(ImageAttachment::new(data, kind.mime_type()))
}
