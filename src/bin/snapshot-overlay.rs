use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use snapshot_overlay::{
    CameraProfile, FontCatalog, FontResolver, RenderTimeouts, SnapshotRenderer, StatesTemplate,
    StaticSource,
};

#[derive(Parser, Debug)]
#[command(name = "snapshot-overlay", version)]
/// Render an annotated snapshot from an image file.
struct Cli {
    /// Source image (any format the image crate can decode).
    #[arg(long)]
    input: PathBuf,

    /// Camera settings JSON, as persisted by the host.
    #[arg(long)]
    config: PathBuf,

    /// JSON object mapping entity ids to their current state.
    #[arg(long)]
    states: Option<PathBuf>,

    /// Directory holding the bundled font files.
    #[arg(long, default_value = "fonts")]
    fonts_dir: PathBuf,

    /// Output JPEG path.
    #[arg(long)]
    output: PathBuf,

    /// Log stage transitions and font loading.
    #[arg(long, short, default_value_t = false)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .init();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("start runtime")?;
    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let profile_json = std::fs::read_to_string(&cli.config)
        .with_context(|| format!("read config '{}'", cli.config.display()))?;
    let config = CameraProfile::from_json(&profile_json)
        .with_context(|| format!("parse config '{}'", cli.config.display()))?
        .into_config();

    let states = match &cli.states {
        Some(path) => read_states(path)?,
        None => HashMap::new(),
    };

    let source = StaticSource(
        std::fs::read(&cli.input)
            .with_context(|| format!("read input '{}'", cli.input.display()))?,
    );

    let fonts = Arc::new(FontResolver::new(FontCatalog::from_dir(&cli.fonts_dir)));
    let snapshot = SnapshotRenderer::new(fonts)
        .with_timeouts(RenderTimeouts::recommended())
        .render(&source, &config, &states, &StatesTemplate)
        .await
        .context("render snapshot")?;

    if let Some(parent) = cli.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&cli.output, &snapshot.bytes)
        .with_context(|| format!("write jpeg '{}'", cli.output.display()))?;

    eprintln!(
        "wrote {} ({}x{})",
        cli.output.display(),
        snapshot.width,
        snapshot.height
    );
    Ok(())
}

/// Reads `{"entity.id": "state", ...}`; non-string states are stringified.
fn read_states(path: &Path) -> anyhow::Result<HashMap<String, String>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("read states '{}'", path.display()))?;
    let raw: HashMap<String, serde_json::Value> = serde_json::from_str(&json)
        .with_context(|| format!("parse states '{}'", path.display()))?;

    Ok(raw
        .into_iter()
        .map(|(entity, state)| {
            let state = match state {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            (entity, state)
        })
        .collect())
}
