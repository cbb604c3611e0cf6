//! Danmu TUI Entry Point
//!
//! Usage:
//!   danmu-tui [OPTIONS] --id <ID>
//!
//! Options:
//!   --source <SOURCE>          Video source (default: demo)
//!   --id <ID>                  Video id within the source
//!   --title <TITLE>            Video title, used for fallback captions
//!   --server-url <URL>         Caption server (default: http://127.0.0.1:3000)
//!   --config <PATH>            TOML config file
//!
//! Logs go to `$XDG_DATA_HOME/danmu/danmu-tui.log`; set `RUST_LOG` to change
//! the level.

use std::io;
use std::panic;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use ratatui::Terminal;
use tracing::info;

use danmu_core::config::{default_config_path, load_config_from_path, ConfigOverrides};
use danmu_core::store::default_store_dir;
use danmu_core::{system_clock, PerformanceTier};
use danmu_tui::{App, AppOptions};

/// Terminal danmu overlay
#[derive(Debug, Parser)]
#[command(name = "danmu-tui", version, about)]
struct Args {
    /// Video source
    #[arg(long, default_value = "demo")]
    source: String,

    /// Video id within the source
    #[arg(long)]
    id: String,

    /// Video title
    #[arg(long, default_value = "")]
    title: String,

    /// Caption server base URL
    #[arg(long)]
    server_url: Option<String>,

    /// TOML config file (default: ~/.config/danmu/danmu.toml)
    #[arg(long, env = "DANMU_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Check if we have a TTY before attempting initialization
    use std::io::IsTerminal;

    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        eprintln!("Error: danmu-tui requires a terminal (TTY)");
        eprintln!();
        eprintln!("This usually means:");
        eprintln!("  • Running in a non-interactive environment (CI, container)");
        eprintln!("  • SSH without -t flag");
        eprintln!("  • Piped stdin/stdout");
        std::process::exit(1);
    }

    init_logging();

    let mut config = load_config_from_path(args.config.clone().or_else(default_config_path))
        .await
        .context("Failed to load configuration")?;
    ConfigOverrides {
        server_url: args.server_url.clone(),
        ..ConfigOverrides::default()
    }
    .apply(&mut config)
    .context("Invalid command-line overrides")?;

    let options = AppOptions {
        source: args.source,
        id: args.id,
        title: args.title,
        server_url: config.server_url.clone(),
        store_dir: default_store_dir(),
        tier: PerformanceTier::detect(),
    };
    info!(
        source = %options.source,
        id = %options.id,
        server = %options.server_url,
        "Starting Danmu TUI"
    );

    // Set up panic hook to restore terminal
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        // Restore terminal before printing panic
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    // Run the app
    let result = run_app(&mut terminal, options).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    // Propagate any errors
    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    options: AppOptions,
) -> anyhow::Result<()> {
    let size = terminal.size()?;
    let area = Rect::new(0, 0, size.width, size.height);

    let mut app = App::new(options, area, system_clock()).await;
    app.run(terminal).await?;

    info!("Danmu TUI stopped");
    Ok(())
}

/// Log to a file under the data directory; stderr belongs to the terminal UI
fn init_logging() {
    let Some(dir) = dirs::data_dir().map(|d| d.join("danmu")) else {
        return;
    };
    if std::fs::create_dir_all(&dir).is_err() {
        return;
    }
    let Ok(file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("danmu-tui.log"))
    else {
        return;
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("danmu_tui=info,danmu_core=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .init();
}
