use std::fs::File;
use std::sync::Arc;

use clap::Parser;
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use unitnav::api::{FilterParams, HttpUnitSource, UnitId};
use unitnav::core::config;
use unitnav::core::window::UnitWindow;
use unitnav::navigator::{NavEvent, Navigator, TerminalView, parse_command};

#[derive(Parser)]
#[command(name = "unitnav", about = "Step through translation units on a review server")]
struct Args {
    /// Server root, e.g. http://localhost:8000
    #[arg(long)]
    base_url: Option<String>,

    /// Translation path to browse, e.g. /fr/project/
    #[arg(long)]
    path: String,

    /// Server-side filter name (e.g. "incomplete", "checks")
    #[arg(long)]
    filter: Option<String>,

    /// Search text
    #[arg(long)]
    search: Option<String>,

    /// Unit to open first
    #[arg(long)]
    unit: Option<u64>,
}

const HELP: &str = "commands: n/next, p/prev, g <id>, pos <n>, ctx, hover <id>, unhover, \
                    filter <name>, search <text>, q/quit";

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    // Initialize file logger - writes to unitnav.log in current directory
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();

    if let Ok(log_file) = File::create("unitnav.log") {
        let _ = WriteLogger::init(LevelFilter::Debug, log_config, log_file);
    }

    let file_config = config::load_config().unwrap_or_else(|e| {
        eprintln!("Warning: {e}, using defaults");
        log::warn!("Falling back to default config: {}", e);
        config::UnitnavConfig::default()
    });
    let resolved = config::resolve(&file_config, args.base_url.as_deref());
    log::info!("unitnav starting up against {}", resolved.base_url);

    let source = Arc::new(HttpUnitSource::new(
        Some(resolved.base_url.clone()),
        resolved.session_id.clone(),
    ));
    let navigator = Navigator::new(
        UnitWindow::new(resolved.window),
        source,
        TerminalView::stdout(),
        resolved.hover_delay,
    );

    let initial = FilterParams {
        filter: args.filter,
        search: args.search,
        uid: args.unit.map(UnitId),
        ..FilterParams::for_path(args.path)
    };

    let (tx, rx) = mpsc::channel(32);
    if tx.send(NavEvent::FilterChanged(initial.clone())).await.is_err() {
        return Ok(());
    }

    println!("{HELP}");
    tokio::spawn(async move {
        let mut filter = initial;
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    log::warn!("Failed to read stdin: {}", e);
                    break;
                }
            };
            let event = match parse_command(&line, &filter) {
                Ok(event) => event,
                Err(e) => {
                    println!("{e}\n{HELP}");
                    continue;
                }
            };
            if let NavEvent::FilterChanged(ref next) = event {
                filter = next.clone();
            }
            let quit = event == NavEvent::Quit;
            if tx.send(event).await.is_err() || quit {
                break;
            }
        }
    });

    navigator.run(rx).await;
    Ok(())
}
