use std::fs::File;
use std::io::stdout;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use ratatui::DefaultTerminal;
use ratatui::crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use ratatui::crossterm::execute;
use tracing::{info, warn};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod comparers;
mod controller;
mod domain;
mod drawer;
mod entry;
mod inputter;
mod loader;
mod model;
mod table;
mod ui;
mod view;

use controller::Controller;
use domain::{TableConfig, TableError, ViewerConfig};
use drawer::{Color, Skin};
use entry::ServerRecord;
use model::{Model, Status};
use ui::TableUI;

/// Browse a ClassiCube server list in the terminal and pick a server.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Server list to show (CSV, Parquet or Arrow IPC)
    path: String,

    /// Only show servers whose name contains this text
    #[arg(short, long)]
    filter: Option<String>,

    /// Draw the scrollbar in the classic grey colours
    #[arg(long)]
    classic: bool,

    /// Background colour as RRGGBB
    #[arg(long)]
    back_col: Option<String>,

    /// Separator and scrollbar track colour as RRGGBB
    #[arg(long)]
    border_col: Option<String>,

    /// Scrollbar thumb colour as RRGGBB
    #[arg(long)]
    active_col: Option<String>,

    #[arg(long, default_value = "servertable.log")]
    log_file: String,

    /// Event poll timeout in milliseconds
    #[arg(long, default_value_t = 100)]
    poll: u64,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Err(e) => {
            eprintln!("Error: {:?}", e);
            ExitCode::FAILURE
        }
        Ok(Some(server)) => {
            println!("{} {}", server.hash, server.ip);
            ExitCode::SUCCESS
        }
        Ok(None) => ExitCode::SUCCESS,
    }
}

fn expand(path: &str) -> Result<String, TableError> {
    shellexpand::full(path)
        .map(|p| p.into_owned())
        .map_err(|e| TableError::LoadingFailed(e.to_string()))
}

fn init_logging(log_file: &str) -> Result<(), TableError> {
    let file = File::create(expand(log_file)?)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(false),
        )
        .with(ErrorLayer::default())
        .init();
    Ok(())
}

fn override_color(target: &mut Color, value: Option<&str>, name: &str) {
    if let Some(hex) = value {
        match Color::parse_hex(hex) {
            Some(color) => *target = color,
            None => warn!("Ignoring invalid {} colour {:?}", name, hex),
        }
    }
}

fn build_config(args: &Args) -> Result<ViewerConfig, TableError> {
    let mut skin = Skin::default();
    override_color(&mut skin.background, args.back_col.as_deref(), "background");
    override_color(&mut skin.button_border, args.border_col.as_deref(), "border");
    override_color(&mut skin.button_fore_active, args.active_col.as_deref(), "active");

    Ok(ViewerConfig {
        path: PathBuf::from(expand(&args.path)?),
        event_poll_time: args.poll,
        initial_filter: args.filter.clone(),
        skin,
        table: TableConfig::default().with_classic_background(args.classic),
    })
}

fn run(args: Args) -> Result<Option<ServerRecord>, TableError> {
    init_logging(&args.log_file)?;
    let config = build_config(&args)?;
    info!("Starting servertable on {:?}", config.path);

    let servers = loader::load_servers(config.path.clone())?;
    let mut model = Model::init(&config, servers)?;
    let mut ui = TableUI::new();
    let mut controller = Controller::new(config.event_poll_time);

    let mut terminal = ratatui::init();
    let result = execute!(stdout(), EnableMouseCapture)
        .map_err(TableError::from)
        .and_then(|_| event_loop(&mut terminal, &mut model, &mut ui, &mut controller));
    let restored = execute!(stdout(), DisableMouseCapture);
    ratatui::restore();

    result?;
    restored?;
    Ok(model.connect_target().cloned())
}

fn event_loop(
    terminal: &mut DefaultTerminal,
    model: &mut Model,
    ui: &mut TableUI,
    controller: &mut Controller,
) -> Result<(), TableError> {
    while model.status != Status::QUITTING {
        if model.take_redraw() {
            terminal.draw(|f| ui.draw(model, f))?;
        }

        if let Some(message) = controller.handle_event(model)? {
            model.update(Some(message))?;
        }
    }
    Ok(())
}
