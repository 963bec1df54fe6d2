use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use crossterm::cursor;
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture};
use crossterm::terminal;
use directories::ProjectDirs;
use nightpdf_core::validate::read_input;
use nightpdf_core::{
    Command, DecodeService, DocumentSession, FilePreferenceStore, Intake, PreferenceStore,
    SearchState, Theme, ThemeSetting, Viewer, ViewerConfig, ViewerEvent, Viewport,
};
use nightpdf_render::{
    compose_frame, composite_surfaces, export_pdf, rail_hit, rail_slots, rail_width,
    spawn_pipeline, PdfiumDecodeService, ThumbnailCache, ViewportRenderer, DOWNLOAD_FILE_NAME,
};
use nightpdf_tty::{
    write_status_line, CellGeometry, DrawParams, EventMapper, KittyRenderer, UiEvent,
};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{prelude::*, EnvFilter};

#[derive(Debug, Parser)]
#[command(
    name = "nightpdf",
    version,
    about = "Night-mode PDF converter and kitty-native viewer"
)]
struct Args {
    /// Status line theme; remembered for later runs
    #[arg(long, value_enum)]
    theme: Option<ThemeArg>,

    /// Configuration file (defaults to config.toml in the platform config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Mode,
}

#[derive(Debug, Subcommand)]
enum Mode {
    /// Invert every page and write the result as an image-only PDF
    Convert {
        file: PathBuf,
        #[arg(short, long, default_value = DOWNLOAD_FILE_NAME)]
        output: PathBuf,
    },
    /// Open the inverted document in the terminal viewer
    View { file: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ThemeArg {
    Dark,
    Light,
}

impl From<ThemeArg> for Theme {
    fn from(value: ThemeArg) -> Self {
        match value {
            ThemeArg::Dark => Theme::Dark,
            ThemeArg::Light => Theme::Light,
        }
    }
}

const IDLE_POLL: Duration = Duration::from_millis(100);
const ANIMATION_FRAME: Duration = Duration::from_millis(16);

struct RawModeGuard;

impl RawModeGuard {
    fn new() -> anyhow::Result<Self> {
        terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        crossterm::execute!(stdout, EnableMouseCapture, cursor::Hide)?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let mut stdout = io::stdout();
        let _ = crossterm::execute!(stdout, DisableMouseCapture, cursor::Show);
        let _ = terminal::disable_raw_mode();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let project_dirs = ProjectDirs::from("net", "nightpdf", "nightpdf")
        .ok_or_else(|| anyhow!("unable to resolve platform data directories"))?;
    let console = matches!(args.command, Mode::Convert { .. });
    let _log_guard = init_logging(&project_dirs, console)?;

    let config = match args.config.clone().or_else(ViewerConfig::default_path) {
        Some(path) => ViewerConfig::load(&path)?,
        None => ViewerConfig::default(),
    };

    let state_dir = project_dirs.data_local_dir().join("state");
    let store: Arc<dyn PreferenceStore> = Arc::new(FilePreferenceStore::new(state_dir)?);
    let mut theme = ThemeSetting::load(store)?;
    if let Some(choice) = args.theme {
        theme.set(choice.into())?;
    }

    match args.command {
        Mode::Convert { file, output } => convert(&file, &output, &config).await,
        Mode::View { file } => view(&file, &config, theme).await,
    }
}

fn print_progress(intake: &Intake) {
    if let Some(label) = intake.progress_label() {
        let mut stderr = io::stderr();
        let _ = write!(stderr, "\r{label}");
        let _ = stderr.flush();
    }
}

/// Validates `path` and runs it through the pipeline.
async fn process_document(path: &Path, config: &ViewerConfig) -> Result<DocumentSession> {
    let bytes = read_input(path, config.max_file_size)?;
    let service: Arc<dyn DecodeService> =
        Arc::new(PdfiumDecodeService::new(config.pdfium_library.as_deref())?);
    let handle = spawn_pipeline(service, bytes, config.render_scale)?;
    let run = handle.run_id();

    let mut intake = Intake::new();
    let result = handle.finish(&mut intake, print_progress).await;
    eprintln!();
    let session = result.with_context(|| format!("failed to process {}", path.display()))?;
    info!(%run, pages = session.page_count(), "document ready");
    Ok(session)
}

async fn convert(path: &Path, output: &Path, config: &ViewerConfig) -> Result<()> {
    let session = process_document(path, config).await?;
    let surfaces = composite_surfaces(&session, 1.0, &SearchState::new());
    let bytes = export_pdf(&surfaces, config.export_page_width)?;
    fs::write(output, &bytes).with_context(|| format!("failed to write {:?}", output))?;
    info!(output = %output.display(), pages = session.page_count(), "conversion finished");
    Ok(())
}

/// Terminal size split into the image area and the status row below it.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Screen {
    columns: u16,
    rows: u16,
    geometry: CellGeometry,
}

impl Screen {
    fn measure(thumbnail_width: u32) -> Result<Self> {
        let (columns, rows, width, height) = match terminal::window_size() {
            Ok(window) => (window.columns, window.rows, window.width, window.height),
            Err(_) => {
                let (columns, rows) = terminal::size()?;
                (columns, rows, 0, 0)
            }
        };
        Ok(Self::new(columns, rows, width, height, thumbnail_width))
    }

    fn new(columns: u16, rows: u16, width: u16, height: u16, thumbnail_width: u32) -> Self {
        let geometry = CellGeometry::from_window(columns, rows, width, height)
            .with_rail_width(rail_width(thumbnail_width));
        Self {
            columns,
            rows,
            geometry,
        }
    }

    fn image_rows(&self) -> u16 {
        self.rows.saturating_sub(1).max(1)
    }

    fn status_row(&self) -> u16 {
        self.rows.saturating_sub(1)
    }

    fn viewport(&self) -> Viewport {
        let page_columns = self.columns.saturating_sub(self.geometry.rail_columns);
        Viewport::new(
            page_columns as f32 * self.geometry.cell_width,
            self.image_rows() as f32 * self.geometry.cell_height,
        )
    }
}

fn format_status(viewer: &Viewer, pending: Option<&str>, notice: Option<&str>) -> String {
    let state = viewer.state();
    let mut parts = vec![
        format!("Page {} of {}", state.current_page, viewer.page_count()),
        format!("{:.0}%", state.zoom * 100.0),
    ];
    let search = viewer.search();
    match search.position() {
        Some((position, total)) => parts.push(format!("match {position}/{total}")),
        None if !search.query().is_empty() => parts.push("no matches".to_owned()),
        None => {}
    }
    parts.extend(pending.filter(|s| !s.is_empty()).map(str::to_owned));
    parts.extend(notice.map(str::to_owned));
    parts.join(" | ")
}

fn export_current(surfaces: &ViewportRenderer, config: &ViewerConfig) -> Result<String> {
    let bytes = export_pdf(surfaces.surfaces(), config.export_page_width)?;
    fs::write(DOWNLOAD_FILE_NAME, &bytes)
        .with_context(|| format!("failed to write {DOWNLOAD_FILE_NAME}"))?;
    info!(bytes = bytes.len(), "exported {}", DOWNLOAD_FILE_NAME);
    Ok(format!("saved {DOWNLOAD_FILE_NAME}"))
}

async fn view(path: &Path, config: &ViewerConfig, mut theme: ThemeSetting) -> Result<()> {
    let session = process_document(path, config).await?;
    let thumbnails = ThumbnailCache::build(&session, config.thumbnail_width);

    let _raw = RawModeGuard::new()?;
    let mut screen = Screen::measure(config.thumbnail_width)?;
    let mut viewer = Viewer::new(
        &session,
        config,
        screen.viewport(),
        rail_slots(thumbnails.as_slice(), screen.viewport().height as u32),
    );
    let mut surfaces = ViewportRenderer::new();
    surfaces.refresh(&session, viewer.state().zoom, viewer.search());

    let mut mapper = EventMapper::new();
    mapper.set_geometry(screen.geometry);
    let mut renderer = KittyRenderer::new(io::stdout());
    renderer.clear_all()?;

    let mut notice: Option<String> = None;
    let mut frame_dirty = true;
    let mut status_dirty = true;

    loop {
        if viewer.tick() {
            frame_dirty = true;
        }
        if frame_dirty {
            let frame = compose_frame(
                &viewer,
                surfaces.surfaces(),
                thumbnails.as_slice(),
                screen.geometry.rail_pixels(),
            );
            renderer.begin_sync_update()?;
            {
                let mut writer = renderer.writer();
                crossterm::queue!(&mut writer, cursor::MoveTo(0, 0))?;
            }
            renderer.draw(
                &frame,
                DrawParams::clamped(screen.columns as u32, screen.image_rows() as u32),
            )?;
            renderer.end_sync_update()?;
            frame_dirty = false;
            status_dirty = true;
        }
        if status_dirty {
            let pending = mapper.pending_input();
            let status = format_status(&viewer, pending.as_deref(), notice.as_deref());
            write_status_line(renderer.writer(), screen.status_row(), &status, theme.current())?;
            status_dirty = false;
        }

        let timeout = if viewer.is_animating() {
            ANIMATION_FRAME
        } else {
            IDLE_POLL
        };
        if !event::poll(timeout)? {
            continue;
        }
        let ui_event = mapper.map_event(event::read()?);
        status_dirty = true;
        match ui_event {
            UiEvent::Quit => break,
            UiEvent::None
            | UiEvent::BeginSearch
            | UiEvent::SearchQueryChanged { .. }
            | UiEvent::SearchCancel => {}
            UiEvent::Command(command) => viewer.apply(command),
            UiEvent::SearchSubmit { query } => viewer.apply(Command::Search { query }),
            UiEvent::ScrollBy { dx, dy } => {
                let state = *viewer.state();
                viewer.apply(Command::Scroll {
                    x: state.scroll_x + dx,
                    y: state.scroll_y + dy,
                });
            }
            UiEvent::RailClicked { y } => {
                if let Some(index) = rail_hit(&viewer, thumbnails.as_slice(), y) {
                    viewer.apply(Command::ThumbnailClicked { page: index + 1 });
                }
            }
            UiEvent::Resized { .. } => {
                screen = Screen::measure(config.thumbnail_width)?;
                mapper.set_geometry(screen.geometry);
                let viewport = screen.viewport();
                viewer.apply(Command::Resize {
                    width: viewport.width,
                    height: viewport.height,
                });
                viewer.set_rail_slots(rail_slots(thumbnails.as_slice(), viewport.height as u32));
                renderer.clear_all()?;
                frame_dirty = true;
            }
            UiEvent::Export => {
                notice = Some(export_current(&surfaces, config).unwrap_or_else(|err| {
                    warn!(error = %err, "export failed");
                    format!("export failed: {err:#}")
                }));
            }
            UiEvent::ToggleTheme => {
                if let Err(err) = theme.set(theme.current().toggled()) {
                    warn!(error = %err, "failed to store theme preference");
                }
            }
        }

        for viewer_event in viewer.drain_events() {
            if viewer_event == ViewerEvent::Recomposite {
                surfaces.refresh(&session, viewer.state().zoom, viewer.search());
            }
            frame_dirty = true;
        }
    }

    renderer.clear_all()?;
    Ok(())
}

fn init_logging(project_dirs: &ProjectDirs, console: bool) -> Result<WorkerGuard> {
    let log_dir = project_dirs.data_local_dir().join("logs");
    fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::never(log_dir, "nightpdf.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(file_writer);
    // The viewer owns the terminal, so only batch conversion logs to stderr.
    let console_layer = console.then(|| tracing_subscriber::fmt::layer().with_writer(io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|err| anyhow!(err))?;

    Ok(guard)
}
