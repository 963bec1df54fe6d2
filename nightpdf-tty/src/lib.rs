use std::io::{self, Write};

use anyhow::Result;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use crossterm::{
    cursor,
    event::{Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind},
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use image::RgbaImage;
use nightpdf_core::{Command, Theme};
use png::{BitDepth, ColorType, Encoder};
use tracing::trace;

pub struct KittyRenderer<W: Write> {
    writer: W,
    image_id: u32,
    placement_id: u32,
}

pub struct DrawParams {
    pub columns: u32,
    pub rows: u32,
}

impl DrawParams {
    pub fn clamped(columns: u32, rows: u32) -> Self {
        Self {
            columns: columns.max(1),
            rows: rows.max(1),
        }
    }
}

impl<W: Write> KittyRenderer<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            image_id: 1,
            placement_id: 1,
        }
    }

    pub fn writer(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Transmits `frame` as PNG and places it over `params` cells, replacing the
    /// previous frame.
    pub fn draw(&mut self, frame: &RgbaImage, params: DrawParams) -> Result<()> {
        let (width, height) = frame.dimensions();
        let mut buffer = Vec::new();
        let mut encoder = Encoder::new(&mut buffer, width, height);
        encoder.set_color(ColorType::Rgba);
        encoder.set_depth(BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(frame.as_raw())?;
        writer.finish()?;

        let encoded = BASE64.encode(&buffer);
        let mut chunks = encoded.as_bytes().chunks(4096).peekable();
        let mut first = true;
        trace!(width, height, bytes = encoded.len(), "drawing frame");

        while let Some(chunk) = chunks.next() {
            let more = u8::from(chunks.peek().is_some());
            if first {
                write!(
                    self.writer,
                    "\u{1b}_Ga=T,f=100,C=1,q=2,i={},p={},c={},r={},s={},v={},z=-1,m={}",
                    self.image_id,
                    self.placement_id,
                    params.columns,
                    params.rows,
                    width,
                    height,
                    more
                )?;
                first = false;
            } else {
                write!(self.writer, "\u{1b}_Gm={},q=2", more)?;
            }
            if !chunk.is_empty() {
                self.writer.write_all(b";")?;
                self.writer.write_all(chunk)?;
            }
            write!(self.writer, "\u{1b}\\")?;
        }

        self.writer.flush()?;
        Ok(())
    }

    pub fn begin_sync_update(&mut self) -> Result<()> {
        write!(self.writer, "\u{1b}[?2026h")?;
        Ok(())
    }

    /// The terminal renders all buffered changes at once.
    pub fn end_sync_update(&mut self) -> Result<()> {
        write!(self.writer, "\u{1b}[?2026l")?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn clear_all(&mut self) -> Result<()> {
        crossterm::execute!(
            &mut self.writer,
            Clear(ClearType::All),
            cursor::MoveTo(0, 0)
        )?;
        Ok(())
    }
}

/// Pixel size of one terminal cell plus the columns taken by the thumbnail rail.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellGeometry {
    pub cell_width: f32,
    pub cell_height: f32,
    pub rail_columns: u16,
}

impl Default for CellGeometry {
    fn default() -> Self {
        Self {
            cell_width: Self::FALLBACK_CELL.0,
            cell_height: Self::FALLBACK_CELL.1,
            rail_columns: 0,
        }
    }
}

impl CellGeometry {
    const FALLBACK_CELL: (f32, f32) = (8.0, 16.0);

    /// Terminals that do not report their pixel size get a fixed cell size.
    pub fn from_window(columns: u16, rows: u16, width: u16, height: u16) -> Self {
        let measure = |pixels: u16, cells: u16, fallback: f32| {
            if pixels == 0 || cells == 0 {
                fallback
            } else {
                pixels as f32 / cells as f32
            }
        };
        Self {
            cell_width: measure(width, columns, Self::FALLBACK_CELL.0),
            cell_height: measure(height, rows, Self::FALLBACK_CELL.1),
            rail_columns: 0,
        }
    }

    pub fn with_rail_width(mut self, rail_pixels: u32) -> Self {
        self.rail_columns = (rail_pixels as f32 / self.cell_width).ceil() as u16;
        self
    }

    pub fn rail_pixels(&self) -> u32 {
        (self.rail_columns as f32 * self.cell_width) as u32
    }

    /// Page-area pixel position of a cell, or `None` inside the rail.
    fn page_point(&self, column: u16, row: u16) -> Option<(f32, f32)> {
        let column = column.checked_sub(self.rail_columns)?;
        Some((
            column as f32 * self.cell_width,
            row as f32 * self.cell_height,
        ))
    }
}

#[derive(Debug, Clone)]
pub enum UiEvent {
    Command(Command),
    /// Relative scroll in page-area pixels.
    ScrollBy { dx: f32, dy: f32 },
    /// Click inside the thumbnail rail, `y` in pixels from the top.
    RailClicked { y: f32 },
    Resized { columns: u16, rows: u16 },
    BeginSearch,
    SearchQueryChanged { query: String },
    SearchSubmit { query: String },
    SearchCancel,
    Export,
    ToggleTheme,
    Quit,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Normal,
    Search,
}

#[derive(Debug, Default)]
pub struct EventMapper {
    pending_count: Option<usize>,
    pending_digits: String,
    mode: InputMode,
    search_buffer: String,
    geometry: CellGeometry,
}

impl EventMapper {
    pub const PAN_STEP: f32 = 48.0;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_geometry(&mut self, geometry: CellGeometry) {
        self.geometry = geometry;
    }

    pub fn geometry(&self) -> CellGeometry {
        self.geometry
    }

    pub fn set_mode(&mut self, mode: InputMode) {
        if self.mode != mode {
            self.reset_count();
            self.search_buffer.clear();
            self.mode = mode;
        }
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn map_event(&mut self, event: Event) -> UiEvent {
        match event {
            Event::Resize(columns, rows) => UiEvent::Resized { columns, rows },
            Event::Mouse(mouse) => self.map_mouse(mouse),
            Event::FocusLost => UiEvent::Command(Command::PointerLeave),
            Event::Key(key) => match self.mode {
                InputMode::Normal => self.map_key_normal(key),
                InputMode::Search => self.map_key_search(key),
            },
            _ => UiEvent::None,
        }
    }

    fn map_mouse(&mut self, mouse: MouseEvent) -> UiEvent {
        let point = self.geometry.page_point(mouse.column, mouse.row);
        match (mouse.kind, point) {
            (MouseEventKind::Down(MouseButton::Left), Some((x, y))) => {
                UiEvent::Command(Command::PointerDown { x, y })
            }
            (MouseEventKind::Down(MouseButton::Left), None) => UiEvent::RailClicked {
                y: mouse.row as f32 * self.geometry.cell_height,
            },
            (MouseEventKind::Drag(MouseButton::Left), Some((x, y))) => {
                UiEvent::Command(Command::PointerMove { x, y })
            }
            // Dragging over the rail leaves the page area.
            (MouseEventKind::Drag(MouseButton::Left), None) => {
                UiEvent::Command(Command::PointerLeave)
            }
            (MouseEventKind::Up(MouseButton::Left), _) => UiEvent::Command(Command::PointerUp),
            (MouseEventKind::ScrollDown, _) => UiEvent::ScrollBy {
                dx: 0.0,
                dy: Self::PAN_STEP,
            },
            (MouseEventKind::ScrollUp, _) => UiEvent::ScrollBy {
                dx: 0.0,
                dy: -Self::PAN_STEP,
            },
            _ => UiEvent::None,
        }
    }

    fn map_key_normal(&mut self, key: KeyEvent) -> UiEvent {
        let KeyEvent {
            code, modifiers, ..
        } = key;
        match (code, modifiers) {
            (KeyCode::Char(c), KeyModifiers::NONE) if c.is_ascii_digit() => {
                if let Some(digit) = c.to_digit(10) {
                    self.push_digit(digit as usize);
                }
                UiEvent::None
            }
            (KeyCode::Char('g'), KeyModifiers::NONE) => {
                let page = self.take_count();
                UiEvent::Command(Command::GotoPage { page })
            }
            (KeyCode::Left, modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
                self.pan(-Self::PAN_STEP, 0.0)
            }
            (KeyCode::Right, modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
                self.pan(Self::PAN_STEP, 0.0)
            }
            (KeyCode::Up, modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
                self.pan(0.0, -Self::PAN_STEP)
            }
            (KeyCode::Down, modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
                self.pan(0.0, Self::PAN_STEP)
            }
            (KeyCode::Char('h'), KeyModifiers::NONE) => self.pan(-Self::PAN_STEP, 0.0),
            (KeyCode::Char('l'), KeyModifiers::NONE) => self.pan(Self::PAN_STEP, 0.0),
            (KeyCode::Char('K'), KeyModifiers::SHIFT) => self.pan(0.0, -Self::PAN_STEP),
            (KeyCode::Char('J'), KeyModifiers::SHIFT) => self.pan(0.0, Self::PAN_STEP),
            (KeyCode::Char('j'), KeyModifiers::NONE) | (KeyCode::Down, KeyModifiers::NONE) => {
                self.command(Command::NextPage)
            }
            (KeyCode::Char('k'), KeyModifiers::NONE) | (KeyCode::Up, KeyModifiers::NONE) => {
                self.command(Command::PrevPage)
            }
            (KeyCode::Char('+'), _) | (KeyCode::Char('='), _) => self.command(Command::ZoomIn),
            (KeyCode::Char('-'), _) => self.command(Command::ZoomOut),
            (KeyCode::Char('/'), KeyModifiers::NONE) => {
                self.set_mode(InputMode::Search);
                UiEvent::BeginSearch
            }
            (KeyCode::Char('n'), KeyModifiers::NONE) => self.command(Command::SearchNext),
            (KeyCode::Char('N'), modifiers)
                if modifiers.is_empty() || modifiers == KeyModifiers::SHIFT =>
            {
                self.command(Command::SearchPrev)
            }
            (KeyCode::Char('e'), KeyModifiers::NONE) => {
                self.reset_count();
                UiEvent::Export
            }
            (KeyCode::Char('d'), KeyModifiers::NONE) => {
                self.reset_count();
                UiEvent::ToggleTheme
            }
            (KeyCode::Char('q'), _) | (KeyCode::Esc, _) => {
                self.reset_count();
                UiEvent::Quit
            }
            (KeyCode::Char('c'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
                UiEvent::Quit
            }
            _ => {
                self.reset_count();
                UiEvent::None
            }
        }
    }

    fn map_key_search(&mut self, key: KeyEvent) -> UiEvent {
        match (key.code, key.modifiers) {
            (KeyCode::Esc, _) => {
                self.set_mode(InputMode::Normal);
                UiEvent::SearchCancel
            }
            (KeyCode::Enter, _) => {
                let query = std::mem::take(&mut self.search_buffer);
                self.set_mode(InputMode::Normal);
                UiEvent::SearchSubmit { query }
            }
            (KeyCode::Backspace, _) => {
                self.search_buffer.pop();
                UiEvent::SearchQueryChanged {
                    query: self.search_buffer.clone(),
                }
            }
            (KeyCode::Char(c), mods) if mods.is_empty() || mods == KeyModifiers::SHIFT => {
                self.search_buffer.push(c);
                UiEvent::SearchQueryChanged {
                    query: self.search_buffer.clone(),
                }
            }
            _ => UiEvent::None,
        }
    }

    fn command(&mut self, command: Command) -> UiEvent {
        self.reset_count();
        UiEvent::Command(command)
    }

    fn push_digit(&mut self, digit: usize) {
        let current = self.pending_count.unwrap_or(0);
        let next = current.saturating_mul(10).saturating_add(digit);
        self.pending_count = Some(next);
        if let Some(c) = char::from_digit(digit as u32, 10) {
            self.pending_digits.push(c);
        }
    }

    /// Typed prefix, or 1 when none was typed. An explicit 0 is passed through.
    fn take_count(&mut self) -> usize {
        let count = self.pending_count.take().unwrap_or(1);
        self.pending_digits.clear();
        count
    }

    fn reset_count(&mut self) {
        self.pending_count = None;
        self.pending_digits.clear();
    }

    fn pan(&mut self, dx: f32, dy: f32) -> UiEvent {
        let multiplier = self.take_count().max(1) as f32;
        UiEvent::ScrollBy {
            dx: dx * multiplier,
            dy: dy * multiplier,
        }
    }

    /// Text to echo in the status line while a key sequence is incomplete.
    pub fn pending_input(&self) -> Option<String> {
        if matches!(self.mode, InputMode::Search) {
            return Some(format!("/{}", self.search_buffer));
        }
        if self.pending_digits.is_empty() {
            None
        } else {
            Some(self.pending_digits.clone())
        }
    }
}

fn status_colors(theme: Theme) -> (Color, Color) {
    match theme {
        Theme::Dark => (Color::Grey, Color::Black),
        Theme::Light => (Color::Black, Color::White),
    }
}

/// Writes `label` on terminal row `row`, styled for `theme`.
pub fn write_status_line<W: Write>(
    writer: &mut W,
    row: u16,
    label: &str,
    theme: Theme,
) -> io::Result<()> {
    let (foreground, background) = status_colors(theme);
    crossterm::queue!(
        writer,
        cursor::MoveTo(0, row),
        Clear(ClearType::CurrentLine),
        SetForegroundColor(foreground),
        SetBackgroundColor(background),
        Print(label),
        ResetColor
    )?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEventKind, KeyEventState};
    use image::Rgba;

    #[test]
    fn kitty_draw_emits_protocol() {
        let mut renderer = KittyRenderer::new(Vec::new());
        let frame = RgbaImage::from_pixel(1, 1, Rgba([255, 0, 0, 255]));

        renderer.draw(&frame, DrawParams::clamped(10, 5)).unwrap();
        let output = String::from_utf8(renderer.writer).unwrap();
        assert!(output.starts_with("\u{1b}_Ga=T,f=100"));
        assert!(output.contains("c=10,r=5,s=1,v=1"));
        assert!(output.ends_with("\u{1b}\\"));
    }

    #[test]
    fn large_frames_are_chunked() {
        let mut renderer = KittyRenderer::new(Vec::new());
        // Noise so PNG compression cannot shrink it below one chunk.
        let mut state = 0x2545_f491_u32;
        let frame = RgbaImage::from_fn(128, 128, |_, _| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let [r, g, b, _] = state.to_le_bytes();
            Rgba([r, g, b, 255])
        });

        renderer.draw(&frame, DrawParams::clamped(0, 0)).unwrap();
        let output = String::from_utf8(renderer.writer).unwrap();
        assert!(output.contains("c=1,r=1"));
        assert!(output.contains("m=1"));
        assert!(output.contains("\u{1b}_Gm=0,q=2"));
    }

    fn key_event(code: KeyCode) -> Event {
        key_event_with_modifiers(code, KeyModifiers::NONE)
    }

    fn key_event_with_modifiers(code: KeyCode, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    fn mouse_event(kind: MouseEventKind, column: u16, row: u16) -> Event {
        Event::Mouse(MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        })
    }

    #[test]
    fn numeric_prefix_then_g_goes_to_page() {
        let mut mapper = EventMapper::new();
        assert!(matches!(
            mapper.map_event(key_event(KeyCode::Char('1'))),
            UiEvent::None
        ));
        assert!(matches!(
            mapper.map_event(key_event(KeyCode::Char('2'))),
            UiEvent::None
        ));
        assert_eq!(mapper.pending_input().as_deref(), Some("12"));

        match mapper.map_event(key_event(KeyCode::Char('g'))) {
            UiEvent::Command(Command::GotoPage { page }) => assert_eq!(page, 12),
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(mapper.pending_input().is_none());
    }

    #[test]
    fn bare_g_goes_to_first_page() {
        let mut mapper = EventMapper::new();
        match mapper.map_event(key_event(KeyCode::Char('g'))) {
            UiEvent::Command(Command::GotoPage { page }) => assert_eq!(page, 1),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn zero_prefix_is_passed_to_the_viewer() {
        let mut mapper = EventMapper::new();
        mapper.map_event(key_event(KeyCode::Char('0')));
        match mapper.map_event(key_event(KeyCode::Char('g'))) {
            UiEvent::Command(Command::GotoPage { page }) => assert_eq!(page, 0),
            other => panic!("unexpected event: {:?}", other),
        }

        mapper.map_event(key_event(KeyCode::Char('0')));
        match mapper.map_event(key_event(KeyCode::Char('l'))) {
            UiEvent::ScrollBy { dx, .. } => {
                assert!((dx - EventMapper::PAN_STEP).abs() < f32::EPSILON)
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn other_command_drops_prefix() {
        let mut mapper = EventMapper::new();
        mapper.map_event(key_event(KeyCode::Char('4')));

        match mapper.map_event(key_event(KeyCode::Char('j'))) {
            UiEvent::Command(Command::NextPage) => {}
            other => panic!("unexpected event: {:?}", other),
        }
        match mapper.map_event(key_event(KeyCode::Char('g'))) {
            UiEvent::Command(Command::GotoPage { page }) => assert_eq!(page, 1),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn page_and_zoom_keys() {
        let mut mapper = EventMapper::new();
        assert!(matches!(
            mapper.map_event(key_event(KeyCode::Char('k'))),
            UiEvent::Command(Command::PrevPage)
        ));
        assert!(matches!(
            mapper.map_event(key_event(KeyCode::Down)),
            UiEvent::Command(Command::NextPage)
        ));
        assert!(matches!(
            mapper.map_event(key_event(KeyCode::Char('+'))),
            UiEvent::Command(Command::ZoomIn)
        ));
        assert!(matches!(
            mapper.map_event(key_event(KeyCode::Char('-'))),
            UiEvent::Command(Command::ZoomOut)
        ));
        assert!(matches!(
            mapper.map_event(key_event(KeyCode::Char('e'))),
            UiEvent::Export
        ));
        assert!(matches!(
            mapper.map_event(key_event(KeyCode::Char('q'))),
            UiEvent::Quit
        ));
    }

    #[test]
    fn n_and_uppercase_n_navigate_matches() {
        let mut mapper = EventMapper::new();
        assert!(matches!(
            mapper.map_event(key_event(KeyCode::Char('n'))),
            UiEvent::Command(Command::SearchNext)
        ));
        assert!(matches!(
            mapper.map_event(key_event_with_modifiers(
                KeyCode::Char('N'),
                KeyModifiers::SHIFT
            )),
            UiEvent::Command(Command::SearchPrev)
        ));
    }

    #[test]
    fn numeric_prefix_scales_pan_distance() {
        let mut mapper = EventMapper::new();
        mapper.map_event(key_event(KeyCode::Char('3')));
        match mapper.map_event(key_event(KeyCode::Char('l'))) {
            UiEvent::ScrollBy { dx, dy } => {
                assert!((dx - 3.0 * EventMapper::PAN_STEP).abs() < f32::EPSILON);
                assert_eq!(dy, 0.0);
            }
            other => panic!("unexpected event: {:?}", other),
        }

        match mapper.map_event(key_event_with_modifiers(KeyCode::Up, KeyModifiers::CONTROL)) {
            UiEvent::ScrollBy { dx, dy } => {
                assert_eq!(dx, 0.0);
                assert!((dy + EventMapper::PAN_STEP).abs() < f32::EPSILON);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn slash_enters_search_mode_and_collects_input() {
        let mut mapper = EventMapper::new();

        assert!(matches!(
            mapper.map_event(key_event(KeyCode::Char('/'))),
            UiEvent::BeginSearch
        ));
        assert_eq!(mapper.pending_input().as_deref(), Some("/"));

        match mapper.map_event(key_event(KeyCode::Char('H'))) {
            UiEvent::SearchQueryChanged { ref query } => assert_eq!(query, "H"),
            other => panic!("unexpected event: {:?}", other),
        }
        match mapper.map_event(key_event(KeyCode::Backspace)) {
            UiEvent::SearchQueryChanged { ref query } => assert!(query.is_empty()),
            other => panic!("unexpected event: {:?}", other),
        }
        // Letters are query text here, not commands.
        mapper.map_event(key_event(KeyCode::Char('q')));
        mapper.map_event(key_event(KeyCode::Char('j')));
        assert_eq!(mapper.pending_input().as_deref(), Some("/qj"));

        match mapper.map_event(key_event(KeyCode::Enter)) {
            UiEvent::SearchSubmit { ref query } => assert_eq!(query, "qj"),
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(mapper.mode(), InputMode::Normal);
        assert!(mapper.pending_input().is_none());
    }

    #[test]
    fn escape_cancels_search() {
        let mut mapper = EventMapper::new();
        mapper.map_event(key_event(KeyCode::Char('/')));
        mapper.map_event(key_event(KeyCode::Char('x')));

        assert!(matches!(
            mapper.map_event(key_event(KeyCode::Esc)),
            UiEvent::SearchCancel
        ));
        assert!(mapper.pending_input().is_none());
    }

    #[test]
    fn mouse_drag_maps_to_pointer_commands() {
        let mut mapper = EventMapper::new();
        mapper.set_geometry(CellGeometry {
            cell_width: 10.0,
            cell_height: 20.0,
            rail_columns: 4,
        });

        match mapper.map_event(mouse_event(MouseEventKind::Down(MouseButton::Left), 6, 3)) {
            UiEvent::Command(Command::PointerDown { x, y }) => {
                assert_eq!((x, y), (20.0, 60.0));
            }
            other => panic!("unexpected event: {:?}", other),
        }
        match mapper.map_event(mouse_event(MouseEventKind::Drag(MouseButton::Left), 8, 3)) {
            UiEvent::Command(Command::PointerMove { x, y }) => assert_eq!((x, y), (40.0, 60.0)),
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(matches!(
            mapper.map_event(mouse_event(MouseEventKind::Drag(MouseButton::Left), 1, 3)),
            UiEvent::Command(Command::PointerLeave)
        ));
        assert!(matches!(
            mapper.map_event(mouse_event(MouseEventKind::Up(MouseButton::Left), 8, 3)),
            UiEvent::Command(Command::PointerUp)
        ));
    }

    #[test]
    fn click_in_rail_reports_offset() {
        let mut mapper = EventMapper::new();
        mapper.set_geometry(CellGeometry {
            cell_width: 10.0,
            cell_height: 20.0,
            rail_columns: 4,
        });

        match mapper.map_event(mouse_event(MouseEventKind::Down(MouseButton::Left), 2, 5)) {
            UiEvent::RailClicked { y } => assert_eq!(y, 100.0),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn geometry_from_window_falls_back_without_pixel_size() {
        let measured = CellGeometry::from_window(100, 50, 1000, 1000);
        assert_eq!((measured.cell_width, measured.cell_height), (10.0, 20.0));

        let fallback = CellGeometry::from_window(100, 50, 0, 0);
        assert_eq!((fallback.cell_width, fallback.cell_height), (8.0, 16.0));

        let with_rail = measured.with_rail_width(165);
        assert_eq!(with_rail.rail_columns, 17);
        assert_eq!(with_rail.rail_pixels(), 170);
    }

    #[test]
    fn status_line_contains_label() {
        let mut out = Vec::new();
        write_status_line(&mut out, 3, "Page 1 of 2", Theme::Light).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Page 1 of 2"));
        assert!(text.starts_with("\u{1b}[4;1H"));
    }
}
