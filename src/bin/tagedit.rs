use std::{
    env,
    fs::{self, File},
    io,
    ops::Range,
    path::{Path, PathBuf},
    sync::Mutex,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Position},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph},
};
use tracing_subscriber::EnvFilter;

use tagged_text::editor::{self, EditOutcome};
use tagged_text::markup::{self, MarkupError};
use tagged_text::render::{RenderOptions, RenderResult, render_text};
use tagged_text::theme::Theme;

const STATUS_TIMEOUT: Duration = Duration::from_secs(4);
const LOG_ENV: &str = "TAGEDIT_LOG";

fn main() -> Result<()> {
    init_logging()?;
    run()
}

/// The terminal belongs to the UI, so logs only go to a file when asked for.
fn init_logging() -> Result<()> {
    let Ok(path) = env::var(LOG_ENV) else {
        return Ok(());
    };
    let file =
        File::create(&path).with_context(|| format!("failed to create log file {path}"))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    tracing::info!("starting tagedit");
    Ok(())
}

fn run() -> Result<()> {
    let mut args = env::args().skip(1);
    let Some(path_arg) = args.next() else {
        eprintln!("Usage: tagedit <file>");
        return Ok(());
    };
    let path = PathBuf::from(path_arg);

    let (text, initial_status) = load_text(&path)?;
    let mut app = App::new(text, path, initial_status);

    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to initialize terminal")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().ok();

    let res = run_app(&mut terminal, &mut app).context("application error");

    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();

    res
}

fn load_text(path: &Path) -> Result<(String, Option<String>)> {
    if !path.exists() {
        return Ok((String::new(), Some("New document".to_string())));
    }
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let status = match markup::read_checked(&text) {
        Ok(_) => None,
        Err(err) => {
            tracing::warn!(%err, "loaded text has unbalanced markup");
            Some(format!("Unbalanced markup: {err}"))
        }
    };
    Ok((text, status))
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();
    let mut needs_redraw = true;

    while !app.should_quit {
        if needs_redraw {
            terminal
                .draw(|frame| app.draw(frame))
                .context("failed to draw frame")?;
            needs_redraw = false;
        }

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout).context("event poll failed")? {
            let evt = event::read().context("failed to read event")?;
            app.handle_event(evt)?;
            needs_redraw = true;
        }

        if last_tick.elapsed() >= tick_rate {
            let had_message_before = app.status_message.is_some();
            app.prune_status_message();
            last_tick = Instant::now();
            if had_message_before && app.status_message.is_none() {
                needs_redraw = true;
            }
        }
    }

    Ok(())
}

struct StatusMessage {
    text: String,
    since: Instant,
    is_error: bool,
}

struct App {
    text: String,
    file_path: PathBuf,
    theme: Theme,
    /// Plain-text position of the caret.
    caret: usize,
    /// Which side of the markers at the caret the next character goes to.
    tag_number: usize,
    selection_anchor: Option<usize>,
    preferred_column: Option<u16>,
    scroll_top: usize,
    should_quit: bool,
    dirty: bool,
    status_message: Option<StatusMessage>,
    layout: Option<RenderResult>,
}

impl App {
    fn new(text: String, file_path: PathBuf, initial_status: Option<String>) -> Self {
        Self {
            text,
            file_path,
            theme: Theme::new(),
            caret: 0,
            tag_number: 0,
            selection_anchor: None,
            preferred_column: None,
            scroll_top: 0,
            should_quit: false,
            dirty: false,
            status_message: initial_status.map(|text| StatusMessage {
                text,
                since: Instant::now(),
                is_error: false,
            }),
            layout: None,
        }
    }

    fn length(&self) -> usize {
        markup::read(&self.text).len()
    }

    fn selection(&self) -> Option<Range<usize>> {
        let anchor = self.selection_anchor?;
        match anchor.cmp(&self.caret) {
            std::cmp::Ordering::Less => Some(anchor..self.caret),
            std::cmp::Ordering::Equal => None,
            std::cmp::Ordering::Greater => Some(self.caret..anchor),
        }
    }

    fn prepare_selection(&mut self, extend: bool) {
        if extend {
            self.selection_anchor.get_or_insert(self.caret);
        } else {
            self.selection_anchor = None;
        }
    }

    fn set_status(&mut self, text: impl Into<String>) {
        self.status_message = Some(StatusMessage {
            text: text.into(),
            since: Instant::now(),
            is_error: false,
        });
    }

    fn report(&mut self, action: &str, err: MarkupError) {
        tracing::warn!(action, %err, "edit refused");
        self.status_message = Some(StatusMessage {
            text: format!("Cannot {action}: {err}"),
            since: Instant::now(),
            is_error: true,
        });
    }

    fn prune_status_message(&mut self) {
        if self
            .status_message
            .as_ref()
            .is_some_and(|message| message.since.elapsed() > STATUS_TIMEOUT)
        {
            self.status_message = None;
        }
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        if area.height == 0 || area.width == 0 {
            return;
        }

        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(area);
        let text_area = vertical[0];
        let status_area = vertical[1];

        let options = RenderOptions {
            wrap_width: text_area.width.max(1) as usize,
            ..RenderOptions::default()
        };
        let render = render_text(
            &self.text,
            &options,
            Some(self.caret),
            self.selection(),
            &self.theme,
        );

        let viewport_height = (text_area.height as usize).max(1);
        if let Some(cursor) = render.cursor {
            if cursor.line < self.scroll_top {
                self.scroll_top = cursor.line;
            } else if cursor.line >= self.scroll_top + viewport_height {
                self.scroll_top = cursor.line + 1 - viewport_height;
            }
        }

        let paragraph = Paragraph::new(Text::from(render.lines.clone()))
            .block(Block::default().borders(Borders::NONE))
            .scroll((self.scroll_top as u16, 0));
        frame.render_widget(paragraph, text_area);

        if let Some(cursor) = render.cursor
            && cursor.line >= self.scroll_top
            && cursor.line < self.scroll_top + viewport_height
        {
            let cursor_y = text_area.y + (cursor.line - self.scroll_top) as u16;
            let cursor_x = text_area.x + cursor.column.min(text_area.width - 1);
            frame.set_cursor_position(Position::new(cursor_x, cursor_y));
        }

        let status_line = self.status_line(&render);
        let status_widget = Paragraph::new(status_line)
            .block(Block::default().borders(Borders::NONE))
            .style(self.theme.status_bar_style());
        frame.render_widget(status_widget, status_area);

        self.layout = Some(render);
    }

    fn status_line(&self, render: &RenderResult) -> Line<'static> {
        let position = render
            .cursor
            .map(|cursor| format!("{}:{}", cursor.line + 1, cursor.column + 1))
            .unwrap_or_default();

        if let Some(message) = &self.status_message {
            let style = if message.is_error {
                self.theme.status_bar_style().patch(self.theme.error_style())
            } else {
                self.theme.status_bar_style()
            };
            return Line::from(vec![
                Span::raw(format!("{position} ")),
                Span::styled(message.text.clone(), style),
            ]);
        }

        let marker = if self.dirty { "*" } else { "" };
        Line::from(vec![
            Span::raw(format!("{position} ")),
            Span::styled(
                format!("{}{marker}", self.file_path.display()),
                self.theme.filename_style(),
            ),
            Span::raw("  ^B:Bold ^E:Italic ^U:Underline ^K:Strike ^S:Save ^Q:Quit"),
        ])
    }

    fn handle_event(&mut self, event: Event) -> Result<()> {
        let Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) = event
        else {
            return Ok(());
        };

        let shift = modifiers.contains(KeyModifiers::SHIFT);
        match (code, modifiers) {
            (KeyCode::Char('q') | KeyCode::Char('c'), m) if m.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            (KeyCode::Char('s'), m) if m.contains(KeyModifiers::CONTROL) => {
                self.save()?;
            }
            (KeyCode::Char('b'), m) if m.contains(KeyModifiers::CONTROL) => self.toggle("strong"),
            (KeyCode::Char('e'), m) if m.contains(KeyModifiers::CONTROL) => self.toggle("em"),
            (KeyCode::Char('u'), m) if m.contains(KeyModifiers::CONTROL) => self.toggle("u"),
            (KeyCode::Char('k'), m) if m.contains(KeyModifiers::CONTROL) => self.toggle("s"),
            (KeyCode::Left, _) => {
                self.prepare_selection(shift);
                self.move_to(self.caret.saturating_sub(1));
            }
            (KeyCode::Right, _) => {
                self.prepare_selection(shift);
                self.move_to((self.caret + 1).min(self.length()));
            }
            (KeyCode::Up, _) => {
                self.prepare_selection(shift);
                self.move_vertically(-1);
            }
            (KeyCode::Down, _) => {
                self.prepare_selection(shift);
                self.move_vertically(1);
            }
            (KeyCode::Home, _) => {
                self.prepare_selection(shift);
                self.move_within_line(0);
            }
            (KeyCode::End, _) => {
                self.prepare_selection(shift);
                self.move_within_line(u16::MAX);
            }
            (KeyCode::Backspace, _) => {
                if !self.erase_selection() && self.caret > 0 {
                    self.erase(self.caret - 1..self.caret);
                }
            }
            (KeyCode::Delete, _) => {
                if !self.erase_selection() && self.caret < self.length() {
                    self.erase(self.caret..self.caret + 1);
                }
            }
            (KeyCode::Enter, _) => self.type_char('\n'),
            (KeyCode::Tab, _) => self.type_char('\t'),
            (KeyCode::Char(ch), m) if !m.contains(KeyModifiers::CONTROL) => self.type_char(ch),
            _ => {}
        }
        Ok(())
    }

    fn move_to(&mut self, position: usize) {
        if position != self.caret {
            self.caret = position;
            self.tag_number = 0;
        }
        self.preferred_column = None;
    }

    fn move_vertically(&mut self, delta: isize) {
        let Some(layout) = &self.layout else {
            return;
        };
        let Some(current) = layout.cursor_map.get(self.caret).copied() else {
            return;
        };
        let Some(line) = current.line.checked_add_signed(delta) else {
            return;
        };
        let column = self.preferred_column.unwrap_or(current.column);
        if let Some(position) = layout.position_at(line, column) {
            self.move_to(position);
            self.preferred_column = Some(column);
        }
    }

    fn move_within_line(&mut self, column: u16) {
        let target = self.layout.as_ref().and_then(|layout| {
            let current = layout.cursor_map.get(self.caret)?;
            layout.position_at(current.line, column)
        });
        if let Some(position) = target {
            self.move_to(position);
        }
    }

    fn type_char(&mut self, ch: char) {
        self.erase_selection();
        match editor::insert_character(ch, self.caret, self.tag_number, &mut self.text) {
            Ok(()) => {
                self.caret += 1;
                self.tag_number = 0;
                self.mark_dirty();
            }
            Err(err) => self.report("insert", err),
        }
    }

    fn erase_selection(&mut self) -> bool {
        let Some(range) = self.selection() else {
            return false;
        };
        self.selection_anchor = None;
        self.erase(range);
        true
    }

    fn erase(&mut self, range: Range<usize>) {
        match editor::erase(range.start, range.end, &mut self.text) {
            Ok(tag_number) => {
                self.caret = range.start;
                self.tag_number = tag_number;
                self.preferred_column = None;
                self.mark_dirty();
            }
            Err(err) => self.report("erase", err),
        }
    }

    fn toggle(&mut self, tag_name: &str) {
        let Some(range) = self.selection() else {
            self.set_status("Select some text first");
            return;
        };
        match editor::toggle_tag(&mut self.text, tag_name, &[], range.start, range.end) {
            Ok(EditOutcome::Applied) => self.mark_dirty(),
            Ok(EditOutcome::Unchanged) => {}
            Err(err) => self.report("format", err),
        }
    }

    fn save(&mut self) -> Result<()> {
        fs::write(&self.file_path, &self.text)
            .with_context(|| format!("failed to write {}", self.file_path.display()))?;
        self.dirty = false;
        self.set_status("Saved");
        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
        self.layout = None;
    }
}
