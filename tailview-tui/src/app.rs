use crate::theme;
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};
use ringbuf::{HeapRb, traits::{Consumer, Split}};
use std::{
    cell::RefCell,
    fs::File,
    io,
    rc::Rc,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};
use tailview_engine::{Change, Highlight, LogBuffer, LogView, MessageStore, RuleSet};

use crate::source::{LineSource, spawn_source_thread};

const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
const DEFAULT_EVENT_POLL_INTERVAL_MS: u64 = 16;
const DEFAULT_RING_BUFFER_SIZE: usize = 16384;
const EXPORT_FILE: &str = "tailview-export.log";

pub struct AppDesc {
    pub poll_interval: Duration,
    pub event_poll_interval: Duration,
    pub ring_buffer_size: usize,
    pub rules: RuleSet,
}

impl Default for AppDesc {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            event_poll_interval: Duration::from_millis(DEFAULT_EVENT_POLL_INTERVAL_MS),
            ring_buffer_size: DEFAULT_RING_BUFFER_SIZE,
            rules: RuleSet::default(),
        }
    }
}

/// Run the viewer until the user quits.
pub fn start_with_source<S>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    source: S,
    desc: AppDesc,
) -> Result<()>
where
    S: LineSource + 'static,
{
    let app = App::new(source, desc);
    app.run(terminal)
}

/// what the user is typing into, if anything
enum InputMode {
    Normal,
    Search(String),
}

struct App {
    is_exiting: bool,
    store: LogBuffer,
    view: LogView,
    changes: Rc<RefCell<Vec<Change>>>,
    line_consumer: ringbuf::HeapCons<String>,
    source_thread: Option<thread::JoinHandle<()>>,
    source_stop: Arc<AtomicBool>,
    poll_interval: Duration,
    event_poll_interval: Duration,
    input_mode: InputMode,
    /// committed search term, reused by n/N
    search_term: String,
    scroll_top: usize,
    viewport_height: usize,
    status_line: Option<String>,
}

impl App {
    fn new<S>(source: S, desc: AppDesc) -> Self
    where
        S: LineSource + 'static,
    {
        let ring_buffer = HeapRb::<String>::new(desc.ring_buffer_size);
        let (producer, consumer) = ring_buffer.split();

        let (source_thread, source_stop) =
            spawn_source_thread(source, producer, desc.poll_interval);

        let mut view = LogView::new(desc.rules);
        let changes = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&changes);
        view.set_on_change(move |change| sink.borrow_mut().push(change));

        Self {
            is_exiting: false,
            store: LogBuffer::new(),
            view,
            changes,
            line_consumer: consumer,
            source_thread: Some(source_thread),
            source_stop,
            poll_interval: desc.poll_interval,
            event_poll_interval: desc.event_poll_interval,
            input_mode: InputMode::Normal,
            search_term: String::new(),
            scroll_top: 0,
            viewport_height: 0,
            status_line: None,
        }
    }

    fn run(mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        let mut last_drain = Instant::now();

        while !self.is_exiting {
            self.poll_event()?;

            if last_drain.elapsed() >= self.poll_interval {
                self.drain_lines();
                last_drain = Instant::now();
            }

            terminal.draw(|frame| self.render(frame))?;
        }

        self.cleanup();
        Ok(())
    }

    fn cleanup(&mut self) {
        self.source_stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.source_thread.take() {
            log::debug!("waiting for source thread to finish");
            if let Err(e) = handle.join() {
                log::error!("source thread panicked: {:?}", e);
            }
        }
    }

    // ------------------------------------------------------------------
    // ingestion
    // ------------------------------------------------------------------

    /// drain the ring buffer into the store and the view as one batch
    fn drain_lines(&mut self) {
        let mut stop_hit = false;
        let mut track_row = None;

        self.view.begin_update();
        while let Some(text) = self.line_consumer.try_pop() {
            if self.view.is_stop_match(&text) {
                stop_hit = true;
            }
            let wants_track = self.view.is_track_match(&text);

            let line = self.store.append(text.as_str());
            let visible = self.view.append(line, &text);
            if visible && wants_track {
                track_row = Some(self.view.row_count() - 1);
            }
        }
        self.view.end_update();

        self.process_changes();

        if stop_hit && self.view.auto_scroll() {
            // auto-pause on a stop pattern; scrolling stays where it is
            self.view.set_auto_scroll(false);
            self.status_line = Some("paused on stop pattern".to_string());
            log::debug!("stop pattern matched, auto-scroll off");
        }

        if let Some(row) = track_row {
            self.view.clear_selection();
            if self.view.select(&[row]).is_ok() {
                self.scroll_to(row);
            }
        }
    }

    /// react to the coalesced engine notifications
    fn process_changes(&mut self) {
        for change in self.changes.borrow_mut().drain(..) {
            match change {
                Change::Appended {
                    scroll_to_bottom, ..
                } => {
                    if scroll_to_bottom {
                        self.scroll_top = self
                            .view
                            .row_count()
                            .saturating_sub(self.viewport_height.max(1));
                    }
                }
                Change::Rebuilt => {
                    let max_top = self.view.row_count().saturating_sub(1);
                    self.scroll_top = self.scroll_top.min(max_top);
                }
                Change::Cleared => {
                    self.scroll_top = 0;
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // input
    // ------------------------------------------------------------------

    fn poll_event(&mut self) -> Result<()> {
        if event::poll(self.event_poll_interval)?
            && let Event::Key(key) = event::read()?
        {
            self.handle_key(key)?;
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.kind != KeyEventKind::Press {
            return Ok(());
        }

        if let InputMode::Search(_) = self.input_mode {
            return self.handle_search_key(key);
        }

        self.status_line = None;
        match key.code {
            KeyCode::Char('q') => self.is_exiting = true,
            KeyCode::Char('/') => self.input_mode = InputMode::Search(String::new()),
            KeyCode::Char('n') => self.find(true),
            KeyCode::Char('N') => self.find(false),
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::Char('g') => self.jump_to(0),
            KeyCode::Char('G') => {
                let count = self.view.row_count();
                if count > 0 {
                    self.jump_to(count - 1);
                }
                self.view.set_auto_scroll(true);
            }
            KeyCode::Char('a') => self.view.select_all(),
            KeyCode::Char('x') => self.view.clear_selection(),
            KeyCode::Char(' ') => {
                let tailing = !self.view.auto_scroll();
                self.view.set_auto_scroll(tailing);
                if tailing {
                    self.scroll_top = self
                        .view
                        .row_count()
                        .saturating_sub(self.viewport_height.max(1));
                }
            }
            KeyCode::Char('e') => self.export()?,
            KeyCode::Char('c') => {
                self.store.clear();
                self.view.clear();
                self.process_changes();
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.scroll_by(-(self.viewport_height as isize / 2));
            }
            KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.scroll_by(self.viewport_height as isize / 2);
            }
            KeyCode::Esc => {
                self.search_term.clear();
                self.view.set_search_term("");
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> Result<()> {
        let InputMode::Search(input) = &mut self.input_mode else {
            return Ok(());
        };

        match key.code {
            KeyCode::Esc => self.input_mode = InputMode::Normal,
            KeyCode::Enter => {
                let term = input.clone();
                self.input_mode = InputMode::Normal;
                self.search_term = term.clone();
                self.view.set_search_term(term);
                self.find(true);
            }
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Char(c) => input.push(c),
            _ => {}
        }
        Ok(())
    }

    fn find(&mut self, forward: bool) {
        if self.search_term.is_empty() {
            return;
        }
        let term = self.search_term.clone();
        let found = if forward {
            self.view.find_next(&term, &self.store)
        } else {
            self.view.find_previous(&term, &self.store)
        };
        if let (true, Some(row)) = (found, self.view.search_position()) {
            self.view.set_auto_scroll(false);
            self.scroll_to(row);
        } else if !found {
            self.status_line = Some(format!("no match for {:?}", term));
        }
    }

    // ------------------------------------------------------------------
    // selection / scrolling
    // ------------------------------------------------------------------

    fn move_selection(&mut self, delta: isize) {
        let count = self.view.row_count();
        if count == 0 {
            return;
        }
        let range = self.view.selected_range();
        let current = if range.count == 0 {
            if delta > 0 { 0 } else { count - 1 }
        } else if delta > 0 {
            (range.end as isize + delta).min(count as isize - 1) as usize
        } else {
            (range.begin as isize + delta).max(0) as usize
        };
        self.jump_to(current);
    }

    fn jump_to(&mut self, row: usize) {
        self.view.clear_selection();
        if self.view.select(&[row]).is_ok() {
            self.view.set_auto_scroll(false);
            self.scroll_to(row);
        }
    }

    fn scroll_to(&mut self, row: usize) {
        let height = self.viewport_height.max(1);
        if row < self.scroll_top {
            self.scroll_top = row;
        } else if row >= self.scroll_top + height {
            self.scroll_top = row + 1 - height;
        }
    }

    fn scroll_by(&mut self, delta: isize) {
        let max_top = self.view.row_count().saturating_sub(1);
        let new_top = (self.scroll_top as isize + delta).clamp(0, max_top as isize) as usize;
        self.scroll_top = new_top;
        self.view.set_auto_scroll(false);
    }

    fn export(&mut self) -> Result<()> {
        let mut out = File::create(EXPORT_FILE)?;
        self.view.export_visible(&self.store, &mut out)?;
        self.status_line = Some(format!(
            "exported {} rows to {}",
            self.view.row_count(),
            EXPORT_FILE
        ));
        log::debug!("exported visible rows to {}", EXPORT_FILE);
        Ok(())
    }

    // ------------------------------------------------------------------
    // rendering
    // ------------------------------------------------------------------

    fn render(&mut self, frame: &mut Frame) {
        let [logs_area, status_area] =
            Layout::vertical([Constraint::Fill(1), Constraint::Length(1)]).areas(frame.area());

        self.render_logs(frame, logs_area);
        self.render_status(frame, status_area);
    }

    fn render_logs(&mut self, frame: &mut Frame, area: Rect) {
        let block = Block::new().borders(Borders::ALL).title(format!(
            "Logs ({}/{})",
            self.view.row_count(),
            self.store.line_count()
        ));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        self.viewport_height = inner.height as usize;
        if self.view.auto_scroll() {
            self.scroll_top = self
                .view
                .row_count()
                .saturating_sub(self.viewport_height.max(1));
        }
        self.view.set_viewport(self.scroll_top, self.viewport_height);

        // only the rows on screen are ever fetched or formatted
        let range = self.view.view_range();
        if range.count == 0 {
            return;
        }

        let selected = self.view.selected_indices();
        let mut lines = Vec::with_capacity(range.count);
        for row_index in range.begin..=range.end {
            let Ok(row) = self.view.row(row_index) else {
                break;
            };
            let mut base = theme::row_style(row.color);
            if selected.binary_search(&row_index).is_ok() {
                base = base.patch(theme::SELECTED_STYLE);
            }

            let text = self
                .view
                .row_text(row_index, &self.store)
                .unwrap_or_default()
                .to_string();
            let spans = self
                .view
                .highlights_at(row_index, &self.store)
                .map(|s| s.to_vec())
                .unwrap_or_default();
            lines.push(highlighted_line(&text, &spans, base, inner.width as usize));
        }

        frame.render_widget(Paragraph::new(lines), inner);
    }

    fn render_status(&mut self, frame: &mut Frame, area: Rect) {
        let (text, style) = match &self.input_mode {
            InputMode::Search(input) => (format!("/{}", input), theme::SEARCH_INPUT_STYLE),
            InputMode::Normal => {
                if let Some(status) = &self.status_line {
                    (status.clone(), theme::STATUS_STYLE)
                } else {
                    let selection = self.view.selected_range();
                    let state = if self.view.auto_scroll() {
                        "TAILING"
                    } else {
                        "PAUSED"
                    };
                    let style = if self.view.auto_scroll() {
                        theme::STATUS_STYLE
                    } else {
                        theme::PAUSED_STYLE
                    };
                    let search = if self.search_term.is_empty() {
                        String::new()
                    } else {
                        format!(" | search: {:?}", self.search_term)
                    };
                    (
                        format!(
                            "{} | {} selected{} | /: search  n/N: next/prev  e: export  q: quit",
                            state, selection.count, search
                        ),
                        style,
                    )
                }
            }
        };

        frame.render_widget(
            Paragraph::new(Line::styled(text, style)).style(style),
            area,
        );
    }
}

/// split one row's text into styled spans around its highlight ranges
fn highlighted_line(
    text: &str,
    highlights: &[Highlight],
    base: Style,
    max_width: usize,
) -> Line<'static> {
    // truncate long lines by characters; the viewer does not soft-wrap
    let clipped: String = text.chars().take(max_width.max(1)).collect();
    let clip_len = clipped.len();

    if highlights.is_empty() {
        return Line::styled(clipped, base);
    }

    let mut spans = Vec::new();
    let mut last = 0;
    for h in highlights {
        let begin = h.begin.min(clip_len);
        let end = h.end.min(clip_len);
        if begin >= end {
            continue;
        }
        if last < begin {
            spans.push(Span::styled(clipped[last..begin].to_string(), base));
        }
        spans.push(Span::styled(
            clipped[begin..end].to_string(),
            theme::text_color_style(h.color).add_modifier(Modifier::BOLD),
        ));
        last = end;
    }
    if last < clip_len {
        spans.push(Span::styled(clipped[last..].to_string(), base));
    }
    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tailview_engine::{Rgb, TextColor, highlights_for};

    #[test]
    fn test_highlighted_line_splits_around_matches() {
        let text = "ERROR retrying now";
        let spans = highlights_for(text, "retry");
        let line = highlighted_line(text, &spans, Style::new(), 80);
        let parts: Vec<String> = line.spans.iter().map(|s| s.content.to_string()).collect();
        assert_eq!(parts, vec!["ERROR ", "retry", "ing now"]);
    }

    #[test]
    fn test_highlighted_line_clips_to_width() {
        let text = "0123456789";
        let spans = highlights_for(text, "89");
        let line = highlighted_line(text, &spans, Style::new(), 5);
        let joined: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(joined, "01234");
    }

    #[test]
    fn test_highlighted_line_without_matches_is_single_span() {
        let line = highlighted_line("plain", &[], Style::new(), 80);
        assert_eq!(line.spans.len(), 1);
    }

    #[test]
    fn test_highlight_span_keeps_its_color() {
        let color = TextColor::new(Rgb::new(1, 2, 3), Rgb::new(4, 5, 6));
        let spans = vec![Highlight::new(0, 2, color)];
        let line = highlighted_line("abcd", &spans, Style::new(), 80);
        assert_eq!(line.spans[0].style.bg, Some(Color::Rgb(1, 2, 3)));
    }
}
