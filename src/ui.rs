use crate::client::{ChatClient, SendError};
use crate::markdown;
use crate::session::SessionId;
use crossterm::event::{self, Event, KeyCode, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use std::io;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const INPUT_HEIGHT: u16 = 6;
const SCROLL_STEP: u16 = 5;
const SPINNER_FRAMES: [&str; 4] = ["◐", "◓", "◑", "◒"];

/// Greeting shown at startup and after every conversation reset.
pub const GREETING: &str = "Olá! 👋 Sou seu assistente de viagens. Posso ajudar com:\n\n\
    ✈️ Consultar, comprar ou cancelar voos\n\
    🏨 Reservar, consultar ou cancelar hotéis\n\n\
    Como posso ajudá-lo hoje?";

fn connection_error_message(endpoint: &str) -> String {
    format!(
        "❌ Erro ao conectar com o servidor. Certifique-se de que o backend está rodando em {endpoint}"
    )
}

type UiResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Outcome of one submission, delivered from the network task and
/// pattern-matched by the controller.
type SendOutcome = Result<String, SendError>;

// Restores terminal settings even if the loop exits early.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Self {
        Self
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        let _ = io::stdout().flush();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChatMessage {
    User(String),
    Assistant(String),
}

impl ChatMessage {
    fn avatar(&self) -> &'static str {
        match self {
            ChatMessage::User(_) => "👤",
            ChatMessage::Assistant(_) => "🤖",
        }
    }

    fn to_lines(&self) -> Vec<Line<'static>> {
        let body = match self {
            // User text bypasses the renderer entirely: plain, whitespace
            // preserved.
            ChatMessage::User(text) => plain_lines(text, Style::default().fg(Color::Blue)),
            ChatMessage::Assistant(text) => markup_lines(
                &markdown::render(text),
                Style::default().fg(Color::Yellow),
            ),
        };
        with_avatar(self.avatar(), body)
    }
}

fn plain_lines(text: &str, style: Style) -> Vec<Line<'static>> {
    text.split('\n')
        .map(|line| Line::from(Span::styled(line.to_string(), style)))
        .collect()
}

/// Splits rendered markup on `<br>` and converts each segment into a styled
/// line: `<strong>` toggles bold, `<em>` toggles italic, anything else —
/// including markup the renderer passed through unescaped — shows literally.
fn markup_lines(markup: &str, base: Style) -> Vec<Line<'static>> {
    markup
        .split("<br>")
        .map(|segment| markup_line(segment, base))
        .collect()
}

fn markup_line(segment: &str, base: Style) -> Line<'static> {
    let mut spans = Vec::new();
    let mut buf = String::new();
    let mut bold = false;
    let mut italic = false;
    let mut rest = segment;

    while let Some(idx) = rest.find('<') {
        let (before, at) = rest.split_at(idx);
        buf.push_str(before);
        if let Some((tag_len, next_bold, next_italic)) = inline_tag(at, bold, italic) {
            flush_span(&mut spans, &mut buf, base, bold, italic);
            bold = next_bold;
            italic = next_italic;
            rest = &at[tag_len..];
        } else {
            buf.push('<');
            rest = &at[1..];
        }
    }
    buf.push_str(rest);
    flush_span(&mut spans, &mut buf, base, bold, italic);

    Line::from(spans)
}

fn inline_tag(text: &str, bold: bool, italic: bool) -> Option<(usize, bool, bool)> {
    if text.starts_with("<strong>") {
        Some(("<strong>".len(), true, italic))
    } else if text.starts_with("</strong>") {
        Some(("</strong>".len(), false, italic))
    } else if text.starts_with("<em>") {
        Some(("<em>".len(), bold, true))
    } else if text.starts_with("</em>") {
        Some(("</em>".len(), bold, false))
    } else {
        None
    }
}

fn flush_span(
    spans: &mut Vec<Span<'static>>,
    buf: &mut String,
    base: Style,
    bold: bool,
    italic: bool,
) {
    if buf.is_empty() {
        return;
    }
    let mut style = base;
    if bold {
        style = style.add_modifier(Modifier::BOLD);
    }
    if italic {
        style = style.add_modifier(Modifier::ITALIC);
    }
    spans.push(Span::styled(std::mem::take(buf), style));
}

// Avatar glyph on the first line, continuation lines indented to match.
fn with_avatar(avatar: &str, body: Vec<Line<'static>>) -> Vec<Line<'static>> {
    body.into_iter()
        .enumerate()
        .map(|(idx, line)| {
            let prefix = if idx == 0 {
                format!("{avatar} ")
            } else {
                "   ".to_string()
            };
            let mut spans = vec![Span::raw(prefix)];
            spans.extend(line.spans);
            Line::from(spans)
        })
        .collect()
}

struct InputBuffer {
    lines: Vec<String>,
    cursor_x: usize,
    cursor_y: usize,
}

impl InputBuffer {
    fn new() -> Self {
        Self {
            lines: vec![String::new()],
            cursor_x: 0,
            cursor_y: 0,
        }
    }

    fn clear(&mut self) {
        self.lines = vec![String::new()];
        self.cursor_x = 0;
        self.cursor_y = 0;
    }

    fn insert_char(&mut self, c: char) {
        let line = &mut self.lines[self.cursor_y];
        if self.cursor_x >= line.len() {
            line.push(c);
        } else {
            line.insert(self.cursor_x, c);
        }
        self.cursor_x += 1;
    }

    fn delete_char(&mut self) {
        let line = &mut self.lines[self.cursor_y];
        if self.cursor_x > 0 {
            line.remove(self.cursor_x - 1);
            self.cursor_x -= 1;
        } else if self.cursor_y > 0 {
            let prev_line = self.lines.remove(self.cursor_y);
            self.cursor_y -= 1;
            self.cursor_x = self.lines[self.cursor_y].len();
            self.lines[self.cursor_y].push_str(&prev_line);
        }
    }

    fn new_line(&mut self) {
        let line = &self.lines[self.cursor_y];
        let remaining: String = line.chars().skip(self.cursor_x).collect();
        self.lines[self.cursor_y] = line.chars().take(self.cursor_x).collect();
        self.lines.insert(self.cursor_y + 1, remaining);
        self.cursor_y += 1;
        self.cursor_x = 0;
    }

    fn move_left(&mut self) {
        if self.cursor_x > 0 {
            self.cursor_x -= 1;
        } else if self.cursor_y > 0 {
            self.cursor_y -= 1;
            self.cursor_x = self.lines[self.cursor_y].len();
        }
    }

    fn move_right(&mut self) {
        let line_len = self.lines[self.cursor_y].len();
        if self.cursor_x < line_len {
            self.cursor_x += 1;
        } else if self.cursor_y < self.lines.len() - 1 {
            self.cursor_y += 1;
            self.cursor_x = 0;
        }
    }

    fn move_up(&mut self) {
        if self.cursor_y > 0 {
            self.cursor_y -= 1;
            self.cursor_x = self.cursor_x.min(self.lines[self.cursor_y].len());
        }
    }

    fn move_down(&mut self) {
        if self.cursor_y < self.lines.len() - 1 {
            self.cursor_y += 1;
            self.cursor_x = self.cursor_x.min(self.lines[self.cursor_y].len());
        }
    }

    fn to_string(&self) -> String {
        self.lines.join("\n")
    }

    fn render(&self) -> Text<'static> {
        if self.lines.iter().all(|l| l.is_empty()) {
            return Text::from(Span::styled(
                "Digite sua mensagem...",
                Style::default().fg(Color::DarkGray),
            ));
        }
        Text::from(
            self.lines
                .iter()
                .map(|l| Line::from(l.clone()))
                .collect::<Vec<_>>(),
        )
    }
}

impl Default for InputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

pub struct App {
    session: SessionId,
    messages: Vec<ChatMessage>,
    input: InputBuffer,
    scroll: u16,
    max_scroll: u16,
    follow: bool,
    sending: bool,
    spinner_idx: usize,
    should_quit: bool,
    client: Arc<ChatClient>,
    sender: mpsc::Sender<SendOutcome>,
    receiver: mpsc::Receiver<SendOutcome>,
}

impl App {
    pub fn new(client: ChatClient) -> Self {
        let (sender, receiver) = mpsc::channel(16);

        Self {
            session: SessionId::new(),
            messages: vec![ChatMessage::Assistant(GREETING.to_string())],
            input: InputBuffer::new(),
            scroll: 0,
            max_scroll: 0,
            follow: true,
            sending: false,
            spinner_idx: 0,
            should_quit: false,
            client: Arc::new(client),
            sender,
            receiver,
        }
    }

    fn push_message(&mut self, message: ChatMessage) {
        self.messages.push(message);
        // Every append snaps the view back to the most recent entry.
        self.follow = true;
    }

    /// Clears the view and mints a fresh session id; the backend is not
    /// told — continuity of server-side history is entirely its business.
    fn new_conversation(&mut self) {
        self.session = SessionId::new();
        self.messages.clear();
        self.push_message(ChatMessage::Assistant(GREETING.to_string()));
    }

    /// One submission: trim, ignore if empty or one is already in flight,
    /// else append the user row and spawn the single network attempt.
    fn submit(&mut self) {
        if self.sending {
            return;
        }
        let text = self.input.to_string();
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        let text = text.to_string();

        self.push_message(ChatMessage::User(text.clone()));
        self.input.clear();
        self.sending = true;

        let client = Arc::clone(&self.client);
        let session = self.session.clone();
        let sender = self.sender.clone();
        tokio::spawn(async move {
            let outcome = client.send_message(&session, &text).await;
            let _ = sender.send(outcome).await;
        });
    }

    fn handle_outcome(&mut self, outcome: SendOutcome) {
        // Composing indicator comes down unconditionally.
        self.sending = false;
        match outcome {
            Ok(reply) => self.push_message(ChatMessage::Assistant(reply)),
            Err(err) => {
                tracing::error!(error = %err, "failed to obtain a reply");
                self.push_message(ChatMessage::Assistant(connection_error_message(
                    self.client.endpoint(),
                )));
            }
        }
    }

    fn handle_events(&mut self) -> UiResult<bool> {
        while let Ok(outcome) = self.receiver.try_recv() {
            self.handle_outcome(outcome);
        }

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c')
                {
                    self.should_quit = true;
                    return Ok(false);
                }
                if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('n')
                {
                    self.new_conversation();
                    return Ok(true);
                }

                match key.code {
                    KeyCode::Esc => {
                        self.should_quit = true;
                        return Ok(false);
                    }
                    KeyCode::Enter => {
                        if key.modifiers.contains(KeyModifiers::SHIFT) {
                            self.input.new_line();
                        } else {
                            self.submit();
                        }
                    }
                    KeyCode::PageUp => {
                        self.follow = false;
                        self.scroll = self.scroll.saturating_sub(SCROLL_STEP);
                    }
                    KeyCode::PageDown => {
                        self.scroll = self.scroll.saturating_add(SCROLL_STEP);
                        if self.scroll >= self.max_scroll {
                            self.follow = true;
                        }
                    }
                    KeyCode::Char(c) => {
                        self.input.insert_char(c);
                    }
                    KeyCode::Backspace => {
                        self.input.delete_char();
                    }
                    KeyCode::Left => {
                        self.input.move_left();
                    }
                    KeyCode::Right => {
                        self.input.move_right();
                    }
                    KeyCode::Up => {
                        self.input.move_up();
                    }
                    KeyCode::Down => {
                        self.input.move_down();
                    }
                    KeyCode::Home => {
                        self.input.cursor_x = 0;
                    }
                    KeyCode::End => {
                        self.input.cursor_x = self.input.lines[self.input.cursor_y].len();
                    }
                    _ => {}
                }
            }
        }

        Ok(true)
    }

    fn draw(&mut self, f: &mut Frame) {
        let [messages_area, input_area] =
            Layout::vertical([Constraint::Min(1), Constraint::Length(INPUT_HEIGHT)])
                .areas(f.area());
        self.draw_messages(f, messages_area);
        self.draw_input(f, input_area);
    }

    fn draw_messages(&mut self, f: &mut Frame, area: Rect) {
        let mut lines: Vec<Line<'static>> = Vec::new();
        for message in &self.messages {
            if !lines.is_empty() {
                lines.push(Line::from(""));
            }
            lines.extend(message.to_lines());
        }

        if self.sending {
            self.spinner_idx = self.spinner_idx.wrapping_add(1);
            if !lines.is_empty() {
                lines.push(Line::from(""));
            }
            lines.push(Line::from(vec![
                Span::raw("🤖 "),
                Span::styled(
                    SPINNER_FRAMES[self.spinner_idx % SPINNER_FRAMES.len()],
                    Style::default().fg(Color::DarkGray),
                ),
            ]));
        }

        let total = wrapped_height(&lines, area.width);
        self.max_scroll = total.saturating_sub(area.height);
        if self.follow {
            self.scroll = self.max_scroll;
        } else {
            self.scroll = self.scroll.min(self.max_scroll);
        }

        let paragraph = Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((self.scroll, 0));
        f.render_widget(paragraph, area);
    }

    fn draw_input(&mut self, f: &mut Frame, area: Rect) {
        let title = if self.sending {
            " Mensagem (aguardando resposta...) "
        } else {
            " Mensagem (Enter envia, Ctrl+N nova conversa, Esc sai) "
        };

        let input_paragraph = Paragraph::new(self.input.render())
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(title)
                    .border_style(Style::default().fg(Color::DarkGray)),
            )
            .wrap(Wrap { trim: false });
        f.render_widget(input_paragraph, area);

        let cursor_x = (self.input.cursor_x + 1) as u16;
        let cursor_y = self.input.cursor_y as u16;
        let x = (area.x + cursor_x).min(area.x + area.width.saturating_sub(2));
        let y = (area.y + 1 + cursor_y).min(area.y + area.height.saturating_sub(2));
        f.set_cursor_position((x, y));
    }
}

// Estimated height after wrapping (ceil(len/width) per line), so the follow
// scroll lands on the last entry.
fn wrapped_height(lines: &[Line<'_>], width: u16) -> u16 {
    let width = width.max(1) as usize;
    let mut total = 0usize;
    for line in lines {
        let len: usize = line
            .spans
            .iter()
            .map(|span| span.content.chars().count())
            .sum();
        total += (len.max(1) + width - 1) / width;
    }
    total as u16
}

pub fn run_tui(client: ChatClient) -> UiResult<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let _guard = TerminalGuard::new();

    let mut app = App::new(client);
    terminal.draw(|f| app.draw(f))?;

    while !app.should_quit {
        if !app.handle_events()? {
            break;
        }

        terminal.draw(|f| app.draw(f))?;
    }

    Ok(())
}
