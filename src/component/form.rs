use crossterm::event::{Event, KeyCode, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Position;
use ratatui::style::{Color, Modifier, Style, Stylize};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    text::{Line, Text},
    widgets::{Block, Paragraph},
    Frame,
};
use tui_textarea::TextArea;

use crate::sys::prompt::{Field, NarrativeInputs};

use super::{Input, Output};

/// Splits `content` into lines no wider than `max_len` cells, counting
/// non-ASCII characters as two cells.
pub fn wrap_text(content: &str, max_len: usize, style: Style) -> Text<'static> {
    let mut text = Text::default();
    let max_len = max_len.max(1);
    let mut s = String::with_capacity(max_len);
    let mut len = 0;
    for c in content.chars() {
        if c == '\n' {
            text.lines.push(Line::styled(std::mem::take(&mut s), style));
            len = 0;
            continue;
        }
        let w = if c.is_ascii() { 1 } else { 2 };
        if len + w > max_len {
            text.lines.push(Line::styled(std::mem::take(&mut s), style));
            len = 0;
        }
        s.push(c);
        len += w;
    }
    text.lines.push(Line::styled(s, style));
    text
}

pub struct ResultComponent {
    pub text: String,
    pub error: Option<String>,
    cursor: (u16, u16),
    last_mouse_event: MouseEvent,
    area: Rect,
    active: bool,
}

impl ResultComponent {
    pub fn new() -> Self {
        Self {
            text: String::new(),
            error: None,
            cursor: (0, 0),
            active: false,
            area: Rect::default(),
            last_mouse_event: MouseEvent {
                row: 0,
                column: 0,
                kind: MouseEventKind::Moved,
                modifiers: KeyModifiers::empty(),
            },
        }
    }

    pub fn set_text(&mut self, text: String) {
        self.text = text;
        self.error = None;
        self.cursor = (0, 0);
    }

    pub fn set_error(&mut self, error: String) {
        self.error = Some(error);
        self.cursor = (0, 0);
    }

    fn update_active(&mut self, event: MouseEvent) {
        if event.kind == MouseEventKind::Down(MouseButton::Left) {
            self.active = self.area.contains(Position::new(event.column, event.row))
        }
        if event.kind == MouseEventKind::Drag(MouseButton::Left) && self.active {
            let delta_y = event.row as i16 - self.last_mouse_event.row as i16;
            self.cursor.0 = (self.cursor.0 as i16 - delta_y).max(0) as u16;
        }
        self.last_mouse_event = event;
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect) {
        self.area = area;
        let (body, style, title) = match &self.error {
            Some(error) => (error.as_str(), Style::new().fg(Color::Red), "Error"),
            None => (self.text.as_str(), Style::new(), "生成内容"),
        };

        let max_len = area.width.saturating_sub(2) as usize;
        let text = wrap_text(body, max_len, style);

        let max_line = area.height.saturating_sub(2) as usize;
        let max_cursor = text.lines.len().saturating_sub(max_line) as u16;
        self.cursor.0 = self.cursor.0.min(max_cursor);

        let paragraph = Paragraph::new(text)
            .block(Block::bordered().title(title).gray())
            .scroll(self.cursor);
        frame.render_widget(paragraph, area);
    }

    pub fn scroll(&mut self, delta: i16) {
        self.cursor.0 = (self.cursor.0 as i16 + delta).max(0) as u16;
    }

    pub fn handler_input(&mut self, input: Input) {
        if let Input::Event(Event::Mouse(event)) = input {
            match event.kind {
                MouseEventKind::ScrollDown => self.scroll(3),
                MouseEventKind::ScrollUp => self.scroll(-3),
                _ => {}
            }
            self.update_active(event);
        }
    }
}

pub struct FormComponent {
    inputs: Vec<TextArea<'static>>,
    focus: usize,
    pub result: ResultComponent,
}

impl FormComponent {
    pub fn new() -> Self {
        let mut form = Self {
            inputs: Field::ALL.iter().map(|_| TextArea::default()).collect(),
            focus: 0,
            result: ResultComponent::new(),
        };
        form.update_focus(0);
        form
    }

    pub fn with_inputs(inputs: &NarrativeInputs) -> Self {
        let mut form = Self::new();
        for (textarea, field) in form.inputs.iter_mut().zip(Field::ALL) {
            textarea.insert_str(inputs.get(field));
        }
        form
    }

    pub fn inputs(&self) -> NarrativeInputs {
        let mut inputs = NarrativeInputs::default();
        for (textarea, field) in self.inputs.iter().zip(Field::ALL) {
            *inputs.get_mut(field) = textarea.lines().join("\n");
        }
        inputs
    }

    fn update_focus(&mut self, focus: usize) {
        self.focus = focus % self.inputs.len();
        for (i, (textarea, field)) in self.inputs.iter_mut().zip(Field::ALL).enumerate() {
            let block = Block::bordered().title(field.label());
            if i == self.focus {
                textarea.set_cursor_style(Style::default().add_modifier(Modifier::REVERSED));
                textarea.set_block(block.yellow());
            } else {
                textarea.set_cursor_style(Style::default());
                textarea.set_block(block.gray());
            }
            textarea.set_cursor_line_style(Style::default());
        }
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect) {
        let horizontal = Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]);
        let [inputs_area, result_area] = horizontal.areas(area);

        let mut constraints = vec![Constraint::Length(3)];
        constraints.extend((1..self.inputs.len()).map(|_| Constraint::Fill(1)));
        let rows = Layout::vertical(constraints).split(inputs_area);

        for (textarea, row) in self.inputs.iter().zip(rows.iter()) {
            frame.render_widget(textarea.widget(), *row);
        }
        self.result.render(frame, result_area);
    }

    pub fn handler_input(&mut self, input: Input) -> Output {
        match input {
            Input::Event(Event::Key(key))
                if key.code == KeyCode::Char('g') && key.modifiers.contains(KeyModifiers::CONTROL) =>
            {
                self.result.error = None;
                Output::Generate(self.inputs())
            }
            Input::Event(Event::Key(key))
                if key.code == KeyCode::Char('s') && key.modifiers.contains(KeyModifiers::CONTROL) =>
            {
                self.result.error = None;
                Output::SaveResult(self.result.text.clone())
            }
            Input::Event(Event::Key(key)) if key.code == KeyCode::Tab => {
                self.update_focus(self.focus + 1);
                Output::Normal
            }
            Input::Event(Event::Key(key)) if key.code == KeyCode::BackTab => {
                self.update_focus(self.focus + self.inputs.len() - 1);
                Output::Normal
            }
            Input::Event(Event::Key(key)) if key.code == KeyCode::PageDown => {
                self.result.scroll(10);
                Output::Normal
            }
            Input::Event(Event::Key(key)) if key.code == KeyCode::PageUp => {
                self.result.scroll(-10);
                Output::Normal
            }
            Input::Event(Event::Key(key)) => {
                self.inputs[self.focus].input(key);
                Output::Normal
            }
            input => {
                self.result.handler_input(input);
                Output::Normal
            }
        }
    }
}
