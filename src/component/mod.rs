use std::{sync::Arc, time::Duration};

use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout},
    widgets::{Block, Paragraph, Tabs},
    Frame, Terminal,
};

use crate::llm::worker::{GenerationWorker, Message};
use crate::sys::{prompt::NarrativeInputs, settings::Settings, Assistant};

pub mod form;
pub mod settings;

#[derive(Debug)]
pub enum Input {
    Event(Event),
    Message(Message),
}

#[derive(Debug)]
pub enum Output {
    Exit,
    Generate(NarrativeInputs),
    SaveResult(String),
    SaveSettings(Settings),
    ReloadSettings,
    Notice(String),
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Compose,
    Settings,
}

pub struct App {
    pub form: form::FormComponent,
    pub settings: settings::SettingsComponent,
    tab: Tab,
    generating: bool,
    exit_n: u8,
    pub event: String,
}

impl App {
    pub fn new(inputs: &NarrativeInputs, settings_path: String) -> Self {
        Self {
            form: form::FormComponent::with_inputs(inputs),
            settings: settings::SettingsComponent::new(settings_path),
            tab: Tab::Compose,
            generating: false,
            exit_n: 0,
            event: String::new(),
        }
    }

    pub fn render(&mut self, f: &mut Frame) {
        let vertical = Layout::vertical([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ]);

        let [tabs_area, main_area, help_area, event_area] = vertical.areas(f.size());

        let tabs = Tabs::new(vec!["Compose", "Settings"])
            .select(self.tab as usize)
            .padding("[", "]")
            .block(Block::bordered().title("记叙文写作助手"));
        f.render_widget(tabs, tabs_area);

        let help = match self.tab {
            Tab::Compose => {
                "help: [Tab field] [Ctrl+G generate] [Ctrl+S save story] [PgUp/PgDn scroll] [Ctrl+T settings] [Esc+Esc quit]"
            }
            Tab::Settings => {
                "help: [Tab field] [↑/↓ model, temperature] [Ctrl+S save] [Ctrl+L reload] [Ctrl+T compose] [Esc+Esc quit]"
            }
        };

        match self.tab {
            Tab::Compose => self.form.render(f, main_area),
            Tab::Settings => self.settings.render(f, main_area),
        }

        f.render_widget(Paragraph::new(help), help_area);
        f.render_widget(Paragraph::new(self.event.as_str()), event_area);
    }

    fn reload_settings(&mut self, assistant: &Assistant) {
        let loaded = assistant.load_settings();
        self.settings
            .reset(&settings::SettingsDraft::from_loaded(&loaded));
        self.event = match loaded.warning() {
            Some(warning) => warning.to_string(),
            None => "settings loaded".to_string(),
        };
    }

    /// Global keys first, then the active tab.
    pub fn handler_input(&mut self, input: Input) -> Output {
        let is_event = matches!(&input, Input::Event(..));

        let output = match input {
            Input::Event(Event::Key(key)) if key.kind != KeyEventKind::Press => Output::Normal,
            Input::Event(Event::Key(key)) if key.code == KeyCode::Esc => {
                self.exit_n += 2;
                if self.exit_n >= 3 {
                    return Output::Exit;
                }
                Output::Normal
            }
            Input::Event(Event::Key(key))
                if key.code == KeyCode::Char('t') && key.modifiers.contains(KeyModifiers::CONTROL) =>
            {
                self.tab = match self.tab {
                    Tab::Compose => Tab::Settings,
                    Tab::Settings => Tab::Compose,
                };
                Output::Normal
            }
            Input::Message(Message::Generated(result)) => {
                self.generating = false;
                match result {
                    Ok(text) => {
                        self.event = format!("generated {} characters", text.chars().count());
                        self.form.result.set_text(text);
                    }
                    Err(e) => {
                        self.event = format!("generation failed: {}", e.lines().next().unwrap_or_default());
                        self.form.result.set_error(e);
                    }
                }
                Output::Normal
            }
            Input::Message(Message::Generate(_)) => Output::Normal,
            input => match self.tab {
                Tab::Compose => self.form.handler_input(input),
                Tab::Settings => self.settings.handler_input(input),
            },
        };

        if is_event {
            self.exit_n = self.exit_n.max(1) - 1;
        }
        output
    }

    pub fn run_loop(mut self, assistant: Arc<Assistant>) -> anyhow::Result<()> {
        self.reload_settings(&assistant);
        let (tx, rx, _worker) = GenerationWorker::spawn(assistant.clone());

        // setup terminal
        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let mut main_loop = || -> anyhow::Result<()> {
            loop {
                terminal.draw(|f| self.render(f))?;

                let input = if self.generating {
                    if let Ok(message) = rx.try_recv() {
                        Input::Message(message)
                    } else if event::poll(Duration::from_millis(50))? {
                        Input::Event(event::read()?)
                    } else {
                        continue;
                    }
                } else {
                    Input::Event(event::read()?)
                };

                match self.handler_input(input) {
                    Output::Exit => break,
                    Output::Generate(_) if self.generating => {
                        self.event = "a story is already being generated".to_string();
                    }
                    Output::Generate(inputs) => {
                        tx.send(Message::Generate(inputs))?;
                        self.generating = true;
                        self.event = "generating...".to_string();
                    }
                    Output::SaveResult(text) => {
                        self.event = match assistant.save_result(&text) {
                            Ok(path) => format!("saved as {}", path.display()),
                            Err(e) => format!("save failed: {e}"),
                        };
                    }
                    Output::SaveSettings(settings) => {
                        self.event = match assistant.save_settings(&settings) {
                            Ok(()) => "settings saved".to_string(),
                            Err(e) => format!("settings not saved: {e}"),
                        };
                    }
                    Output::ReloadSettings => self.reload_settings(&assistant),
                    Output::Notice(notice) => self.event = notice,
                    Output::Normal => {}
                }
            }
            Ok(())
        };

        let r = main_loop();

        // restore terminal
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;
        r
    }
}
