use crossterm::event::{Event, KeyCode, KeyModifiers};
use ratatui::style::{Modifier, Style, Stylize};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    widgets::{Block, Paragraph},
    Frame,
};
use tui_textarea::TextArea;

use crate::sys::settings::{Loaded, Settings, DEFAULT_MODEL, DEFAULT_URL, KNOWN_MODELS};

use super::{Input, Output};

pub const MIN_TEMPERATURE: f64 = 0.0;
pub const MAX_TEMPERATURE: f64 = 1.5;
const TEMPERATURE_STEP: f64 = 0.1;
/// Used when there is no settings file yet.
const EDITOR_TEMPERATURE: f64 = 1.0;

/// The editor's view of a [`Settings`], as typed.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsDraft {
    pub url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: String,
}

impl SettingsDraft {
    pub fn from_loaded(loaded: &Loaded) -> Self {
        match loaded {
            Loaded::Found(settings) => Self::from_settings(settings),
            _ => Self::from_settings(&Settings {
                temperature: EDITOR_TEMPERATURE,
                ..Settings::default()
            }),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            url: settings.url.clone(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            temperature: format!("{:.2}", settings.temperature),
        }
    }

    /// Temperature is clamped to the editor range and rounded to hundredths.
    pub fn commit(&self) -> Result<Settings, String> {
        let temperature: f64 = self
            .temperature
            .trim()
            .parse()
            .map_err(|_| format!("temperature `{}` is not a number", self.temperature.trim()))?;
        if !temperature.is_finite() {
            return Err(format!("temperature `{}` is not a number", self.temperature.trim()));
        }
        let temperature = round2(temperature.clamp(MIN_TEMPERATURE, MAX_TEMPERATURE));

        let url = match self.url.trim() {
            "" => DEFAULT_URL,
            url => url,
        };
        let model = match self.model.trim() {
            "" => DEFAULT_MODEL,
            model => model,
        };

        Ok(Settings {
            url: url.to_string(),
            api_key: self.api_key.trim().to_string(),
            model: model.to_string(),
            temperature,
        })
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn next_model(current: &str, forward: bool) -> &'static str {
    let n = KNOWN_MODELS.len();
    match KNOWN_MODELS.iter().position(|m| *m == current.trim()) {
        Some(i) if forward => KNOWN_MODELS[(i + 1) % n],
        Some(i) => KNOWN_MODELS[(i + n - 1) % n],
        None => KNOWN_MODELS[0],
    }
}

const URL: usize = 0;
const API_KEY: usize = 1;
const MODEL: usize = 2;
const TEMPERATURE: usize = 3;
const TITLES: [&str; 4] = ["API URL", "API Key", "Model (↑/↓ to pick)", "Temperature (0.0 - 1.5)"];

pub struct SettingsComponent {
    fields: Vec<TextArea<'static>>,
    focus: usize,
    pub path: String,
}

impl SettingsComponent {
    pub fn new(path: String) -> Self {
        let mut component = Self {
            fields: Vec::new(),
            focus: 0,
            path,
        };
        component.reset(&SettingsDraft::from_loaded(&Loaded::Missing));
        component
    }

    pub fn reset(&mut self, draft: &SettingsDraft) {
        self.fields = [
            &draft.url,
            &draft.api_key,
            &draft.model,
            &draft.temperature,
        ]
        .into_iter()
        .map(|value| TextArea::new(vec![value.clone()]))
        .collect();
        self.fields[API_KEY].set_mask_char('*');
        self.update_focus(self.focus);
    }

    pub fn draft(&self) -> SettingsDraft {
        let value = |i: usize| self.fields[i].lines().join("");
        SettingsDraft {
            url: value(URL),
            api_key: value(API_KEY),
            model: value(MODEL),
            temperature: value(TEMPERATURE),
        }
    }

    fn replace_field(&mut self, i: usize, value: String) {
        self.fields[i] = TextArea::new(vec![value]);
        self.update_focus(self.focus);
    }

    fn update_focus(&mut self, focus: usize) {
        self.focus = focus % self.fields.len();
        for (i, field) in self.fields.iter_mut().enumerate() {
            let block = Block::bordered().title(TITLES[i]);
            if i == self.focus {
                field.set_cursor_style(Style::default().add_modifier(Modifier::REVERSED));
                field.set_block(block.yellow());
            } else {
                field.set_cursor_style(Style::default());
                field.set_block(block.gray());
            }
            field.set_cursor_line_style(Style::default());
        }
    }

    fn step(&mut self, up: bool) {
        match self.focus {
            MODEL => {
                let model = next_model(&self.draft().model, up);
                self.replace_field(MODEL, model.to_string());
            }
            TEMPERATURE => {
                let current: f64 = self.draft().temperature.trim().parse().unwrap_or(EDITOR_TEMPERATURE);
                let delta = if up { TEMPERATURE_STEP } else { -TEMPERATURE_STEP };
                let next = round2((current + delta).clamp(MIN_TEMPERATURE, MAX_TEMPERATURE));
                self.replace_field(TEMPERATURE, format!("{next:.2}"));
            }
            _ => {}
        }
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect) {
        let vertical = Layout::vertical([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(1),
        ]);
        let [url_area, key_area, model_area, temperature_area, path_area] = vertical.areas(area);

        for (field, area) in self
            .fields
            .iter()
            .zip([url_area, key_area, model_area, temperature_area])
        {
            frame.render_widget(field.widget(), area);
        }

        let path = Paragraph::new(format!("settings file: {}", self.path)).gray();
        frame.render_widget(path, path_area);
    }

    pub fn handler_input(&mut self, input: Input) -> Output {
        match input {
            Input::Event(Event::Key(key))
                if key.code == KeyCode::Char('s') && key.modifiers.contains(KeyModifiers::CONTROL) =>
            {
                match self.draft().commit() {
                    Ok(settings) => Output::SaveSettings(settings),
                    Err(e) => Output::Notice(e),
                }
            }
            Input::Event(Event::Key(key))
                if key.code == KeyCode::Char('l') && key.modifiers.contains(KeyModifiers::CONTROL) =>
            {
                Output::ReloadSettings
            }
            Input::Event(Event::Key(key)) if key.code == KeyCode::Tab || key.code == KeyCode::Enter => {
                self.update_focus(self.focus + 1);
                Output::Normal
            }
            Input::Event(Event::Key(key)) if key.code == KeyCode::BackTab => {
                self.update_focus(self.focus + self.fields.len() - 1);
                Output::Normal
            }
            Input::Event(Event::Key(key)) if key.code == KeyCode::Up || key.code == KeyCode::Down => {
                self.step(key.code == KeyCode::Up);
                Output::Normal
            }
            Input::Event(Event::Key(key)) => {
                self.fields[self.focus].input(key);
                Output::Normal
            }
            _ => Output::Normal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEvent;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> Input {
        Input::Event(Event::Key(KeyEvent::new(code, modifiers)))
    }

    fn draft() -> SettingsDraft {
        SettingsDraft {
            url: " https://api.example.test ".to_string(),
            api_key: " sk-1 ".to_string(),
            model: "deepseek-reasoner".to_string(),
            temperature: "0.733".to_string(),
        }
    }

    #[test]
    fn commit_trims_and_rounds() {
        assert_eq!(
            draft().commit().unwrap(),
            Settings {
                url: "https://api.example.test".to_string(),
                api_key: "sk-1".to_string(),
                model: "deepseek-reasoner".to_string(),
                temperature: 0.73,
            }
        );
    }

    #[test]
    fn commit_clamps_temperature_and_fills_blanks() {
        let edited = SettingsDraft {
            url: String::new(),
            model: " ".to_string(),
            temperature: "9".to_string(),
            ..draft()
        }
        .commit()
        .unwrap();
        assert_eq!(edited.url, DEFAULT_URL);
        assert_eq!(edited.model, DEFAULT_MODEL);
        assert_eq!(edited.temperature, MAX_TEMPERATURE);

        let bad = SettingsDraft {
            temperature: "warm".to_string(),
            ..draft()
        };
        assert!(bad.commit().is_err());
    }

    #[test]
    fn fresh_editor_starts_at_one() {
        let draft = SettingsDraft::from_loaded(&Loaded::Missing);
        assert_eq!(draft.temperature, "1.00");
        assert_eq!(draft.model, DEFAULT_MODEL);
    }

    #[test]
    fn editing_round_trips_through_the_component() {
        let settings = Settings {
            url: "https://x".to_string(),
            api_key: "k".to_string(),
            model: "deepseek-chat".to_string(),
            temperature: 0.5,
        };
        let mut component = SettingsComponent::new("api.key".to_string());
        component.reset(&SettingsDraft::from_settings(&settings));

        // url -> key -> model, then pick the next known model
        component.handler_input(key(KeyCode::Tab, KeyModifiers::NONE));
        component.handler_input(key(KeyCode::Tab, KeyModifiers::NONE));
        component.handler_input(key(KeyCode::Down, KeyModifiers::NONE));
        // temperature up one step
        component.handler_input(key(KeyCode::Tab, KeyModifiers::NONE));
        component.handler_input(key(KeyCode::Up, KeyModifiers::NONE));

        match component.handler_input(key(KeyCode::Char('s'), KeyModifiers::CONTROL)) {
            Output::SaveSettings(saved) => assert_eq!(
                saved,
                Settings {
                    model: "deepseek-reasoner".to_string(),
                    temperature: 0.6,
                    ..settings
                }
            ),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn model_cycle_wraps() {
        assert_eq!(next_model("deepseek-reasoner", true), "deepseek-chat");
        assert_eq!(next_model("deepseek-chat", false), "deepseek-reasoner");
        assert_eq!(next_model("custom", true), "deepseek-chat");
    }
}
