use handlebars::Handlebars;

use super::error::{Error, Result};

pub const SYSTEM_INSTRUCTION: &str = "你是一个专业的写作助手";

const NARRATIVE_TEMPLATE: &str = concat!(
    "根据以下写作要素创作一篇中小学生记叙文：\n",
    "        主要人物：{{protagonist}}\n",
    "        事件起因：{{cause}}\n",
    "        事件经过：{{process}}\n",
    "        事件结果：{{result}}\n",
    "        环境描写：{{setting}}\n",
    "        人物描写：{{characterization}}\n",
    "        情感表达：{{emotion}}\n",
    "        \n",
    "        要求语言生动，结构清晰，人物神态、动作等描写生动，适合中小学生阅读。",
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Protagonist,
    Cause,
    Process,
    Result,
    Setting,
    Characterization,
    Emotion,
}

impl Field {
    /// Form order, which is also template order.
    pub const ALL: [Field; 7] = [
        Field::Protagonist,
        Field::Cause,
        Field::Process,
        Field::Result,
        Field::Setting,
        Field::Characterization,
        Field::Emotion,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Field::Protagonist => "主要人物",
            Field::Cause => "事件起因",
            Field::Process => "事件经过",
            Field::Result => "事件结果",
            Field::Setting => "环境描写",
            Field::Characterization => "人物描写",
            Field::Emotion => "情感表达",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct NarrativeInputs {
    pub protagonist: String,
    pub cause: String,
    pub process: String,
    pub result: String,
    pub setting: String,
    pub characterization: String,
    pub emotion: String,
}

impl NarrativeInputs {
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Protagonist => &self.protagonist,
            Field::Cause => &self.cause,
            Field::Process => &self.process,
            Field::Result => &self.result,
            Field::Setting => &self.setting,
            Field::Characterization => &self.characterization,
            Field::Emotion => &self.emotion,
        }
    }

    pub fn get_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Protagonist => &mut self.protagonist,
            Field::Cause => &mut self.cause,
            Field::Process => &mut self.process,
            Field::Result => &mut self.result,
            Field::Setting => &mut self.setting,
            Field::Characterization => &mut self.characterization,
            Field::Emotion => &mut self.emotion,
        }
    }

    pub fn trimmed(&self) -> Self {
        let mut out = Self::default();
        for field in Field::ALL {
            *out.get_mut(field) = self.get(field).trim().to_string();
        }
        out
    }

    /// Every field is checked before failing, so the error names all of the
    /// empty ones at once.
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&'static str> = Field::ALL
            .into_iter()
            .filter(|f| self.get(*f).trim().is_empty())
            .map(Field::label)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation { missing })
        }
    }
}

pub struct PromptBuilder {
    registry: Handlebars<'static>,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptBuilder {
    pub fn new() -> Self {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        registry.set_strict_mode(true);
        Self { registry }
    }

    pub fn build(&self, inputs: &NarrativeInputs) -> Result<String> {
        inputs.validate()?;
        let prompt = self
            .registry
            .render_template(NARRATIVE_TEMPLATE, &inputs.trimmed())?;
        log::debug!("prompt:\n{prompt}");
        Ok(prompt)
    }
}
