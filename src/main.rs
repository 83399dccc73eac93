use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use sys::{
    llm::{CompletionBackend, CompletionClient, DEFAULT_MAX_TOKENS},
    output::OutputWriter,
    prompt::NarrativeInputs,
    settings::{Loaded, SettingsStore},
    Assistant,
};

mod component;
mod debug_tool;
mod llm;
mod sys;

#[derive(Debug, clap::Parser)]
#[command(about = "Writes short narrative essays from seven story elements")]
struct Args {
    /// settings file, `api.key` beside the executable by default
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// where saved stories go
    #[arg(long, global = true, default_value = ".")]
    output_dir: PathBuf,

    #[arg(long, global = true, default_value_t = DEFAULT_MAX_TOKENS)]
    max_tokens: u32,

    /// echo the prompt instead of calling the API
    #[arg(long, global = true)]
    debug_llm: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    /// interactive form (default)
    Tui {
        /// prefill the form from a TOML file
        #[arg(long, short)]
        inputs: Option<PathBuf>,
    },
    /// generate one story and print it
    Generate {
        /// TOML file with the seven fields; flags override it
        #[arg(long, short)]
        inputs: Option<PathBuf>,

        #[command(flatten)]
        fields: FieldArgs,

        /// also save the story to `{date}_{suffix}.txt`
        #[arg(long)]
        save: bool,
    },
    #[command(subcommand)]
    Settings(SettingsCommand),
}

#[derive(Debug, clap::Args)]
struct FieldArgs {
    #[arg(long)]
    protagonist: Option<String>,
    #[arg(long)]
    cause: Option<String>,
    #[arg(long)]
    process: Option<String>,
    #[arg(long)]
    result: Option<String>,
    #[arg(long)]
    setting: Option<String>,
    #[arg(long)]
    characterization: Option<String>,
    #[arg(long)]
    emotion: Option<String>,
}

impl FieldArgs {
    fn apply(self, inputs: &mut NarrativeInputs) {
        let overrides = [
            (self.protagonist, &mut inputs.protagonist),
            (self.cause, &mut inputs.cause),
            (self.process, &mut inputs.process),
            (self.result, &mut inputs.result),
            (self.setting, &mut inputs.setting),
            (self.characterization, &mut inputs.characterization),
            (self.emotion, &mut inputs.emotion),
        ];
        for (value, slot) in overrides {
            if let Some(value) = value {
                *slot = value;
            }
        }
    }
}

#[derive(Debug, clap::Subcommand)]
enum SettingsCommand {
    /// print the current settings, credential masked
    Show,
    /// update some fields and save
    Set {
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        temperature: Option<f64>,
    },
}

fn loader_inputs(inputs_file_path: Option<&PathBuf>) -> anyhow::Result<NarrativeInputs> {
    let Some(path) = inputs_file_path else {
        return Ok(NarrativeInputs::default());
    };
    let inputs = std::fs::read_to_string(path)
        .map_err(|_| anyhow::anyhow!("inputs file `{}` not found", path.display()))?;
    let inputs = toml::from_str(&inputs)
        .map_err(|e| anyhow::anyhow!("inputs file `{}`: {e}", path.display()))?;
    Ok(inputs)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Args::parse();

    let store = cli
        .config
        .clone()
        .map(SettingsStore::new)
        .unwrap_or_else(SettingsStore::beside_executable);

    let backend: Box<dyn CompletionBackend> = if cli.debug_llm {
        Box::new(debug_tool::EchoBackend)
    } else {
        Box::new(CompletionClient::new()?.with_max_tokens(cli.max_tokens))
    };

    let assistant = Assistant::new(store, backend, OutputWriter::new(&cli.output_dir));

    match cli.command.unwrap_or(Command::Tui { inputs: None }) {
        Command::Tui { inputs } => {
            let inputs = loader_inputs(inputs.as_ref())?;
            let settings_path = assistant.settings_store().path().display().to_string();
            let app = component::App::new(&inputs, settings_path);

            let res = app.run_loop(Arc::new(assistant));

            if let Err(err) = res {
                println!("{err:?}");
            }
        }
        Command::Generate {
            inputs,
            fields,
            save,
        } => {
            let mut inputs = loader_inputs(inputs.as_ref())?;
            fields.apply(&mut inputs);

            let text = assistant
                .submit_inputs(&inputs)
                .map_err(|e| anyhow::anyhow!(e.report()))?;
            println!("{text}");

            if save {
                let path = assistant.save_result(&text)?;
                eprintln!("saved as {}", path.display());
            }
        }
        Command::Settings(SettingsCommand::Show) => {
            let path = assistant.settings_store().path().display().to_string();
            match assistant.load_settings() {
                Loaded::Found(settings) => {
                    println!("file:        {path}");
                    println!("url:         {}", settings.url);
                    println!("api_key:     {}", settings.masked_api_key());
                    println!("model:       {}", settings.model);
                    println!("temperature: {}", settings.temperature);
                }
                Loaded::Missing => println!("no settings at {path}"),
                Loaded::Invalid { reason } => anyhow::bail!(reason),
            }
        }
        Command::Settings(SettingsCommand::Set {
            url,
            api_key,
            model,
            temperature,
        }) => {
            let mut settings = assistant.load_settings().settings().unwrap_or_default();
            if let Some(url) = url {
                settings.url = url;
            }
            if let Some(api_key) = api_key {
                settings.api_key = api_key;
            }
            if let Some(model) = model {
                settings.model = model;
            }
            if let Some(temperature) = temperature {
                settings.temperature = temperature;
            }
            assistant.save_settings(&settings)?;
            println!(
                "saved to {}",
                assistant.settings_store().path().display()
            );
        }
    }

    Ok(())
}
