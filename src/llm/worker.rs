use std::sync::Arc;

use crossbeam::channel::{Receiver, Sender};

use crate::sys::{prompt::NarrativeInputs, Assistant};

#[derive(Debug, Clone)]
pub enum Message {
    Generate(NarrativeInputs),
    Generated(Result<String, String>),
}

pub type MessageTx = Sender<Message>;
pub type MessageRx = Receiver<Message>;

/// Runs completion calls off the UI thread, one at a time, in arrival order.
pub struct GenerationWorker {
    assistant: Arc<Assistant>,
    rx: MessageRx,
    tx: MessageTx,
}

impl GenerationWorker {
    pub fn new(assistant: Arc<Assistant>, rx: MessageRx, tx: MessageTx) -> Self {
        Self { assistant, rx, tx }
    }

    /// Spawns the worker thread and hands back the UI's ends of the channels.
    pub fn spawn(
        assistant: Arc<Assistant>,
    ) -> (MessageTx, MessageRx, std::thread::JoinHandle<anyhow::Result<()>>) {
        let (request_tx, request_rx) = crossbeam::channel::unbounded();
        let (reply_tx, reply_rx) = crossbeam::channel::unbounded();
        let handle = std::thread::spawn(move || {
            GenerationWorker::new(assistant, request_rx, reply_tx).run_loop()
        });
        (request_tx, reply_rx, handle)
    }

    /// Returns once the UI drops its sender.
    pub fn run_loop(&mut self) -> anyhow::Result<()> {
        while let Ok(message) = self.rx.recv() {
            let inputs = match message {
                Message::Generate(inputs) => inputs,
                Message::Generated(_) => continue,
            };

            let result = self
                .assistant
                .submit_inputs(&inputs)
                .map_err(|e| e.report());
            if let Err(e) = &result {
                log::warn!("generation failed: {e}");
            }

            if self.tx.send(Message::Generated(result)).is_err() {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug_tool::EchoBackend;
    use crate::sys::{
        output::OutputWriter,
        settings::{Settings, SettingsStore, SETTINGS_FILE_NAME},
    };

    #[test]
    fn replies_in_order_and_stops_with_the_sender() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join(SETTINGS_FILE_NAME));
        store.save(&Settings::with_api_key("k")).unwrap();
        let assistant = Assistant::new(store, Box::new(EchoBackend), OutputWriter::new(dir.path()));

        let (tx, rx, handle) = GenerationWorker::spawn(Arc::new(assistant));

        tx.send(Message::Generate(NarrativeInputs::default())).unwrap();
        let mut inputs = NarrativeInputs::default();
        for field in crate::sys::prompt::Field::ALL {
            *inputs.get_mut(field) = "x".to_string();
        }
        tx.send(Message::Generate(inputs)).unwrap();

        match rx.recv().unwrap() {
            Message::Generated(Err(e)) => assert!(e.contains("主要人物")),
            other => panic!("unexpected {other:?}"),
        }
        match rx.recv().unwrap() {
            Message::Generated(Ok(text)) => assert!(text.starts_with("根据以下写作要素")),
            other => panic!("unexpected {other:?}"),
        }

        drop(tx);
        handle.join().unwrap().unwrap();
    }
}
