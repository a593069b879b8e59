use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use voxcable_core::{PlayOutcome, Session, SettingsManager};

use crate::commands::{handle_local_command, LocalCommandResult};
use crate::formatter::Formatter;

pub struct InteractiveApp {
    session: Session,
    formatter: Formatter,
}

impl InteractiveApp {
    pub fn new(settings_manager: &SettingsManager) -> Result<Self> {
        let settings = settings_manager.settings();
        let formatter = Formatter::new();

        let session = Session::new(&settings)?;
        match session.device_name() {
            Some(name) => formatter.print_success(&format!("Output device: {name}")),
            None => formatter.print_error(&format!(
                "No output device matching {:?}; running without playback.",
                settings.audio.device_name
            )),
        }
        if !session.local_available() {
            formatter
                .print_system("Local offline engine unavailable; only network-neural will work.");
        }

        Ok(Self { session, formatter })
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut rl = DefaultEditor::new()?;

        self.formatter
            .print_system("Type text to speak it, /help for commands, /exit to quit");

        loop {
            let line = match rl.readline("\x1b[35m>\x1b[0m ") {
                Ok(line) => line,
                Err(err) => match err {
                    ReadlineError::Interrupted => {
                        continue;
                    }
                    // Eof or a closed input stream ends the session cleanly.
                    _ => break,
                },
            };

            let input = line.trim();
            if input.is_empty() {
                continue;
            }

            match handle_local_command(&mut self.session, input) {
                LocalCommandResult::Handled { msg } => {
                    self.formatter.print_system(&msg);
                    continue;
                }
                LocalCommandResult::Exit => break,
                LocalCommandResult::Unhandled => (),
            }

            self.submit(input).await;
        }

        self.formatter.print_system("Goodbye.");
        Ok(())
    }

    async fn submit(&self, text: &str) {
        self.formatter.print_status(&format!(
            "Synthesizing with {}...",
            self.session.backend()
        ));

        match self.session.speak(text).await {
            Ok(Some(PlayOutcome::Completed)) => self.formatter.print_success("Played."),
            Ok(Some(PlayOutcome::Skipped)) => self
                .formatter
                .print_system("No playback device; clip discarded."),
            Ok(None) => {}
            Err(e) => self.formatter.print_error(&e.to_string()),
        }
    }
}
