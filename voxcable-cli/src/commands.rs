use voxcable_core::{BackendKind, Session};

pub enum LocalCommandResult {
    Handled {
        msg: String,
    },

    /// A command to exit the app was detected
    Exit,

    /// The input was not a command and should be synthesized as speech
    Unhandled,
}

pub fn handle_local_command(session: &mut Session, input: &str) -> LocalCommandResult {
    let lower = input.trim().to_ascii_lowercase();
    match lower.as_str() {
        "/exit" | "/quit" => LocalCommandResult::Exit,
        "/help" => LocalCommandResult::Handled { msg: help_text() },
        _ if lower.starts_with("/tts") => handle_tts(session, &lower),
        _ => LocalCommandResult::Unhandled,
    }
}

fn handle_tts(session: &mut Session, input: &str) -> LocalCommandResult {
    let mut parts = input.split_whitespace();
    parts.next(); // "/tts"

    let Some(value) = parts.next() else {
        return LocalCommandResult::Handled {
            msg: format!(
                "Active backend: {}. Switch with /tts network-neural or /tts local-offline.",
                session.backend()
            ),
        };
    };

    match value.parse::<BackendKind>() {
        Ok(kind) => {
            session.set_backend(kind);
            LocalCommandResult::Handled {
                msg: format!("Backend switched to: {kind}"),
            }
        }
        // Invalid values never touch the session state.
        Err(e) => LocalCommandResult::Handled {
            msg: format!("{e}. Backend left at: {}.", session.backend()),
        },
    }
}

fn help_text() -> String {
    "Type text and press Enter to speak it into the virtual cable.\n\
     Commands:\n\
       /tts network-neural   switch to the network neural backend (default)\n\
       /tts local-offline    switch to the local offline backend\n\
       /tts                  show the active backend\n\
       /help                 show this help\n\
       /exit                 quit"
        .to_string()
}
