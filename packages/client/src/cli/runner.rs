//! Interactive client loop.

use cups_shared::time::{SystemClock, deadline_after};
use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::mpsc;

use crate::{error::ClientError, session::Session};

use super::{
    domain::{connection_ended, should_render},
    formatter::SessionFormatter,
    input::{self, Input},
    ui::{print_above_prompt, redisplay_prompt},
};

/// Run the interactive client until the user quits or the connection ends
pub async fn run_client(session: Session) -> Result<(), ClientError> {
    let prompt = format!("{}> ", session.room_name());
    print!(
        "{}",
        SessionFormatter::format_welcome(
            session.room_name(),
            session.connection_type(),
            session.endpoint()
        )
    );

    let mut publications = session.publications();
    let mut observer = session.subscribe();
    let mut input_rx = spawn_readline(prompt.clone());

    let clock = SystemClock;
    let mut last_rendered = None;

    let result = loop {
        tokio::select! {
            changed = observer.changed() => {
                let Some(snapshot) = changed else {
                    break Ok(());
                };

                // Connected and Disconnected may arrive coalesced, so ask the
                // connection rather than the snapshots seen so far
                if let Some(reason) = connection_ended(
                    &snapshot,
                    session.connection_state(),
                    session.has_opened(),
                    session.endpoint(),
                ) {
                    break Err(reason);
                }

                if should_render(&snapshot, last_rendered.as_ref()) {
                    let formatted =
                        SessionFormatter::format_snapshot(&snapshot, session.connection_type());
                    print_above_prompt(&formatted, &prompt);
                    last_rendered = Some(snapshot);
                }
            }
            changed = publications.changed() => {
                match changed {
                    Some(Some(publication)) => {
                        let deadline = deadline_after(&clock, publication.secs);
                        let formatted = SessionFormatter::format_publication(&publication, deadline);
                        print_above_prompt(&formatted, &prompt);
                    }
                    Some(None) => print_above_prompt(
                        &SessionFormatter::format_publication_withdrawn(),
                        &prompt,
                    ),
                    None => break Ok(()),
                }
            }
            line = input_rx.recv() => {
                // Readline thread ended (Ctrl+C / Ctrl+D)
                let Some(line) = line else {
                    break Ok(());
                };

                match input::parse(&line) {
                    Ok(Input::Quit) => break Ok(()),
                    Ok(Input::Help) => print!("{}", SessionFormatter::format_help()),
                    Ok(request) => {
                        let task = task_name(&request);
                        match dispatch(&session, request) {
                            Ok(()) => print!("{}", SessionFormatter::format_sent_confirmation(task)),
                            Err(e) => print!("{}", SessionFormatter::format_command_error(&e)),
                        }
                    }
                    Err(input::InputError::Empty) => {}
                    Err(e) => print!("{}", SessionFormatter::format_input_error(&e)),
                }
                redisplay_prompt(&prompt);
            }
        }
    };

    session.close();
    match &result {
        Ok(()) => tracing::info!("Left room '{}'", session.room_name()),
        Err(e) => tracing::warn!("Session for room '{}' ended: {}", session.room_name(), e),
    }
    result
}

/// Hand a parsed request to the session's command façade
fn dispatch(session: &Session, request: Input) -> Result<(), ClientError> {
    match request {
        Input::Cup(color) => session.choose_cup(color),
        Input::Create(definition) => session.create_question(definition),
        Input::Publish { id, secs } => session.publish_question(id, secs),
        Input::Answer { id, answer } => session.answer_question(id, answer),
        Input::Delete(id) => session.delete_question(id),
        Input::Modify(modification) => session.modify_question(modification),
        Input::Help | Input::Quit => Ok(()),
    }
}

fn task_name(request: &Input) -> &'static str {
    match request {
        Input::Cup(_) => "ChooseCup",
        Input::Create(_) => "CreateQuestion",
        Input::Publish { .. } => "PublishQuestion",
        Input::Answer { .. } => "AnswerQuestion",
        Input::Delete(_) => "DeleteQuestion",
        Input::Modify(_) => "ModifyQuestion",
        Input::Help => "help",
        Input::Quit => "quit",
    }
}

/// Read lines on a blocking thread, since rustyline is synchronous
fn spawn_readline(prompt: String) -> mpsc::UnboundedReceiver<String> {
    let (input_tx, input_rx) = mpsc::unbounded_channel::<String>();

    std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                tracing::error!("Failed to initialize readline: {}", e);
                return;
            }
        };

        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        rl.add_history_entry(line).ok();
                    }
                    if input_tx.send(line.to_string()).is_err() {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    input_rx
}
