//! Message formatting utilities for client display.

use cups_shared::time::timestamp_to_jst_rfc3339;

use crate::{
    error::ClientError,
    protocol::{ConnectionType, CupColor, QuestionInfo, QuestionPublication},
    snapshot::{ConnectionStatus, SessionSnapshot},
};

use super::input::{InputError, USAGE};

const RULE: &str = "============================================================";
const THIN_RULE: &str = "------------------------------------------------------------";

/// Session formatter for client display
pub struct SessionFormatter;

impl SessionFormatter {
    /// Format the greeting printed once the CLI starts
    pub fn format_welcome(room_name: &str, connection_type: ConnectionType, url: &str) -> String {
        format!(
            "\nJoining room '{}' as {} via {}. Type 'help' for commands, 'quit' to leave.\n",
            room_name, connection_type, url
        )
    }

    /// Format a full snapshot of the room
    ///
    /// Teachers see the cup tally and answer counts, students only see the
    /// questions.
    pub fn format_snapshot(snapshot: &SessionSnapshot, connection_type: ConnectionType) -> String {
        let mut output = String::new();
        output.push_str("\n\n");
        output.push_str(RULE);
        output.push('\n');
        output.push_str(&format!(
            "Room: {} ({})\n",
            snapshot.room_name(),
            Self::status_label(snapshot.connection_status)
        ));
        output.push_str(&format!("Participants: {}\n", snapshot.connection_count));

        if connection_type == ConnectionType::Teacher {
            let cups: Vec<String> = CupColor::ALL
                .iter()
                .map(|color| format!("{} {}", color.as_str(), snapshot.cup_tally.count(*color)))
                .collect();
            output.push_str(&format!("Cups: {}\n", cups.join(" / ")));
        }

        match &snapshot.questions {
            None => {}
            Some(questions) if questions.is_empty() => output.push_str("Questions: (none)\n"),
            Some(questions) => {
                output.push_str("Questions:\n");
                for question in questions {
                    output.push_str(&Self::format_question(question, connection_type));
                }
            }
        }

        if let Some(error) = &snapshot.error_message {
            output.push_str(&format!("Error: {}\n", error));
        }

        output.push_str(RULE);
        output.push('\n');
        output
    }

    fn format_question(question: &QuestionInfo, connection_type: ConnectionType) -> String {
        let mut line = format!("  {} {}", question.id, question.title);
        let options: Vec<String> = question
            .options
            .iter()
            .enumerate()
            .map(|(index, option)| match connection_type {
                ConnectionType::Teacher => {
                    let answers = question.answers.get(index).copied().unwrap_or(0);
                    format!("{}) {} [{}]", index, option, answers)
                }
                ConnectionType::Student => format!("{}) {}", index, option),
            })
            .collect();
        if !options.is_empty() {
            line.push_str(&format!(": {}", options.join(", ")));
        }
        line.push('\n');
        line
    }

    /// Format a published question with its closing time
    ///
    /// # Arguments
    ///
    /// * `publication` - The published question
    /// * `deadline` - Unix timestamp when answering closes (milliseconds)
    pub fn format_publication(publication: &QuestionPublication, deadline: i64) -> String {
        let mut output = format!(
            "\n\n{}\nQuestion {}: {}\n",
            THIN_RULE, publication.id, publication.title
        );
        for (index, option) in publication.options.iter().enumerate() {
            output.push_str(&format!("  {}) {}\n", index, option));
        }
        output.push_str(&format!(
            "answer with: answer {} <index>, closes at {}\n",
            publication.id.0,
            timestamp_to_jst_rfc3339(deadline)
        ));
        output.push_str(THIN_RULE);
        output.push('\n');
        output
    }

    /// Format the notice shown when the published question is withdrawn
    pub fn format_publication_withdrawn() -> String {
        "\n- The published question was withdrawn\n".to_string()
    }

    /// Format a confirmation after a command was queued
    pub fn format_sent_confirmation(task: &str) -> String {
        format!("sent {}\n", task)
    }

    /// Format a command failure
    pub fn format_command_error(error: &ClientError) -> String {
        match error {
            ClientError::NotConnected => {
                "\n! Not connected to the room, the command was not sent\n".to_string()
            }
            other => format!("\n! {}\n", other),
        }
    }

    /// Format a line that could not be parsed
    pub fn format_input_error(error: &InputError) -> String {
        match error {
            InputError::UnknownCommand(_) => format!("\n! {}\n{}\n", error, USAGE),
            _ => format!("\n! {}\n", error),
        }
    }

    pub fn format_help() -> String {
        format!("\n{}\n", USAGE)
    }

    fn status_label(status: ConnectionStatus) -> &'static str {
        match status {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Working => "updating",
            ConnectionStatus::Error => "error",
        }
    }
}
