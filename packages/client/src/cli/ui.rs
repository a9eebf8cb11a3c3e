//! UI utilities for the client.

use std::io::Write;

/// Print `text` and redisplay the prompt below it
pub fn print_above_prompt(text: &str, prompt: &str) {
    print!("{}", text);
    redisplay_prompt(prompt);
}

/// Redisplay the prompt after printing output
pub fn redisplay_prompt(prompt: &str) {
    print!("{}", prompt);
    std::io::stdout().flush().ok();
}
