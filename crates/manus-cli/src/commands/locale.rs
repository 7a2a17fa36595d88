//! /locale command - show and set display language

use super::CommandResult;
use manus_session::Locale;

pub struct LocaleCommand;

impl LocaleCommand {
    pub fn execute(args: &str, current: Locale) -> CommandResult {
        if args.is_empty() {
            CommandResult::Message(show_locales(current))
        } else {
            match args.parse::<Locale>() {
                Ok(locale) => CommandResult::ChangeLocale(locale),
                Err(e) => CommandResult::Message(e),
            }
        }
    }
}

fn show_locales(current: Locale) -> String {
    let mut output = String::from("Languages:\n\n");

    for locale in Locale::ALL {
        let marker = if locale == current { " *" } else { "" };
        output.push_str(&format!("  {:<4} {}{}\n", locale.code(), locale.label(), marker));
    }

    output.push_str("\nSet with: /locale <code>");
    output
}
