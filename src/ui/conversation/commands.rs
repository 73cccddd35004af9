use std::str::FromStr;

use strum::{IntoEnumIterator, AsRefStr, EnumIter, EnumString, IntoStaticStr};

/// Commands that can be invoked by starting a message with a leading slash.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, AsRefStr, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum SlashCommand {
    /// Stop the reply that is being generated
    Stop,
    /// Clear the conversation
    Clear,
    /// Show what AiRA remembers
    Memories,
    /// Forget one memory by id
    Forget,
    /// Show help
    Help,
    /// Exit the application
    Bye,
}

pub fn command_entries() -> Vec<CommandEntry> {
    SlashCommand::iter()
        .map(|command| CommandEntry {
            command,
            keyword: command.command(),
            description: command.description(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub command: SlashCommand,
    pub argument: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandEntry {
    pub command: SlashCommand,
    pub keyword: &'static str,
    pub description: &'static str,
}

impl ParsedCommand {
    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }
}

impl SlashCommand {
    /// User-visible description shown in help.
    pub fn description(self) -> &'static str {
        match self {
            SlashCommand::Stop => "stop the reply that is being generated",
            SlashCommand::Clear => "clear the conversation",
            SlashCommand::Memories => "show what AiRA remembers (optionally: /memories <category>)",
            SlashCommand::Forget => "forget a memory: /forget <id> (ids are shown by /memories)",
            SlashCommand::Help => "show available commands",
            SlashCommand::Bye => "exit the application",
        }
    }

    /// Command string without the leading '/'.
    pub fn command(self) -> &'static str {
        self.into()
    }

    /// Whether this command can be run while a reply is being generated.
    pub fn available_during_streaming(self) -> bool {
        match self {
            SlashCommand::Stop
            | SlashCommand::Memories
            | SlashCommand::Forget
            | SlashCommand::Help
            | SlashCommand::Bye => true,
            // clearing would drop the user's prompt out from under the reply
            SlashCommand::Clear => false,
        }
    }
}

/// Return all built-in commands in a Vec paired with their command string.
pub fn built_in_slash_commands() -> Vec<(&'static str, SlashCommand)> {
    SlashCommand::iter()
        .map(|c| (c.command(), c))
        .collect()
}

/// Parse a slash command from user input
pub fn parse_slash_command(input: &str) -> Option<ParsedCommand> {
    let input = input.trim();
    if !input.starts_with('/') {
        return None;
    }

    let mut parts = input[1..].split_whitespace();
    let head = parts.next()?;
    let rest: Vec<String> = parts.map(|s| s.to_string()).collect();

    let command = SlashCommand::from_str(head).ok().or_else(|| match head.to_lowercase().as_str() {
        "q" | "quit" | "exit" => Some(SlashCommand::Bye),
        "s" | "cancel" => Some(SlashCommand::Stop),
        "m" | "memory" => Some(SlashCommand::Memories),
        _ => None,
    })?;

    let argument = if rest.is_empty() {
        None
    } else {
        Some(rest.join(" "))
    };

    Some(ParsedCommand { command, argument })
}

/// Get help text for all available commands
pub fn get_help_text() -> String {
    let mut help = String::from("Available commands:\n\n");
    for (command_str, command) in built_in_slash_commands() {
        help.push_str(&format!("/{} - {}\n", command_str, command.description()));
    }

    help.push_str("\nAliases: /q for /bye, /s for /stop, /m for /memories.");
    help.push_str("\nPress Esc while AiRA is replying to stop generation.");

    help
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_and_arguments() {
        let parsed = parse_slash_command("/memories preferences").unwrap();
        assert_eq!(parsed.command, SlashCommand::Memories);
        assert_eq!(parsed.argument(), Some("preferences"));

        let parsed = parse_slash_command("/stop").unwrap();
        assert_eq!(parsed.command, SlashCommand::Stop);
        assert_eq!(parsed.argument(), None);
    }

    #[test]
    fn forget_takes_an_id() {
        let parsed = parse_slash_command("/forget 3").unwrap();
        assert_eq!(parsed.command, SlashCommand::Forget);
        assert_eq!(parsed.argument(), Some("3"));
    }

    #[test]
    fn resolves_aliases() {
        assert_eq!(parse_slash_command("/q").unwrap().command, SlashCommand::Bye);
        assert_eq!(parse_slash_command("/s").unwrap().command, SlashCommand::Stop);
        assert_eq!(parse_slash_command("/m about").unwrap().command, SlashCommand::Memories);
    }

    #[test]
    fn plain_text_and_unknown_commands_are_not_commands() {
        assert!(parse_slash_command("hello there").is_none());
        assert!(parse_slash_command("/dance").is_none());
        assert!(parse_slash_command("/").is_none());
    }

    #[test]
    fn help_lists_every_command() {
        let help = get_help_text();
        for entry in command_entries() {
            assert!(help.contains(&format!("/{}", entry.keyword)));
        }
    }

    #[test]
    fn clear_waits_for_generation() {
        assert!(SlashCommand::Stop.available_during_streaming());
        assert!(!SlashCommand::Clear.available_during_streaming());
    }
}
