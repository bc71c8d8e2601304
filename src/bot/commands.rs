//! Command enums, parsing and the help listing.

use teloxide::types::BotCommand;
use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Debug, Clone, Copy, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Start the bot")]
    Start,
    #[command(description = "Show this command list")]
    Help,
    #[command(description = "What this bot does")]
    About,
    #[command(description = "Check that the bot is alive")]
    Ping,
    #[command(description = "Tell a joke")]
    Joke,
    #[command(description = "Share a fun fact")]
    Fact,
    #[command(description = "Share a quote")]
    Quote,
    #[command(description = "Get some motivation")]
    Motivate,
    #[command(description = "Get a usage tip")]
    Tip,
    #[command(description = "Show the group rules")]
    Rules,
    #[command(description = "Say hello")]
    Hello,
    #[command(description = "How to get help")]
    Support,
    #[command(description = "Flip a coin")]
    Flip,
    #[command(description = "Roll a six-sided die")]
    Roll,
    #[command(description = "Random number from 1 to 100")]
    Random,
    #[command(rename = "8ball", description = "Ask the magic 8-ball a question")]
    EightBall,
    #[command(description = "Rate something from 0 to 10")]
    Rate,
    #[command(description = "Choose between options (a, b, c)")]
    Choose,
    #[command(description = "Get a compliment")]
    Compliment,
    #[command(description = "Get roasted")]
    Roast,
    #[command(description = "Open a fortune cookie")]
    Fortune,
    #[command(description = "Generate a random password [length]")]
    Password,
    #[command(description = "Check your luck today")]
    Luck,
    #[command(description = "Repeat your text")]
    Echo,
    #[command(description = "Reverse your text")]
    Reverse,
    #[command(description = "UPPERCASE your text")]
    Upper,
    #[command(description = "lowercase your text")]
    Lower,
    #[command(description = "Title Case your text")]
    Title,
    #[command(description = "Count characters and words")]
    Count,
    #[command(description = "mOcK your text")]
    Mock,
    #[command(description = "Add 👏 between words")]
    Clap,
    #[command(description = "Evaluate an arithmetic expression")]
    Calc,
    #[command(description = "Show your user and chat id")]
    Id,
    #[command(description = "Show the current UTC time")]
    Time,
    #[command(description = "Show how long the bot has been running")]
    Uptime,
    #[command(description = "Ask the AI a question")]
    Ask,
    #[command(description = "Translate the replied message [language]")]
    Translate,
}

/// Commands only `ADMIN_ID` may run. Never registered in the client menu.
#[derive(BotCommands, Debug, Clone, Copy, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Admin commands:")]
pub enum AdminCommand {
    #[command(description = "Pause user tracking (admin)")]
    Shutdown,
    #[command(description = "Resume user tracking (admin)")]
    Poweron,
    #[command(description = "Message every active user (admin)")]
    Broadcast,
    #[command(description = "Ban a user id (admin)")]
    Ban,
    #[command(description = "Unban a user id (admin)")]
    Unban,
    #[command(description = "Kick the replied user from the group (admin)")]
    Kick,
    #[command(description = "List banned users (admin)")]
    Banned,
    #[command(description = "Show bot statistics (admin)")]
    Stats,
    #[command(description = "List users seen this session (admin)")]
    Users,
    #[command(description = "Delete recent messages [count] (admin)")]
    Purge,
    #[command(description = "Mute the replied user [duration] (admin)")]
    Mute,
    #[command(description = "Unmute the replied user (admin)")]
    Unmute,
    #[command(description = "List scheduled unmutes (admin)")]
    Mutes,
}

/// A parsed command of either group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invocation {
    Public(Command),
    Admin(AdminCommand),
}

impl From<Command> for Invocation {
    fn from(command: Command) -> Self {
        Self::Public(command)
    }
}

impl From<AdminCommand> for Invocation {
    fn from(command: AdminCommand) -> Self {
        Self::Admin(command)
    }
}

impl Invocation {
    #[cfg(test)]
    pub fn is_admin_only(self) -> bool {
        matches!(self, Self::Admin(_))
    }

    #[cfg(test)]
    /// Every command in help order, public ones first.
    pub fn all() -> Vec<Self> {
        listing().iter().filter_map(|c| parse(&c.command, None)).map(|(command, _)| command).collect()
    }

    /// The name as typed after the slash, e.g. `8ball`.
    pub fn name(self) -> String {
        let listed = match self {
            Self::Public(_) => Command::bot_commands(),
            Self::Admin(_) => AdminCommand::bot_commands(),
        };
        listed
            .into_iter()
            .find(|c| parse(&c.command, None).is_some_and(|(command, _)| command == self))
            .map(|c| c.command.trim_start_matches('/').to_string())
            .unwrap_or_default()
    }
}

fn listing() -> Vec<BotCommand> {
    let mut commands = Command::bot_commands();
    commands.extend(AdminCommand::bot_commands());
    commands
}

/// Split `/name[@bot] args` into the command and its trimmed arguments.
///
/// Commands addressed to a different bot are ignored; with no known
/// username any `@bot` suffix is accepted. Returns `None` for plain text
/// and unknown commands.
pub fn parse<'a>(text: &'a str, bot_username: Option<&str>) -> Option<(Invocation, &'a str)> {
    let (token, args) = match text.find(char::is_whitespace) {
        Some(i) => (&text[..i], text[i..].trim()),
        None => (text, ""),
    };

    let addressed = token.split_once('@').map(|(_, name)| name);
    let bot_name = bot_username.or(addressed).unwrap_or_default();

    // Every variant is a unit variant, so only the token is parsed.
    let token = token.to_ascii_lowercase();
    let command = match Command::parse(&token, bot_name) {
        Ok(command) => Invocation::Public(command),
        Err(_) => Invocation::Admin(AdminCommand::parse(&token, bot_name).ok()?),
    };
    Some((command, args))
}

/// One line per command: `/<name> - <description>`.
pub fn help_text() -> String {
    listing()
        .iter()
        .map(|c| format!("{} - {}", c.command, c.description))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn public(command: Command) -> Option<(Invocation, &'static str)> {
        Some((Invocation::Public(command), ""))
    }

    #[test]
    fn test_parse_plain_command() {
        assert_eq!(parse("/ping", None), public(Command::Ping));
        assert_eq!(parse("/PING", None), public(Command::Ping));
        assert_eq!(parse("/ban", None), Some((Invocation::Admin(AdminCommand::Ban), "")));
    }

    #[test]
    fn test_parse_with_args() {
        assert_eq!(
            parse("/echo  hello world ", None),
            Some((Invocation::Public(Command::Echo), "hello world"))
        );
        assert_eq!(parse("/calc\n2+2", None), Some((Invocation::Public(Command::Calc), "2+2")));
    }

    #[test]
    fn test_parse_addressed_command() {
        assert_eq!(parse("/joke@quip_bot", Some("quip_bot")), public(Command::Joke));
        assert_eq!(parse("/joke@Quip_Bot", Some("quip_bot")), public(Command::Joke));
        assert_eq!(parse("/joke@other_bot", Some("quip_bot")), None);
        assert_eq!(parse("/joke@whoever", None), public(Command::Joke));
    }

    #[test]
    fn test_parse_rejects_plain_and_unknown() {
        assert_eq!(parse("hello", None), None);
        assert_eq!(parse("/doesnotexist", None), None);
        assert_eq!(parse("/", None), None);
        assert_eq!(parse("ping", None), None);
    }

    #[test]
    fn test_eight_ball_name() {
        assert_eq!(
            parse("/8ball will it work?", None),
            Some((Invocation::Public(Command::EightBall), "will it work?"))
        );
        assert_eq!(Invocation::from(Command::EightBall).name(), "8ball");
        assert_eq!(Invocation::from(AdminCommand::Poweron).name(), "poweron");
    }

    #[test]
    fn test_every_command_round_trips() {
        let all = Invocation::all();
        assert_eq!(all.len(), 50);
        for command in all {
            let text = format!("/{}", command.name());
            assert_eq!(parse(&text, None), Some((command, "")));
        }
    }

    #[test]
    fn test_help_text_format() {
        let help = help_text();
        let lines: Vec<&str> = help.lines().collect();
        assert_eq!(lines.len(), 50);
        assert_eq!(lines[0], "/start - Start the bot");
        assert!(lines.contains(&"/calc - Evaluate an arithmetic expression"));
        assert!(lines.contains(&"/8ball - Ask the magic 8-ball a question"));
    }

    #[test]
    fn test_menu_has_no_admin_commands() {
        let menu = Command::bot_commands();
        assert_eq!(menu.len(), 37);
        assert!(!menu.iter().any(|c| c.command == "/ban"));
    }

    #[test]
    fn test_admin_flags() {
        assert!(Invocation::from(AdminCommand::Ban).is_admin_only());
        assert!(Invocation::from(AdminCommand::Broadcast).is_admin_only());
        assert!(!Invocation::from(Command::Flip).is_admin_only());
    }
}
