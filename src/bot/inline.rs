//! Inline-query dispatcher: keyword matching over a fixed, ordered pattern list.

use tracing::{debug, warn};

use crate::bot::calc;
use crate::bot::replies;
use crate::bot::state::AppState;
use crate::bot::telegram;
use crate::bot::textgen;

/// One selectable inline result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineEntry {
    pub title: String,
    pub description: String,
    /// Text inserted into the chat when the entry is picked.
    pub text: String,
}

impl InlineEntry {
    fn new(title: &str, description: &str, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            title: title.to_string(),
            description: description.to_string(),
            text: telegram::truncate(&text).into_owned(),
        }
    }
}

/// Zero-argument keywords, matched exactly.
const EXACT: &[&str] = &[
    "joke", "fact", "quote", "motivate", "tip", "ping", "flip", "roll", "random", "compliment", "roast",
    "fortune", "luck", "password",
];

/// Argument-taking keywords, matched as `keyword<space>argument`.
const PREFIX: &[&str] = &[
    "echo", "reverse", "upper", "lower", "mock", "clap", "rate", "choose", "8ball", "calc", "ask",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matched<'a> {
    Exact(&'static str),
    Prefix(&'static str, &'a str),
}

/// Find the first pattern that matches the trimmed query.
///
/// Keywords are compared ASCII case-insensitively; the argument keeps the
/// caller's casing.
pub fn match_query(query: &str) -> Option<Matched<'_>> {
    let query = query.trim();
    if query.is_empty() {
        return None;
    }

    if let Some(keyword) = EXACT.iter().copied().find(|kw| query.eq_ignore_ascii_case(kw)) {
        return Some(Matched::Exact(keyword));
    }

    PREFIX.iter().find_map(|&keyword| {
        let head = query.get(..keyword.len())?;
        let rest = query.get(keyword.len()..)?;
        if !head.eq_ignore_ascii_case(keyword) || !rest.starts_with(' ') {
            return None;
        }
        let arg = rest.trim();
        (!arg.is_empty()).then_some(Matched::Prefix(keyword, arg))
    })
}

pub fn help_entry() -> InlineEntry {
    let text = format!(
        "🤖 Inline keywords:\n{}\n\nWith text: {}",
        EXACT.join(", "),
        PREFIX.iter().map(|k| format!("{k} <text>")).collect::<Vec<_>>().join(", ")
    );
    InlineEntry::new("Help", "Type a keyword like joke, flip, calc 2+2 or ask ...", text)
}

/// Answer an inline query. The result always holds at least one entry.
pub async fn answer(state: &AppState, query: &str) -> Vec<InlineEntry> {
    let entry = match match_query(query) {
        Some(Matched::Exact(keyword)) => exact_entry(keyword),
        Some(Matched::Prefix(keyword, arg)) => prefix_entry(state, keyword, arg).await,
        None => None,
    };

    match entry {
        Some(entry) => vec![entry],
        None => {
            debug!("Inline query {:?} fell back to help", query);
            vec![help_entry()]
        }
    }
}

fn exact_entry(keyword: &str) -> Option<InlineEntry> {
    let entry = match keyword {
        "joke" => InlineEntry::new("Joke", "Send a joke", replies::joke()),
        "fact" => InlineEntry::new("Fact", "Send a fun fact", replies::fact()),
        "quote" => InlineEntry::new("Quote", "Send a quote", replies::quote()),
        "motivate" => InlineEntry::new("Motivation", "Send some motivation", replies::motivate()),
        "tip" => InlineEntry::new("Tip", "Send a usage tip", replies::tip()),
        "ping" => InlineEntry::new("Ping", "Pong!", replies::ping()),
        "flip" => InlineEntry::new("Flip a coin", "Heads or tails?", replies::flip()),
        "roll" => InlineEntry::new("Roll a die", "1 to 6", replies::roll()),
        "random" => InlineEntry::new("Random number", "1 to 100", replies::random_number()),
        "compliment" => InlineEntry::new("Compliment", "Send a compliment", replies::compliment()),
        "roast" => InlineEntry::new("Roast", "Send a roast", replies::roast()),
        "fortune" => InlineEntry::new("Fortune cookie", "Open a fortune cookie", replies::fortune()),
        "luck" => InlineEntry::new("Luck", "How lucky are you today?", replies::luck()),
        "password" => InlineEntry::new(
            "Password",
            "Random 16-character password",
            replies::password(replies::PASSWORD_DEFAULT),
        ),
        _ => return None,
    };
    Some(entry)
}

async fn prefix_entry(state: &AppState, keyword: &str, arg: &str) -> Option<InlineEntry> {
    let entry = match keyword {
        "echo" => InlineEntry::new("Echo", arg, arg),
        "reverse" => InlineEntry::new("Reverse", arg, replies::reverse(arg)),
        "upper" => InlineEntry::new("Uppercase", arg, replies::upper(arg)),
        "lower" => InlineEntry::new("Lowercase", arg, replies::lower(arg)),
        "mock" => InlineEntry::new("Mock", arg, replies::mock(arg)),
        "clap" => InlineEntry::new("Clap", arg, replies::clap(arg)),
        "rate" => InlineEntry::new("Rate", arg, replies::rate(arg)),
        "8ball" => InlineEntry::new("Magic 8-ball", arg, replies::eight_ball(arg)),
        "choose" => {
            let text = replies::choose(arg).unwrap_or_else(|| "Give me at least two options.".to_string());
            InlineEntry::new("Choose", arg, text)
        }
        "calc" => {
            let text = match calc::evaluate(arg) {
                Ok(value) => format!("{} = {}", calc::sanitize(arg), calc::format_number(value)),
                Err(e) => {
                    debug!("Inline calc {:?} failed: {}", arg, e);
                    replies::INVALID_EXPRESSION.to_string()
                }
            };
            InlineEntry::new("Calculate", arg, text)
        }
        "ask" => {
            let text = match state.textgen.generate(&textgen::ask_prompt(arg)).await {
                Ok(answer) => format!("❓ {arg}\n\n{answer}"),
                Err(e) => {
                    warn!("Inline ask failed: {}", e);
                    replies::SERVICE_FAILURE.to_string()
                }
            };
            InlineEntry::new("Ask AI", arg, text)
        }
        _ => return None,
    };
    Some(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::database::Database;
    use crate::bot::textgen::TextGenerator;

    fn state() -> AppState {
        AppState::new(None, Database::in_memory().unwrap(), TextGenerator::disabled())
    }

    #[test]
    fn test_match_exact() {
        assert_eq!(match_query("joke"), Some(Matched::Exact("joke")));
        assert_eq!(match_query("  FLIP "), Some(Matched::Exact("flip")));
        assert_eq!(match_query("jokes"), None);
    }

    #[test]
    fn test_match_prefix_keeps_argument_case() {
        assert_eq!(match_query("Echo Hello World"), Some(Matched::Prefix("echo", "Hello World")));
        assert_eq!(match_query("calc 2+2"), Some(Matched::Prefix("calc", "2+2")));
    }

    #[test]
    fn test_prefix_needs_space_and_argument() {
        assert_eq!(match_query("echohello"), None);
        assert_eq!(match_query("echo"), None);
        assert_eq!(match_query("echo    "), None);
    }

    #[test]
    fn test_non_ascii_query_does_not_panic() {
        assert_eq!(match_query("ёжик"), None);
        assert_eq!(match_query("échoé"), None);
    }

    #[tokio::test]
    async fn test_flip_returns_one_coin_face() {
        let results = answer(&state(), "flip").await;
        assert_eq!(results.len(), 1);
        assert!(replies::coin_faces().contains(&results[0].text.as_str()));
    }

    #[tokio::test]
    async fn test_empty_and_unknown_fall_back_to_help() {
        for query in ["", "   ", "doesnotexist"] {
            let results = answer(&state(), query).await;
            assert_eq!(results, vec![help_entry()], "query {query:?}");
        }
    }

    #[tokio::test]
    async fn test_calc_shares_command_contract() {
        let results = answer(&state(), "calc 2+2").await;
        assert_eq!(results[0].text, "2+2 = 4");

        let results = answer(&state(), "calc 10/0").await;
        assert_eq!(results[0].text, replies::INVALID_EXPRESSION);
    }

    #[tokio::test]
    async fn test_ask_failure_uses_apology() {
        let results = answer(&state(), "ask what is rust?").await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text, replies::SERVICE_FAILURE);
    }

    #[tokio::test]
    async fn test_transforms() {
        assert_eq!(answer(&state(), "reverse hello").await[0].text, "olleh");
        assert_eq!(answer(&state(), "upper Hi").await[0].text, "HI");
        assert_eq!(answer(&state(), "echo Keep Case").await[0].text, "Keep Case");
    }

    #[tokio::test]
    async fn test_long_text_is_bounded() {
        let words = vec!["word"; 1000].join(" ");
        let results = answer(&state(), &format!("clap {words}")).await;
        assert!(results[0].text.chars().count() < telegram::MAX_MESSAGE_LEN);
        assert!(results[0].text.ends_with("..."));
    }

    #[tokio::test]
    async fn test_every_keyword_answers() {
        for keyword in EXACT {
            let results = answer(&state(), keyword).await;
            assert_eq!(results.len(), 1);
            assert_ne!(results[0], help_entry(), "keyword {keyword}");
        }
    }
}
