//! Reply texts shared by the command handlers and the inline dispatcher.

use rand::Rng;
use rand::seq::IndexedRandom;

const JOKE: &str = "Why do programmers prefer dark mode? Because light attracts bugs. 🐛";
const FACT: &str = "Honey never spoils. Archaeologists have found 3000-year-old honey in Egyptian tombs that was still edible. 🍯";
const QUOTE: &str = "\"Simplicity is prerequisite for reliability.\" — Edsger W. Dijkstra";
const MOTIVATE: &str = "💪 Small steps every day add up to big results. Keep going!";
const TIP: &str = "💡 Tip: you can use me in any chat by typing my @username followed by a keyword, like 'flip' or 'calc 2+2'.";
const RULES: &str = "📜 Group rules:\n1. Be kind.\n2. No spam or ads.\n3. Stay on topic.\n4. Admins have the final word.";
const SUPPORT: &str = "🆘 Need help? Send /help for the command list or contact the bot admin.";

pub const NOT_AUTHORIZED: &str = "⛔ You are not authorized to use this command.";
pub const INVALID_EXPRESSION: &str = "Invalid expression.";
pub const SERVICE_FAILURE: &str = "Sorry, I couldn't get an answer right now. Please try again later.";

const COIN: [&str; 2] = ["🪙 Heads!", "🪙 Tails!"];

const EIGHT_BALL: [&str; 12] = [
    "It is certain.",
    "Without a doubt.",
    "You may rely on it.",
    "Yes, definitely.",
    "Most likely.",
    "Signs point to yes.",
    "Reply hazy, try again.",
    "Ask again later.",
    "Cannot predict now.",
    "Don't count on it.",
    "My sources say no.",
    "Very doubtful.",
];

const COMPLIMENTS: [&str; 6] = [
    "You're more helpful than a well-written README. 📘",
    "Your code would pass review on the first try. ✅",
    "You light up the chat like a fresh deploy on Friday... in a good way. ✨",
    "You have impeccable taste in bots. 🤖",
    "Talking to you is the highlight of my uptime. 🌟",
    "You're the semicolon to my statement. 😄",
];

const ROASTS: [&str; 6] = [
    "You're the reason the help command exists. 🔥",
    "I've seen better logic in a regex written at 3am. 🔥",
    "You're like a merge conflict: nobody asked for you, yet here you are. 🔥",
    "Your Wi-Fi has a stronger personality than you. 🔥",
    "If you were a function, you'd return undefined. 🔥",
    "You bring everyone so much joy... when you log off. 🔥",
];

const FORTUNES: [&str; 6] = [
    "🥠 A pleasant surprise is waiting for you.",
    "🥠 Your hard work will soon pay off.",
    "🥠 A new friendship will bring you joy.",
    "🥠 Today is a good day to try something new.",
    "🥠 An unexpected message will make you smile.",
    "🥠 The bug you fear most is a missing semicolon.",
];

const PASSWORD_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz23456789!@#$%&*?";
pub const PASSWORD_MIN: usize = 8;
pub const PASSWORD_MAX: usize = 64;
pub const PASSWORD_DEFAULT: usize = 16;

// ==================== STATIC ====================

pub fn start(first_name: &str) -> String {
    format!("👋 Hi {first_name}! I'm a fun little helper bot.\nSend /help to see everything I can do.")
}

pub fn about() -> &'static str {
    "🤖 I answer commands with jokes, facts, games, text tricks, a calculator, and AI answers. Try /help."
}

pub fn ping() -> &'static str {
    "🏓 Pong!"
}

pub fn joke() -> &'static str {
    JOKE
}

pub fn fact() -> &'static str {
    FACT
}

pub fn quote() -> &'static str {
    QUOTE
}

pub fn motivate() -> &'static str {
    MOTIVATE
}

pub fn tip() -> &'static str {
    TIP
}

pub fn rules() -> &'static str {
    RULES
}

pub fn hello(first_name: &str) -> String {
    format!("Hello, {first_name}! 👋")
}

pub fn support() -> &'static str {
    SUPPORT
}

// ==================== RANDOMIZED ====================

/// Pick one entry of a non-empty list.
fn pick(options: &'static [&'static str]) -> &'static str {
    options.choose(&mut rand::rng()).copied().unwrap_or_default()
}

pub fn flip() -> &'static str {
    pick(&COIN)
}

/// Both possible `flip` replies.
pub fn coin_faces() -> &'static [&'static str] {
    &COIN
}

pub fn roll() -> String {
    format!("🎲 You rolled a {}!", rand::rng().random_range(1..=6))
}

pub fn random_number() -> String {
    format!("🔢 Your random number is {}.", rand::rng().random_range(1..=100))
}

pub fn eight_ball(question: &str) -> String {
    format!("🎱 {question}\n{}", pick(&EIGHT_BALL))
}

#[cfg(test)]
pub fn eight_ball_answers() -> &'static [&'static str] {
    &EIGHT_BALL
}

pub fn rate(thing: &str) -> String {
    format!("I rate {thing} a {}/10!", rand::rng().random_range(0..=10))
}

/// Split `choose` arguments: comma separated if any comma is present,
/// otherwise whitespace separated. Blank options are dropped.
pub fn choice_options(args: &str) -> Vec<&str> {
    let options: Vec<&str> = if args.contains(',') {
        args.split(',').map(str::trim).collect()
    } else {
        args.split_whitespace().collect()
    };
    options.into_iter().filter(|o| !o.is_empty()).collect()
}

/// `None` when fewer than two options were given.
pub fn choose(args: &str) -> Option<String> {
    let options = choice_options(args);
    if options.len() < 2 {
        return None;
    }
    options
        .choose(&mut rand::rng())
        .map(|choice| format!("🤔 I choose: {choice}"))
}

pub fn compliment() -> &'static str {
    pick(&COMPLIMENTS)
}

pub fn roast() -> &'static str {
    pick(&ROASTS)
}

pub fn fortune() -> &'static str {
    pick(&FORTUNES)
}

pub fn luck() -> String {
    format!("🍀 Your luck today is {}%.", rand::rng().random_range(0..=100))
}

/// Random password; `length` is clamped to the supported range.
pub fn password(length: usize) -> String {
    let length = length.clamp(PASSWORD_MIN, PASSWORD_MAX);
    let mut rng = rand::rng();
    (0..length)
        .map(|_| PASSWORD_CHARSET[rng.random_range(0..PASSWORD_CHARSET.len())] as char)
        .collect()
}

// ==================== TEXT TRANSFORMS ====================

pub fn reverse(text: &str) -> String {
    text.chars().rev().collect()
}

pub fn upper(text: &str) -> String {
    text.to_uppercase()
}

pub fn lower(text: &str) -> String {
    text.to_lowercase()
}

/// Capitalize the first letter of each word, lowercase the rest.
pub fn title(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

pub fn count(text: &str) -> String {
    format!(
        "📏 {} characters, {} words.",
        text.chars().count(),
        text.split_whitespace().count()
    )
}

/// aLtErNaTiNg case over letters only.
pub fn mock(text: &str) -> String {
    let mut upper_next = false;
    text.chars()
        .flat_map(|c| {
            if c.is_alphabetic() {
                let out: Vec<char> = if upper_next {
                    c.to_uppercase().collect()
                } else {
                    c.to_lowercase().collect()
                };
                upper_next = !upper_next;
                out
            } else {
                vec![c]
            }
        })
        .collect()
}

pub fn clap(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" 👏 ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reverse() {
        assert_eq!(reverse("hello"), "olleh");
        assert_eq!(reverse("héllo wörld"), "dlröw olléh");
    }

    #[test]
    fn test_case_transforms_are_idempotent() {
        for x in ["Hello World", "ß straße", "MiXeD 123"] {
            assert_eq!(upper(&upper(x)), upper(x));
            assert_eq!(lower(&lower(x)), lower(x));
        }
        assert_eq!(upper("abc"), "ABC");
        assert_eq!(lower("ABC"), "abc");
    }

    #[test]
    fn test_title() {
        assert_eq!(title("hello wORLD"), "Hello World");
        assert_eq!(title("a  b"), "A  B");
    }

    #[test]
    fn test_mock() {
        assert_eq!(mock("hello world"), "hElLo WoRlD");
    }

    #[test]
    fn test_clap() {
        assert_eq!(clap("this is  great"), "this 👏 is 👏 great");
    }

    #[test]
    fn test_plain_texts_carry_no_markup() {
        for text in [about(), tip(), rules(), support()] {
            assert!(!text.contains('`') && !text.contains('*'), "{text}");
        }
    }

    #[test]
    fn test_count() {
        assert_eq!(count("hi there"), "📏 8 characters, 2 words.");
    }

    #[test]
    fn test_flip_is_one_of_two_faces() {
        for _ in 0..20 {
            assert!(coin_faces().contains(&flip()));
        }
    }

    #[test]
    fn test_choice_options() {
        assert_eq!(choice_options("pizza, sushi , tacos"), vec!["pizza", "sushi", "tacos"]);
        assert_eq!(choice_options("red green"), vec!["red", "green"]);
        assert_eq!(choice_options("a,,b"), vec!["a", "b"]);
    }

    #[test]
    fn test_choose_needs_two_options() {
        assert_eq!(choose("only"), None);
        assert_eq!(choose(""), None);
        let reply = choose("tea, coffee").unwrap();
        assert!(reply == "🤔 I choose: tea" || reply == "🤔 I choose: coffee");
    }

    #[test]
    fn test_password_length_is_clamped() {
        assert_eq!(password(2).len(), PASSWORD_MIN);
        assert_eq!(password(1000).len(), PASSWORD_MAX);
        let p = password(PASSWORD_DEFAULT);
        assert_eq!(p.len(), PASSWORD_DEFAULT);
        assert!(p.bytes().all(|b| PASSWORD_CHARSET.contains(&b)));
    }

    #[test]
    fn test_ranges() {
        for _ in 0..50 {
            let roll = roll();
            let n: u32 = roll.trim_start_matches("🎲 You rolled a ").trim_end_matches('!').parse().unwrap();
            assert!((1..=6).contains(&n));
        }
    }

    #[test]
    fn test_eight_ball_uses_fixed_answers() {
        let reply = eight_ball("Will it rain?");
        assert!(reply.starts_with("🎱 Will it rain?\n"));
        let answer = reply.lines().nth(1).unwrap();
        assert!(eight_ball_answers().contains(&answer));
    }
}
