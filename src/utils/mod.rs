//! Shared helpers.

use std::time::Duration;

use teloxide::prelude::*;
use teloxide::types::{Message, ParseMode, ReplyParameters};

use crate::bot::dispatcher::ThrottledBot;

/// Replies longer than this are shipped as a document instead of a message.
pub const REPLY_LIMIT: usize = 3500;

/// Commands /cmd refuses to run, matched case-insensitively against the
/// start of the command line.
const FORBIDDEN_COMMANDS: [&str; 4] = ["poweroff", "halt", "shutdown", "reboot"];

pub fn is_forbidden_command(cmd: &str) -> bool {
    let lower = cmd.to_lowercase();
    FORBIDDEN_COMMANDS
        .iter()
        .any(|forbidden| lower.starts_with(forbidden))
}

/// HTML reply to the triggering message.
pub async fn reply_html(
    bot: &ThrottledBot,
    msg: &Message,
    text: impl Into<String>,
) -> anyhow::Result<()> {
    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html)
        .reply_parameters(ReplyParameters::new(msg.id))
        .await?;
    Ok(())
}

/// Human-readable uptime, largest unit first: "2 days, 3 hours and 5 minutes".
pub fn format_timespan(duration: Duration) -> String {
    let total = duration.as_secs();
    if total == 0 {
        return "0 seconds".to_string();
    }

    const UNITS: [(&str, u64); 4] = [
        ("day", 86_400),
        ("hour", 3_600),
        ("minute", 60),
        ("second", 1),
    ];

    let mut parts = Vec::new();
    let mut rest = total;
    for (name, size) in UNITS {
        let count = rest / size;
        rest %= size;
        if count > 0 {
            let plural = if count == 1 { "" } else { "s" };
            parts.push(format!("{count} {name}{plural}"));
        }
    }

    match parts.len() {
        1 => parts.remove(0),
        n => format!("{} and {}", parts[..n - 1].join(", "), parts[n - 1]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_commands_match_at_start_only() {
        assert!(is_forbidden_command("poweroff"));
        assert!(is_forbidden_command("REBOOT now"));
        assert!(is_forbidden_command("shutdown -h now"));
        assert!(is_forbidden_command("halt"));
        assert!(!is_forbidden_command("echo reboot"));
        assert!(!is_forbidden_command("sudo poweroff"));
        assert!(!is_forbidden_command("ls -la"));
    }

    #[test]
    fn timespan_formatting() {
        assert_eq!(format_timespan(Duration::from_secs(0)), "0 seconds");
        assert_eq!(format_timespan(Duration::from_secs(1)), "1 second");
        assert_eq!(format_timespan(Duration::from_secs(61)), "1 minute and 1 second");
        assert_eq!(
            format_timespan(Duration::from_secs(90_061)),
            "1 day, 1 hour, 1 minute and 1 second"
        );
        assert_eq!(format_timespan(Duration::from_secs(7_200)), "2 hours");
    }
}
