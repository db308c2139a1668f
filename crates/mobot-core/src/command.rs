//! Command token normalization.
//!
//! Telegram may send `/cmd@botname arg1 ...` in group chats; every form of the
//! same command must reduce to the same lowercase token.

pub const COMMAND_MARKER: char = '/';
pub const ROUTING_SUFFIX_DELIMITER: char = '@';

/// Text that does not start with the command marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NotACommand;

/// Extract the normalized command token from raw message text.
///
/// The token is the first whitespace-delimited word with the marker stripped,
/// anything from the first `@` on dropped, and the rest lowercased. A bare
/// `/` yields an empty token, which matches no handler.
pub fn parse_command(text: &str) -> Result<String, NotACommand> {
    if !text.starts_with(COMMAND_MARKER) {
        return Err(NotACommand);
    }

    let first = text.split(char::is_whitespace).next().unwrap_or("");
    let token = first
        .trim_start_matches(COMMAND_MARKER)
        .split(ROUTING_SUFFIX_DELIMITER)
        .next()
        .unwrap_or("")
        .to_lowercase();

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_marker_suffix_and_case() {
        assert_eq!(parse_command("/inmo@ExampleBot").unwrap(), "inmo");
        assert_eq!(parse_command("/RMO").unwrap(), "rmo");
        assert_eq!(parse_command("/Start@Bot please").unwrap(), "start");
        assert_eq!(parse_command("/amc10 give me one").unwrap(), "amc10");
        assert_eq!(parse_command("/aime\nsecond line").unwrap(), "aime");
    }

    #[test]
    fn rejects_text_without_marker() {
        assert_eq!(parse_command("hello"), Err(NotACommand));
        assert_eq!(parse_command(""), Err(NotACommand));
        assert_eq!(parse_command(" /rmo"), Err(NotACommand));
        assert_eq!(parse_command("rmo/"), Err(NotACommand));
    }

    #[test]
    fn bare_marker_yields_empty_token() {
        assert_eq!(parse_command("/").unwrap(), "");
        assert_eq!(parse_command("/@Bot").unwrap(), "");
        assert_eq!(parse_command("/ rmo").unwrap(), "");
    }

    #[test]
    fn repeated_markers_are_stripped() {
        assert_eq!(parse_command("//imo").unwrap(), "imo");
    }
}
