use std::fmt;

/// Marker separating the counts from the player names in a `list` response
const PLAYERS_ONLINE_MARKER: &str = "players online:";

/// Discord channel names are limited to 100 characters
const MAX_PRESENCE_LEN: usize = 100;

/// Who is online, as reported by the server's `list` command
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServerStatus {
    pub online: u32,
    pub capacity: u32,
    /// Player names in the order the server listed them
    pub players: Vec<String>,
    /// The response text this status was parsed from
    pub raw: String,
}

impl ServerStatus {
    /// Parses the response to `list`
    ///
    /// The expected shape is "There are 2 of a max of 20 players online: Alice,
    /// Bob", but the wording varies between servers so this never fails:
    /// anything it can't make sense of comes out as zero or empty.
    pub fn parse<S: Into<String>>(raw: S) -> Self {
        let raw = raw.into();

        let (head, tail) = match raw.split_once(PLAYERS_ONLINE_MARKER) {
            Some((head, tail)) => (head, Some(tail)),
            None => (raw.as_str(), None),
        };

        let (online, capacity) = {
            let mut counts = digit_runs(head);
            match (counts.next(), counts.next()) {
                (Some(online), Some(capacity)) => (online, capacity),
                _ => (0, 0),
            }
        };

        let players = tail
            .map(|tail| {
                tail.split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            online,
            capacity,
            players,
            raw,
        }
    }

    /// Renders a short "<server name> online/capacity" line, e.g. for a voice
    /// channel name or bot presence
    pub fn presence_line(&self, server_name: &str) -> String {
        format!("{} {}/{}", server_name, self.online, self.capacity)
            .chars()
            .take(MAX_PRESENCE_LEN)
            .collect()
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{} online", self.online, self.capacity)?;
        if !self.players.is_empty() {
            write!(f, ": {}", self.players.join(", "))?;
        }
        Ok(())
    }
}

/// Yields every maximal run of ASCII digits in `text` as a number
///
/// Runs too large for a `u32` saturate.
fn digit_runs(text: &str) -> impl Iterator<Item = u32> + '_ {
    text.split(|c: char| !c.is_ascii_digit())
        .filter(|run| !run.is_empty())
        .map(|run| run.parse().unwrap_or(u32::MAX))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn two_players() {
        let status = ServerStatus::parse("There are 2 of a max of 20 players online: Alice, Bob");
        assert_eq!(status.online, 2);
        assert_eq!(status.capacity, 20);
        assert_eq!(status.players, vec!["Alice", "Bob"]);
        assert_eq!(
            status.raw,
            "There are 2 of a max of 20 players online: Alice, Bob"
        );
    }

    #[test]
    fn nobody_online() {
        let status = ServerStatus::parse("There are 0 of a max of 20 players online:");
        assert_eq!(status.online, 0);
        assert_eq!(status.capacity, 20);
        assert!(status.players.is_empty());
    }

    #[test]
    fn garbage() {
        let status = ServerStatus::parse("unexpected garbage");
        assert_eq!(status.online, 0);
        assert_eq!(status.capacity, 0);
        assert!(status.players.is_empty());
        assert_eq!(status.raw, "unexpected garbage");
    }

    #[test]
    fn single_count_defaults_both_to_zero() {
        let status = ServerStatus::parse("There are 3 players online: a, b, c");
        assert_eq!((status.online, status.capacity), (0, 0));
        assert_eq!(status.players, vec!["a", "b", "c"]);
    }

    #[test]
    fn digits_glued_to_words() {
        // Legacy servers: "There are 1/10 players online:"
        let status = ServerStatus::parse("There are 1/10 players online:Steve,, ,Alex ");
        assert_eq!((status.online, status.capacity), (1, 10));
        assert_eq!(status.players, vec!["Steve", "Alex"]);
    }

    #[test]
    fn huge_numbers_saturate() {
        let status = ServerStatus::parse("99999999999999 of 5 players online:");
        assert_eq!(status.online, u32::MAX);
        assert_eq!(status.capacity, 5);
    }

    #[test]
    fn presence_line_is_truncated() {
        let status = ServerStatus::parse("There are 3 of a max of 10 players online:");
        assert_eq!(status.presence_line("VŠB Minecraft"), "VŠB Minecraft 3/10");

        let long_name = "x".repeat(150);
        assert_eq!(status.presence_line(&long_name).chars().count(), 100);
    }

    #[test]
    fn display() {
        let status = ServerStatus::parse("There are 2 of a max of 20 players online: Alice, Bob");
        assert_eq!(status.to_string(), "2/20 online: Alice, Bob");
        assert_eq!(ServerStatus::default().to_string(), "0/0 online");
    }
}
