use mc_rcon_bridge_lib::chat::ChatMessage;

/// Utility function to return a neatly formatted string describing who's playing
/// Minecraft
///
/// `short` can be set to true to truncate the list.
pub fn format_online_players(online_players: &[String], short: bool) -> String {
    // Sort the players for stable name order and sanitize their names
    let mut online_players_vec: Vec<_> = online_players.iter().map(sanitize_for_markdown).collect();
    online_players_vec.sort();
    online_players_vec.dedup();

    match online_players_vec.as_slice() {
        [] => "Nobody is playing Minecraft".into(),
        [p1] => format!("{} is playing Minecraft", p1),
        [p1, p2] => format!("{} and {} are playing Minecraft", p1, p2),
        [p1, p2, p3, rest @ ..] if short => {
            let mut string = format!("{}, {}, and {}", p1, p2, p3);

            if !rest.is_empty() {
                string.push_str(&format!(" (+ {} more)", rest.len()));
            }

            string.push_str(" are playing Minecraft");
            string
        }
        [all @ .., last] => format!("{}, and {} are playing Minecraft", all.join(", "), last),
    }
}

/// Renders a chat message for relaying to a markdown chat
pub fn chat_line(chat: &ChatMessage) -> String {
    format!("**{}**: {}", sanitize_for_markdown(&chat.name), chat.msg)
}

/// Sanitizes the given text for usage in a markdown context
pub fn sanitize_for_markdown<T: AsRef<str>>(text: T) -> String {
    let text = text.as_ref();

    text.chars().fold(String::new(), |mut s, c| {
        match c {
            '*' | '_' | '~' | '>' | '`' | '|' => {
                s.push('\\');
                s.push(c);
            }
            _ => s.push(c),
        }
        s
    })
}

#[cfg(test)]
mod test {
    use expect_test::{expect, Expect};

    use super::*;

    fn players(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    fn check(names: &[&str], short: bool, expect: Expect) {
        expect.assert_eq(&format_online_players(&players(names), short));
    }

    #[test]
    fn sanitize_markdown() {
        let testcase = "~*`cdawg_m`>|";
        assert_eq!(sanitize_for_markdown(testcase), "\\~\\*\\`cdawg\\_m\\`\\>\\|");
    }

    #[test]
    fn chat_line_escapes_name_only() {
        let chat = ChatMessage {
            name: "x_X".into(),
            msg: "*waves*".into(),
        };
        expect![["**x\\_X**: *waves*"]].assert_eq(&chat_line(&chat));
    }

    mod format_online_players {
        use super::*;

        #[test]
        fn markdown_in_names() {
            for short in [true, false] {
                check(
                    &["p1_", "*`p2`"],
                    short,
                    expect![["\\*\\`p2\\` and p1\\_ are playing Minecraft"]],
                );
            }
        }

        #[test]
        fn few_players() {
            for short in [true, false] {
                check(&[], short, expect![["Nobody is playing Minecraft"]]);
                check(&["p1"], short, expect![["p1 is playing Minecraft"]]);
                check(
                    &["p2", "p1"],
                    short,
                    expect![["p1 and p2 are playing Minecraft"]],
                );
                check(
                    &["p3", "p1", "p2"],
                    short,
                    expect![["p1, p2, and p3 are playing Minecraft"]],
                );
            }
        }

        #[test]
        fn duplicates_count_once() {
            check(&["p1", "p1"], true, expect![["p1 is playing Minecraft"]]);
        }

        #[test]
        fn short_truncates() {
            check(
                &["p1", "p2", "p3", "p4"],
                true,
                expect![["p1, p2, and p3 (+ 1 more) are playing Minecraft"]],
            );
            check(
                &["p1", "p3", "p2", "p4", "p6", "p5", "p7"],
                true,
                expect![["p1, p2, and p3 (+ 4 more) are playing Minecraft"]],
            );
        }

        #[test]
        fn long_lists_everyone() {
            check(
                &["p1", "p3", "p2", "p4", "p6", "p5", "p7"],
                false,
                expect![["p1, p2, p3, p4, p5, p6, and p7 are playing Minecraft"]],
            );
        }
    }
}
