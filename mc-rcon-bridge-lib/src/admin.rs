//! Typed versions of the commands moderators run against the server.
//!
//! Each `AdminCommand` renders to the exact command line sent over RCON via
//! its `Display` impl. Parsing from a string is offered for command-line use
//! and rejects malformed input before anything reaches the server.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors from parsing an `AdminCommand`
#[derive(Error, Debug, PartialEq)]
pub enum AdminCommandParseError {
    #[error("no command given")]
    Empty,
    #[error("unknown command \"{0}\"")]
    Unknown(String),
    #[error("missing {what} for `{command}`")]
    MissingArgument {
        command: &'static str,
        what: &'static str,
    },
    #[error("invalid {what} \"{value}\"")]
    InvalidArgument { what: &'static str, value: String },
    #[error("unexpected extra argument \"{0}\"")]
    UnexpectedArgument(String),
}

/// Declares an enum of fixed keywords along with conversions to and from them
macro_rules! keyword_enum {
    ($(#[$meta:meta])* $name:ident, $what:literal { $($variant:ident => $keyword:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $keyword),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = AdminCommandParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_ascii_lowercase().as_str() {
                    $($keyword => Ok($name::$variant),)+
                    _ => Err(AdminCommandParseError::InvalidArgument {
                        what: $what,
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

keyword_enum!(
    /// Game modes accepted by `gamemode`
    GameMode, "game mode" {
        Survival => "survival",
        Creative => "creative",
        Adventure => "adventure",
        Spectator => "spectator",
    }
);

keyword_enum!(
    Weather, "weather" {
        Clear => "clear",
        Rain => "rain",
        Thunder => "thunder",
    }
);

keyword_enum!(
    Difficulty, "difficulty" {
        Peaceful => "peaceful",
        Easy => "easy",
        Normal => "normal",
        Hard => "hard",
    }
);

/// Whitelist operations
///
/// Adding or removing always names a player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WhitelistAction {
    On,
    Off,
    List,
    Add(String),
    Remove(String),
}

/// Commands that can be sent to the server on behalf of a moderator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    // Players
    Op { player: String },
    Deop { player: String },
    Kick { player: String, reason: Option<String> },
    Ban { player: String, reason: Option<String> },
    BanIp { ip: String },
    Pardon { player: String },
    PardonIp { ip: String },
    Whitelist(WhitelistAction),

    // Server
    Stop,
    SaveAll,
    SaveOn,
    SaveOff,
    /// `reload confirm` is Paper's non-interactive form
    Reload { confirm: bool },
    List,
    Say { message: String },

    // World
    GameMode { mode: GameMode, player: String },
    Teleport { target: String, destination: String },
    TimeSet { value: String },
    TimeAdd { ticks: u32 },
    Weather(Weather),
    Difficulty(Difficulty),
    WorldBorderSet { size: u32 },
    EffectGive {
        player: String,
        effect: String,
        /// Duration in seconds, optionally followed by an amplifier
        duration: Option<(u32, Option<u8>)>,
    },
    EffectClear { player: String },

    // Info
    Version,
    Seed,
    DatapackList,
    ScoreboardObjectivesList,
}

impl fmt::Display for AdminCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use AdminCommand::*;

        match self {
            Op { player } => write!(f, "op {}", player),
            Deop { player } => write!(f, "deop {}", player),
            Kick { player, reason } => write_with_reason(f, "kick", player, reason),
            Ban { player, reason } => write_with_reason(f, "ban", player, reason),
            BanIp { ip } => write!(f, "ban-ip {}", ip),
            Pardon { player } => write!(f, "pardon {}", player),
            PardonIp { ip } => write!(f, "pardon-ip {}", ip),
            Whitelist(action) => match action {
                WhitelistAction::On => f.write_str("whitelist on"),
                WhitelistAction::Off => f.write_str("whitelist off"),
                WhitelistAction::List => f.write_str("whitelist list"),
                WhitelistAction::Add(player) => write!(f, "whitelist add {}", player),
                WhitelistAction::Remove(player) => write!(f, "whitelist remove {}", player),
            },

            Stop => f.write_str("stop"),
            SaveAll => f.write_str("save-all"),
            SaveOn => f.write_str("save-on"),
            SaveOff => f.write_str("save-off"),
            Reload { confirm: true } => f.write_str("reload confirm"),
            Reload { confirm: false } => f.write_str("reload"),
            List => f.write_str("list"),
            Say { message } => write!(f, "say {}", message),

            GameMode { mode, player } => write!(f, "gamemode {} {}", mode, player),
            Teleport { target, destination } => write!(f, "tp {} {}", target, destination),
            TimeSet { value } => write!(f, "time set {}", value),
            TimeAdd { ticks } => write!(f, "time add {}", ticks),
            Weather(weather) => write!(f, "weather {}", weather),
            Difficulty(difficulty) => write!(f, "difficulty {}", difficulty),
            WorldBorderSet { size } => write!(f, "worldborder set {}", size),
            EffectGive {
                player,
                effect,
                duration,
            } => {
                write!(f, "effect give {} {}", player, effect)?;
                if let Some((seconds, amplifier)) = duration {
                    write!(f, " {}", seconds)?;
                    if let Some(amplifier) = amplifier {
                        write!(f, " {}", amplifier)?;
                    }
                }
                Ok(())
            }
            EffectClear { player } => write!(f, "effect clear {}", player),

            Version => f.write_str("version"),
            Seed => f.write_str("seed"),
            DatapackList => f.write_str("datapack list"),
            ScoreboardObjectivesList => f.write_str("scoreboard objectives list"),
        }
    }
}

fn write_with_reason(
    f: &mut fmt::Formatter,
    command: &str,
    player: &str,
    reason: &Option<String>,
) -> fmt::Result {
    write!(f, "{} {}", command, player)?;
    if let Some(reason) = reason {
        write!(f, " {}", reason)?;
    }
    Ok(())
}

/// Walks the whitespace-separated words of a command line
struct Args<'a> {
    command: &'static str,
    words: std::iter::Peekable<std::str::SplitWhitespace<'a>>,
}

impl<'a> Args<'a> {
    fn required(&mut self, what: &'static str) -> Result<String, AdminCommandParseError> {
        self.words
            .next()
            .map(String::from)
            .ok_or(AdminCommandParseError::MissingArgument {
                command: self.command,
                what,
            })
    }

    fn parsed<T: FromStr>(&mut self, what: &'static str) -> Result<T, AdminCommandParseError> {
        let word = self.required(what)?;
        word.parse()
            .map_err(|_| AdminCommandParseError::InvalidArgument { what, value: word })
    }

    fn keyword<T>(&mut self, what: &'static str) -> Result<T, AdminCommandParseError>
    where
        T: FromStr<Err = AdminCommandParseError>,
    {
        self.required(what)?.parse()
    }

    /// Joins everything that is left, if anything is
    fn rest(&mut self) -> Option<String> {
        let rest = self.words.by_ref().collect::<Vec<_>>().join(" ");
        if rest.is_empty() {
            None
        } else {
            Some(rest)
        }
    }

    fn finish(mut self) -> Result<(), AdminCommandParseError> {
        match self.words.next() {
            Some(extra) => Err(AdminCommandParseError::UnexpectedArgument(extra.into())),
            None => Ok(()),
        }
    }
}

impl FromStr for AdminCommand {
    type Err = AdminCommandParseError;

    /// Parses the same form the command renders to, e.g. `whitelist add Alice`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use AdminCommand::*;

        let mut words = s.split_whitespace().peekable();
        let head = words.next().ok_or(AdminCommandParseError::Empty)?;

        // Two-word commands are matched on both words
        let (command, words): (&'static str, _) = match (head, words.peek().copied()) {
            ("save-all", _) => ("save-all", words),
            ("time", Some("set")) => ("time set", skip_one(words)),
            ("time", Some("add")) => ("time add", skip_one(words)),
            ("worldborder", Some("set")) => ("worldborder set", skip_one(words)),
            ("effect", Some("give")) => ("effect give", skip_one(words)),
            ("effect", Some("clear")) => ("effect clear", skip_one(words)),
            ("datapack", Some("list")) => ("datapack list", skip_one(words)),
            ("scoreboard", Some("objectives")) => {
                let mut words = skip_one(words);
                if words.next() != Some("list") {
                    return Err(AdminCommandParseError::Unknown(s.trim().into()));
                }
                ("scoreboard objectives list", words)
            }
            (other, _) => (known_command(other)?, words),
        };

        let mut args = Args { command, words };

        let parsed = match command {
            "op" => Op {
                player: args.required("player")?,
            },
            "deop" => Deop {
                player: args.required("player")?,
            },
            "kick" => Kick {
                player: args.required("player")?,
                reason: args.rest(),
            },
            "ban" => Ban {
                player: args.required("player")?,
                reason: args.rest(),
            },
            "ban-ip" => BanIp {
                ip: args.required("IP address")?,
            },
            "pardon" => Pardon {
                player: args.required("player")?,
            },
            "pardon-ip" => PardonIp {
                ip: args.required("IP address")?,
            },
            "whitelist" => Whitelist(match args.required("whitelist action")?.as_str() {
                "on" => WhitelistAction::On,
                "off" => WhitelistAction::Off,
                "list" => WhitelistAction::List,
                "add" => WhitelistAction::Add(args.required("player")?),
                "remove" => WhitelistAction::Remove(args.required("player")?),
                other => {
                    return Err(AdminCommandParseError::InvalidArgument {
                        what: "whitelist action",
                        value: other.into(),
                    })
                }
            }),

            "stop" => Stop,
            "save-all" => SaveAll,
            "save-on" => SaveOn,
            "save-off" => SaveOff,
            "reload" => Reload {
                confirm: match args.words.next() {
                    Some("confirm") => true,
                    Some(other) => {
                        return Err(AdminCommandParseError::UnexpectedArgument(other.into()))
                    }
                    None => false,
                },
            },
            "list" => List,
            "say" => Say {
                message: args.rest().ok_or(AdminCommandParseError::MissingArgument {
                    command: "say",
                    what: "message",
                })?,
            },

            "gamemode" => GameMode {
                mode: args.keyword("game mode")?,
                player: args.required("player")?,
            },
            "tp" => Teleport {
                target: args.required("target")?,
                destination: args.rest().ok_or(AdminCommandParseError::MissingArgument {
                    command: "tp",
                    what: "destination",
                })?,
            },
            "time set" => TimeSet {
                value: args.required("time")?,
            },
            "time add" => TimeAdd {
                ticks: args.parsed("tick count")?,
            },
            "weather" => Weather(args.keyword("weather")?),
            "difficulty" => Difficulty(args.keyword("difficulty")?),
            "worldborder set" => WorldBorderSet {
                size: args.parsed("border size")?,
            },
            "effect give" => {
                let player = args.required("player")?;
                let effect = args.required("effect")?;
                let duration = if args.words.peek().is_some() {
                    let seconds = args.parsed("duration")?;
                    let amplifier = if args.words.peek().is_some() {
                        Some(args.parsed("amplifier")?)
                    } else {
                        None
                    };
                    Some((seconds, amplifier))
                } else {
                    None
                };

                EffectGive {
                    player,
                    effect,
                    duration,
                }
            }
            "effect clear" => EffectClear {
                player: args.required("player")?,
            },

            "version" => Version,
            "seed" => Seed,
            "datapack list" => DatapackList,
            "scoreboard objectives list" => ScoreboardObjectivesList,
            _ => unreachable!("`known_command` only returns handled commands"),
        };

        args.finish()?;
        Ok(parsed)
    }
}

fn skip_one<I: Iterator>(mut iter: I) -> I {
    iter.next();
    iter
}

fn known_command(word: &str) -> Result<&'static str, AdminCommandParseError> {
    const SINGLE_WORD: &[&str] = &[
        "op",
        "deop",
        "kick",
        "ban",
        "ban-ip",
        "pardon",
        "pardon-ip",
        "whitelist",
        "stop",
        "save-on",
        "save-off",
        "reload",
        "list",
        "say",
        "gamemode",
        "tp",
        "weather",
        "difficulty",
        "version",
        "seed",
    ];

    SINGLE_WORD
        .iter()
        .copied()
        .find(|known| *known == word)
        .ok_or_else(|| AdminCommandParseError::Unknown(word.into()))
}

#[cfg(test)]
mod test {
    use super::*;

    fn roundtrip(line: &str) -> AdminCommand {
        let command: AdminCommand = line.parse().unwrap();
        assert_eq!(command.to_string(), line);
        command
    }

    #[test]
    fn player_commands() {
        assert_eq!(
            roundtrip("kick Steve griefing the spawn"),
            AdminCommand::Kick {
                player: "Steve".into(),
                reason: Some("griefing the spawn".into())
            }
        );
        assert_eq!(
            roundtrip("ban Steve"),
            AdminCommand::Ban {
                player: "Steve".into(),
                reason: None
            }
        );
        roundtrip("ban-ip 203.0.113.7");
        roundtrip("pardon-ip 203.0.113.7");
        roundtrip("deop Alex");
    }

    #[test]
    fn whitelist_add_requires_player() {
        assert_eq!(
            "whitelist add".parse::<AdminCommand>(),
            Err(AdminCommandParseError::MissingArgument {
                command: "whitelist",
                what: "player"
            })
        );
        assert_eq!(
            roundtrip("whitelist remove Alice"),
            AdminCommand::Whitelist(WhitelistAction::Remove("Alice".into()))
        );
        roundtrip("whitelist on");
    }

    #[test]
    fn whitelist_on_takes_no_player() {
        assert_eq!(
            "whitelist on Alice".parse::<AdminCommand>(),
            Err(AdminCommandParseError::UnexpectedArgument("Alice".into()))
        );
    }

    #[test]
    fn world_commands() {
        assert_eq!(
            roundtrip("gamemode creative Alex"),
            AdminCommand::GameMode {
                mode: GameMode::Creative,
                player: "Alex".into()
            }
        );
        roundtrip("tp Alex 100 64 -20");
        roundtrip("time set night");
        roundtrip("time add 6000");
        roundtrip("weather thunder");
        roundtrip("difficulty hard");
        roundtrip("worldborder set 5000");
        roundtrip("effect give Alex minecraft:speed");
        roundtrip("effect give Alex minecraft:speed 30 2");
        roundtrip("effect clear Alex");
    }

    #[test]
    fn keywords_are_case_insensitive_but_render_lowercase() {
        let command: AdminCommand = "weather RAIN".parse().unwrap();
        assert_eq!(command.to_string(), "weather rain");
    }

    #[test]
    fn info_and_server_commands() {
        roundtrip("save-all");
        roundtrip("save-off");
        roundtrip("reload confirm");
        roundtrip("reload");
        roundtrip("datapack list");
        roundtrip("scoreboard objectives list");
        roundtrip("say back in 5 minutes");
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(
            "".parse::<AdminCommand>(),
            Err(AdminCommandParseError::Empty)
        );
        assert_eq!(
            "summon creeper".parse::<AdminCommand>(),
            Err(AdminCommandParseError::Unknown("summon".into()))
        );
        assert_eq!(
            "time add soon".parse::<AdminCommand>(),
            Err(AdminCommandParseError::InvalidArgument {
                what: "tick count",
                value: "soon".into()
            })
        );
        assert_eq!(
            "gamemode hardcore Alex".parse::<AdminCommand>(),
            Err(AdminCommandParseError::InvalidArgument {
                what: "game mode",
                value: "hardcore".into()
            })
        );
        assert!("scoreboard players list".parse::<AdminCommand>().is_err());
    }
}
