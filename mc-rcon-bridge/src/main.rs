use std::{path::PathBuf, str::FromStr};

use anyhow::{anyhow, Context};

use tokio::{
    io::{AsyncBufReadExt, BufReader},
    time::{self, MissedTickBehavior},
};

use mc_rcon_bridge_lib::{chat::*, AdminCommand, RconManager, CHAT_LOG_TARGET};

use log::*;

use config::{Bridge, Config, PASSWORD_ENV_VAR};
use relay::{chat_line, format_online_players};
use structopt::StructOpt;

mod config;
mod logging;
mod relay;

#[derive(StructOpt, Debug)]
pub struct Opt {
    /// Path to config
    #[structopt(
        short = "c",
        long,
        parse(from_os_str),
        default_value = "./mc-rcon-bridge-config.toml"
    )]
    config: PathBuf,

    /// Generate a default config and then exit the program
    #[structopt(short = "g", long)]
    gen_config: bool,

    /// Hostname of the Minecraft server (overrides the config)
    #[structopt(long)]
    host: Option<String>,

    /// RCON port of the Minecraft server (overrides the config)
    #[structopt(long)]
    port: Option<u16>,

    #[structopt(subcommand)]
    mode: Option<Mode>,
}

#[derive(StructOpt, Debug)]
pub enum Mode {
    /// Read commands from stdin, one per line, and print the responses (default)
    ///
    /// `status` prints who is online and `quit` exits.
    Console,
    /// Run a single command and print the response
    Exec {
        #[structopt(required = true)]
        command: Vec<String>,
    },
    /// Run a checked administration command, e.g. `admin whitelist add Alice`
    Admin {
        #[structopt(required = true)]
        command: Vec<String>,
    },
    /// Reload the server, using `reload confirm` where supported
    Reload,
    /// Print who is online
    Status,
    /// Keep relaying presence and chat until interrupted
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    log_panics::init();
    CHAT_LOG_TARGET
        .set("chat")
        .map_err(|_| anyhow!("chat log target was already set"))?;

    let opt = Opt::from_args();
    let mut config = Config::load(&opt.config).await?;

    if opt.gen_config {
        return Ok(());
    }

    config.merge_in_args(&opt);
    config.apply_password_override(std::env::var(PASSWORD_ENV_VAR).ok());

    logging::setup_logger(
        &config.logging.file,
        config.logging.all,
        config.logging.self_level,
        config.logging.chat,
    )
    .with_context(|| "Failed to set up logging")?;

    let manager = RconManager::new(config.rcon.to_rcon_config())
        .with_context(|| "Invalid RCON settings in the config")?;
    manager.start().await;

    let res = match opt.mode.unwrap_or(Mode::Console) {
        Mode::Console => console(&manager).await,
        Mode::Exec { command } => exec(&manager, &command.join(" ")).await,
        Mode::Admin { command } => admin(&manager, &command.join(" ")).await,
        Mode::Reload => manager
            .reload()
            .await
            .map(|out| println!("{}", out))
            .with_context(|| "Failed to reload the server"),
        Mode::Status => {
            println!("{}", manager.get_status().await);
            Ok(())
        }
        Mode::Watch => watch(&manager, &config.bridge).await,
    };

    manager.stop().await;
    res
}

async fn console(manager: &RconManager) -> anyhow::Result<()> {
    info!(
        "Sending commands to {}; `status` shows who is online, `quit` exits",
        manager.config().address()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines
        .next_line()
        .await
        .with_context(|| "Failed to read from stdin")?
    {
        match line.trim() {
            "" => {}
            "quit" | "exit" => break,
            "status" => println!("{}", manager.get_status().await),
            command => match manager.send(command).await {
                Ok(response) => println!("{}", response),
                Err(e) => error!("Failed to run `{}`: {}", command, e),
            },
        }
    }

    Ok(())
}

async fn exec(manager: &RconManager, command: &str) -> anyhow::Result<()> {
    let response = manager
        .send(command)
        .await
        .with_context(|| format!("Failed to run `{}`", command))?;
    println!("{}", response);

    Ok(())
}

async fn admin(manager: &RconManager, command: &str) -> anyhow::Result<()> {
    let command = AdminCommand::from_str(command)
        .with_context(|| format!("`{}` is not a supported command", command))?;
    let response = manager
        .run(&command)
        .await
        .with_context(|| format!("Failed to run `{}`", command))?;
    println!("{}", response);

    Ok(())
}

/// Logs presence changes and relays chat from the server log every poll interval
async fn watch(manager: &RconManager, bridge: &Bridge) -> anyhow::Result<()> {
    let mut log_tail = bridge.log_path.as_ref().map(LogTail::new);
    if log_tail.is_none() {
        info!("No `bridge.log_path` configured; chat will not be relayed");
    }

    let mut interval = time::interval(bridge.poll_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut last_presence = None;

    loop {
        tokio::select! {
            res = &mut ctrl_c => {
                res.with_context(|| "Failed to listen for ctrl-c")?;
                info!("Interrupted, shutting down");
                break;
            }
            _ = interval.tick() => {}
        }

        let status = manager.get_status().await;
        let presence = status.presence_line(&bridge.server_name);
        if last_presence.as_ref() != Some(&presence) {
            info!(
                "{} ({})",
                presence,
                format_online_players(&status.players, true)
            );
            last_presence = Some(presence);
        }

        if let Some(log_tail) = log_tail.as_mut() {
            match log_tail.poll().await {
                Ok(lines) => {
                    for chat in lines.iter().filter_map(|l| ChatMessage::try_parse_from(l)) {
                        chat.log();
                        println!("{}", chat_line(&chat));
                    }
                }
                Err(e) => warn!("Failed to read {:?}: {}", log_tail.path(), e),
            }
        }
    }

    Ok(())
}
