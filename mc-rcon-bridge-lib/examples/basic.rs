/*!
Simple usage of the library to keep an RCON connection open to a Minecraft server.

Every line typed on stdin is sent to the server as a command and the response
is printed. The connection is kept alive in the background between commands and
re-established automatically if the server restarts.
*/

use std::io::{self, BufRead};

use structopt::StructOpt;

use mc_rcon_bridge_lib::{RconConfig, RconManager};

#[derive(StructOpt, Debug)]
pub struct Opt {
    /// Hostname of the Minecraft server
    #[structopt(long, default_value = "localhost")]
    host: String,

    /// RCON port of the Minecraft server
    #[structopt(long, default_value = "25575")]
    port: u16,

    /// RCON password (`rcon.password` in `server.properties`)
    password: String,
}

#[tokio::main]
async fn main() {
    let opt = Opt::from_args();

    let config = RconConfig::new(opt.host, opt.port, opt.password);
    let manager = RconManager::new(config).expect("RCON config was not valid");
    manager.start().await;

    println!("{}", manager.get_status().await);

    let (line_tx, mut line_rx) = tokio::sync::mpsc::channel::<String>(8);
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines().map_while(Result::ok) {
            if line_tx.blocking_send(line).is_err() {
                break;
            }
        }
    });

    while let Some(line) = line_rx.recv().await {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match manager.send(line).await {
            Ok(response) => println!("{}", response),
            Err(e) => eprintln!("Failed to run `{}`: {}", line, e),
        }
    }

    // Note that the persistent connection has to be closed explicitly
    manager.stop().await;
}
