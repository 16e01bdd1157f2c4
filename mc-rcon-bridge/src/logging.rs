use mc_rcon_bridge_lib::CHAT_LOG_TARGET;
use std::path::Path;
use time::format_description::FormatItem;

pub fn setup_logger<P: AsRef<Path>>(
    logfile_path: P,
    log_level_all: log::Level,
    log_level_self: log::Level,
    log_level_chat: log::Level,
) -> Result<(), fern::InitError> {
    let chat_target = *CHAT_LOG_TARGET.get().unwrap_or(&"chat");

    let file_logger = fern::Dispatch::new()
        .format(|out, message, record| {
            const LOG_TIMESTAMP_FORMAT: &[FormatItem] = time::macros::format_description!(
                "[[[month]-[day]-[year]][[[hour repr:12 padding:none]:[minute]:[second] [period]]"
            );

            out.finish(format_args!(
                "{}[{}][{}] {}",
                formatted_time_now(LOG_TIMESTAMP_FORMAT),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(log_level_all.to_level_filter())
        .level_for("mc_rcon_bridge", log_level_self.to_level_filter())
        .level_for("mc_rcon_bridge_lib", log_level_self.to_level_filter())
        .level_for(chat_target, log_level_chat.to_level_filter())
        .chain(fern::log_file(logfile_path)?);

    // Standard output is kept for command responses and relayed chat
    let terminal_logger = fern::Dispatch::new()
        .format(|out, message, record| {
            const CONSOLE_TIMESTAMP_FORMAT: &[FormatItem] = time::macros::format_description!(
                "[hour repr:12 padding:none]:[minute]:[second] [period]"
            );

            out.finish(format_args!(
                "[{}] [{}, {}]: {}",
                formatted_time_now(CONSOLE_TIMESTAMP_FORMAT),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(log::LevelFilter::Error)
        .level_for("mc_rcon_bridge", log::LevelFilter::Info)
        .level_for("mc_rcon_bridge_lib", log::LevelFilter::Warn)
        .level_for(chat_target, log::LevelFilter::Off)
        .chain(std::io::stderr());

    fern::Dispatch::new()
        .chain(terminal_logger)
        .chain(file_logger)
        .apply()?;

    Ok(())
}

fn formatted_time_now(format: &[FormatItem]) -> String {
    time::OffsetDateTime::now_local()
        .ok()
        .and_then(|datetime| datetime.format(format).ok())
        .unwrap_or_else(|| String::from("time error"))
}
