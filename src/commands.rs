use teloxide::utils::command::BotCommands;

#[derive(Debug, Clone, BotCommands)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    #[command(description = "subscribe to daily motivation.")]
    Start,
    #[command(description = "unsubscribe from daily quotes.")]
    Stop,
    #[command(description = "get a motivational quote right now.")]
    Quote,
    #[command(description = "display help.")]
    Help,
}

pub(crate) fn help_text() -> String {
    Command::descriptions().to_string()
}
