use std::fmt;

/// Label of the quick-action button; pressing it sends this exact text.
pub const QUOTE_BUTTON: &str = "💡 Get Motivation Now";

/// Replaces the real quote whenever the quote API can't be used.
pub const FALLBACK_QUOTE: &str = "Keep pushing forward! (Could not fetch new quote currently).";

/// Every fixed reply the bot can send, picked by outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Welcome,
    Subscribed { name: String, delivery: String },
    Unsubscribed,
    SaveFailed,
    SomethingWentWrong,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Welcome => write!(
                f,
                "Welcome! 🚀\nTo subscribe to daily motivation, please enter your name:"
            ),
            Notice::Subscribed { name, delivery } => write!(
                f,
                "Thanks {name}! You are now subscribed. You will receive quotes daily at {delivery}."
            ),
            Notice::Unsubscribed => write!(
                f,
                "You have been unsubscribed. 🔕\nYou won't receive daily quotes anymore.\n\nType /start if you want to join again!"
            ),
            Notice::SaveFailed => write!(f, "There was an error saving your name. Please try again."),
            Notice::SomethingWentWrong => write!(f, "Something went wrong. Please try again."),
        }
    }
}
