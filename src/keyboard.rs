use teloxide::types::{KeyboardButton, KeyboardMarkup, ReplyMarkup};

use crate::messages::QUOTE_BUTTON;

/// Reply keyboard attached to an outgoing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Keyboard {
    /// Leave whatever keyboard the user already has.
    #[default]
    Keep,
    QuickQuote,
    Remove,
}

pub(crate) fn quick_quote_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![KeyboardButton::new(QUOTE_BUTTON)]]).resize_keyboard()
}

impl Keyboard {
    pub(crate) fn markup(self) -> Option<ReplyMarkup> {
        match self {
            Keyboard::Keep => None,
            Keyboard::QuickQuote => Some(quick_quote_keyboard().into()),
            Keyboard::Remove => Some(ReplyMarkup::kb_remove()),
        }
    }
}
