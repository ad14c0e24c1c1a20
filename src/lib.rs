use state::{OnboardingState, OnboardingStorage};
use teloxide::prelude::Dialogue;

pub mod broadcast;
pub mod commands;
pub mod config;
pub mod database;
pub mod error;
pub mod health;
pub mod keyboard;
pub mod messages;
pub mod onboarding;
pub mod quote;
pub mod scheduler;
pub mod schema;
pub mod state;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub type UserDialogue = Dialogue<OnboardingState, OnboardingStorage>;
pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync + 'static>>;
