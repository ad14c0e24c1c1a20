use teloxide::dispatching::dialogue::InMemStorage;

/// Where a chat stands in the subscription flow. A chat with no stored
/// state is not onboarding; entries are added by `/start` and removed once
/// the name has been saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OnboardingState {
    WaitingForName,
}

pub type OnboardingStorage = InMemStorage<OnboardingState>;
