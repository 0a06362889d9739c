pub mod slack;

pub use slack::{ReleaseNotifier, SlackNotifier, WebhookError};
