//! Outbound channel senders and the dispatch orchestrator.

pub mod dispatcher;
pub mod email;
pub mod outbound;
pub mod slack;
pub mod telegram;
pub mod webhook_sender;

pub use dispatcher::Dispatcher;
pub use email::{EmailError, EmailSender, MailTransport};
pub use outbound::OutboundClient;
pub use slack::SlackSender;
pub use telegram::TelegramSender;
pub use webhook_sender::WebhookSender;
