//! HTTP clients for the tracked platforms and the alert sink.
//!
//! Each adapter owns a closed mapping from upstream responses to
//! [`subsync_core::platform::FetchOutcome`]. The mapping functions are pure
//! and public so they can be reviewed and tested without a network.

pub mod error;
pub mod http;
pub mod instagram;
pub mod notify;
pub mod telegram;
pub mod vk;
pub mod youtube;

pub use error::{Error, Result};
pub use instagram::{InstagramClient, InstagramConfig};
pub use notify::{AlertSink, LogNotifier, SalebotConfig, SalebotNotifier};
pub use telegram::{TelegramClient, TelegramConfig};
pub use vk::{VkClient, VkConfig};
pub use youtube::{YoutubeClient, YoutubeConfig};
