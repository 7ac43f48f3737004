//! External service adapters: quote providers and notifications.

pub mod eastmoney;
pub mod market_data;
pub mod notification;

pub use eastmoney::EastmoneyQuoteSource;
pub use market_data::QuoteSource;
pub use notification::{LogNotifier, Notifier, PushbulletNotifier};
