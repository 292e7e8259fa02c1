// Messages from the sequencer core to the host

pub mod notification;

pub use notification::{Notification, NotificationCategory, NotificationLevel, NotificationQueue};
