//! Analytics over a window of fetched mail

mod metrics;
mod window;

pub use metrics::{
    DEFAULT_TOP_SENDERS, EmailMetrics, MEDIUM_MESSAGE_BYTES, OTHER_SENDERS, SMALL_MESSAGE_BYTES,
    SenderCount, SizeDistribution, TimeDistribution,
};
pub use window::{DEFAULT_DAYS, DateWindow, MAX_DAYS};
