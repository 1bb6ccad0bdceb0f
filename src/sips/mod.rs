pub mod aggregate;
pub mod export;
pub mod store;

pub use aggregate::{bucketize, bucketize_in, render_chart, HourBucket};
pub use export::{export_to_file, to_csv, DEFAULT_EXPORT_FILE};
pub use store::{Confirm, SharedSipLog, SipLog, SipSummary, CLEAR_PROMPT, SIPS_KEY};
