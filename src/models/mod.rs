pub mod sip;

pub use sip::{SipId, SipIntent, SipMethod, SipRecord, DEFAULT_VOLUME_ML};
