pub mod waitlist;

pub use waitlist::{method_not_allowed, waitlist_join, waitlist_preflight};
