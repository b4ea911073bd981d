pub mod ms {
    pub const POLL_INTERVAL: u64 = 100;
    pub const DISCOVERY_WAIT: u64 = 10_000;
    pub const PAGE_SETTLE: u64 = 1000;
    pub const RETRY_DELAY: u64 = 2000;
    pub const MAX_RETRY_DELAY: u64 = 10_000;
    pub const PAGE_CLOSE_SETTLE: u64 = 100;
}

pub mod secs {
    pub const NAVIGATION: u64 = 30;
    pub const REQUEST: u64 = 120;
}
