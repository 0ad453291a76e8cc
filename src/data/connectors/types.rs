/// Price columns every series must carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequiredColumn {
    Open,
    High,
    Low,
    Close,
}

impl RequiredColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::High => "high",
            Self::Low => "low",
            Self::Close => "close",
        }
    }

    pub fn all() -> Vec<Self> {
        vec![Self::Open, Self::High, Self::Low, Self::Close]
    }

    /// Common alternative column names
    pub fn aliases(&self) -> Vec<&'static str> {
        match self {
            Self::Open => vec!["open", "Open", "OPEN", "o"],
            Self::High => vec!["high", "High", "HIGH", "h"],
            Self::Low => vec!["low", "Low", "LOW", "l"],
            Self::Close => vec!["close", "Close", "CLOSE", "c"],
        }
    }
}

/// Volume is optional; price-only exports are accepted.
pub const VOLUME_ALIASES: [&str; 6] = ["volume", "Volume", "VOLUME", "vol", "Vol", "v"];

pub const DATE_ALIASES: [&str; 6] = ["Date", "date", "Datetime", "datetime", "time", "timestamp"];
