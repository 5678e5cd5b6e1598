//! Curated vocabulary for the relevance pre-filter:
//!   - general financial terms (weight 1)
//!   - strong financial indicators (weight 2)
//!   - non-financial exclusion terms (sports, entertainment, recipes, weather)
//!   - structural patterns for scraped junk (release tags, score lines, plot blurbs)
//!   - company-name aliases keyed by ticker symbol
//!
//! Keep this minimal & composable - load from config/JSON later.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

/// General financial vocabulary. Each distinct match contributes weight 1.
pub const FINANCIAL_TERMS: &[&str] = &[
    "stock",
    "shares",
    "shareholder",
    "market cap",
    "trading",
    "traders",
    "investor",
    "investment",
    "revenue",
    "profit",
    "earnings",
    "dividend",
    "ipo",
    "merger",
    "acquisition",
    "guidance",
    "nasdaq",
    "nyse",
    "s&p 500",
    "dow jones",
    "quarterly",
    "fiscal year",
    "valuation",
    "portfolio",
    "analyst",
    "rally",
    "selloff",
    "sell-off",
    "bond yield",
    "etf",
    "buyback",
    "margin",
    "outlook",
    "wall street",
    "ticker",
    "volatility",
];

/// Strong financial indicators. Each distinct match contributes weight 2,
/// and two or more of these alone decide relevance.
pub const STRONG_FINANCIAL_TERMS: &[&str] = &[
    "earnings report",
    "earnings call",
    "price target",
    "upgraded",
    "downgraded",
    "beats estimates",
    "beat estimates",
    "misses estimates",
    "missed estimates",
    "quarterly results",
    "pre-market",
    "after-hours",
    "short interest",
    "stock split",
    "dividend yield",
    "buy rating",
    "sell rating",
    "hold rating",
    "raised guidance",
    "cut guidance",
    "sec filing",
    "10-q",
    "10-k",
    "8-k",
    "13f",
    "insider selling",
    "insider buying",
    "share repurchase",
];

/// Non-financial vocabulary. Matches push the verdict toward "not relevant".
pub const EXCLUSION_TERMS: &[&str] = &[
    // sports
    "championship",
    "playoff",
    "touchdown",
    "volleyball",
    "basketball",
    "football match",
    "soccer",
    "tournament",
    "halftime",
    "goalkeeper",
    "home run",
    "quarterback",
    "head coach",
    "season opener",
    "world cup",
    "olympics",
    // entertainment
    "box office",
    "movie trailer",
    "film festival",
    "episode",
    "album",
    "concert tour",
    "celebrity",
    "premiere",
    "red carpet",
    "oscars",
    "grammys",
    "sitcom",
    "blockbuster",
    // recipes
    "recipe",
    "ingredients",
    "tablespoon",
    "teaspoon",
    "preheat",
    "oven",
    "simmer",
    "marinade",
    // weather
    "rainfall",
    "thunderstorm",
    "humidity",
    "snowfall",
    "heatwave",
    "cold front",
    "gusty winds",
];

lazy_static! {
    /// Video resolution tags, e.g. "720p", "1080p", "2160p".
    pub static ref RE_RESOLUTION: Regex = Regex::new(r"\b\d{3,4}p\b").unwrap();
    /// Release/subtitle encoding tags common in pirated-media titles.
    pub static ref RE_RELEASE_TAG: Regex =
        Regex::new(r"(?i)\b(x264|x265|h264|hevc|hdtv|webrip|web-dl|bluray|dvdrip|subbed|dubbed)\b")
            .unwrap();
    /// Trailing score-like digit pair, e.g. "... 3-1" or "... 102:98".
    pub static ref RE_TRAILING_SCORE: Regex = Regex::new(r"\b\d{1,3}\s*[-:]\s*\d{1,3}\s*$").unwrap();
    /// Plot-summary markers from scraped media listings.
    pub static ref RE_PLOT_MARKER: Regex = Regex::new(r"(?i)\bplot\s*:").unwrap();
}

lazy_static! {
    /// Lowercased company-name aliases per ticker. A hit on an alias for the
    /// item's own symbol is a strong relevance signal.
    pub static ref COMPANY_ALIASES: HashMap<&'static str, &'static [&'static str]> = {
        let mut m: HashMap<&'static str, &'static [&'static str]> = HashMap::new();
        m.insert("AAPL", &["apple"] as &[_]);
        m.insert("MSFT", &["microsoft"]);
        m.insert("GOOGL", &["google", "alphabet"]);
        m.insert("GOOG", &["google", "alphabet"]);
        m.insert("AMZN", &["amazon"]);
        m.insert("TSLA", &["tesla"]);
        m.insert("META", &["meta platforms", "facebook", "instagram"]);
        m.insert("NVDA", &["nvidia"]);
        m.insert("NFLX", &["netflix"]);
        m.insert("JPM", &["jpmorgan", "jp morgan"]);
        m.insert("BA", &["boeing"]);
        m.insert("DIS", &["disney"]);
        m.insert("INTC", &["intel"]);
        m.insert("AMD", &["advanced micro devices"]);
        m.insert("KO", &["coca-cola", "coca cola"]);
        m.insert("XOM", &["exxon", "exxonmobil"]);
        m
    };
}

/// Aliases for a symbol, or an empty slice when the symbol is unknown.
pub fn aliases_for(symbol: &str) -> &'static [&'static str] {
    COMPANY_ALIASES
        .get(symbol.to_uppercase().as_str())
        .copied()
        .unwrap_or(&[])
}
