//! CSS selectors for Skyscanner day-view pages.
//!
//! Skyscanner ships hashed CSS-module class names, so selectors match on
//! stable class-name prefixes rather than exact classes.
//!
//! **Update process**: when parsing fails, capture an HTML sample, update
//! selectors, and add a test fixture.

use scraper::Selector;
use std::sync::LazyLock;

/// Headline round-trip price on a flight day view.
pub static PRICE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        "span[class*='Price_mainPrice'], \
         span[class*='BpkText_bpk-text'][class*='Price'], \
         [class*='TotalPrice_totalPrice']",
    )
    .unwrap()
});

/// Explicit no-offers marker: the search ran but found nothing.
pub static NO_RESULTS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        "[class*='FlightsErrata'], \
         [class*='NoResultsMessage'], \
         [class*='EmptyState_empty']",
    )
    .unwrap()
});

/// Anti-automation challenge page markers.
pub static CHALLENGE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        "#px-captcha, \
         .px-captcha-container, \
         form#challenge-form, \
         iframe[src*='captcha']",
    )
    .unwrap()
});
