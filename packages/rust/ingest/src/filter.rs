//! Deny-list filtering and page/iframe splitting.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use tabcatalog_shared::{TabKind, TabRecord};

use crate::RawTab;
use crate::decode::decode_title;

/// A single URL exclusion rule.
struct DenyRule {
    name: &'static str,
    matches: fn(&str) -> bool,
}

static HEADLESS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"headless").expect("valid regex"));

static CAPTCHA_ROTATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"recaptcha|RotateCookiesPage").expect("valid regex"));

/// URL deny-list, checked in order. A tab is dropped if any rule matches.
static DENY_RULES: &[DenyRule] = &[
    DenyRule {
        name: "extension-page",
        matches: |url| url.contains("chrome-extension://"),
    },
    DenyRule {
        name: "embedded-video",
        matches: |url| url.contains("youtube.com/embed"),
    },
    DenyRule {
        name: "headless-sandbox-probe",
        matches: |url| HEADLESS_RE.is_match(url) && url.contains("stackblitz.com"),
    },
    DenyRule {
        name: "captcha-or-cookie-rotation",
        matches: |url| CAPTCHA_ROTATION_RE.is_match(url),
    },
    DenyRule {
        name: "sso-relay",
        matches: |url| url.contains("seamlessaccess"),
    },
    // Plain account pages are noise but the rotation/CAPTCHA sub-flows are
    // carved out. The rule above already drops those sub-flows, so in practice
    // every accounts.google.com page is excluded; kept as observed, likely
    // over-fit to one browsing profile.
    DenyRule {
        name: "google-account-page",
        matches: |url| url.contains("accounts.google.com") && !CAPTCHA_ROTATION_RE.is_match(url),
    },
];

/// Name of the first deny rule matching `url`, if any.
pub fn deny_reason(url: &str) -> Option<&'static str> {
    DENY_RULES
        .iter()
        .find(|rule| (rule.matches)(url))
        .map(|rule| rule.name)
}

/// Split raw descriptors into page and iframe passes, filter each, and
/// concatenate pages before iframes.
///
/// Descriptors of any other type (service workers, background pages, ...)
/// are never catalog-eligible.
pub fn filter_tabs(raw: &[RawTab]) -> Vec<TabRecord> {
    let mut tabs = filter_pass(raw, TabKind::Page);
    tabs.extend(filter_pass(raw, TabKind::Iframe));
    tabs
}

/// Filter the descriptors of a single kind.
pub fn filter_pass(raw: &[RawTab], kind: TabKind) -> Vec<TabRecord> {
    raw.iter()
        .filter(|tab| TabKind::from_source(&tab.kind) == kind)
        .filter_map(|tab| {
            let url = tab.url.trim();
            if let Some(reason) = deny_reason(url) {
                debug!(url, reason, "tab excluded");
                return None;
            }

            let decoded = decode_title(&tab.title);
            let title = decoded.trim();
            if title.is_empty() {
                debug!(url, "tab excluded: empty title");
                return None;
            }
            if url.is_empty() {
                debug!(title, "tab excluded: empty url");
                return None;
            }

            Some(TabRecord::new(title, url, kind))
        })
        .collect()
}
