//! Pattern-driven redaction applied inline during capture (§4.D, §6).
//!
//! Order matters: vendor-specific API-key patterns must precede the
//! generic `sk-…` fallback so the labeled replacement wins. The default
//! list below is written in exactly the order the format specifies.

use regex::Regex;

/// `(pattern, replacement)` pairs, in application order.
type PatternList = Vec<(String, &'static str)>;

fn default_patterns() -> PatternList {
    vec![
        (r"sk-ant-[A-Za-z0-9_-]{20,}".into(), "[REDACTED_ANTHROPIC_KEY]"),
        (r"sk-proj-[A-Za-z0-9_-]{20,}".into(), "[REDACTED_OPENAI_KEY]"),
        (r"sk_live_[A-Za-z0-9_-]{20,}".into(), "[REDACTED_STRIPE_KEY]"),
        (r"sk_test_[A-Za-z0-9_-]{20,}".into(), "[REDACTED_STRIPE_KEY]"),
        (r"pk_live_[A-Za-z0-9_-]{20,}".into(), "[REDACTED_STRIPE_KEY]"),
        (r"pk_test_[A-Za-z0-9_-]{20,}".into(), "[REDACTED_STRIPE_KEY]"),
        (r"sk-[A-Za-z0-9_-]{20,}".into(), "[REDACTED_API_KEY]"),
        (r"AKIA[A-Z0-9]{16}".into(), "[REDACTED_AWS_KEY]"),
        (r"ghp_[A-Za-z0-9]{36}".into(), "[REDACTED_GITHUB_TOKEN]"),
        (r"gho_[A-Za-z0-9]{36}".into(), "[REDACTED_GITHUB_TOKEN]"),
        (r"github_pat_[A-Za-z0-9_]{22,}".into(), "[REDACTED_GITHUB_TOKEN]"),
        (r"Bearer\s+[A-Za-z0-9_\-.]{20,}".into(), "Bearer [REDACTED_TOKEN]"),
        (r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}".into(), "[REDACTED_EMAIL]"),
        (
            r#"(?:api[_-]?key|token|secret|password|authorization)["']?\s*[:=]\s*["']?([A-Za-z0-9+/=]{32,})"#
                .into(),
            "[REDACTED_SECRET]",
        ),
    ]
}

const EMAIL_REPLACEMENT: &str = "[REDACTED_EMAIL]";

/// Configuration for the scrubbing transform. Mirrors the knobs of the
/// source `ScrubConfig`: override the base pattern list entirely, append
/// extra patterns, drop email redaction, or apply exact-string
/// substitutions after the regex passes.
#[derive(Debug, Clone)]
pub struct ScrubConfig {
    patterns: Option<PatternList>,
    extra_patterns: PatternList,
    redact_emails: bool,
    custom_strings: Vec<(String, String)>,
}

impl Default for ScrubConfig {
    fn default() -> Self {
        Self { patterns: None, extra_patterns: Vec::new(), redact_emails: true, custom_strings: Vec::new() }
    }
}

impl ScrubConfig {
    pub fn builder() -> ScrubConfigBuilder {
        ScrubConfigBuilder::default()
    }

    fn resolved_patterns(&self) -> PatternList {
        let mut patterns = match &self.patterns {
            Some(custom) => custom.clone(),
            None => {
                let mut base = default_patterns();
                if !self.redact_emails {
                    base.retain(|(_, replacement)| *replacement != EMAIL_REPLACEMENT);
                }
                base
            }
        };
        patterns.extend(self.extra_patterns.clone());
        patterns
    }
}

impl Default for ScrubConfigBuilder {
    fn default() -> Self {
        Self { patterns: None, extra_patterns: Vec::new(), redact_emails: true, custom_strings: Vec::new() }
    }
}

/// Fluent builder for [`ScrubConfig`].
#[derive(Debug, Clone)]
pub struct ScrubConfigBuilder {
    patterns: Option<PatternList>,
    extra_patterns: PatternList,
    redact_emails: bool,
    custom_strings: Vec<(String, String)>,
}

impl ScrubConfigBuilder {
    /// Replace the default pattern list entirely.
    pub fn patterns(mut self, patterns: PatternList) -> Self {
        self.patterns = Some(patterns);
        self
    }

    /// Append patterns after the (default or overridden) pattern list.
    pub fn extra_pattern(mut self, pattern: impl Into<String>, replacement: &'static str) -> Self {
        self.extra_patterns.push((pattern.into(), replacement));
        self
    }

    pub fn redact_emails(mut self, redact: bool) -> Self {
        self.redact_emails = redact;
        self
    }

    pub fn custom_string(mut self, exact: impl Into<String>, replacement: impl Into<String>) -> Self {
        self.custom_strings.push((exact.into(), replacement.into()));
        self
    }

    pub fn build(self) -> ScrubConfig {
        ScrubConfig {
            patterns: self.patterns,
            extra_patterns: self.extra_patterns,
            redact_emails: self.redact_emails,
            custom_strings: self.custom_strings,
        }
    }
}

/// A [`ScrubConfig`] compiled into `Regex` objects, ready to apply.
pub struct Scrubber {
    compiled: Vec<(Regex, &'static str)>,
    custom_strings: Vec<(String, String)>,
}

impl Scrubber {
    pub fn new(config: &ScrubConfig) -> Self {
        let compiled = config
            .resolved_patterns()
            .into_iter()
            .map(|(pattern, replacement)| {
                (Regex::new(&pattern).expect("built-in/extra scrub pattern must compile"), replacement)
            })
            .collect();
        Self { compiled, custom_strings: config.custom_strings.clone() }
    }

    /// Decode `data` as UTF-8 (lossy), apply every regex pass in order,
    /// then every custom-string pass in order, and re-encode as UTF-8.
    pub fn scrub(&self, data: &[u8]) -> Vec<u8> {
        let mut text = String::from_utf8_lossy(data).into_owned();
        for (pattern, replacement) in &self.compiled {
            text = pattern.replace_all(&text, *replacement).into_owned();
        }
        for (original, replacement) in &self.custom_strings {
            text = text.replace(original.as_str(), replacement.as_str());
        }
        text.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_anthropic_key_before_generic_sk_pattern() {
        let scrubber = Scrubber::new(&ScrubConfig::default());
        let out = scrubber.scrub(b"key=sk-ant-REDACTED end");
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("[REDACTED_ANTHROPIC_KEY]"));
        assert!(!text.contains("sk-ant-"));
    }

    #[test]
    fn redacts_openai_key_before_generic_sk_pattern() {
        let scrubber = Scrubber::new(&ScrubConfig::default());
        let out = scrubber.scrub(b"sk-proj-abcdefghijklmnopqrstuvwxyz1234567890");
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("[REDACTED_OPENAI_KEY]"));
    }

    #[test]
    fn redacts_emails_by_default() {
        let scrubber = Scrubber::new(&ScrubConfig::default());
        let out = scrubber.scrub(b"contact user@test.com for help");
        assert_eq!(String::from_utf8(out).unwrap(), "contact [REDACTED_EMAIL] for help");
    }

    #[test]
    fn redact_emails_false_disables_email_pattern() {
        let config = ScrubConfig::builder().redact_emails(false).build();
        let scrubber = Scrubber::new(&config);
        let out = scrubber.scrub(b"user@test.com");
        assert_eq!(String::from_utf8(out).unwrap(), "user@test.com");
    }

    #[test]
    fn custom_strings_applied_after_regex_passes() {
        let config = ScrubConfig::builder().custom_string("my-secret", "[REDACTED]").build();
        let scrubber = Scrubber::new(&config);
        let out = scrubber.scrub(b"token is my-secret here");
        assert_eq!(String::from_utf8(out).unwrap(), "token is [REDACTED] here");
    }

    #[test]
    fn scrub_is_idempotent_for_default_patterns() {
        let scrubber = Scrubber::new(&ScrubConfig::default());
        let input = b"sk-ant-REDACTED user@test.com";
        let once = scrubber.scrub(input);
        let twice = scrubber.scrub(&once);
        assert_eq!(once, twice);
    }
}
