//! Keyword and entity heuristics that turn a free-text message into the
//! signals the composer routes on.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::catalog::BEACHES;

pub const TIDE_KEYWORDS: &[&str] = &["tide", "high tide", "low tide"];
pub const AMENITY_KEYWORDS: &[&str] = &["amenities", "restaurant", "hotel", "parking"];
pub const WEATHER_KEYWORDS: &[&str] = &[
    "weather",
    "forecast",
    "temperature",
    "conditions",
    "wind",
    "rain",
    "cloud",
    "sunny",
    "humid",
    "storm",
];

/// Words that never start a beach name; stripped from the front of a
/// `<words> beach` capture.
const LEADING_NOISE: &[&str] = &[
    "a", "about", "and", "any", "at", "for", "from", "go", "how", "in", "is", "like", "me", "near",
    "of", "on", "or", "than", "the", "tell", "to", "visit", "visiting", "what", "whats", "what's",
    "which", "with",
];

const PREPOSITIONS: &[&str] = &["at", "in", "near"];

lazy_static! {
    static ref PHRASE_RE: Regex =
        Regex::new(r"(?i)\b(?:at|in|near)\s+((?:[a-z'\-]+\s+){0,4}?[a-z'\-]+)\s+beach\b").unwrap();
    static ref MENTION_RE: Regex =
        Regex::new(r"(?i)\b([a-z'\-]+(?:\s+[a-z'\-]+)?)\s+beach\b").unwrap();
}

/// Named-entity recognition for places, treated as a black box.
pub trait LocationExtractor: Send + Sync {
    /// The first geographic, location or facility entity in `text`.
    fn extract_location(&self, text: &str) -> Option<String>;
}

/// Recognises the beaches listed in the catalog by name.
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogLocationExtractor;

impl LocationExtractor for CatalogLocationExtractor {
    fn extract_location(&self, text: &str) -> Option<String> {
        let lowered = text.to_lowercase();
        BEACHES
            .iter()
            .filter_map(|beach| {
                find_word(&lowered, &beach.name.to_lowercase())
                    .or_else(|| find_word(&lowered, beach.short_name))
                    .map(|position| (position, beach.name))
            })
            .min_by_key(|(position, _)| *position)
            .map(|(_, name)| name.to_string())
    }
}

/// Never finds an entity; leaves extraction to the pattern fallbacks.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocationExtractor;

impl LocationExtractor for NoLocationExtractor {
    fn extract_location(&self, _text: &str) -> Option<String> {
        None
    }
}

/// Which step of the extraction chain produced a beach name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MentionSource {
    Entity,
    Phrase,
    Mention,
    LastWord,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BeachMention {
    pub name: String,
    pub source: MentionSource,
}

/// Per-message routing signals. Derived fresh for every message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntentSignals {
    pub beach: Option<BeachMention>,
    pub wants_tide: bool,
    pub wants_amenities: bool,
    pub wants_weather: bool,
}

impl IntentSignals {
    pub fn beach_name(&self) -> Option<&str> {
        self.beach.as_ref().map(|mention| mention.name.as_str())
    }

    pub fn wants_provider_data(&self) -> bool {
        self.wants_tide || self.wants_amenities || self.wants_weather
    }
}

pub struct IntentClassifier {
    extractor: Box<dyn LocationExtractor>,
    last_word_fallback: bool,
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new(Box::new(CatalogLocationExtractor))
    }
}

impl IntentClassifier {
    pub fn new(extractor: Box<dyn LocationExtractor>) -> Self {
        Self {
            extractor,
            last_word_fallback: false,
        }
    }

    /// Guess the last word of the message as the beach name when nothing
    /// better matched. Off by default: such a guess is usually not a beach.
    pub fn with_last_word_fallback(mut self, enabled: bool) -> Self {
        self.last_word_fallback = enabled;
        self
    }

    pub fn classify(&self, text: &str) -> IntentSignals {
        let lowered = text.to_lowercase();
        IntentSignals {
            beach: self.extract_beach(text),
            wants_tide: contains_any(&lowered, TIDE_KEYWORDS),
            wants_amenities: contains_any(&lowered, AMENITY_KEYWORDS),
            wants_weather: contains_any(&lowered, WEATHER_KEYWORDS),
        }
    }

    pub fn extract_beach(&self, text: &str) -> Option<BeachMention> {
        if let Some(entity) = self.extractor.extract_location(text) {
            let words: Vec<&str> = entity.split_whitespace().collect();
            if !words.is_empty() {
                return Some(BeachMention {
                    name: with_beach_suffix(&title_case(&words)),
                    source: MentionSource::Entity,
                });
            }
        }

        if let Some(name) = PHRASE_RE
            .captures_iter(text)
            .filter_map(|caps| caps.get(1).and_then(|m| phrase_words(m.as_str())))
            .next()
        {
            return Some(BeachMention {
                name,
                source: MentionSource::Phrase,
            });
        }

        if let Some(name) = MENTION_RE
            .captures_iter(text)
            .filter_map(|caps| caps.get(1).and_then(|m| mention_words(m.as_str())))
            .last()
        {
            return Some(BeachMention {
                name,
                source: MentionSource::Mention,
            });
        }

        if self.last_word_fallback {
            let last = text
                .split_whitespace()
                .last()
                .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()))
                .filter(|word| !word.is_empty())?;
            return Some(BeachMention {
                name: title_case(&[last]),
                source: MentionSource::LastWord,
            });
        }

        None
    }
}

fn contains_any(lowered: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| lowered.contains(keyword))
}

/// Words between the last preposition and "beach", e.g. "the Clearwater".
fn phrase_words(capture: &str) -> Option<String> {
    let words: Vec<&str> = capture.split_whitespace().collect();
    let start = words
        .iter()
        .rposition(|word| PREPOSITIONS.contains(&word.to_lowercase().as_str()))
        .map(|idx| idx + 1)
        .unwrap_or(0);
    let words: Vec<&str> = strip_noise(&words[start..]);
    if words.is_empty() {
        return None;
    }
    Some(with_beach_suffix(&title_case(&words)))
}

/// Words before "beach". A two-word capture keeps its first word only when
/// both words share capitalisation ("Santa Monica", "santa monica").
fn mention_words(capture: &str) -> Option<String> {
    let mut words: Vec<&str> = capture.split_whitespace().collect();
    if let [first, second] = words[..] {
        if starts_uppercase(first) != starts_uppercase(second) {
            words.remove(0);
        }
    }
    let words = strip_noise(&words);
    if words.is_empty() {
        return None;
    }
    Some(with_beach_suffix(&title_case(&words)))
}

fn strip_noise<'a>(words: &[&'a str]) -> Vec<&'a str> {
    words
        .iter()
        .skip_while(|word| LEADING_NOISE.contains(&word.to_lowercase().as_str()))
        .copied()
        .collect()
}

fn title_case(words: &[&str]) -> String {
    words
        .iter()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn starts_uppercase(word: &str) -> bool {
    word.chars().next().is_some_and(char::is_uppercase)
}

fn with_beach_suffix(name: &str) -> String {
    let lowered = name.to_lowercase();
    if lowered == "beach" || lowered.ends_with(" beach") {
        name.to_string()
    } else {
        format!("{} Beach", name)
    }
}

/// Byte offset of `needle` in `haystack` where it stands as whole words.
fn find_word(haystack: &str, needle: &str) -> Option<usize> {
    haystack.match_indices(needle).map(|(idx, _)| idx).find(|&idx| {
        let before = haystack[..idx].chars().next_back();
        let after = haystack[idx + needle.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}
