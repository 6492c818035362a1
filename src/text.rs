// src/text.rs
//! Text primitives shared by the profile builder and the scorer:
//! normalisation, tokenizer, stop-words and whole-phrase keyword matching.

use once_cell::sync::OnceCell;
use regex::Regex;
use std::collections::BTreeSet;

/// Normalize free text: decode entities, strip tags, fold quotes, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML/MathML tags (reference managers keep <i>, <sub> etc. in abstracts)
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[a-z][^>]*>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    re_ws.replace_all(&out, " ").trim().to_string()
}

const STOPWORDS: &[&str] = &[
    "about", "above", "across", "after", "again", "against", "all", "also", "although", "among",
    "and", "any", "are", "around", "based", "been", "before", "being", "below", "between",
    "both", "but", "can", "could", "did", "does", "doing", "done", "due", "during", "each",
    "either", "even", "find", "first", "for", "found", "from", "further", "had", "has", "have",
    "having", "here", "however", "into", "its", "itself", "large", "less", "more", "most",
    "much", "must", "new", "non", "not", "now", "observed", "off", "one", "only", "other",
    "our", "out", "over", "paper", "present", "presented", "propose", "result", "results",
    "same", "several", "should", "show", "shown", "shows", "since", "some", "such", "than",
    "that", "the", "their", "them", "then", "there", "these", "they", "this", "those",
    "through", "thus", "two", "under", "until", "upon", "use", "used", "using", "very", "via",
    "was", "we", "well", "were", "what", "when", "where", "whether", "which", "while", "who",
    "whose", "why", "will", "with", "within", "without", "work", "would", "yet", "you",
    "your", "study", "studies", "three", "may", "might", "high", "low",
];

/// True for words carrying no topical signal.
pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word)
}

/// Unicode word tokenizer: lowercased, stop-words, short tokens and pure numbers removed.
pub fn tokenize(input: &str) -> Vec<String> {
    static RE_WORD: OnceCell<Regex> = OnceCell::new();
    // letters/digits plus inner hyphens ("n-body", "x-ray")
    let re = RE_WORD.get_or_init(|| Regex::new(r"(?u)\b\w[\w-]*\w\b|\b\w\b").unwrap());
    re.find_iter(input)
        .map(|m| m.as_str().to_lowercase())
        .filter(|t| t.chars().count() >= 3)
        .filter(|t| !t.chars().all(|c| c.is_ascii_digit() || c == '-'))
        .filter(|t| !is_stopword(t))
        .collect()
}

/// All word tokens (lowercased, nothing removed) joined by single spaces and padded,
/// so phrases can be matched on word boundaries.
fn phrase_haystack(input: &str) -> String {
    static RE_ALL: OnceCell<Regex> = OnceCell::new();
    let re = RE_ALL.get_or_init(|| Regex::new(r"(?u)\w[\w-]*").unwrap());
    let mut out = String::with_capacity(input.len() + 2);
    out.push(' ');
    for m in re.find_iter(input) {
        out.push_str(&m.as_str().to_lowercase());
        out.push(' ');
    }
    out
}

/// Pre-tokenized view of one document for repeated keyword lookups.
#[derive(Debug, Clone)]
pub struct TermIndex {
    terms: BTreeSet<String>,
    haystack: String,
}

impl TermIndex {
    pub fn new(text: &str) -> Self {
        Self {
            terms: tokenize(text).into_iter().collect(),
            haystack: phrase_haystack(text),
        }
    }

    /// Distinct content terms of the document.
    pub fn terms(&self) -> &BTreeSet<String> {
        &self.terms
    }

    /// Whole-word / whole-phrase, case-insensitive match.
    pub fn contains(&self, keyword: &str) -> bool {
        let needle = phrase_haystack(keyword);
        if needle.trim().is_empty() {
            return false;
        }
        self.haystack.contains(&needle)
    }

    /// Keywords from `keywords` present in the document, in iteration order.
    pub fn matches<'a, I>(&self, keywords: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        keywords
            .into_iter()
            .filter(|k| self.contains(k))
            .cloned()
            .collect()
    }
}

/// Split into sentences on `.`, `!`, `?` followed by whitespace.
pub fn sentences(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        cur.push(ch);
        if matches!(ch, '.' | '!' | '?') && chars.peek().map_or(true, |c| c.is_whitespace()) {
            let s = cur.trim();
            if !s.is_empty() {
                out.push(s.to_string());
            }
            cur.clear();
        }
    }
    let tail = cur.trim();
    if !tail.is_empty() {
        out.push(tail.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_markup_and_ws() {
        let s = "  The <i>JWST</i>&nbsp;view of   “early” galaxies\n";
        assert_eq!(normalize_text(s), "The JWST view of \"early\" galaxies");
    }

    #[test]
    fn tokenizer_drops_noise() {
        let toks = tokenize("We use N-body simulations of 2024 dark-matter halos at z=6.");
        assert_eq!(toks, vec!["n-body", "simulations", "dark-matter", "halos"]);
    }

    #[test]
    fn phrase_match_is_whole_word() {
        let idx = TermIndex::new("Constraints on Dark Matter annihilation from dwarfs");
        assert!(idx.contains("dark matter"));
        assert!(idx.contains("DWARFS"));
        assert!(!idx.contains("dark matte"));
        assert!(!idx.contains("matter annihilations"));
        assert!(!idx.contains("   "));
    }

    #[test]
    fn sentence_split() {
        let s = sentences("First one. Second at z=1.5 holds! Third?");
        assert_eq!(s, vec!["First one.", "Second at z=1.5 holds!", "Third?"]);
    }
}
