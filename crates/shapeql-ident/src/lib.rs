//! Identifier word-splitting and case conversion.
//!
//! GraphQL field names are `lowerCamelCase` while Rust prefers
//! `snake_case` and `MixedCaps` type names, so converting between the
//! conventions is a parse step (identifier → word fragments) followed by
//! an emit step (word fragments → identifier). Splitting on case
//! transitions alone is not enough: acronyms such as `URL` and `ID` form
//! a single fragment (`DatabaseID` → `Database`, `ID`), and runs of
//! uppercase letters with no case boundary (`UIIP`) are split against a
//! table of well-known initialisms.

/// An identifier name, parsed into word fragments.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Name(pub Vec<String>);

impl Name {
    /// Express the name in `MixedCaps` convention, preserving initialisms
    /// (`{client, Mutation, Id}` → `ClientMutationID`).
    pub fn to_mixed_caps(&self) -> String {
        let mut out = String::new();
        for word in &self.0 {
            match canonical_initialism(word) {
                Some(initialism) => out.push_str(initialism),
                None => out.push_str(&title(word)),
            }
        }
        out
    }

    /// Express the name in `lowerCamelCase` convention. The first
    /// fragment is lowercased wholly, so initialisms flatten
    /// (`{Database, ID}` → `databaseId`, `{URL}` → `url`).
    pub fn to_lower_camel_case(&self) -> String {
        let mut out = String::new();
        for (i, word) in self.0.iter().enumerate() {
            if i == 0 {
                out.push_str(&word.to_lowercase());
            } else {
                out.push_str(&title(word));
            }
        }
        out
    }
}

impl<S: Into<String>> FromIterator<S> for Name {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Name(iter.into_iter().map(Into::into).collect())
    }
}

/// Parse a `MixedCaps` identifier name.
///
/// E.g., `"ClientMutationID"` → `{Client, Mutation, ID}`.
pub fn parse_mixed_caps(name: &str) -> Name {
    scan_camel(name, true)
}

/// Parse a `lowerCamelCase` identifier name.
///
/// E.g., `"clientMutationId"` → `{client, Mutation, Id}`.
pub fn parse_lower_camel_case(name: &str) -> Name {
    scan_camel(name, false)
}

/// Parse a `SCREAMING_SNAKE_CASE` identifier name.
///
/// E.g., `"CLIENT_MUTATION_ID"` → `{CLIENT, MUTATION, ID}`.
pub fn parse_screaming_snake_case(name: &str) -> Name {
    name.split('_').filter(|w| !w.is_empty()).collect()
}

/// Parse a `snake_case` identifier name.
///
/// E.g., `"database_id"` → `{database, id}`.
pub fn parse_snake_case(name: &str) -> Name {
    name.split('_').filter(|w| !w.is_empty()).collect()
}

/// Split a camel-case identifier at lower→Upper transitions and at
/// Upper→Upper,lower transitions (the last uppercase of an acronym run
/// starts the next word). When `split_acronyms` is set, uppercase-led
/// words are additionally checked against the initialism table so that
/// runs like `UIIP` break into `UI`, `IP`.
fn scan_camel(name: &str, split_acronyms: bool) -> Name {
    let runes: Vec<char> = name.chars().collect();
    let mut words = Vec::new();
    let (mut w, mut i) = (0, 0);
    while i + 1 <= runes.len() {
        let mut eow = false;
        if i + 1 == runes.len() {
            eow = true;
        } else if runes[i].is_lowercase() && runes[i + 1].is_uppercase() {
            eow = true;
        } else if i + 2 < runes.len() && runes[i + 1].is_uppercase() && runes[i + 2].is_lowercase() {
            eow = true;
        }
        i += 1;
        if !eow {
            continue;
        }
        let word: String = runes[w..i].iter().collect();
        w = i;
        if split_acronyms && word.chars().all(char::is_uppercase) {
            if let Some((a, b)) = split_initialisms(&word) {
                words.push(a);
                words.push(b);
                continue;
            }
        }
        words.push(word);
    }
    Name(words)
}

/// Break an all-uppercase run into two known initialisms, if possible
/// (`"HTTPSSQL"` → `("HTTPS", "SQL")`).
fn split_initialisms(word: &str) -> Option<(String, String)> {
    for (i, _) in word.char_indices().skip(1) {
        let (a, b) = word.split_at(i);
        if is_initialism(a) && is_initialism(b) {
            return Some((a.to_string(), b.to_string()));
        }
    }
    None
}

fn title(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn canonical_initialism(word: &str) -> Option<&'static str> {
    let upper = word.to_uppercase();
    INITIALISMS.iter().find(|&&i| i == upper).copied()
}

fn is_initialism(word: &str) -> bool {
    canonical_initialism(word).is_some()
}

/// Common initialisms, after go/lint.
const INITIALISMS: &[&str] = &[
    "ACL", "API", "ASCII", "CPU", "CSS", "DNS", "EOF", "GUID", "HTML", "HTTP", "HTTPS", "ID",
    "IP", "JSON", "LHS", "QPS", "RAM", "RHS", "RPC", "SLA", "SMTP", "SQL", "SSH", "TCP", "TLS",
    "TTL", "UDP", "UI", "UID", "UUID", "URI", "URL", "UTF8", "VM", "XML", "XMPP", "XSRF", "XSS",
];
