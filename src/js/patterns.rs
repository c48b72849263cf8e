//! Prioritised pattern catalogues for locating entities in player scripts
//!
//! Each extraction target owns an ordered list of expressions. The list is
//! tried front to back and the first hit wins, so new obfuscation shapes are
//! supported by appending (or inserting) an expression without touching the
//! calling code.

use crate::error::CipherError;
use crate::js::scanner::{Match, Span};
use crate::Result;
use regex::{Captures, Regex};
use tracing::debug;

/// Identifier characters accepted in minified names
const IDENT: &str = r"[a-zA-Z0-9$_]";

/// Ordered alternatives for one extraction target
#[derive(Debug, Clone)]
pub struct PatternSet {
    target: &'static str,
    group: &'static str,
    patterns: Vec<Regex>,
}

impl PatternSet {
    /// Compile `sources` in priority order. Every source must define the
    /// named capture group `group`, which designates the extracted value.
    pub fn new<S: AsRef<str>>(
        target: &'static str,
        group: &'static str,
        sources: &[S],
    ) -> Result<Self> {
        let mut patterns = Vec::with_capacity(sources.len());
        for source in sources {
            let regex = Regex::new(source.as_ref())?;
            if !regex.capture_names().flatten().any(|name| name == group) {
                return Err(CipherError::InvalidPattern(format!(
                    "pattern for {} lacks capture group '{}': {}",
                    target,
                    group,
                    source.as_ref()
                )));
            }
            patterns.push(regex);
        }
        Ok(Self {
            target,
            group,
            patterns,
        })
    }

    /// Number of alternatives
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Captures of the first pattern (in priority order) that matches `text`
    pub fn first_captures<'a>(&self, text: &'a str) -> Result<Captures<'a>> {
        for (index, pattern) in self.patterns.iter().enumerate() {
            if let Some(captures) = pattern.captures(text) {
                if captures.name(self.group).is_some() {
                    debug!("Matched {} with pattern #{}", self.target, index);
                    return Ok(captures);
                }
            }
        }
        Err(CipherError::NoPatternMatched(self.target))
    }

    /// Designated group of the first pattern that matches `text`
    pub fn first_match<'a>(&self, text: &'a str) -> Result<Match<'a>> {
        let captures = self.first_captures(text)?;
        let group = captures
            .name(self.group)
            .ok_or(CipherError::NoPatternMatched(self.target))?;
        Ok(Match::new(text, Span::new(group.start(), group.end())))
    }
}

/// Try each pattern of `patterns` in order against `text`
pub fn extract_first_match<'a>(patterns: &PatternSet, text: &'a str) -> Result<Match<'a>> {
    patterns.first_match(text)
}

/// The static pattern catalogue used while building plans
#[derive(Debug, Clone)]
pub struct ScriptPatterns {
    /// Entry function of the signature cipher (group `name`)
    pub signature_function: PatternSet,
    /// Transform object referenced by a signature plan statement (group `object`)
    pub transform_object: PatternSet,
    /// Entry function of the throttling transform, named directly (group `name`)
    pub throttling_function: PatternSet,
    /// Array through which the throttling entry function is called (group `array`)
    pub throttling_array_ref: PatternSet,
    /// Opening brace of the `try` block holding the throttling plan (group `open`)
    pub try_block: PatternSet,
    /// A single signature plan statement (groups `name` and optional `arg`)
    pub transform_call: PatternSet,
    /// A throttling plan call site `c[i](c[j](,c[k])?)`
    pub throttling_step: Regex,
    /// Array index directly following a name, e.g. `[0]`
    pub index_suffix: Regex,
}

impl ScriptPatterns {
    /// Compile the catalogue
    pub fn new() -> Result<Self> {
        Ok(Self {
            signature_function: PatternSet::new(
                "signature function name",
                "name",
                &[
                    r#"\b[cs]\s*&&\s*[adf]\.set\([^,]+\s*,\s*encodeURIComponent\s*\(\s*(?P<name>[a-zA-Z0-9$]+)\("#,
                    r#"\b[a-zA-Z0-9]+\s*&&\s*[a-zA-Z0-9]+\.set\([^,]+\s*,\s*encodeURIComponent\s*\(\s*(?P<name>[a-zA-Z0-9$]+)\("#,
                    r#"(?:\b|[^a-zA-Z0-9$])(?P<name>[a-zA-Z0-9$]{2})\s*=\s*function\(\s*a\s*\)\s*\{\s*a\s*=\s*a\.split\(\s*""\s*\)"#,
                    r#"(?P<name>[a-zA-Z0-9$]+)\s*=\s*function\(\s*a\s*\)\s*\{\s*a\s*=\s*a\.split\(\s*""\s*\)"#,
                    r#"(?:"signature"|'signature')\s*,\s*(?P<name>[a-zA-Z0-9$]+)\("#,
                    r#"\.sig\|\|(?P<name>[a-zA-Z0-9$]+)\("#,
                    r#"yt\.akamaized\.net/\)\s*\|\|\s*.*?\s*[cs]\s*&&\s*[adf]\.set\([^,]+\s*,\s*(?:encodeURIComponent\s*\()?\s*(?P<name>[a-zA-Z0-9$]+)\("#,
                    r#"\b[cs]\s*&&\s*[adf]\.set\([^,]+\s*,\s*(?P<name>[a-zA-Z0-9$]+)\("#,
                    r#"\b[a-zA-Z0-9]+\s*&&\s*[a-zA-Z0-9]+\.set\([^,]+\s*,\s*(?P<name>[a-zA-Z0-9$]+)\("#,
                    r#"\bc\s*&&\s*a\.set\([^,]+\s*,\s*\([^)]*\)\s*\(\s*(?P<name>[a-zA-Z0-9$]+)\("#,
                    r#"\bc\s*&&\s*[a-zA-Z0-9]+\.set\([^,]+\s*,\s*\([^)]*\)\s*\(\s*(?P<name>[a-zA-Z0-9$]+)\("#,
                ],
            )?,
            transform_object: PatternSet::new(
                "transform object name",
                "object",
                &[
                    r#"^\s*(?P<object>[a-zA-Z0-9$_]+)\.[a-zA-Z0-9$_]+\("#,
                    r#"^\s*(?P<object>[a-zA-Z0-9$_]+)\[""#,
                ],
            )?,
            throttling_function: PatternSet::new(
                "throttling function name",
                "name",
                &[
                    r#"a\.[a-zA-Z]\s*&&\s*\([a-z]\s*=\s*a\.get\("n"\)\)\s*&&[^;}]*?\|\|\s*(?P<name>[a-zA-Z0-9$_]+)"#,
                    r#"\.get\("n"\)\)&&\([a-zA-Z0-9$_]=(?P<name>[a-zA-Z0-9$_]+)\([a-zA-Z0-9$_]\)"#,
                ],
            )?,
            throttling_array_ref: PatternSet::new(
                "throttling function array",
                "array",
                &[
                    r#"\.get\("n"\)\)&&\([a-zA-Z0-9$_]=(?P<array>[a-zA-Z0-9$_]+)\[\d+\]\([a-zA-Z0-9$_]\)"#,
                    r#"\([a-z]\s*=\s*(?P<array>[a-zA-Z0-9$]+)\[\d+\]\([a-z]\)"#,
                ],
            )?,
            try_block: PatternSet::new(
                "throttling try block",
                "open",
                &[r#";\s*try\s*(?P<open>\{)"#, r#"\btry\s*(?P<open>\{)"#],
            )?,
            transform_call: Self::transform_calls()?,
            throttling_step: Regex::new(
                r#"c\[(?P<op>\d+)\]\(c\[(?P<first>\d+)\](?:,c\[(?P<second>\d+)\])?\)"#,
            )?,
            index_suffix: Regex::new(r#"^\[(?P<index>\d+)\]"#)?,
        })
    }

    /// Shapes of a single signature plan statement (groups `name` and optional `arg`)
    pub fn transform_calls() -> Result<PatternSet> {
        PatternSet::new(
            "transform call",
            "name",
            &[
                r#"^[a-zA-Z0-9$_]+\.(?P<name>[a-zA-Z0-9$_]+)\([a-zA-Z0-9$_]+,\s*(?P<arg>\d+)\)$"#,
                r#"^[a-zA-Z0-9$_]+\[["'](?P<name>[a-zA-Z0-9$_]+)["']\]\([a-zA-Z0-9$_]+,\s*(?P<arg>\d+)\)$"#,
                r#"^[a-zA-Z0-9$_]+\.(?P<name>[a-zA-Z0-9$_]+)\([a-zA-Z0-9$_]+\)$"#,
                r#"^[a-zA-Z0-9$_]+\[["'](?P<name>[a-zA-Z0-9$_]+)["']\]\([a-zA-Z0-9$_]+\)$"#,
            ],
        )
    }

    /// Definition of the function `name`; group `def` ends at the body's opening brace
    pub fn function_definition(name: &str) -> Result<PatternSet> {
        let name = regex::escape(name);
        PatternSet::new(
            "function definition",
            "def",
            &[
                format!(
                    r#"(?:^|[^a-zA-Z0-9$_.])(?P<def>{name}\s*=\s*function\s*\(\s*{IDENT}+\s*\)\s*\{{)"#
                ),
                format!(
                    r#"(?P<def>function\s+{name}\s*\(\s*{IDENT}+\s*\)\s*\{{)"#
                ),
            ],
        )
    }

    /// Object literal bound to `name`; group `open` is its opening brace
    pub fn object_literal(name: &str) -> Result<PatternSet> {
        let name = regex::escape(name);
        PatternSet::new(
            "transform object literal",
            "open",
            &[
                format!(r#"(?:var|let|const)\s+{name}\s*=\s*(?P<open>\{{)"#),
                format!(r#"(?:^|[^a-zA-Z0-9$_.]){name}\s*=\s*(?P<open>\{{)"#),
            ],
        )
    }

    /// Array literal bound to `name`; group `open` is its opening bracket
    pub fn array_literal(name: &str) -> Result<PatternSet> {
        let name = regex::escape(name);
        PatternSet::new(
            "throttling array literal",
            "open",
            &[
                format!(r#"var\s+{name}\s*=\s*(?P<open>\[)"#),
                format!(r#"[;,]\s*{name}\s*=\s*(?P<open>\[)"#),
            ],
        )
    }
}
