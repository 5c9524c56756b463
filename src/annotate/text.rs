//! Natural-language annotation of comment text.
//!
//! Tokenization, POS tagging, and constituency parsing are delegated to
//! an external CoreNLP-style HTTP service; this module only decodes its
//! response and derives flat feature values from it. `MockAnnotator`
//! stands in for the service in tests.
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

/// Errors from the annotation backend.
#[derive(Error, Debug)]
pub enum AnnotateError {
    #[error("annotator request failed: {0}")]
    Http(String),

    #[error("annotator response not understood: {0}")]
    Decode(String),
}

/// One annotated token.
#[derive(Debug, Clone)]
pub struct Token {
    pub word: String,
    pub pos: String,
}

/// The first sentence of an annotated text.
#[derive(Debug, Clone)]
pub struct Sentence {
    pub tokens: Vec<Token>,
    /// Bracketed constituency parse, when the backend produced one.
    pub parse: Option<ParseTree>,
}

/// Trait for annotation backends. Implementations must be `Send + Sync`
/// so one backend can serve a whole run.
pub trait Annotator: Send + Sync {
    /// Annotate `text` and return its first sentence, or `None` when
    /// the text contains no sentence at all.
    fn annotate(&self, text: &str) -> Result<Option<Sentence>, AnnotateError>;
}

// ── Derived feature values ───────────────────────────────────────────

static CODE_PAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[=_{}%@]|\w\.\w|\w\(|[;:]\s*$").unwrap());

/// Whether the text looks like code rather than prose: assignment and
/// brace characters, dotted or called identifiers, or a trailing
/// semicolon/colon.
pub fn is_code_like(text: &str) -> bool {
    CODE_PAT.is_match(text)
}

fn is_letters(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_alphabetic())
}

/// Alphabetic words of the sentence, lowercased, comma-joined.
pub fn words(sentence: &Sentence) -> String {
    sentence
        .tokens
        .iter()
        .filter(|t| is_letters(&t.word))
        .map(|t| t.word.to_lowercase())
        .collect::<Vec<_>>()
        .join(",")
}

/// Alphabetic POS labels of the sentence, comma-joined. Punctuation
/// tags (`.`, `,`, ...) drop out.
pub fn pos_tags(sentence: &Sentence) -> String {
    sentence
        .tokens
        .iter()
        .filter(|t| is_letters(&t.pos))
        .map(|t| t.pos.clone())
        .collect::<Vec<_>>()
        .join(",")
}

// ── Constituency parse ───────────────────────────────────────────────

/// A bracketed parse: interior nodes carry constituent labels, leaves
/// carry the words themselves.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseTree {
    Leaf(String),
    Node {
        label: String,
        children: Vec<ParseTree>,
    },
}

impl ParseTree {
    pub fn label(&self) -> &str {
        match self {
            ParseTree::Leaf(word) => word,
            ParseTree::Node { label, .. } => label,
        }
    }

    /// Parse a Penn-Treebank-style bracketed string such as
    /// `(ROOT (S (NP (NN dog)) (VP (VBZ barks))))`.
    pub fn from_bracketed(s: &str) -> Result<ParseTree, AnnotateError> {
        let mut chars = s.chars().peekable();
        let tree = parse_node(&mut chars)?;
        Ok(tree)
    }

    /// Labels of the nodes `level + 1` steps below the root,
    /// comma-joined; at exactly the requested depth leaf words appear
    /// as their own labels.
    pub fn flatten(&self, level: usize) -> String {
        let mut syms = Vec::new();
        visit(&mut syms, self, level);
        syms.join(",")
    }
}

fn visit<'a>(syms: &mut Vec<&'a str>, tree: &'a ParseTree, level: usize) {
    if let ParseTree::Node { children, .. } = tree {
        for child in children {
            if level == 0 {
                syms.push(child.label());
            } else {
                visit(syms, child, level - 1);
            }
        }
    }
}

fn parse_node(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
) -> Result<ParseTree, AnnotateError> {
    skip_spaces(chars);
    match chars.peek() {
        Some('(') => {
            chars.next();
            skip_spaces(chars);
            let label = read_atom(chars);
            let mut children = Vec::new();
            loop {
                skip_spaces(chars);
                match chars.peek() {
                    Some(')') => {
                        chars.next();
                        break;
                    }
                    Some(_) => children.push(parse_node(chars)?),
                    None => {
                        return Err(AnnotateError::Decode("unbalanced parse string".into()));
                    }
                }
            }
            Ok(ParseTree::Node { label, children })
        }
        Some(_) => Ok(ParseTree::Leaf(read_atom(chars))),
        None => Err(AnnotateError::Decode("empty parse string".into())),
    }
}

fn skip_spaces(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) {
    while chars.peek().is_some_and(|c| c.is_whitespace()) {
        chars.next();
    }
}

fn read_atom(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut atom = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() || c == '(' || c == ')' {
            break;
        }
        atom.push(c);
        chars.next();
    }
    atom
}

// ── HTTP backend ─────────────────────────────────────────────────────

const ANNOTATORS_PROPS: &str =
    r#"{"annotators":"tokenize,ssplit,pos,parse","outputFormat":"json"}"#;

#[derive(Deserialize)]
struct NlpResponse {
    #[serde(default)]
    sentences: Vec<NlpSentence>,
}

#[derive(Deserialize)]
struct NlpSentence {
    #[serde(default)]
    tokens: Vec<NlpToken>,
    parse: Option<String>,
}

#[derive(Deserialize)]
struct NlpToken {
    word: String,
    pos: Option<String>,
}

/// Annotator backed by a CoreNLP-compatible HTTP server.
pub struct HttpAnnotator {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpAnnotator {
    pub fn new(url: impl Into<String>) -> Result<Self, AnnotateError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AnnotateError::Http(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl Annotator for HttpAnnotator {
    fn annotate(&self, text: &str) -> Result<Option<Sentence>, AnnotateError> {
        let response = self
            .client
            .post(&self.url)
            .query(&[("properties", ANNOTATORS_PROPS)])
            .body(text.to_string())
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| AnnotateError::Http(e.to_string()))?;

        let body: NlpResponse = response
            .json()
            .map_err(|e| AnnotateError::Decode(e.to_string()))?;

        let Some(first) = body.sentences.into_iter().next() else {
            return Ok(None);
        };

        let tokens = first
            .tokens
            .into_iter()
            .map(|t| Token {
                word: t.word,
                pos: t.pos.unwrap_or_default(),
            })
            .collect();
        let parse = match first.parse {
            Some(s) => Some(ParseTree::from_bracketed(&s)?),
            None => None,
        };
        Ok(Some(Sentence { tokens, parse }))
    }
}

// ── Mock backend ─────────────────────────────────────────────────────

/// Deterministic offline annotator: whitespace tokenization, crude POS
/// guesses, no parse tree. Enough to exercise the pipeline in tests.
#[derive(Default)]
pub struct MockAnnotator;

impl Annotator for MockAnnotator {
    fn annotate(&self, text: &str) -> Result<Option<Sentence>, AnnotateError> {
        let tokens: Vec<Token> = text
            .split_whitespace()
            .map(|raw| {
                let word = raw.trim_matches(|c: char| !c.is_alphanumeric());
                let word = if word.is_empty() { raw } else { word };
                let pos = if word.chars().all(|c| c.is_ascii_digit()) {
                    "CD"
                } else if is_letters(word) {
                    "NN"
                } else {
                    "SYM"
                };
                Token {
                    word: word.to_string(),
                    pos: pos.to_string(),
                }
            })
            .collect();
        if tokens.is_empty() {
            return Ok(None);
        }
        Ok(Some(Sentence {
            tokens,
            parse: None,
        }))
    }
}
