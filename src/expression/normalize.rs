use regex::Regex;
use std::sync::OnceLock;

use super::lexicon::{
    is_close_bracket, is_decimal_point, is_filler, is_open_bracket, is_wrap_word, number_word,
    operator_word, OperatorWord,
};

/// Result of normalizing one spoken segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    /// Symbolic expression, or `None` when nothing usable was said.
    pub expression: Option<String>,
    /// Share of tokens that carried arithmetic meaning, in `[0, 1]`.
    pub confidence: f32,
}

impl Normalized {
    fn empty() -> Self {
        Self {
            expression: None,
            confidence: 0.0,
        }
    }
}

/// Convert spoken math ("three plus four") into a calculator expression ("3+4").
///
/// Deterministic and idempotent on its own output. Unknown words are dropped.
pub fn normalize(text: &str) -> Normalized {
    let prepared = rewrite_phrases(&text.to_lowercase());
    let tokens = tokenize(&prepared);
    if tokens.is_empty() {
        return Normalized::empty();
    }

    let (lexemes, matched) = lex(&tokens);
    let mut builder = ExpressionBuilder::default();
    for lexeme in lexemes {
        builder.push(lexeme);
    }

    Normalized {
        expression: builder.finish(),
        confidence: (matched as f32 / tokens.len() as f32).min(1.0),
    }
}

/// Shorthand for callers that only need the expression.
pub fn normalize_expression(text: &str) -> Option<String> {
    normalize(text).expression
}

// ============================================================================
// Phrase rewriting and tokenization
// ============================================================================

struct Rewrite {
    pattern: Regex,
    replacement: &'static str,
}

fn rewrites() -> &'static [Rewrite] {
    static REWRITES: OnceLock<Vec<Rewrite>> = OnceLock::new();
    REWRITES.get_or_init(|| {
        // Operand reorderings must run before the operator phrases below
        // consume their "divided by" / "from" anchors.
        [
            (
                r"\bremainder (?:when|if) ([a-z0-9 .]+?) is divided by ([a-z0-9 .]+)",
                "$1 mod $2",
            ),
            (r"\bsubtract ([a-z0-9 .]+?) from ([a-z0-9 .]+)", "$2 minus $1"),
            (r"\btake away ([a-z0-9 .]+?) from ([a-z0-9 .]+)", "$2 minus $1"),
            (r"\badd ([a-z0-9 .]+?) to ([a-z0-9 .]+)", "$2 plus $1"),
            (r"\bsum of ([a-z0-9 .]+?) and ([a-z0-9 .]+)", "$1 plus $2"),
            (
                r"\bdifference between ([a-z0-9 .]+?) and ([a-z0-9 .]+)",
                "$1 minus $2",
            ),
            (r"\bproduct of ([a-z0-9 .]+?) and ([a-z0-9 .]+)", "$1 times $2"),
            (r"\bmodulus of ([a-z0-9 .]+?) and ([a-z0-9 .]+)", "$1 mod $2"),
            (r"\b(?:multiplied|multiply|times) (?:by|with)\b", "times"),
            (r"\b(?:divided|divide) (?:by|into)\b", "over"),
            (
                r"\b(?:open|opening|left) (?:bracket|parenthesis|paren)\b",
                " ( ",
            ),
            (
                r"\b(?:close|closing|right) (?:bracket|parenthesis|paren)\b",
                " ) ",
            ),
        ]
        .into_iter()
        .map(|(pattern, replacement)| Rewrite {
            pattern: Regex::new(pattern).expect("rewrite pattern should compile"),
            replacement,
        })
        .collect()
    })
}

fn rewrite_phrases(lowered: &str) -> String {
    let mut text = lowered.to_string();
    for rewrite in rewrites() {
        if rewrite.pattern.is_match(&text) {
            text = rewrite
                .pattern
                .replace_all(&text, rewrite.replacement)
                .into_owned();
        }
    }
    text
}

fn tokenize(text: &str) -> Vec<&str> {
    static TOKEN_RE: OnceLock<Regex> = OnceLock::new();
    let re = TOKEN_RE.get_or_init(|| {
        Regex::new(r"[a-z']+|\d+(?:\.\d+)?|[+\-*/%().=×÷]").expect("token regex should compile")
    });
    re.find_iter(text).map(|m| m.as_str()).collect()
}

// ============================================================================
// Lexing
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Lexeme {
    Number(String),
    Operator(OperatorWord),
    Dot,
    Open,
    Close,
    Wrap,
    Separator,
}

/// Map tokens to lexemes; returns the lexemes plus how many tokens matched.
fn lex(tokens: &[&str]) -> (Vec<Lexeme>, usize) {
    let mut lexemes = Vec::with_capacity(tokens.len());
    let mut matched = 0usize;
    let mut i = 0usize;

    while i < tokens.len() {
        let token = tokens[i];
        if token.starts_with(|c: char| c.is_ascii_digit()) {
            lexemes.push(Lexeme::Number(token.to_string()));
            matched += 1;
            i += 1;
            continue;
        }
        if number_word(token).is_some() {
            let mut values = Vec::new();
            while i < tokens.len() {
                if let Some(value) = number_word(tokens[i]) {
                    values.push(value);
                    matched += 1;
                    i += 1;
                } else if tokens[i] == "and"
                    && matches!(values.last().copied(), Some(100) | Some(1_000))
                    && tokens.get(i + 1).and_then(|next| number_word(next)).is_some()
                {
                    // "one hundred and five"
                    matched += 1;
                    i += 1;
                } else {
                    break;
                }
            }
            lexemes.extend(
                collapse_number_words(&values)
                    .into_iter()
                    .map(|value| Lexeme::Number(value.to_string())),
            );
            continue;
        }

        let lexeme = if let Some(word) = operator_word(token) {
            Some(Lexeme::Operator(word))
        } else if is_decimal_point(token) {
            Some(Lexeme::Dot)
        } else if is_open_bracket(token) {
            Some(Lexeme::Open)
        } else if is_close_bracket(token) {
            Some(Lexeme::Close)
        } else if is_wrap_word(token) {
            Some(Lexeme::Wrap)
        } else if is_filler(token) {
            Some(Lexeme::Separator)
        } else {
            None
        };
        if let Some(lexeme) = lexeme {
            lexemes.push(lexeme);
            matched += 1;
        }
        i += 1;
    }

    (lexemes, matched)
}

/// Fold a run of number words into one or more integers.
///
/// Values that cannot extend the current number start a new one, so digit
/// dictation ("one two three") yields `[1, 2, 3]` and "forty six" yields `[46]`.
/// A magnitude that would overflow `u64` also starts a new number.
pub(super) fn collapse_number_words(values: &[u64]) -> Vec<u64> {
    let mut out = Vec::new();
    let mut total = 0u64;
    let mut current = 0u64;
    let mut started = false;

    for &value in values {
        match value {
            100 | 1_000 => {
                let scaled = current.max(1).checked_mul(value);
                let next = match (value, scaled) {
                    (100, Some(scaled)) => total.checked_add(scaled).map(|_| (total, scaled)),
                    (_, Some(scaled)) => total.checked_add(scaled).map(|sum| (sum, 0)),
                    (_, None) => None,
                };
                match next {
                    Some((next_total, next_current)) => {
                        total = next_total;
                        current = next_current;
                    }
                    None => {
                        if started {
                            out.push(total + current);
                        }
                        (total, current) = if value == 100 { (0, 100) } else { (1_000, 0) };
                    }
                }
            }
            _ => {
                let has_magnitude = current > 0 || total > 0;
                let fits = started
                    && has_magnitude
                    && match value {
                        0 => false,
                        1..=9 => current % 10 == 0 && current % 100 != 10,
                        _ => current % 100 == 0,
                    }
                    && current
                        .checked_add(value)
                        .and_then(|sum| total.checked_add(sum))
                        .is_some();
                if fits {
                    current += value;
                } else {
                    if started {
                        out.push(total + current);
                        total = 0;
                    }
                    current = value;
                }
            }
        }
        started = true;
    }
    if started {
        out.push(total + current);
    }
    out
}

// ============================================================================
// Expression assembly
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Tail {
    #[default]
    Start,
    Number,
    Dot,
    Operator,
    Unary,
    Open,
    Close,
    Postfix,
}

#[derive(Debug, Default)]
struct ExpressionBuilder {
    out: String,
    tail: Tail,
    depth: usize,
    number_has_dot: bool,
    /// Operator from a verb phrasing ("add six and eight") waiting for its
    /// second operand.
    pending_prefix: Option<char>,
    separated: bool,
    wrap_pending: bool,
}

impl ExpressionBuilder {
    fn push(&mut self, lexeme: Lexeme) {
        match lexeme {
            Lexeme::Separator => {
                self.separated = true;
                return;
            }
            Lexeme::Number(digits) => self.push_number(&digits),
            Lexeme::Operator(word) => self.push_operator(word),
            Lexeme::Dot => self.push_dot(),
            Lexeme::Open => self.push_open(),
            Lexeme::Close => self.push_close(),
            Lexeme::Wrap => self.wrap_pending = true,
        }
        self.separated = false;
    }

    fn push_number(&mut self, digits: &str) {
        if self.tail == Tail::Number && self.separated {
            if let Some(symbol) = self.pending_prefix.take() {
                self.push_binary(symbol);
            }
        }
        match self.tail {
            Tail::Number | Tail::Dot => {
                if self.number_has_dot {
                    self.out.extend(digits.chars().filter(|c| *c != '.'));
                } else {
                    self.out.push_str(digits);
                }
            }
            _ => {
                self.number_has_dot = false;
                self.out.push_str(digits);
            }
        }
        if digits.contains('.') {
            self.number_has_dot = true;
        }
        self.tail = Tail::Number;
    }

    fn push_operator(&mut self, word: OperatorWord) {
        // A dangling "." never survives an operator.
        if self.tail == Tail::Dot {
            self.out.pop();
            self.recompute_tail();
        }
        match self.tail {
            Tail::Start | Tail::Open => {
                if word.prefix {
                    self.pending_prefix = Some(word.symbol);
                } else if word.symbol == '-' {
                    self.out.push('-');
                    self.tail = Tail::Unary;
                }
            }
            Tail::Operator => {
                if word.symbol == '-' {
                    self.out.push('-');
                    self.tail = Tail::Unary;
                } else if word.symbol != '%' {
                    self.out.pop();
                    self.out.push(word.symbol);
                }
            }
            Tail::Unary => {}
            Tail::Postfix if word.symbol == '%' => {}
            Tail::Number | Tail::Dot | Tail::Close | Tail::Postfix => {
                self.push_binary(word.symbol);
                if word.symbol == '%' {
                    self.tail = Tail::Postfix;
                }
            }
        }
    }

    fn push_binary(&mut self, symbol: char) {
        if self.tail == Tail::Dot {
            self.out.pop();
        }
        if self.wrap_pending {
            self.wrap_pending = false;
            if self.depth == 0 && !self.out.is_empty() && !is_fully_wrapped(&self.out) {
                self.out = format!("({})", self.out);
            }
        }
        self.out.push(symbol);
        self.tail = Tail::Operator;
    }

    fn push_dot(&mut self) {
        match self.tail {
            Tail::Number if !self.number_has_dot => {}
            Tail::Start | Tail::Operator | Tail::Unary | Tail::Open => {}
            _ => return,
        }
        self.out.push('.');
        self.number_has_dot = true;
        self.tail = Tail::Dot;
    }

    fn push_open(&mut self) {
        if self.tail == Tail::Dot {
            self.out.pop();
        }
        self.out.push('(');
        self.depth += 1;
        self.tail = Tail::Open;
    }

    fn push_close(&mut self) {
        if self.depth == 0 {
            return;
        }
        self.trim_dangling();
        if self.tail == Tail::Open {
            self.out.pop();
            self.depth -= 1;
            self.recompute_tail();
            return;
        }
        self.out.push(')');
        self.depth -= 1;
        self.tail = Tail::Close;
    }

    /// Drop trailing operators and decimal points.
    fn trim_dangling(&mut self) {
        while matches!(self.out.chars().last(), Some('+' | '-' | '*' | '/' | '.')) {
            self.out.pop();
        }
        self.recompute_tail();
    }

    fn recompute_tail(&mut self) {
        self.tail = match self.out.chars().last() {
            None => Tail::Start,
            Some('(') => Tail::Open,
            Some(')') => Tail::Close,
            Some('%') => Tail::Postfix,
            Some('.') => Tail::Dot,
            Some('+' | '*' | '/') => Tail::Operator,
            Some('-') => Tail::Unary,
            Some(_) => {
                let number: String = self
                    .out
                    .chars()
                    .rev()
                    .take_while(|c| c.is_ascii_digit() || *c == '.')
                    .collect();
                self.number_has_dot = number.contains('.');
                Tail::Number
            }
        };
    }

    fn finish(mut self) -> Option<String> {
        loop {
            self.trim_dangling();
            if self.tail == Tail::Open {
                self.out.pop();
                self.depth = self.depth.saturating_sub(1);
                continue;
            }
            break;
        }
        if self.out.is_empty() {
            None
        } else {
            Some(self.out)
        }
    }
}

fn is_fully_wrapped(expression: &str) -> bool {
    if !expression.starts_with('(') || !expression.ends_with(')') {
        return false;
    }
    let mut depth = 0i32;
    for (idx, ch) in expression.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return idx == expression.len() - 1;
                }
            }
            _ => {}
        }
    }
    false
}
