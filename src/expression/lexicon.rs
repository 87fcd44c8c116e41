//! Word tables for spoken arithmetic (English only).

/// Binary or prefix operator recognized from a spoken word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct OperatorWord {
    pub(super) symbol: char,
    /// Verb forms ("add", "divide") that may precede both operands.
    pub(super) prefix: bool,
}

const fn op(symbol: char) -> Option<OperatorWord> {
    Some(OperatorWord {
        symbol,
        prefix: false,
    })
}

const fn verb(symbol: char) -> Option<OperatorWord> {
    Some(OperatorWord {
        symbol,
        prefix: true,
    })
}

pub(super) fn number_word(word: &str) -> Option<u64> {
    let value = match word {
        "zero" | "oh" | "nought" => 0,
        "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        "eleven" => 11,
        "twelve" => 12,
        "thirteen" => 13,
        "fourteen" => 14,
        "fifteen" => 15,
        "sixteen" => 16,
        "seventeen" => 17,
        "eighteen" => 18,
        "nineteen" => 19,
        "twenty" => 20,
        "thirty" => 30,
        "forty" | "fourty" => 40,
        "fifty" => 50,
        "sixty" => 60,
        "seventy" => 70,
        "eighty" => 80,
        "ninety" => 90,
        "hundred" => 100,
        "thousand" => 1_000,
        _ => return None,
    };
    Some(value)
}

pub(super) fn operator_word(word: &str) -> Option<OperatorWord> {
    match word {
        "plus" | "+" => op('+'),
        "add" | "sum" => verb('+'),
        "minus" | "negative" | "less" | "-" => op('-'),
        "subtract" => verb('-'),
        "times" | "x" | "into" | "multiplied" | "*" | "×" => op('*'),
        "multiply" | "product" => verb('*'),
        "divided" | "over" | "slash" | "/" | "÷" => op('/'),
        "divide" => verb('/'),
        "mod" | "modulo" | "percent" | "%" => op('%'),
        "modulus" | "remainder" => verb('%'),
        _ => None,
    }
}

pub(super) fn is_decimal_point(word: &str) -> bool {
    matches!(word, "point" | "dot" | "decimal" | ".")
}

pub(super) fn is_open_bracket(word: &str) -> bool {
    matches!(word, "(" | "bracket" | "parenthesis" | "parentheses")
}

pub(super) fn is_close_bracket(word: &str) -> bool {
    matches!(word, ")" | "close" | "closing")
}

/// "whole" / "entire" wrap everything said so far before the next operator.
pub(super) fn is_wrap_word(word: &str) -> bool {
    matches!(word, "whole" | "entire")
}

/// Words that carry no arithmetic meaning but separate spoken operands.
pub(super) fn is_filler(word: &str) -> bool {
    matches!(
        word,
        "by" | "of"
            | "the"
            | "a"
            | "an"
            | "and"
            | "then"
            | "from"
            | "to"
            | "with"
            | "is"
            | "are"
            | "was"
            | "were"
            | "be"
            | "per"
            | "what"
            | "what's"
            | "whats"
            | "please"
            | "um"
            | "uh"
            | "equals"
            | "equal"
            | "="
    )
}
