use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;

use super::IntentLabel;
use crate::error::VoiceError;

/// One labeled utterance used to train the intent classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingSample {
    pub text: String,
    pub label: IntentLabel,
}

impl TrainingSample {
    pub fn new(text: impl Into<String>, label: IntentLabel) -> Self {
        Self {
            text: text.into(),
            label,
        }
    }
}

const DEFAULT_PHRASES: &[(&str, IntentLabel)] = &[
    ("equals", IntentLabel::Calculate),
    ("calculate", IntentLabel::Calculate),
    ("show result", IntentLabel::Calculate),
    ("what is the answer", IntentLabel::Calculate),
    ("finish the calculation", IntentLabel::Calculate),
    ("clear", IntentLabel::Clear),
    ("clear everything", IntentLabel::Clear),
    ("reset calculator", IntentLabel::Clear),
    ("wipe it", IntentLabel::Clear),
    ("backspace", IntentLabel::Backspace),
    ("delete last", IntentLabel::Backspace),
    ("remove the last digit", IntentLabel::Backspace),
    ("undo", IntentLabel::Backspace),
    ("stop listening", IntentLabel::Stop),
    ("mic off", IntentLabel::Stop),
    ("end voice control", IntentLabel::Stop),
    ("don't listen", IntentLabel::Stop),
    ("ignore this", IntentLabel::Noop),
    ("never mind", IntentLabel::Noop),
    ("random words", IntentLabel::Noop),
    ("one plus two", IntentLabel::AppendExpression),
    ("seven times five", IntentLabel::AppendExpression),
    ("twelve minus four", IntentLabel::AppendExpression),
    ("thirty three divided by eleven", IntentLabel::AppendExpression),
    ("open bracket three plus four close bracket", IntentLabel::AppendExpression),
    ("nine point five plus two", IntentLabel::AppendExpression),
    ("add six and eight", IntentLabel::AppendExpression),
    ("subtract seven from nineteen", IntentLabel::AppendExpression),
    ("multiply four by three", IntentLabel::AppendExpression),
    ("divide twenty by five", IntentLabel::AppendExpression),
    ("forty six plus seven whole multiply by four", IntentLabel::AppendExpression),
    (
        "open bracket twelve minus five close bracket times nine",
        IntentLabel::AppendExpression,
    ),
    ("sum of eight and four whole divide by two", IntentLabel::AppendExpression),
    ("add five and nine then multiply by two", IntentLabel::AppendExpression),
    ("modulus of nineteen and four", IntentLabel::AppendExpression),
    ("twenty three mod five", IntentLabel::AppendExpression),
    ("thirty six modulo eight", IntentLabel::AppendExpression),
    ("remainder when fifty three is divided by six", IntentLabel::AppendExpression),
    (
        "open parenthesis forty plus ten close parenthesis times three",
        IntentLabel::AppendExpression,
    ),
    (
        "seventy two divided by open bracket eight minus two close bracket",
        IntentLabel::AppendExpression,
    ),
];

/// Corpus written to disk the first time the service starts.
pub fn default_dataset() -> Vec<TrainingSample> {
    DEFAULT_PHRASES
        .iter()
        .map(|(text, label)| TrainingSample::new(*text, *label))
        .collect()
}

const SMALL_NUMBER_WORDS: [&str; 20] = [
    "zero",
    "one",
    "two",
    "three",
    "four",
    "five",
    "six",
    "seven",
    "eight",
    "nine",
    "ten",
    "eleven",
    "twelve",
    "thirteen",
    "fourteen",
    "fifteen",
    "sixteen",
    "seventeen",
    "eighteen",
    "nineteen",
];

const TENS_WORDS: [&str; 8] = [
    "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
];

/// Spell an integer the way a speaker would. Values of a thousand or more
/// stay as digits.
pub fn number_to_words(value: i64) -> String {
    if value < 0 {
        return format!("minus {}", number_to_words(-value));
    }
    let value = value as u64;
    match value {
        0..=19 => SMALL_NUMBER_WORDS[value as usize].to_string(),
        20..=99 => {
            let tens = TENS_WORDS[(value / 10 - 2) as usize];
            match value % 10 {
                0 => tens.to_string(),
                rest => format!("{tens} {}", SMALL_NUMBER_WORDS[rest as usize]),
            }
        }
        100..=999 => {
            let base = format!("{} hundred", SMALL_NUMBER_WORDS[(value / 100) as usize]);
            match value % 100 {
                0 => base,
                rest => format!("{base} {}", number_to_words(rest as i64)),
            }
        }
        _ => value.to_string(),
    }
}

const SYNTHETIC_NUMBERS: [i64; 10] = [3, 4, 5, 7, 9, 12, 15, 20, 36, 48];
const MODULUS_NUMBERS: [i64; 4] = [19, 23, 53, 75];

/// Templated arithmetic phrasings merged into every training run so the
/// expression label has broad coverage of number and operator words.
pub fn synthetic_expression_corpus() -> Vec<TrainingSample> {
    let mut phrases: Vec<String> = Vec::new();

    for &a in &SYNTHETIC_NUMBERS {
        for &b in &SYNTHETIC_NUMBERS {
            let (wa, wb) = (number_to_words(a), number_to_words(b));
            phrases.extend([
                format!("{wa} plus {wb}"),
                format!("add {wa} to {wb}"),
                format!("sum of {wa} and {wb}"),
                format!("{wa} minus {wb}"),
                format!("subtract {wb} from {wa}"),
                format!("{wa} times {wb}"),
                format!("{wa} multiply by {wb}"),
                format!("product of {wa} and {wb}"),
                format!("{wa} divided by {wb}"),
                format!("divide {wa} by {wb}"),
                format!("{wa} over {wb}"),
                format!("{wa} mod {wb}"),
                format!("{a} + {b}"),
                format!("{a} * {b}"),
            ]);
        }
    }

    for &a in &MODULUS_NUMBERS {
        for b in 2..8 {
            let (wa, wb) = (number_to_words(a), number_to_words(b));
            phrases.push(format!("remainder when {wa} is divided by {wb}"));
            phrases.push(format!("{a} % {b}"));
        }
    }

    let triples = &SYNTHETIC_NUMBERS[..5];
    for &a in triples {
        for &b in triples {
            for &c in triples {
                let (wa, wb, wc) = (number_to_words(a), number_to_words(b), number_to_words(c));
                phrases.extend([
                    format!("{wa} plus {wb} minus {wc}"),
                    format!("open bracket {wa} plus {wb} close bracket times {wc}"),
                    format!("{wa} plus {wb} whole divide by {wc}"),
                    format!("({a} - {b}) / {c}"),
                ]);
            }
        }
    }

    merge_samples(
        phrases
            .into_iter()
            .map(|text| TrainingSample::new(text, IntentLabel::AppendExpression)),
    )
}

/// Trim texts, drop empties, and keep the first occurrence of each text
/// compared case-insensitively.
pub fn merge_samples(samples: impl IntoIterator<Item = TrainingSample>) -> Vec<TrainingSample> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for sample in samples {
        let text = sample.text.trim();
        if text.is_empty() {
            continue;
        }
        if seen.insert(text.to_lowercase()) {
            merged.push(TrainingSample::new(text, sample.label));
        }
    }
    merged
}

/// Read a dataset file. Missing, malformed, or empty files are load failures.
pub fn load_dataset(path: &Path) -> Result<Vec<TrainingSample>, VoiceError> {
    let raw = fs::read_to_string(path).map_err(|err| {
        VoiceError::ClassifierLoadFailure(format!(
            "failed to read dataset {}: {err}",
            path.display()
        ))
    })?;
    let samples: Vec<TrainingSample> = serde_json::from_str(&raw).map_err(|err| {
        VoiceError::ClassifierLoadFailure(format!("invalid dataset {}: {err}", path.display()))
    })?;
    let samples = merge_samples(samples);
    if samples.is_empty() {
        return Err(VoiceError::ClassifierLoadFailure(format!(
            "dataset {} has no usable samples",
            path.display()
        )));
    }
    Ok(samples)
}

pub fn save_dataset(path: &Path, samples: &[TrainingSample]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(samples).map_err(io::Error::other)?;
    fs::write(path, json)
}

/// Write the default corpus when no dataset exists yet, then load it.
pub fn ensure_dataset(path: &Path) -> Result<Vec<TrainingSample>, VoiceError> {
    if !path.exists() {
        save_dataset(path, &default_dataset()).map_err(|err| {
            VoiceError::ClassifierLoadFailure(format!(
                "failed to bootstrap dataset {}: {err}",
                path.display()
            ))
        })?;
        tracing::info!(path = %path.display(), "wrote default intent dataset");
    }
    load_dataset(path)
}
