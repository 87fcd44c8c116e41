use regex::Regex;
use std::sync::OnceLock;

/// Phrase that forces an immediate flush of the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum TriggerKind {
    Clear,
    Calculate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct TriggerMatch {
    pub(super) kind: TriggerKind,
    pub(super) start: usize,
    pub(super) end: usize,
}

/// Case-insensitive match of `alternatives` as whole words. Hyphens and
/// apostrophes count as word characters, so "non-stop" is not "stop".
fn phrase_pattern(alternatives: &str) -> String {
    format!(r"(?i)(?:^|[^\w'-])(?P<phrase>{alternatives})(?:[^\w'-]|$)")
}

fn trigger_regex() -> &'static Regex {
    static TRIGGER_RE: OnceLock<Regex> = OnceLock::new();
    // Longer phrases first so "clear everything" wins over "clear" at the
    // same offset.
    TRIGGER_RE.get_or_init(|| {
        Regex::new(&phrase_pattern(
            r"(?P<clear>clear everything|reset calculator|clear)|(?P<calculate>is equal to|equal to|equals|calculate|show result)",
        ))
        .expect("trigger regex should compile")
    })
}

fn stop_regex() -> &'static Regex {
    static STOP_RE: OnceLock<Regex> = OnceLock::new();
    STOP_RE.get_or_init(|| {
        Regex::new(&phrase_pattern("stop listening|stop|mic off"))
            .expect("stop regex should compile")
    })
}

fn backspace_regex() -> &'static Regex {
    static BACKSPACE_RE: OnceLock<Regex> = OnceLock::new();
    BACKSPACE_RE.get_or_init(|| {
        Regex::new(&phrase_pattern("backspace|delete last|undo"))
            .expect("backspace regex should compile")
    })
}

/// Earliest clear/calculate phrase in `text`.
pub(super) fn find_trigger(text: &str) -> Option<TriggerMatch> {
    let caps = trigger_regex().captures(text)?;
    let phrase = caps.name("phrase")?;
    let kind = if caps.name("clear").is_some() {
        TriggerKind::Clear
    } else {
        TriggerKind::Calculate
    };
    Some(TriggerMatch {
        kind,
        start: phrase.start(),
        end: phrase.end(),
    })
}

pub(super) fn contains_stop(text: &str) -> bool {
    stop_regex().is_match(text)
}

pub(super) fn contains_backspace(text: &str) -> bool {
    backspace_regex().is_match(text)
}
