use std::io::{self, BufRead};
use std::thread;
use voicecalc::session::SessionManager;
use voicecalc::VoiceError;

// ============================================================================
// Stdin Reader Thread
// ============================================================================

/// Forward stdin lines to the session as transcript segments.
pub(crate) fn spawn_stdin_feed(session: SessionManager) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let stdin = io::stdin();
        let stdin_lock = stdin.lock();

        for line in stdin_lock.lines() {
            let line = match line {
                Ok(l) => l,
                Err(_) => break,
            };

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match session.submit_segment(trimmed) {
                Ok(()) => {}
                Err(VoiceError::SessionNotListening) => {
                    tracing::warn!("segment ignored: session is not listening (POST /voice/start)");
                }
                Err(err) => tracing::warn!("segment dropped: {err}"),
            }
        }

        tracing::debug!("stdin feed thread exiting");
    })
}
