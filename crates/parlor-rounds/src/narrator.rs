//! The narration seam: prompt in, short atmospheric text out.
//!
//! The actual language-model client lives outside the core. The engine only
//! sees this trait, wraps every call in a timeout, and substitutes a
//! deterministic fallback line when generation fails — narration may be slow
//! or broken, but the round state machine never waits on it unboundedly.

use parlor_protocol::NarrationMoment;

/// Everything a narrator needs to produce one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrationRequest {
    /// The story moment being narrated.
    pub moment: NarrationMoment,
    /// Ambiance hint from the round plan or prepared assets, if any.
    pub seed: Option<String>,
    /// 1-based round index, absent for session-level narration.
    pub round_index: Option<u32>,
    /// Mini-game code of the round being narrated, if any.
    pub code: Option<String>,
}

/// A narration attempt failed; the engine falls back to a canned line.
#[derive(Debug, thiserror::Error)]
#[error("narration generation failed: {0}")]
pub struct NarrationError(pub String);

/// Produces short narrative text for party moments.
pub trait Narrator: Send + Sync + 'static {
    async fn narrate(&self, request: &NarrationRequest) -> Result<String, NarrationError>;
}

// ---------------------------------------------------------------------------
// StubNarrator
// ---------------------------------------------------------------------------

/// Offline narrator: deterministic one-liners, no external calls.
///
/// Used when the party runs without a generator, and by the test suites.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubNarrator;

impl Narrator for StubNarrator {
    async fn narrate(&self, request: &NarrationRequest) -> Result<String, NarrationError> {
        let text = match (&request.moment, &request.code) {
            (NarrationMoment::RoundIntro, Some(code)) => {
                format!("A hush falls over the table. Prepare yourselves for '{code}'.")
            }
            (NarrationMoment::RoundIntro, None) => {
                "A hush falls over the table. The next game is about to begin.".to_owned()
            }
            (NarrationMoment::RoundStart, Some(code)) => format!("The game '{code}' begins."),
            (NarrationMoment::RoundStart, None) => "The game begins.".to_owned(),
            (NarrationMoment::RoundEnd, _) => {
                "The noise dies down. Glances cross the room.".to_owned()
            }
            (NarrationMoment::SessionEnd, _) => {
                "The picture sharpens: the hour of accusations draws near.".to_owned()
            }
        };
        Ok(text)
    }
}

/// The canned line broadcast when a narrator errors out or times out.
/// Deterministic on purpose: offline parties must behave identically run
/// after run.
pub(crate) fn fallback_line(moment: NarrationMoment) -> &'static str {
    match moment {
        NarrationMoment::RoundIntro => "A tense silence settles over the room.",
        NarrationMoment::RoundStart => "The game begins.",
        NarrationMoment::RoundEnd => "The round is over. The silence returns.",
        NarrationMoment::SessionEnd => "The hour of accusations draws near.",
    }
}
