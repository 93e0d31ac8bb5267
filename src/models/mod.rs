pub mod interaction;
pub mod scores;
pub mod user_preferences;
pub mod video;

pub use interaction::{InteractionEvent, InteractionKind, PersonaVector};
pub use scores::{RankedCandidate, RankedItem, RankingCandidate, ScoreBreakdown, VideoSignals};
pub use user_preferences::UserPreferences;
pub use video::{normalize_tags, split_delimited, Video};
