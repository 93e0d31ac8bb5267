use serde::{Deserialize, Serialize};

/// A recommended video with its composed score
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedItem {
    pub video_id: i64,
    pub score: f64,
}

/// Flat score breakdown for a single (user, video) pair
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScoreBreakdown {
    pub similarity: f64,
    pub topic_score: f64,
    pub sentiment_adjust: f64,
    pub final_score: f64,
}

/// Pre-aggregated sentiment and topic signals for one video
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VideoSignals {
    pub video_id: i64,
    pub pos_ratio: Option<f64>,
    pub avg_sentiment_score: Option<f64>,
    pub topic_id: Option<i64>,
    pub topic_score: Option<f64>,
}

/// Inputs for batch ranking; any missing number counts as 0.0
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RankingCandidate {
    pub video_id: i64,
    pub pos_ratio: Option<f64>,
    pub avg_sentiment_score: Option<f64>,
    pub topic_id: Option<i64>,
    pub topic_score: Option<f64>,
    pub view_count: Option<i64>,
    pub user_affinity: Option<f64>,
}

/// Scored output of the ranking engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedCandidate {
    pub video_id: i64,
    pub sentiment_score: f64,
    pub topic_score: f64,
    pub popularity: f64,
    pub final_score: f64,
}
