use crate::models::{RankedCandidate, RankingCandidate};

const POS_RATIO_WEIGHT: f64 = 0.6;
const AVG_SENTIMENT_WEIGHT: f64 = 0.4;
const TOPIC_MISMATCH_DAMPING: f64 = 0.7;

const SENTIMENT_WEIGHT: f64 = 0.5;
const TOPIC_WEIGHT: f64 = 0.3;
const POPULARITY_WEIGHT: f64 = 0.2;
const USER_AFFINITY_WEIGHT: f64 = 0.1;

/// `0.6 * posRatio + 0.4 * avgSentimentScore`, missing inputs as 0.0
pub fn sentiment_score(pos_ratio: Option<f64>, avg_sentiment_score: Option<f64>) -> f64 {
    POS_RATIO_WEIGHT * finite_or_zero(pos_ratio) + AVG_SENTIMENT_WEIGHT * finite_or_zero(avg_sentiment_score)
}

/// Topic affinity after target-topic adjustment.
///
/// A match with the target topic forces 1.0, a mismatch damps the base score
/// by 0.7, and without a target the base score passes through.
pub fn topic_score(
    base_score: Option<f64>,
    video_topic_id: Option<i64>,
    target_topic_id: Option<i64>,
) -> f64 {
    let base = finite_or_zero(base_score);
    match target_topic_id {
        Some(target) if video_topic_id == Some(target) => 1.0,
        Some(_) => base * TOPIC_MISMATCH_DAMPING,
        None => base,
    }
}

/// `ln(viewCount + 1)`, uncapped
pub fn popularity(view_count: Option<i64>) -> f64 {
    let views = view_count.unwrap_or(0).max(0) as f64;
    (views + 1.0).ln()
}

fn finite_or_zero(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Composes sentiment, topic and popularity sub-scores into a ranking score
#[derive(Debug, Clone, Default)]
pub struct RankingEngine;

impl RankingEngine {
    pub fn new() -> Self {
        Self
    }

    /// Scores a single candidate against an optional target topic
    pub fn score(&self, candidate: &RankingCandidate, target_topic_id: Option<i64>) -> RankedCandidate {
        let sentiment = sentiment_score(candidate.pos_ratio, candidate.avg_sentiment_score);
        let topic = topic_score(candidate.topic_score, candidate.topic_id, target_topic_id);
        let popularity = popularity(candidate.view_count);

        let mut final_score =
            SENTIMENT_WEIGHT * sentiment + TOPIC_WEIGHT * topic + POPULARITY_WEIGHT * popularity;
        if let Some(affinity) = candidate.user_affinity.filter(|a| a.is_finite()) {
            final_score += USER_AFFINITY_WEIGHT * affinity;
        }

        RankedCandidate {
            video_id: candidate.video_id,
            sentiment_score: sentiment,
            topic_score: topic,
            popularity,
            final_score,
        }
    }

    /// Scores and sorts candidates by descending final score.
    ///
    /// Equal scores are ordered by ascending video id so the result does not
    /// depend on the order the candidates were read in.
    pub fn rank(&self, candidates: &[RankingCandidate], target_topic_id: Option<i64>) -> Vec<RankedCandidate> {
        let mut ranked: Vec<RankedCandidate> = candidates
            .iter()
            .map(|candidate| self.score(candidate, target_topic_id))
            .collect();

        ranked.sort_by(|a, b| {
            b.final_score
                .total_cmp(&a.final_score)
                .then_with(|| a.video_id.cmp(&b.video_id))
        });

        tracing::debug!(
            candidates = ranked.len(),
            target_topic_id = ?target_topic_id,
            "Ranked candidates"
        );

        ranked
    }
}
