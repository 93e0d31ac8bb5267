use std::collections::HashSet;

use crate::models::{RankedItem, Video};

use super::features::{self, FeatureMap};
use super::similarity::cosine_sparse;

pub(crate) const SIMILARITY_WEIGHT: f64 = 0.9;
pub(crate) const POPULARITY_WEIGHT: f64 = 0.1;
const POPULARITY_CAP: f64 = 0.1;

/// Attenuated popularity boost, capped so it cannot outweigh similarity
pub fn popularity_boost(view_count: i64) -> f64 {
    let views = view_count.max(0) as f64;
    ((views + 1.0).log10() / 10.0).min(POPULARITY_CAP)
}

/// Content-based recommender over sparse feature maps
#[derive(Debug, Clone)]
pub struct ContentRecommender {
    min_duration_secs: i32,
}

impl ContentRecommender {
    pub fn new(min_duration_secs: i32) -> Self {
        Self { min_duration_secs }
    }

    /// Whether a video is long enough to recommend; unknown durations pass
    pub fn is_eligible(&self, video: &Video) -> bool {
        video
            .duration_secs
            .map_or(true, |secs| secs >= self.min_duration_secs)
    }

    /// Scores candidates against a user feature map and returns the top `limit`.
    ///
    /// `final = 0.9 * cosine + 0.1 * popularity`. Excluded and too-short videos
    /// are skipped. Equal scores keep candidate order.
    pub fn recommend(
        &self,
        candidates: &[Video],
        user_vector: &FeatureMap,
        exclude_ids: &HashSet<i64>,
        limit: usize,
    ) -> Vec<RankedItem> {
        let mut scored: Vec<RankedItem> = candidates
            .iter()
            .filter(|video| !exclude_ids.contains(&video.id) && self.is_eligible(video))
            .map(|video| {
                let similarity = cosine_sparse(user_vector, &features::extract(video));
                RankedItem {
                    video_id: video.id,
                    score: SIMILARITY_WEIGHT * similarity
                        + POPULARITY_WEIGHT * popularity_boost(video.view_count),
                }
            })
            .collect();

        sort_descending(&mut scored);
        scored.truncate(limit);
        scored
    }

    /// Videos most similar to `base`, by feature cosine only
    pub fn similar_items(&self, base: &Video, candidates: &[Video], limit: usize) -> Vec<RankedItem> {
        let base_features = features::extract(base);

        let mut scored: Vec<RankedItem> = candidates
            .iter()
            .filter(|video| video.id != base.id)
            .map(|video| RankedItem {
                video_id: video.id,
                score: cosine_sparse(&base_features, &features::extract(video)),
            })
            .collect();

        sort_descending(&mut scored);
        scored.truncate(limit);
        scored
    }

    /// Cold-start ordering by view count when there is nothing to personalize on
    pub fn popular(
        &self,
        candidates: &[Video],
        exclude_ids: &HashSet<i64>,
        limit: usize,
    ) -> Vec<RankedItem> {
        let mut eligible: Vec<&Video> = candidates
            .iter()
            .filter(|video| !exclude_ids.contains(&video.id) && self.is_eligible(video))
            .collect();

        eligible.sort_by(|a, b| b.view_count.cmp(&a.view_count));

        eligible
            .into_iter()
            .take(limit)
            .map(|video| RankedItem {
                video_id: video.id,
                score: popularity_boost(video.view_count),
            })
            .collect()
    }
}

/// Stable descending sort by score
pub(crate) fn sort_descending(items: &mut [RankedItem]) {
    items.sort_by(|a, b| b.score.total_cmp(&a.score));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserPreferences;

    fn video(id: i64, tags: &[&str], region: Option<&str>, view_count: i64) -> Video {
        Video {
            id,
            title: String::new(),
            description: String::new(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            region: region.map(str::to_string),
            keyword: None,
            duration_secs: Some(300),
            view_count,
            like_count: 0,
            embedding: None,
        }
    }

    fn busan_lover() -> FeatureMap {
        let mut prefs = UserPreferences::new();
        prefs.add_tag("감성");
        prefs.add_region("부산");
        features::user_vector(&prefs)
    }

    #[test]
    fn test_tag_and_region_match_beats_region_only() {
        let both = video(1, &["감성", "여행"], Some("부산"), 0);
        let region_only = video(2, &["바다"], Some("부산"), 0);
        let user = busan_lover();

        let both_sim = cosine_sparse(&user, &features::extract(&both));
        let region_sim = cosine_sparse(&user, &features::extract(&region_only));
        assert!(both_sim > region_sim);

        let ranked = ContentRecommender::new(60).recommend(
            &[region_only, both],
            &user,
            &HashSet::new(),
            10,
        );
        assert_eq!(ranked[0].video_id, 1);
        assert_eq!(ranked[1].video_id, 2);
    }

    #[test]
    fn test_excluded_and_short_videos_are_filtered() {
        let mut short = video(3, &["감성"], Some("부산"), 0);
        short.duration_secs = Some(15);
        let unknown_duration = Video {
            duration_secs: None,
            ..video(4, &["감성"], None, 0)
        };
        let viewed = video(5, &["감성"], Some("부산"), 0);

        let excluded: HashSet<i64> = [5].into_iter().collect();
        let ranked = ContentRecommender::new(60).recommend(
            &[short, unknown_duration, viewed],
            &busan_lover(),
            &excluded,
            10,
        );

        let ids: Vec<i64> = ranked.iter().map(|r| r.video_id).collect();
        assert_eq!(ids, vec![4]);
    }

    #[test]
    fn test_popularity_is_capped_and_monotonic() {
        assert_eq!(popularity_boost(0), 0.0);
        assert!(popularity_boost(1) < popularity_boost(5));
        assert!(popularity_boost(5) <= popularity_boost(100_000));
        assert_eq!(popularity_boost(10_000_000_000), POPULARITY_CAP);
        assert_eq!(popularity_boost(-5), 0.0);
    }

    #[test]
    fn test_higher_view_count_never_ranks_lower() {
        let quiet = video(1, &["감성"], Some("부산"), 0);
        let busy = video(2, &["감성"], Some("부산"), 5);
        let ranked = ContentRecommender::new(60).recommend(
            &[quiet, busy],
            &busan_lover(),
            &HashSet::new(),
            10,
        );
        assert_eq!(ranked[0].video_id, 2);
        assert!(ranked[0].score >= ranked[1].score);
    }

    #[test]
    fn test_ties_keep_candidate_order() {
        let candidates = vec![
            video(30, &["감성"], None, 0),
            video(10, &["감성"], None, 0),
            video(20, &["감성"], None, 0),
        ];
        let ranked =
            ContentRecommender::new(60).recommend(&candidates, &busan_lover(), &HashSet::new(), 10);
        let ids: Vec<i64> = ranked.iter().map(|r| r.video_id).collect();
        assert_eq!(ids, vec![30, 10, 20]);
    }

    #[test]
    fn test_limit_and_empty_candidates() {
        let recommender = ContentRecommender::new(60);
        let candidates: Vec<Video> = (1..=5).map(|id| video(id, &["감성"], None, id)).collect();

        assert_eq!(
            recommender
                .recommend(&candidates, &busan_lover(), &HashSet::new(), 2)
                .len(),
            2
        );
        assert!(recommender
            .recommend(&[], &busan_lover(), &HashSet::new(), 5)
            .is_empty());
    }

    #[test]
    fn test_similar_items_excludes_base_and_ignores_popularity() {
        let base = video(1, &["야경"], Some("부산"), 0);
        let twin = video(2, &["야경"], Some("부산"), 0);
        let famous_stranger = video(3, &["스키"], Some("평창"), 1_000_000);

        let ranked = ContentRecommender::new(60).similar_items(
            &base,
            &[base.clone(), famous_stranger, twin],
            10,
        );

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].video_id, 2);
        assert!((ranked[0].score - 1.0).abs() < 1e-9);
        assert_eq!(ranked[1].score, 0.0);
    }

    #[test]
    fn test_popular_orders_by_views() {
        let candidates = vec![
            video(1, &[], None, 10),
            video(2, &[], None, 500),
            video(3, &[], None, 500),
            video(4, &[], None, 90),
        ];
        let excluded: HashSet<i64> = [4].into_iter().collect();
        let ranked = ContentRecommender::new(60).popular(&candidates, &excluded, 10);
        let ids: Vec<i64> = ranked.iter().map(|r| r.video_id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }
}
