use serde::{Deserialize, Serialize};

use super::domain::{CaregiverReview, UserId};

/// Aggregated rating exposed on a caregiver profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewSummary {
    pub caregiver_id: UserId,
    /// Mean rating, absent until the first review arrives.
    pub average: Option<f32>,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewer_own_rating: Option<u8>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ReviewAggregator;

impl ReviewAggregator {
    pub fn new() -> Self {
        Self
    }

    pub fn summarize(
        &self,
        caregiver: &UserId,
        viewer: Option<&UserId>,
        reviews: &[CaregiverReview],
    ) -> ReviewSummary {
        let relevant: Vec<&CaregiverReview> = reviews
            .iter()
            .filter(|review| &review.caregiver_id == caregiver)
            .collect();

        let count = relevant.len();
        let total: u32 = relevant
            .iter()
            .map(|review| u32::from(review.rating.value()))
            .sum();
        let average = if count == 0 {
            None
        } else {
            Some(total as f32 / count as f32)
        };

        let viewer_own_rating = viewer.and_then(|viewer| {
            relevant
                .iter()
                .find(|review| &review.reviewer_id == viewer)
                .map(|review| review.rating.value())
        });

        ReviewSummary {
            caregiver_id: caregiver.clone(),
            average,
            count,
            viewer_own_rating,
        }
    }
}
