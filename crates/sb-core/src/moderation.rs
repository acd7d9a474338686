//! # Review Moderation
//!
//! Admin-side review workflow over in-memory data. Reviews live in two
//! parallel collections: `submitted` holds every customer review with its
//! moderation status, `published` holds the approved copies the site shows.

use std::collections::HashMap;

use crate::error::{AppError, Result};
use crate::models::{Review, ReviewStatus};

#[derive(Debug, Clone, Default)]
pub struct ReviewBoard {
    submitted: Vec<Review>,
    published: Vec<Review>,
}

impl ReviewBoard {
    pub fn new(submitted: Vec<Review>) -> Self {
        let published = submitted
            .iter()
            .filter(|review| review.status == ReviewStatus::Approved)
            .cloned()
            .collect();
        Self {
            submitted,
            published,
        }
    }

    /// Mock reviews for the dashboard.
    pub fn with_sample_data() -> Self {
        let sample = [
            ("r1", "Maya L.", "Swedish massage", 5, "The calmest hour of my month.", "2024-05-02", ReviewStatus::Approved),
            ("r2", "Daniel K.", "Deep tissue massage", 4, "Firm pressure, exactly what my back needed.", "2024-05-09", ReviewStatus::Pending),
            ("r3", "Priya S.", "Hot stone therapy", 5, "Warm stones and a lovely therapist.", "2024-05-14", ReviewStatus::Pending),
            ("r4", "Tom B.", "Aromatherapy", 2, "Room was too cold.", "2024-05-20", ReviewStatus::Rejected),
            ("r5", "Elena R.", "Couples massage", 5, "Booked for our anniversary, will return.", "2024-06-01", ReviewStatus::Approved),
            ("r6", "Chris W.", "Reflexology", 3, "Nice, but the session started late.", "2024-06-03", ReviewStatus::Pending),
        ];
        Self::new(
            sample
                .into_iter()
                .map(|(id, author, service, rating, text, date, status)| Review {
                    id: id.into(),
                    author: author.into(),
                    service: service.into(),
                    rating,
                    text: text.into(),
                    date: date.into(),
                    status,
                })
                .collect(),
        )
    }

    pub fn submitted(&self) -> &[Review] {
        &self.submitted
    }

    pub fn published(&self) -> &[Review] {
        &self.published
    }

    pub fn get(&self, id: &str) -> Option<&Review> {
        self.submitted.iter().find(|review| review.id == id)
    }

    /// Marks the review approved and publishes it. Approving twice is a no-op.
    pub fn approve(&mut self, id: &str) -> Result<&Review> {
        let index = self.index_of(id)?;
        self.submitted[index].status = ReviewStatus::Approved;
        let review = self.submitted[index].clone();
        match self.published.iter_mut().find(|published| published.id == id) {
            Some(existing) => *existing = review,
            None => self.published.push(review),
        }
        log::info!("review {id} approved");
        Ok(&self.submitted[index])
    }

    pub fn reject(&mut self, id: &str) -> Result<&Review> {
        self.transition(id, ReviewStatus::Rejected)
    }

    /// Sends the review back to the moderation queue.
    pub fn reset(&mut self, id: &str) -> Result<&Review> {
        self.transition(id, ReviewStatus::Pending)
    }

    pub fn delete(&mut self, id: &str) -> Result<Review> {
        let index = self.index_of(id)?;
        self.published.retain(|review| review.id != id);
        log::info!("review {id} deleted");
        Ok(self.submitted.remove(index))
    }

    /// Reviews matching `status` (if given) whose author, service or text
    /// contains `query`, ignoring case.
    pub fn filter(&self, status: Option<ReviewStatus>, query: Option<&str>) -> Vec<&Review> {
        let needle = query
            .map(|q| q.trim().to_lowercase())
            .filter(|q| !q.is_empty());

        self.submitted
            .iter()
            .filter(|review| status.map_or(true, |wanted| review.status == wanted))
            .filter(|review| match &needle {
                None => true,
                Some(needle) => [&review.author, &review.service, &review.text]
                    .iter()
                    .any(|field| field.to_lowercase().contains(needle.as_str())),
            })
            .collect()
    }

    pub fn counts(&self) -> HashMap<ReviewStatus, usize> {
        let mut counts = HashMap::from([
            (ReviewStatus::Pending, 0),
            (ReviewStatus::Approved, 0),
            (ReviewStatus::Rejected, 0),
        ]);
        for review in &self.submitted {
            *counts.entry(review.status).or_default() += 1;
        }
        counts
    }

    fn transition(&mut self, id: &str, status: ReviewStatus) -> Result<&Review> {
        let index = self.index_of(id)?;
        self.submitted[index].status = status;
        self.published.retain(|review| review.id != id);
        log::info!("review {id} moved to {status:?}");
        Ok(&self.submitted[index])
    }

    fn index_of(&self, id: &str) -> Result<usize> {
        self.submitted
            .iter()
            .position(|review| review.id == id)
            .ok_or_else(|| AppError::NotFound("Review".into(), id.into()))
    }
}
