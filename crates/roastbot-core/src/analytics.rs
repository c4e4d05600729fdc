//! Engagement analytics: reactions and shares.
//!
//! Handlers talk to an [`AnalyticsStore`] injected through application state
//! rather than to process-wide counters. [`InMemoryAnalytics`] is the only
//! implementation shipped here; it is process-local and resets on restart.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;

use crate::content::{ContentType, Reaction, SharePlatform};
use crate::error::Result;

/// Share total at which content is considered viral.
pub const DEFAULT_VIRAL_THRESHOLD: u64 = 100;

/// A reaction left on a piece of generated content.
#[derive(Debug, Clone)]
pub struct FeedbackEvent {
    pub content_id: String,
    pub content_type: ContentType,
    pub reaction: Reaction,
    pub prompt_used: Option<String>,
}

/// A share of a generated meme.
#[derive(Debug, Clone)]
pub struct ShareEvent {
    pub content_type: ContentType,
    pub platform: SharePlatform,
    pub meme_id: Option<String>,
}

/// Count per reaction kind, serialized as `{ love, funny, meh, bad }`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReactionCounts {
    pub love: u64,
    pub funny: u64,
    pub meh: u64,
    pub bad: u64,
}

impl ReactionCounts {
    fn increment(&mut self, reaction: Reaction) {
        match reaction {
            Reaction::Love => self.love += 1,
            Reaction::Funny => self.funny += 1,
            Reaction::Meh => self.meh += 1,
            Reaction::Bad => self.bad += 1,
        }
    }
}

/// Usage of a follow-up prompt and the reactions it earned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PromptStats {
    pub uses: u64,
    pub reactions: ReactionCounts,
}

/// Reaction totals after recording a feedback event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedbackSummary {
    pub reactions: ReactionCounts,
    pub total: u64,
}

/// Shares on one platform, split by content type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlatformShares {
    pub roast: u64,
    pub compliment: u64,
}

impl PlatformShares {
    fn increment(&mut self, content_type: ContentType) {
        match content_type {
            ContentType::Roast => self.roast += 1,
            ContentType::Compliment => self.compliment += 1,
        }
    }
}

/// Share counts for one platform after recording a share event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareSummary {
    pub platform: PlatformShares,
    pub total: u64,
    pub is_viral: bool,
}

/// Full share breakdown across all platforms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareTotals {
    pub twitter: PlatformShares,
    pub facebook: PlatformShares,
    pub copy: PlatformShares,
    pub total: u64,
    pub viral_threshold: u64,
}

impl ShareTotals {
    fn platform_mut(&mut self, platform: SharePlatform) -> &mut PlatformShares {
        match platform {
            SharePlatform::Twitter => &mut self.twitter,
            SharePlatform::Facebook => &mut self.facebook,
            SharePlatform::Copy => &mut self.copy,
        }
    }
}

/// Repository for engagement counters.
#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    /// Record a reaction and return the updated reaction totals.
    async fn record_feedback(&self, event: &FeedbackEvent) -> Result<FeedbackSummary>;

    /// Record a share and return the updated counts for its platform.
    async fn record_share(&self, event: &ShareEvent) -> Result<ShareSummary>;

    /// Current share breakdown across all platforms.
    async fn share_totals(&self) -> Result<ShareTotals>;

    /// Usage statistics for a follow-up prompt, if it was ever reported.
    async fn prompt_stats(&self, prompt: &str) -> Result<Option<PromptStats>>;
}

#[derive(Debug, Default)]
struct Counters {
    reactions: ReactionCounts,
    feedback_total: u64,
    prompts: HashMap<String, PromptStats>,
    shares: ShareTotals,
}

/// Process-local analytics store.
#[derive(Debug)]
pub struct InMemoryAnalytics {
    counters: Mutex<Counters>,
}

impl InMemoryAnalytics {
    pub fn new(viral_threshold: u64) -> Self {
        let counters = Counters {
            shares: ShareTotals {
                viral_threshold,
                ..ShareTotals::default()
            },
            ..Counters::default()
        };
        Self {
            counters: Mutex::new(counters),
        }
    }
}

impl Default for InMemoryAnalytics {
    fn default() -> Self {
        Self::new(DEFAULT_VIRAL_THRESHOLD)
    }
}

#[async_trait]
impl AnalyticsStore for InMemoryAnalytics {
    async fn record_feedback(&self, event: &FeedbackEvent) -> Result<FeedbackSummary> {
        let mut counters = self.counters.lock();

        counters.reactions.increment(event.reaction);
        counters.feedback_total += 1;

        if let Some(prompt) = event.prompt_used.as_deref().filter(|p| !p.is_empty()) {
            let stats = counters.prompts.entry(prompt.to_string()).or_default();
            stats.uses += 1;
            stats.reactions.increment(event.reaction);
        }

        tracing::debug!(
            content_id = %event.content_id,
            content_type = %event.content_type,
            reaction = %event.reaction,
            total = counters.feedback_total,
            "feedback recorded"
        );

        Ok(FeedbackSummary {
            reactions: counters.reactions,
            total: counters.feedback_total,
        })
    }

    async fn record_share(&self, event: &ShareEvent) -> Result<ShareSummary> {
        let mut counters = self.counters.lock();
        let shares = &mut counters.shares;

        shares.platform_mut(event.platform).increment(event.content_type);
        shares.total += 1;

        let summary = ShareSummary {
            platform: *shares.platform_mut(event.platform),
            total: shares.total,
            is_viral: shares.total >= shares.viral_threshold,
        };

        tracing::debug!(
            platform = %event.platform,
            content_type = %event.content_type,
            meme_id = event.meme_id.as_deref().unwrap_or(""),
            total = summary.total,
            "share recorded"
        );

        Ok(summary)
    }

    async fn share_totals(&self) -> Result<ShareTotals> {
        Ok(self.counters.lock().shares.clone())
    }

    async fn prompt_stats(&self, prompt: &str) -> Result<Option<PromptStats>> {
        Ok(self.counters.lock().prompts.get(prompt).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feedback(reaction: Reaction, prompt: Option<&str>) -> FeedbackEvent {
        FeedbackEvent {
            content_id: "abc".to_string(),
            content_type: ContentType::Roast,
            reaction,
            prompt_used: prompt.map(str::to_string),
        }
    }

    fn share(platform: SharePlatform, content_type: ContentType) -> ShareEvent {
        ShareEvent {
            content_type,
            platform,
            meme_id: None,
        }
    }

    #[tokio::test]
    async fn feedback_counts_accumulate() {
        let store = InMemoryAnalytics::default();
        store.record_feedback(&feedback(Reaction::Love, None)).await.unwrap();
        store.record_feedback(&feedback(Reaction::Love, None)).await.unwrap();
        let summary = store
            .record_feedback(&feedback(Reaction::Bad, None))
            .await
            .unwrap();

        assert_eq!(summary.total, 3);
        assert_eq!(summary.reactions.love, 2);
        assert_eq!(summary.reactions.bad, 1);
        assert_eq!(summary.reactions.funny, 0);
    }

    #[tokio::test]
    async fn prompt_usage_is_tracked() {
        let store = InMemoryAnalytics::default();
        let prompt = "Make it more brutal";
        store
            .record_feedback(&feedback(Reaction::Funny, Some(prompt)))
            .await
            .unwrap();
        store
            .record_feedback(&feedback(Reaction::Meh, Some(prompt)))
            .await
            .unwrap();

        let stats = store.prompt_stats(prompt).await.unwrap().unwrap();
        assert_eq!(stats.uses, 2);
        assert_eq!(stats.reactions.funny, 1);
        assert_eq!(stats.reactions.meh, 1);
        assert!(store.prompt_stats("Keep it classy").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_prompt_is_ignored() {
        let store = InMemoryAnalytics::default();
        store
            .record_feedback(&feedback(Reaction::Love, Some("")))
            .await
            .unwrap();
        assert!(store.prompt_stats("").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn shares_split_by_platform_and_type() {
        let store = InMemoryAnalytics::default();
        store
            .record_share(&share(SharePlatform::Twitter, ContentType::Roast))
            .await
            .unwrap();
        let summary = store
            .record_share(&share(SharePlatform::Twitter, ContentType::Compliment))
            .await
            .unwrap();
        store
            .record_share(&share(SharePlatform::Copy, ContentType::Roast))
            .await
            .unwrap();

        assert_eq!(summary.platform, PlatformShares { roast: 1, compliment: 1 });
        assert_eq!(summary.total, 2);
        assert!(!summary.is_viral);

        let totals = store.share_totals().await.unwrap();
        assert_eq!(totals.total, 3);
        assert_eq!(totals.copy.roast, 1);
        assert_eq!(totals.facebook, PlatformShares::default());
        assert_eq!(totals.viral_threshold, DEFAULT_VIRAL_THRESHOLD);
    }

    #[tokio::test]
    async fn viral_flag_flips_at_threshold() {
        let store = InMemoryAnalytics::new(3);
        let mut last = None;
        for _ in 0..3 {
            last = Some(
                store
                    .record_share(&share(SharePlatform::Facebook, ContentType::Roast))
                    .await
                    .unwrap(),
            );
        }
        assert!(last.unwrap().is_viral);
    }

    #[test]
    fn share_summary_serializes_camel_case() {
        let summary = ShareSummary {
            platform: PlatformShares::default(),
            total: 1,
            is_viral: false,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["isViral"], false);
        assert_eq!(json["platform"]["roast"], 0);
    }
}
