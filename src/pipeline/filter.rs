//! Delivery filter: keyword suppression and per-item idempotence.

use crate::models::{CandidateItem, KeywordRules};
use crate::storage::DeliveryCache;

/// Decides which collected items may be dispatched.
#[derive(Debug, Clone, Copy)]
pub struct DeliveryFilter<'a> {
    block_keywords: &'a [String],
}

impl<'a> DeliveryFilter<'a> {
    pub fn new(rules: &'a KeywordRules) -> Self {
        Self {
            block_keywords: &rules.block_keywords,
        }
    }

    /// Whether a block keyword occurs in the item's rendered body.
    pub fn is_blocked(&self, item: &CandidateItem) -> bool {
        let body = item.rendered_body();
        self.block_keywords
            .iter()
            .any(|k| !k.is_empty() && body.contains(k.as_str()))
    }

    /// Keep the eligible items in their original order.
    ///
    /// Returns the eligible items and the number suppressed.
    pub fn apply(&self, items: Vec<CandidateItem>) -> (Vec<CandidateItem>, usize) {
        let total = items.len();
        let eligible: Vec<CandidateItem> = items
            .into_iter()
            .filter(|item| {
                let blocked = self.is_blocked(item);
                if blocked {
                    log::info!(
                        "Suppressed {} #{} by block keyword",
                        item.feed_id,
                        item.item_id
                    );
                }
                !blocked
            })
            .collect();
        let suppressed = total - eligible.len();
        (eligible, suppressed)
    }

    /// Thread admission: not delivered before (unless forced) and not blocked.
    pub async fn admit_thread(
        &self,
        cache: &DeliveryCache<'_>,
        item: &CandidateItem,
        force: bool,
    ) -> bool {
        if !force && cache.is_delivered(item.item_id).await {
            log::debug!("Skipping delivered thread {}", cache.key(item.item_id));
            return false;
        }
        !self.is_blocked(item)
    }
}
