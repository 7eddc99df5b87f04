use serde::Serialize;

/// One upstream token budget window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TokenBucket {
    pub consumed: u64,
    /// `None` when the upstream did not report a remaining balance.
    pub remaining: Option<u64>,
}

/// Token accounting returned by the analytics API with each response.
/// Read by the scheduler before every fetch decision; replaced wholesale
/// by the next successful fetch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct QuotaSnapshot {
    pub tokens_per_hour: TokenBucket,
    pub tokens_per_day: TokenBucket,
}

impl QuotaSnapshot {
    /// Collapses the per-property quota reports of one batched refresh into
    /// the snapshot that gates the next decision: the most constrained
    /// property wins on `remaining`, while `consumed` adds up across
    /// properties. Returns `None` for an empty batch.
    pub fn merge_batch<'a, I>(snapshots: I) -> Option<QuotaSnapshot>
    where
        I: IntoIterator<Item = &'a QuotaSnapshot>,
    {
        snapshots
            .into_iter()
            .copied()
            .reduce(|merged, next| QuotaSnapshot {
                tokens_per_hour: merge_buckets(merged.tokens_per_hour, next.tokens_per_hour),
                tokens_per_day: merge_buckets(merged.tokens_per_day, next.tokens_per_day),
            })
    }
}

fn merge_buckets(a: TokenBucket, b: TokenBucket) -> TokenBucket {
    TokenBucket {
        consumed: a.consumed + b.consumed,
        remaining: match (a.remaining, b.remaining) {
            (Some(x), Some(y)) => Some(x.min(y)),
            (remaining, None) | (None, remaining) => remaining,
        },
    }
}
