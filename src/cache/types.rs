use crate::vectordb::TierKind;

/// How a question was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheStatus {
    HitFast,
    HitDurable,
    Miss,
}

impl CacheStatus {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::HitFast => "HIT_FAST",
            CacheStatus::HitDurable => "HIT_DURABLE",
            CacheStatus::Miss => "MISS",
        }
    }

    #[inline]
    pub fn is_hit(&self) -> bool {
        !matches!(self, CacheStatus::Miss)
    }
}

impl From<TierKind> for CacheStatus {
    fn from(tier: TierKind) -> Self {
        match tier {
            TierKind::Fast => CacheStatus::HitFast,
            TierKind::Durable => CacheStatus::HitDurable,
        }
    }
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
