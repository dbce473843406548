use std::collections::HashMap;
use std::sync::OnceLock;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub const DEFAULT_TIER: u8 = 3;
pub const DEFAULT_WEIGHT: Decimal = dec!(0.5);
pub const DEFAULT_CATEGORY: &str = "unknown";

#[derive(Debug, Clone, Copy)]
pub struct TierInfo {
    pub tier: u8,
    pub weight: Decimal,
}

/// Domain -> (tier, static weight). Tier 1 is wire-service/regulatory grade,
/// tier 2 is press-release distribution and established financial media.
/// Everything else falls through to tier 3 at `DEFAULT_WEIGHT`.
fn credibility_tiers() -> &'static HashMap<&'static str, TierInfo> {
    static TIERS: OnceLock<HashMap<&'static str, TierInfo>> = OnceLock::new();
    TIERS.get_or_init(|| {
        let mut m = HashMap::new();
        for domain in ["sec.gov", "bloomberg.com", "reuters.com", "wsj.com", "ft.com"] {
            m.insert(
                domain,
                TierInfo {
                    tier: 1,
                    weight: dec!(1.5),
                },
            );
        }
        for domain in [
            "globenewswire.com",
            "businesswire.com",
            "prnewswire.com",
            "accesswire.com",
            "marketwatch.com",
            "cnbc.com",
            "benzinga.com",
        ] {
            m.insert(
                domain,
                TierInfo {
                    tier: 2,
                    weight: dec!(1.0),
                },
            );
        }
        m
    })
}

/// Strip a leading `www.` so lookups don't care whether the scraper kept it.
pub(crate) fn normalize_host(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

pub fn get_source_tier(host: &str) -> u8 {
    credibility_tiers()
        .get(normalize_host(host))
        .map(|info| info.tier)
        .unwrap_or(DEFAULT_TIER)
}

pub fn get_source_weight(host: &str) -> Decimal {
    credibility_tiers()
        .get(normalize_host(host))
        .map(|info| info.weight)
        .unwrap_or(DEFAULT_WEIGHT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier1_source_gets_weight_1_5() {
        assert_eq!(get_source_tier("sec.gov"), 1);
        assert_eq!(get_source_weight("bloomberg.com"), dec!(1.5));
    }

    #[test]
    fn tier2_source_gets_weight_1_0() {
        assert_eq!(get_source_tier("businesswire.com"), 2);
        assert_eq!(get_source_weight("benzinga.com"), dec!(1.0));
    }

    #[test]
    fn unknown_source_falls_back_to_tier3() {
        assert_eq!(get_source_tier("some-random-blog.example"), DEFAULT_TIER);
        assert_eq!(get_source_weight("some-random-blog.example"), DEFAULT_WEIGHT);
    }

    #[test]
    fn www_prefix_is_normalized() {
        assert_eq!(get_source_tier("www.reuters.com"), 1);
    }
}
