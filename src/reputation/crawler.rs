use std::fmt;
use std::net::IpAddr;

use ipnet::IpNet;
use tracing::warn;

/// Recognized legitimate crawler families. These are the bots a publisher
/// wants: blocking one costs search/social traffic, so matching a family
/// here routes the request through IP-range verification instead of the
/// penalty pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlerFamily {
    Googlebot,
    Bingbot,
    YandexBot,
    Baiduspider,
    DuckDuckBot,
    Applebot,
}

impl fmt::Display for CrawlerFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrawlerFamily::Googlebot => write!(f, "Googlebot"),
            CrawlerFamily::Bingbot => write!(f, "Bingbot"),
            CrawlerFamily::YandexBot => write!(f, "YandexBot"),
            CrawlerFamily::Baiduspider => write!(f, "Baiduspider"),
            CrawlerFamily::DuckDuckBot => write!(f, "DuckDuckBot"),
            CrawlerFamily::Applebot => write!(f, "Applebot"),
        }
    }
}

struct CrawlerSignature {
    family: CrawlerFamily,
    ua_token: &'static str,
    /// Published CIDR ranges the crawler operates from.
    ranges: &'static [&'static str],
}

const CRAWLERS: &[CrawlerSignature] = &[
    CrawlerSignature {
        family: CrawlerFamily::Googlebot,
        ua_token: "googlebot",
        ranges: &["66.249.64.0/19", "192.178.5.0/27", "34.100.182.96/28"],
    },
    CrawlerSignature {
        family: CrawlerFamily::Bingbot,
        ua_token: "bingbot",
        ranges: &[
            "157.55.39.0/24",
            "207.46.13.0/24",
            "40.77.167.0/24",
            "13.66.139.0/24",
        ],
    },
    CrawlerSignature {
        family: CrawlerFamily::YandexBot,
        ua_token: "yandexbot",
        ranges: &["5.45.192.0/18", "77.88.0.0/18", "213.180.192.0/19"],
    },
    CrawlerSignature {
        family: CrawlerFamily::Baiduspider,
        ua_token: "baiduspider",
        ranges: &["180.76.0.0/16", "119.63.192.0/21"],
    },
    CrawlerSignature {
        family: CrawlerFamily::DuckDuckBot,
        ua_token: "duckduckbot",
        ranges: &["20.191.45.212/32", "40.88.21.235/32", "52.142.26.175/32"],
    },
    CrawlerSignature {
        family: CrawlerFamily::Applebot,
        ua_token: "applebot",
        ranges: &["17.0.0.0/8"],
    },
];

/// Match a lower-cased user agent string against crawler signatures.
pub fn match_user_agent(ua_lower: &str) -> Option<CrawlerFamily> {
    CRAWLERS
        .iter()
        .find(|sig| ua_lower.contains(sig.ua_token))
        .map(|sig| sig.family)
}

/// Parsed crawler IP-range tables, built once at engine construction.
pub struct CrawlerDirectory {
    ranges: Vec<(CrawlerFamily, Vec<IpNet>)>,
}

impl CrawlerDirectory {
    pub fn new() -> Self {
        let mut ranges = Vec::with_capacity(CRAWLERS.len());
        for sig in CRAWLERS {
            let nets: Vec<IpNet> = sig
                .ranges
                .iter()
                .filter_map(|cidr| match cidr.parse::<IpNet>() {
                    Ok(net) => Some(net),
                    Err(e) => {
                        warn!(cidr = cidr, error = %e, "Skipping unparseable crawler range");
                        None
                    }
                })
                .collect();
            ranges.push((sig.family, nets));
        }
        Self { ranges }
    }

    /// True when the IP falls inside the family's published ranges.
    /// A UA that claims a crawler family from an unlisted IP is spoofing.
    pub fn verify(&self, family: CrawlerFamily, ip: IpAddr) -> bool {
        self.ranges
            .iter()
            .find(|(f, _)| *f == family)
            .map(|(_, nets)| nets.iter().any(|net| net.contains(&ip)))
            .unwrap_or(false)
    }
}

impl Default for CrawlerDirectory {
    fn default() -> Self {
        Self::new()
    }
}
