use anyhow::Context;
use maxminddb::{Reader, geoip2};
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use tracing::{debug, info};

/// Maps a client address to a lower-case ISO country code, used to fill in
/// the country of scores posted without one.
pub trait CountryResolver: Send + Sync {
    fn resolve(&self, ip: IpAddr) -> Option<String>;
}

/// Accepts a bare address or an `addr:port` pair as seen on a connection.
pub fn parse_ip(raw: &str) -> Option<IpAddr> {
    let raw = raw.trim();
    raw.parse::<IpAddr>()
        .ok()
        .or_else(|| raw.parse::<SocketAddr>().ok().map(|addr| addr.ip()))
}

/// Resolves countries from a MaxMind country database such as
/// GeoLite2-Country.
pub struct GeoIpResolver {
    reader: Reader<Vec<u8>>,
}

impl GeoIpResolver {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let reader = Reader::open_readfile(path)
            .with_context(|| format!("Failed to open GeoIP database {}", path.display()))?;
        info!(
            path = %path.display(),
            database = %reader.metadata.database_type,
            "Opened GeoIP database"
        );
        Ok(Self { reader })
    }
}

impl CountryResolver for GeoIpResolver {
    fn resolve(&self, ip: IpAddr) -> Option<String> {
        match self.reader.lookup::<geoip2::Country>(ip) {
            Ok(record) => record
                .country
                .and_then(|country| country.iso_code)
                .map(str::to_lowercase),
            Err(e) => {
                debug!(%ip, error = %e, "No country for address");
                None
            }
        }
    }
}
