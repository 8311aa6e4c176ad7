use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::domain::types::Location;

use super::{GeocodeError, Geocoder};

/// Wraps a geocoder with a SQLite cache keyed by address.
///
/// Entries older than the TTL are looked up again. The cache is best effort:
/// database errors are logged and the inner geocoder is used directly.
pub struct CachedGeocoder<G> {
    inner: G,
    pool: SqlitePool,
    ttl_secs: i64,
}

impl<G: Geocoder> CachedGeocoder<G> {
    pub fn new(inner: G, pool: SqlitePool, ttl_secs: i64) -> Self {
        Self {
            inner,
            pool,
            ttl_secs,
        }
    }

    async fn lookup(&self, address: &str) -> Result<Option<(Location, i64)>, sqlx::Error> {
        let row: Option<(f64, f64, i64)> =
            sqlx::query_as("SELECT lat, lng, cached_at FROM geocode_cache WHERE address = ?")
                .bind(address)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(lat, lng, cached_at)| (Location::new(lat, lng), cached_at)))
    }

    async fn store(&self, address: &str, location: Location, now: i64) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO geocode_cache (address, lat, lng, cached_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(address)
        .bind(location.lat)
        .bind(location.lng)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl<G: Geocoder> Geocoder for CachedGeocoder<G> {
    async fn resolve(&self, address: &str) -> Result<Option<Location>, GeocodeError> {
        let key = address.trim();
        let now = Utc::now().timestamp();

        match self.lookup(key).await {
            Ok(Some((location, cached_at))) if now - cached_at < self.ttl_secs => {
                debug!("Geocode cache hit for {:?}", key);
                return Ok(Some(location));
            }
            Ok(Some((_, cached_at))) => {
                info!("Cached location for {:?} expired ({}), refreshing", key, cached_at);
            }
            Ok(None) => {}
            Err(e) => warn!("Geocode cache read failed: {}", e),
        }

        let resolved = self.inner.resolve(key).await?;

        if let Some(location) = resolved {
            if let Err(e) = self.store(key, location, now).await {
                warn!("Geocode cache write failed: {}", e);
            }
        }

        Ok(resolved)
    }
}
