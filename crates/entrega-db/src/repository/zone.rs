//! # Zone Repository
//!
//! Delivery zones and the establishment defaults they fall back to.
//!
//! Defaults live in the `settings` table as one JSON document under
//! [`DEFAULTS_KEY`]; a fresh database answers with
//! `EstablishmentDefaults::default()`.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use entrega_core::{DeliveryZone, EstablishmentDefaults, NewZone};

/// Settings key of the establishment delivery defaults.
pub const DEFAULTS_KEY: &str = "delivery_defaults";

const ZONE_COLUMNS: &str = "id, name, fee_override, minimum_order_override, \
     eta_min_override, eta_max_override, is_active, created_at, updated_at";

/// Repository for zones and establishment settings.
#[derive(Debug, Clone)]
pub struct ZoneRepository {
    pool: SqlitePool,
}

impl ZoneRepository {
    /// Creates a new ZoneRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ZoneRepository { pool }
    }

    /// Lists zones by name; inactive ones only when asked.
    pub async fn list(&self, include_inactive: bool) -> DbResult<Vec<DeliveryZone>> {
        let filter = if include_inactive {
            ""
        } else {
            "WHERE is_active = 1"
        };
        let zones = sqlx::query_as::<_, DeliveryZone>(&format!(
            "SELECT {ZONE_COLUMNS} FROM delivery_zones {filter} ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(zones)
    }

    /// Gets a zone by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<DeliveryZone>> {
        let zone = sqlx::query_as::<_, DeliveryZone>(&format!(
            "SELECT {ZONE_COLUMNS} FROM delivery_zones WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(zone)
    }

    /// Creates an active zone.
    ///
    /// ## Errors
    /// * `UniqueViolation` - a zone with the same name exists
    pub async fn create(&self, new: NewZone) -> DbResult<DeliveryZone> {
        let zone = new.into_zone(Uuid::new_v4().to_string(), Utc::now());
        zone.validate()?;

        debug!(id = %zone.id, name = %zone.name, "Inserting zone");

        sqlx::query(&format!(
            "INSERT INTO delivery_zones ({ZONE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
        ))
        .bind(&zone.id)
        .bind(&zone.name)
        .bind(zone.fee_override)
        .bind(zone.minimum_order_override)
        .bind(zone.eta_min_override)
        .bind(zone.eta_max_override)
        .bind(zone.is_active)
        .bind(zone.created_at)
        .bind(zone.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("zone name", zone.name.clone()),
            other => other,
        })?;

        info!(id = %zone.id, name = %zone.name, "Zone created");
        Ok(zone)
    }

    /// Overwrites the editable fields of a zone.
    pub async fn update(&self, zone: &DeliveryZone) -> DbResult<DeliveryZone> {
        zone.validate()?;
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE delivery_zones SET
                name = ?2,
                fee_override = ?3,
                minimum_order_override = ?4,
                eta_min_override = ?5,
                eta_max_override = ?6,
                is_active = ?7,
                updated_at = ?8
            WHERE id = ?1
            "#,
        )
        .bind(&zone.id)
        .bind(zone.name.trim())
        .bind(zone.fee_override)
        .bind(zone.minimum_order_override)
        .bind(zone.eta_min_override)
        .bind(zone.eta_max_override)
        .bind(zone.is_active)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Zone", &zone.id));
        }

        let mut updated = zone.clone();
        updated.name = zone.name.trim().to_string();
        updated.updated_at = now;
        Ok(updated)
    }

    /// Activates or deactivates a zone. Inactive zones fall back to the
    /// establishment defaults.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE delivery_zones SET is_active = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Zone", id));
        }

        info!(id = %id, active, "Zone activation changed");
        Ok(())
    }

    /// Deletes a zone. Orders keep their history with `zone_id` cleared.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM delivery_zones WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Zone", id));
        }

        info!(id = %id, "Zone deleted");
        Ok(())
    }

    // =========================================================================
    // Establishment defaults
    // =========================================================================

    /// Reads the establishment delivery defaults.
    pub async fn get_defaults(&self) -> DbResult<EstablishmentDefaults> {
        let raw: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?1")
            .bind(DEFAULTS_KEY)
            .fetch_optional(&self.pool)
            .await?;

        match raw {
            Some(json) => serde_json::from_str(&json)
                .map_err(|e| DbError::CorruptData(format!("{DEFAULTS_KEY}: {e}"))),
            None => Ok(EstablishmentDefaults::default()),
        }
    }

    /// Stores the establishment delivery defaults.
    pub async fn save_defaults(&self, defaults: &EstablishmentDefaults) -> DbResult<()> {
        defaults.validate()?;
        let json =
            serde_json::to_string(defaults).map_err(|e| DbError::Internal(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(DEFAULTS_KEY)
        .bind(json)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        info!(
            base_fee = %defaults.fee_rule.base_fee,
            included_km = defaults.fee_rule.included_km,
            minimum_order = %defaults.minimum_order,
            "Establishment defaults saved"
        );
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use entrega_core::money::Money;
    use entrega_core::zone::{resolve_terms, FeePolicy};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn new_zone(name: &str) -> NewZone {
        NewZone {
            name: name.to_string(),
            fee_override: Some(Money::from_cents(700)),
            minimum_order_override: None,
            eta_min_override: Some(40),
            eta_max_override: Some(60),
        }
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let db = db().await;
        let repo = db.zones();

        repo.create(new_zone("Vila Madalena")).await.unwrap();
        let pinheiros = repo.create(new_zone("Pinheiros")).await.unwrap();

        let zones = repo.list(false).await.unwrap();
        let names: Vec<_> = zones.iter().map(|z| z.name.as_str()).collect();
        assert_eq!(names, vec!["Pinheiros", "Vila Madalena"]);

        let stored = repo.get_by_id(&pinheiros.id).await.unwrap().unwrap();
        assert_eq!(stored.fee_override, Some(Money::from_cents(700)));
        assert!(stored.is_active);
    }

    #[tokio::test]
    async fn test_duplicate_name() {
        let db = db().await;
        let repo = db.zones();
        repo.create(new_zone("Centro")).await.unwrap();
        let err = repo.create(new_zone("Centro")).await.unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn test_deactivate_update_delete() {
        let db = db().await;
        let repo = db.zones();
        let zone = repo.create(new_zone("Moema")).await.unwrap();

        repo.set_active(&zone.id, false).await.unwrap();
        assert!(repo.list(false).await.unwrap().is_empty());
        assert_eq!(repo.list(true).await.unwrap().len(), 1);

        let mut edited = repo.get_by_id(&zone.id).await.unwrap().unwrap();
        edited.fee_override = None;
        edited.is_active = true;
        repo.update(&edited).await.unwrap();
        let stored = repo.get_by_id(&zone.id).await.unwrap().unwrap();
        assert_eq!(stored.fee_override, None);
        assert!(stored.is_active);

        repo.delete(&zone.id).await.unwrap();
        assert!(matches!(
            repo.delete(&zone.id).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_defaults_round_trip_and_resolution() {
        let db = db().await;
        let repo = db.zones();

        assert_eq!(repo.get_defaults().await.unwrap(), EstablishmentDefaults::default());

        let mut defaults = EstablishmentDefaults::default();
        defaults.minimum_order = Money::from_cents(3000);
        defaults.fee_rule.base_fee = Money::from_cents(600);
        repo.save_defaults(&defaults).await.unwrap();
        assert_eq!(repo.get_defaults().await.unwrap(), defaults);

        let zone = repo.create(new_zone("Jardins")).await.unwrap();
        let terms = resolve_terms(&repo.get_defaults().await.unwrap(), Some(&zone));
        assert_eq!(terms.fee_policy, FeePolicy::Flat { fee: Money::from_cents(700) });
        assert_eq!(terms.minimum_order, Money::from_cents(3000));
    }

    #[tokio::test]
    async fn test_invalid_defaults_rejected() {
        let db = db().await;
        let mut defaults = EstablishmentDefaults::default();
        defaults.eta_min_minutes = 60;
        defaults.eta_max_minutes = 30;
        assert!(db.zones().save_defaults(&defaults).await.is_err());
    }
}
