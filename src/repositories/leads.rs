use crate::models::leads::{
    referral_code_from_ip, Dataset, Lead, LeadLookup, LeadPage, NewLead, RegisteredLead,
};

use sqlx::SqlitePool;
use uuid::Uuid;

const DEFAULT_DAILY_LIMIT: i64 = 100;
const REFERRAL_BONUS_LIMIT: i64 = 30;
const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("{0}")]
    Validation(String),
    #[error("lead already registered for {email} at {ip_address}")]
    Duplicate { email: String, ip_address: String },
    #[error("no lead matches that email and IP address")]
    NotFound,
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for dataset in [Dataset::Leads, Dataset::Archive] {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL,
                email TEXT NOT NULL,
                ip_address TEXT NOT NULL,
                name TEXT NOT NULL,
                phone TEXT NOT NULL,
                question TEXT NOT NULL,
                affiliate_count INTEGER NOT NULL DEFAULT 0,
                daily_limit INTEGER NOT NULL DEFAULT 100,
                extra_limit INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE (email, ip_address)
            )
            "#,
            dataset.table()
        ))
        .execute(pool)
        .await?;
    }

    Ok(())
}

#[derive(Clone)]
pub struct LeadRepository {
    conn: SqlitePool,
    link_base: String,
}

impl LeadRepository {
    pub fn new(conn: SqlitePool, link_base: String) -> Self {
        LeadRepository { conn, link_base }
    }

    pub async fn insert_lead(&self, new_lead: &NewLead) -> Result<RegisteredLead, LedgerError> {
        required("email", &new_lead.email)?;
        required("ip_address", &new_lead.ip_address)?;
        required("name", &new_lead.name)?;
        required("phone", &new_lead.phone)?;
        required("question", &new_lead.question)?;

        let lead_id = Uuid::new_v4().hyphenated().to_string();
        let mut tx = self.conn.begin().await?;

        let insert = sqlx::query_as::<_, Lead>(
            r#"
            INSERT INTO leads (id, email, ip_address, name, phone, question,
                               affiliate_count, daily_limit, extra_limit)
            VALUES (?, ?, ?, ?, ?, ?, 0, ?, 0)
            RETURNING *
            "#,
        )
        .bind(&lead_id)
        .bind(&new_lead.email)
        .bind(&new_lead.ip_address)
        .bind(&new_lead.name)
        .bind(&new_lead.phone)
        .bind(&new_lead.question)
        .bind(DEFAULT_DAILY_LIMIT)
        .fetch_one(&mut *tx)
        .await;

        let lead = match insert {
            Ok(lead) => lead,
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(LedgerError::Duplicate {
                    email: new_lead.email.clone(),
                    ip_address: new_lead.ip_address.clone(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        // Credit the referrer inside the same transaction so a failed credit
        // cannot leave a registered lead without its attribution. The freshly
        // inserted row is excluded: a lead cannot refer itself.
        let referral_applied = match &new_lead.referral_code {
            Some(code) if !code.trim().is_empty() => {
                let credited = sqlx::query(
                    r#"
                    UPDATE leads
                    SET affiliate_count = affiliate_count + 1,
                        extra_limit = extra_limit + ?,
                        updated_at = CURRENT_TIMESTAMP
                    WHERE replace(ip_address, '.', '') = ? AND seq <> ?
                    "#,
                )
                .bind(REFERRAL_BONUS_LIMIT)
                .bind(code.trim())
                .bind(lead.seq)
                .execute(&mut *tx)
                .await?
                .rows_affected();

                credited > 0
            }
            _ => false,
        };

        tx.commit().await?;

        Ok(RegisteredLead {
            lead,
            referral_applied,
        })
    }

    // Bulk update: the referral code is not a stored key, so every lead whose
    // dot-stripped IP matches is credited. Zero matches is a no-op, reported
    // through the returned count rather than an error.
    pub async fn credit_referral(&self, referral_code: &str) -> Result<u64, LedgerError> {
        required("referral_code", referral_code)?;

        let credited = sqlx::query(
            r#"
            UPDATE leads
            SET affiliate_count = affiliate_count + 1,
                extra_limit = extra_limit + ?,
                updated_at = CURRENT_TIMESTAMP
            WHERE replace(ip_address, '.', '') = ?
            "#,
        )
        .bind(REFERRAL_BONUS_LIMIT)
        .bind(referral_code.trim())
        .execute(&self.conn)
        .await?
        .rows_affected();

        Ok(credited)
    }

    pub async fn find_lead(&self, email: &str, ip_address: &str) -> Result<LeadLookup, LedgerError> {
        let lead = sqlx::query_as::<_, Lead>(
            "SELECT * FROM leads WHERE email = ? AND ip_address = ?",
        )
        .bind(email)
        .bind(ip_address)
        .fetch_optional(&self.conn)
        .await?;

        if let Some(lead) = lead {
            return Ok(LeadLookup {
                email_exists: true,
                ip_exists: true,
                lead: Some(lead),
            });
        }

        let email_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM leads WHERE email = ?)")
                .bind(email)
                .fetch_one(&self.conn)
                .await?;
        let ip_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM leads WHERE ip_address = ?)")
                .bind(ip_address)
                .fetch_one(&self.conn)
                .await?;

        Ok(LeadLookup {
            email_exists,
            ip_exists,
            lead: None,
        })
    }

    pub async fn affiliate_link(&self, email: &str, ip_address: &str) -> Result<String, LedgerError> {
        let lookup = self.find_lead(email, ip_address).await?;
        let lead = lookup.lead.ok_or(LedgerError::NotFound)?;

        Ok(format!(
            "{}?ref={}",
            self.link_base,
            referral_code_from_ip(&lead.ip_address)
        ))
    }

    pub async fn list_page(
        &self,
        dataset: Dataset,
        page: u32,
        per_page: u32,
    ) -> Result<LeadPage, LedgerError> {
        if page < 1 {
            return Err(LedgerError::Validation(
                "page number must be at least 1".to_string(),
            ));
        }
        if per_page < 1 || per_page > MAX_PER_PAGE {
            return Err(LedgerError::Validation(format!(
                "per_page must be between 1 and {}",
                MAX_PER_PAGE
            )));
        }

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", dataset.table()))
            .fetch_one(&self.conn)
            .await?;

        // Offset is measured from the end of the table: scanning forward from
        // it and reversing yields the newest-first page without a descending
        // index. The last page carries the remainder.
        let page_span = i64::from(page) * i64::from(per_page);
        let start = (total - page_span).max(0);
        let limit = i64::from(per_page).min((total - page_span + i64::from(per_page)).max(0));

        let mut data = if limit > 0 {
            sqlx::query_as::<_, Lead>(&format!(
                "SELECT * FROM {} ORDER BY seq ASC LIMIT ? OFFSET ?",
                dataset.table()
            ))
            .bind(limit)
            .bind(start)
            .fetch_all(&self.conn)
            .await?
        } else {
            Vec::new()
        };
        data.reverse();

        Ok(LeadPage {
            page,
            data,
            total,
            has_more: start > 0,
        })
    }
}

fn required(field: &'static str, value: &str) -> Result<(), LedgerError> {
    if value.trim().is_empty() {
        return Err(LedgerError::Validation(format!(
            "missing required field: {}",
            field
        )));
    }

    Ok(())
}
