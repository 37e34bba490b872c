use super::{OptionalExt, text_enum};
use crate::Database;
use crate::models::PurchaseRow;
use anyhow::Result;
use chrono::Utc;
use pepperpot_types::models::PurchaseStatus;

impl Database {
    /// Records a completed purchase, updating the existing row for the same
    /// (user, document) pair if there is one.
    pub fn upsert_completed_purchase(
        &self,
        id: &str,
        user_id: &str,
        document_id: &str,
        amount: i64,
        payment_intent_id: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO purchases (id, user_id, document_id, amount, payment_intent_id, status, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(user_id, document_id) DO UPDATE SET
                    amount = excluded.amount,
                    payment_intent_id = excluded.payment_intent_id,
                    status = excluded.status,
                    updated_at = excluded.updated_at",
                rusqlite::params![
                    id,
                    user_id,
                    document_id,
                    amount,
                    payment_intent_id,
                    PurchaseStatus::Completed.as_str(),
                    Utc::now()
                ],
            )?;
            Ok(())
        })
    }

    /// Returns the number of purchases marked failed (0 when the intent is unknown).
    pub fn mark_purchase_failed(&self, payment_intent_id: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE purchases SET status = ?1, updated_at = ?2 WHERE payment_intent_id = ?3",
                rusqlite::params![PurchaseStatus::Failed.as_str(), Utc::now(), payment_intent_id],
            )?;
            Ok(changed)
        })
    }

    pub fn get_purchase(&self, user_id: &str, document_id: &str) -> Result<Option<PurchaseRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, user_id, document_id, amount, payment_intent_id, status, updated_at
                 FROM purchases WHERE user_id = ?1 AND document_id = ?2",
                [user_id, document_id],
                |row| {
                    Ok(PurchaseRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        document_id: row.get(2)?,
                        amount: row.get(3)?,
                        payment_intent_id: row.get(4)?,
                        status: text_enum(row, 5)?,
                        updated_at: row.get(6)?,
                    })
                },
            )
            .optional()
        })
    }
}
