use sqlx::{sqlite::SqliteRow, Row, SqliteConnection};
use staybook_core::domain::account::{Account, AccountId};

use super::{parse_enum, parse_timestamp, RepositoryError};

pub async fn find_account(
    conn: &mut SqliteConnection,
    id: &AccountId,
) -> Result<Option<Account>, RepositoryError> {
    let row = sqlx::query(
        "SELECT
            id,
            role,
            display_name,
            email,
            identity_verification,
            payment_method_verified,
            created_at
         FROM accounts
         WHERE id = ?",
    )
    .bind(&id.0)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(account_from_row).transpose()
}

pub async fn save_account(
    conn: &mut SqliteConnection,
    account: &Account,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO accounts (
            id,
            role,
            display_name,
            email,
            identity_verification,
            payment_method_verified,
            created_at
         ) VALUES (?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
            role = excluded.role,
            display_name = excluded.display_name,
            email = excluded.email,
            identity_verification = excluded.identity_verification,
            payment_method_verified = excluded.payment_method_verified",
    )
    .bind(&account.id.0)
    .bind(account.role.as_str())
    .bind(&account.display_name)
    .bind(&account.email)
    .bind(account.identity_verification.as_str())
    .bind(account.payment_method_verified)
    .bind(account.created_at.to_rfc3339())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

fn account_from_row(row: SqliteRow) -> Result<Account, RepositoryError> {
    let role: String = row.try_get("role")?;
    let identity: String = row.try_get("identity_verification")?;

    Ok(Account {
        id: AccountId(row.try_get("id")?),
        role: parse_enum("role", &role)?,
        display_name: row.try_get("display_name")?,
        email: row.try_get("email")?,
        identity_verification: parse_enum("identity_verification", &identity)?,
        payment_method_verified: row.try_get("payment_method_verified")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use staybook_core::domain::account::{Account, AccountId, AccountRole, IdentityVerification};

    use super::{find_account, save_account};
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn save_then_find_updates_verification_in_place() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let mut conn = pool.acquire().await.expect("acquire");

        let mut account = Account {
            id: AccountId("AC-GUEST-9".to_owned()),
            role: AccountRole::Guest,
            display_name: "Sam".to_owned(),
            email: "sam@example.com".to_owned(),
            identity_verification: IdentityVerification::Pending,
            payment_method_verified: false,
            created_at: Utc::now(),
        };
        save_account(&mut conn, &account).await.expect("insert");

        account.identity_verification = IdentityVerification::Verified;
        account.payment_method_verified = true;
        save_account(&mut conn, &account).await.expect("update");

        let stored = find_account(&mut conn, &account.id).await.expect("find").expect("present");
        assert_eq!(stored.identity_verification, IdentityVerification::Verified);
        assert!(stored.payment_method_verified);
        assert!(find_account(&mut conn, &AccountId("AC-NOPE".to_owned()))
            .await
            .expect("find")
            .is_none());
    }
}
