use crate::models::TokenRecord;

use super::TokenError;

/// Gate on the use budget. Only checks; the increment happens on commit.
pub struct UsageGuard;

impl UsageGuard {
    pub fn is_exhausted(record: &TokenRecord) -> bool {
        record.max_uses.is_some_and(|max| record.uses >= max)
    }

    pub fn check(record: &TokenRecord) -> Result<(), TokenError> {
        if Self::is_exhausted(record) {
            Err(TokenError::UsageExhausted)
        } else {
            Ok(())
        }
    }
}
