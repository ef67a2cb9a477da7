use std::sync::Arc;

use chrono::NaiveDate;

use crate::domain::account::AccountId;
use crate::ports::{LeavePredicate, PortError};

#[derive(Clone)]
pub struct EngineerAvailability {
    leave: Arc<dyn LeavePredicate>,
}

impl EngineerAvailability {
    pub fn new(leave: Arc<dyn LeavePredicate>) -> Self {
        Self { leave }
    }

    /// An engineer is unavailable when explicitly excluded or on approved leave on `as_of`.
    pub async fn is_available(
        &self,
        engineer_id: AccountId,
        as_of: NaiveDate,
        exclude: Option<AccountId>,
    ) -> Result<bool, PortError> {
        if exclude == Some(engineer_id) {
            return Ok(false);
        }
        let on_leave = self.leave.is_on_leave(engineer_id, as_of).await?;
        Ok(!on_leave)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::NaiveDate;

    use super::EngineerAvailability;
    use crate::domain::account::AccountId;
    use crate::ports::{LeavePredicate, PortError};

    struct OnLeave(HashSet<(i64, NaiveDate)>);

    #[async_trait]
    impl LeavePredicate for OnLeave {
        async fn is_on_leave(
            &self,
            engineer_id: AccountId,
            date: NaiveDate,
        ) -> Result<bool, PortError> {
            Ok(self.0.contains(&(engineer_id.0, date)))
        }
    }

    struct BrokenLeaveStore;

    #[async_trait]
    impl LeavePredicate for BrokenLeaveStore {
        async fn is_on_leave(&self, _: AccountId, _: NaiveDate) -> Result<bool, PortError> {
            Err(PortError::Storage("leave table unavailable".to_string()))
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 10).expect("date")
    }

    #[tokio::test]
    async fn engineer_without_leave_is_available() {
        let availability = EngineerAvailability::new(Arc::new(OnLeave(HashSet::new())));

        assert!(availability.is_available(AccountId(1), today(), None).await.expect("query"));
    }

    #[tokio::test]
    async fn engineer_on_leave_today_is_unavailable() {
        let availability =
            EngineerAvailability::new(Arc::new(OnLeave(HashSet::from([(1, today())]))));

        assert!(!availability.is_available(AccountId(1), today(), None).await.expect("query"));
        assert!(availability.is_available(AccountId(2), today(), None).await.expect("query"));
    }

    #[tokio::test]
    async fn excluded_engineer_is_unavailable_without_consulting_leave() {
        let availability = EngineerAvailability::new(Arc::new(BrokenLeaveStore));

        let available = availability
            .is_available(AccountId(9), today(), Some(AccountId(9)))
            .await
            .expect("exclusion short-circuits the leave lookup");
        assert!(!available);

        assert!(availability.is_available(AccountId(8), today(), Some(AccountId(9))).await.is_err());
    }
}
