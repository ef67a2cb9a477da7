use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::account::AccountId;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LeaveId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

impl LeaveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }
}

impl FromStr for LeaveStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            _ => Err(DomainError::UnknownStatus { kind: "leave", value: value.to_string() }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveRecord {
    pub id: LeaveId,
    pub engineer_id: AccountId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub leave_type: String,
    pub reason: String,
    pub status: LeaveStatus,
}

impl LeaveRecord {
    /// True when this is an approved leave whose range contains `date`, both ends inclusive.
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.status == LeaveStatus::Approved && self.start_date <= date && date <= self.end_date
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{LeaveId, LeaveRecord, LeaveStatus};
    use crate::domain::account::AccountId;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).expect("valid date")
    }

    fn leave(status: LeaveStatus) -> LeaveRecord {
        LeaveRecord {
            id: LeaveId(1),
            engineer_id: AccountId(55),
            start_date: date(10),
            end_date: date(12),
            leave_type: "CASUAL".to_string(),
            reason: "family event".to_string(),
            status,
        }
    }

    #[test]
    fn approved_leave_covers_both_range_ends() {
        let record = leave(LeaveStatus::Approved);
        assert!(!record.covers(date(9)));
        assert!(record.covers(date(10)));
        assert!(record.covers(date(11)));
        assert!(record.covers(date(12)));
        assert!(!record.covers(date(13)));
    }

    #[test]
    fn pending_or_rejected_leave_never_covers() {
        assert!(!leave(LeaveStatus::Pending).covers(date(11)));
        assert!(!leave(LeaveStatus::Rejected).covers(date(11)));
    }
}
