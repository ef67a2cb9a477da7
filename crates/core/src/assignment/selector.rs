use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::assignment::availability::EngineerAvailability;
use crate::clock::Clock;
use crate::domain::account::{Account, AccountId, Pincode};
use crate::domain::ticket::TicketStatus;
use crate::errors::ServiceError;
use crate::geo::GeoPoint;
use crate::ports::{AccountQuery, LeavePredicate, TicketStore};

/// The engineer chosen for a ticket and how the choice was made.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Selection {
    pub engineer: Account,
    pub workload: u64,
    /// Only computed when more than one engineer shared the lowest workload.
    pub distance_km: Option<f64>,
    pub tie_group_size: usize,
    pub candidates_considered: usize,
}

/// Picks the least busy available engineer in a pincode, breaking workload
/// ties by straight-line distance to the ticket location.
#[derive(Clone)]
pub struct EngineerSelector {
    accounts: Arc<dyn AccountQuery>,
    tickets: Arc<dyn TicketStore>,
    availability: EngineerAvailability,
    clock: Arc<dyn Clock>,
}

impl EngineerSelector {
    pub fn new(
        accounts: Arc<dyn AccountQuery>,
        tickets: Arc<dyn TicketStore>,
        leave: Arc<dyn LeavePredicate>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { accounts, tickets, availability: EngineerAvailability::new(leave), clock }
    }

    pub async fn select_best_engineer(
        &self,
        target: GeoPoint,
        pincode: Pincode,
        exclude: Option<AccountId>,
    ) -> Result<Option<AccountId>, ServiceError> {
        Ok(self.select(target, pincode, exclude).await?.map(|selection| selection.engineer.id))
    }

    /// `None` when the pincode has no engineers or every engineer is
    /// excluded or on leave today. Distance ties keep the collaborator's
    /// iteration order.
    pub async fn select(
        &self,
        target: GeoPoint,
        pincode: Pincode,
        exclude: Option<AccountId>,
    ) -> Result<Option<Selection>, ServiceError> {
        let today = self.clock.today();
        let engineers = self.accounts.find_engineers_by_pincode(pincode).await?;

        let mut available = Vec::with_capacity(engineers.len());
        for engineer in engineers {
            if self.availability.is_available(engineer.id, today, exclude).await? {
                available.push(engineer);
            }
        }

        let mut loaded = Vec::with_capacity(available.len());
        for engineer in available {
            let workload = self
                .tickets
                .count_by_engineer_and_status(engineer.id, TicketStatus::InProgress)
                .await?;
            loaded.push((engineer, workload));
        }

        let Some(min_workload) = loaded.iter().map(|(_, workload)| *workload).min() else {
            debug!(
                event_name = "assignment.no_candidates",
                pincode = pincode.0,
                %today,
                "no available engineers in pincode"
            );
            return Ok(None);
        };

        let candidates_considered = loaded.len();
        let mut tie_group: Vec<Account> = loaded
            .into_iter()
            .filter(|(_, workload)| *workload == min_workload)
            .map(|(engineer, _)| engineer)
            .collect();
        let tie_group_size = tie_group.len();

        if tie_group_size == 1 {
            let engineer = tie_group.remove(0);
            debug!(
                event_name = "assignment.selected",
                pincode = pincode.0,
                engineer_id = engineer.id.0,
                workload = min_workload,
                "least busy engineer selected"
            );
            return Ok(Some(Selection {
                engineer,
                workload: min_workload,
                distance_km: None,
                tie_group_size,
                candidates_considered,
            }));
        }

        let closest = tie_group
            .into_iter()
            .map(|engineer| {
                let distance = target.distance_km_to(&engineer.location);
                (engineer, distance)
            })
            .min_by(|(_, left), (_, right)| left.total_cmp(right));

        Ok(closest.map(|(engineer, distance)| {
            debug!(
                event_name = "assignment.selected",
                pincode = pincode.0,
                engineer_id = engineer.id.0,
                workload = min_workload,
                distance_km = distance,
                tie_group_size,
                "closest of equally busy engineers selected"
            );
            Selection {
                engineer,
                workload: min_workload,
                distance_km: Some(distance),
                tie_group_size,
                candidates_considered,
            }
        }))
    }
}
