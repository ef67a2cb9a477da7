use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::account::Pincode;

/// One async mutex per pincode. Holding the guard across engineer selection
/// and ticket persistence stops two concurrent requests in the same pincode
/// from reading the same workload counts and picking the same engineer.
#[derive(Default)]
pub struct PincodeLocks {
    locks: Mutex<HashMap<Pincode, Arc<AsyncMutex<()>>>>,
}

impl PincodeLocks {
    pub async fn acquire(&self, pincode: Pincode) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = match self.locks.lock() {
                Ok(locks) => locks,
                Err(poisoned) => poisoned.into_inner(),
            };
            Arc::clone(locks.entry(pincode).or_default())
        };
        lock.lock_owned().await
    }
}
