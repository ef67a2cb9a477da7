use crate::commands::runtime::{migrate, with_pool};
use crate::commands::{CommandResult, Failure};

pub fn run() -> CommandResult {
    with_pool("migrate", |_config, pool| async move {
        migrate(&pool).await?;
        Ok::<_, Failure>(("applied pending migrations".to_string(), None))
    })
}
