mod event_repo;
mod payment_repo;
mod rows;

use sqlx::PgPool;

/// Postgres-backed store. All mutation is single-row conditional writes
/// (`WHERE status = expected`) plus `ON CONFLICT DO NOTHING`-style upserts,
/// so correctness holds across any number of concurrent processes.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
