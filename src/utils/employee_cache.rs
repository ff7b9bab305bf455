use anyhow::Result;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::time::Duration;

use crate::model::employee::Employee;
use crate::store::mysql::{EmployeeRow, employee_select_sql};

/// Employee profiles by id. Category and shift rarely change, and every
/// review and decision needs them.
pub static EMPLOYEE_CACHE: Lazy<Cache<u64, Employee>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(50_000)
        .time_to_live(Duration::from_secs(3600))
        .build()
});

pub async fn get(id: u64) -> Option<Employee> {
    EMPLOYEE_CACHE.get(&id).await
}

pub async fn remember(employee: &Employee) {
    EMPLOYEE_CACHE.insert(employee.id, employee.clone()).await;
}

async fn batch_remember(employees: &[Employee]) {
    let futures: Vec<_> = employees
        .iter()
        .map(|e| EMPLOYEE_CACHE.insert(e.id, e.clone()))
        .collect();

    futures::future::join_all(futures).await;
}

/// Load active employees into the cache, streaming rows in batches.
pub async fn warmup_employee_cache(pool: &MySqlPool, batch_size: usize) -> Result<()> {
    let sql = employee_select_sql("WHERE is_active = 1");
    let mut stream = sqlx::query_as::<_, EmployeeRow>(&sql).fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total_count = 0usize;

    while let Some(row) = stream.next().await {
        batch.push(Employee::try_from(row?)?);
        total_count += 1;

        if batch.len() >= batch_size {
            batch_remember(&batch).await;
            batch.clear();
        }
    }

    if !batch.is_empty() {
        batch_remember(&batch).await;
    }

    tracing::info!(total_count, "Employee cache warmup complete");

    Ok(())
}
