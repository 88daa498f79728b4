use super::{
    models::{cve_matches_term, Cve, CveFilter, LogEntry, LogQuery, User},
    Store, StoreError, StoreResult,
};
use async_trait::async_trait;
use tokio::sync::RwLock;

#[derive(Default)]
struct Collections {
    users: Vec<User>,
    logs: Vec<LogEntry>,
    cves: Vec<Cve>,
}

/// Process-local store with the same contract as the MongoDB backend.
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<Collections>,
}

fn take<T>(items: impl Iterator<Item = T>, offset: u64, limit: u32) -> Vec<T> {
    items
        .skip(usize::try_from(offset).unwrap_or(usize::MAX))
        .take(limit as usize)
        .collect()
}

#[async_trait]
impl Store for MemoryStore {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let data = self.data.read().await;
        Ok(data.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        let data = self.data.read().await;
        Ok(data.users.iter().find(|u| u.id == id).cloned())
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut data = self.data.write().await;
        if data
            .users
            .iter()
            .any(|u| u.email == user.email || u.id == user.id)
        {
            return Err(StoreError::Duplicate);
        }
        data.users.push(user.clone());
        Ok(())
    }

    async fn insert_log(&self, entry: &LogEntry) -> StoreResult<()> {
        let mut data = self.data.write().await;
        if data.logs.iter().any(|l| l.id == entry.id) {
            return Err(StoreError::Duplicate);
        }
        data.logs.push(entry.clone());
        Ok(())
    }

    async fn list_logs(&self, query: &LogQuery) -> StoreResult<Vec<LogEntry>> {
        let data = self.data.read().await;
        let mut logs: Vec<&LogEntry> = data
            .logs
            .iter()
            .filter(|l| l.user_id == query.user_id)
            .filter(|l| query.tool.as_deref().map_or(true, |tool| l.tool == tool))
            .collect();
        // stable sort keeps insertion order for equal timestamps
        logs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(take(logs.into_iter().cloned(), query.offset, query.limit))
    }

    async fn delete_log(&self, user_id: &str, log_id: &str) -> StoreResult<bool> {
        let mut data = self.data.write().await;
        let before = data.logs.len();
        data.logs.retain(|l| !(l.id == log_id && l.user_id == user_id));
        Ok(data.logs.len() != before)
    }

    async fn count_cves(&self) -> StoreResult<u64> {
        let data = self.data.read().await;
        Ok(data.cves.len() as u64)
    }

    async fn insert_cve(&self, cve: &Cve) -> StoreResult<()> {
        let mut data = self.data.write().await;
        if data.cves.iter().any(|c| c.id == cve.id) {
            return Err(StoreError::Duplicate);
        }
        data.cves.push(cve.clone());
        Ok(())
    }

    async fn list_cves(&self, filter: &CveFilter) -> StoreResult<Vec<Cve>> {
        let data = self.data.read().await;
        Ok(take(
            data.cves.iter().filter(|c| filter.matches(c)).cloned(),
            0,
            filter.limit,
        ))
    }

    async fn find_cve(&self, id: &str) -> StoreResult<Option<Cve>> {
        let data = self.data.read().await;
        Ok(data.cves.iter().find(|c| c.id == id).cloned())
    }

    async fn search_cves(&self, term: &str, limit: u32) -> StoreResult<Vec<Cve>> {
        let data = self.data.read().await;
        Ok(take(
            data.cves.iter().filter(|c| cve_matches_term(c, term)).cloned(),
            0,
            limit,
        ))
    }
}
