use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

pub const DEFAULT_REPORT_TTL_SECS: u64 = 15 * 60;

/// Generated document bytes plus download metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportArtifact {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub filename: String,
}

#[derive(Debug, Clone)]
struct StoredReport {
    artifact: ReportArtifact,
    expires_at: DateTime<Utc>,
}

/// In-memory artifact store keyed by opaque tokens that expire after a TTL.
#[derive(Debug)]
pub struct TempReportStore {
    entries: Mutex<HashMap<String, StoredReport>>,
    ttl: Duration,
}

impl Default for TempReportStore {
    fn default() -> Self {
        Self::new(std::time::Duration::from_secs(DEFAULT_REPORT_TTL_SECS))
    }
}

impl TempReportStore {
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: Duration::from_std(ttl).unwrap_or_else(|_| Duration::seconds(DEFAULT_REPORT_TTL_SECS as i64)),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, StoredReport>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores `artifact`, pruning expired entries first. Returns the token and expiry.
    pub fn put_at(&self, artifact: ReportArtifact, now: DateTime<Utc>) -> (String, DateTime<Utc>) {
        let mut entries = self.entries();
        entries.retain(|_, entry| entry.expires_at > now);
        let token = Uuid::new_v4().to_string();
        let expires_at = now + self.ttl;
        entries.insert(
            token.clone(),
            StoredReport {
                artifact,
                expires_at,
            },
        );
        (token, expires_at)
    }

    pub fn put(&self, artifact: ReportArtifact) -> (String, DateTime<Utc>) {
        self.put_at(artifact, Utc::now())
    }

    /// Looks up a live artifact; an expired entry is removed and reported as missing.
    pub fn get_at(&self, token: &str, now: DateTime<Utc>) -> Option<ReportArtifact> {
        let mut entries = self.entries();
        let expired = entries.get(token)?.expires_at <= now;
        if expired {
            entries.remove(token);
            return None;
        }
        entries.get(token).map(|entry| entry.artifact.clone())
    }

    pub fn get(&self, token: &str) -> Option<ReportArtifact> {
        self.get_at(token, Utc::now())
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
