use async_trait::async_trait;
use futures_util::future;

use crate::errors::Result;

/// Persistence collaborator for one editable record. Implementations map
/// read failures onto the error enum so not-found, parse and I/O problems
/// stay distinguishable.
#[async_trait]
pub trait ResourceStore<T>: Send + Sync {
    async fn read(&self) -> Result<T>;
    async fn write(&self, value: &T) -> Result<()>;
}

/// A remotely-persisted record paired with an in-memory working copy.
///
/// Edits accumulate in `working` and hit the store only on an explicit
/// `save`; `snapshot` is the last value confirmed persisted. Dirty state is
/// always derived by comparing the two, never cached.
pub struct EditableResource<T> {
    label: String,
    store: Box<dyn ResourceStore<T>>,
    working: Option<T>,
    snapshot: Option<T>,
    save_pending: bool,
    load_pending: bool,
}

impl<T> EditableResource<T>
where
    T: Clone + PartialEq + Send + Sync,
{
    pub fn new(label: impl Into<String>, store: Box<dyn ResourceStore<T>>) -> Self {
        Self {
            label: label.into(),
            store,
            working: None,
            snapshot: None,
            save_pending: false,
            load_pending: false,
        }
    }

    /// Fetch the persisted value. On success both `working` and `snapshot`
    /// take the loaded value; on failure the previous state is untouched.
    /// Re-entrant loads while one is pending are no-ops.
    pub async fn load(&mut self) -> Result<()> {
        if self.load_pending {
            return Ok(());
        }
        self.load_pending = true;
        let result = self.store.read().await;
        self.load_pending = false;

        let value = result?;
        self.working = Some(value.clone());
        self.snapshot = Some(value);
        Ok(())
    }

    /// Mutate the working copy in place. Synchronous, never touches the
    /// snapshot or the store. No-op before the first successful load.
    pub fn edit(&mut self, apply: impl FnOnce(&mut T)) {
        if let Some(working) = self.working.as_mut() {
            apply(working);
        } else {
            tracing::warn!(label = %self.label, "edit before load ignored");
        }
    }

    pub fn working(&self) -> Option<&T> {
        self.working.as_ref()
    }

    pub fn snapshot(&self) -> Option<&T> {
        self.snapshot.as_ref()
    }

    /// Persist the working copy. Resolves immediately when clean or while a
    /// prior save is still pending. The snapshot advances only after the
    /// store write succeeds; on failure the edits stay in place and the
    /// session remains dirty.
    pub async fn save(&mut self) -> Result<()> {
        if self.save_pending || !self.is_dirty() {
            return Ok(());
        }
        let Some(value) = self.working.clone() else {
            return Ok(());
        };

        self.save_pending = true;
        let result = self.store.write(&value).await;
        self.save_pending = false;

        result?;
        self.snapshot = Some(value);
        Ok(())
    }

    /// Discard edits: `working` becomes a copy of the snapshot. Always
    /// synchronous, always succeeds, idempotent.
    pub fn revert(&mut self) {
        self.working = self.snapshot.clone();
    }

    /// Structural comparison of working copy vs snapshot, order-sensitive
    /// for list-valued records.
    pub fn is_dirty(&self) -> bool {
        self.working != self.snapshot
    }

    pub fn is_save_pending(&self) -> bool {
        self.save_pending
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Object-safe view of a session so an aggregator can hold sessions over
/// different record types.
#[async_trait]
pub trait Session: Send {
    fn label(&self) -> &str;
    fn is_dirty(&self) -> bool;
    fn is_save_pending(&self) -> bool;
    async fn save(&mut self) -> Result<()>;
    fn revert(&mut self);
}

#[async_trait]
impl<T> Session for EditableResource<T>
where
    T: Clone + PartialEq + Send + Sync,
{
    fn label(&self) -> &str {
        EditableResource::label(self)
    }

    fn is_dirty(&self) -> bool {
        EditableResource::is_dirty(self)
    }

    fn is_save_pending(&self) -> bool {
        EditableResource::is_save_pending(self)
    }

    async fn save(&mut self) -> Result<()> {
        EditableResource::save(self).await
    }

    fn revert(&mut self) {
        EditableResource::revert(self)
    }
}

/// Outcome of a `save_all`: succeeded saves keep their snapshot update even
/// when others fail, so partial success is visible per section.
#[derive(Debug, Default)]
pub struct SaveAllReport {
    pub saved: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl SaveAllReport {
    pub fn all_saved(&self) -> bool {
        self.failed.is_empty()
    }

    /// Single human-readable message aggregating the failures, `None` when
    /// everything saved.
    pub fn error(&self) -> Option<String> {
        if self.failed.is_empty() {
            return None;
        }
        let parts: Vec<String> = self
            .failed
            .iter()
            .map(|(label, message)| format!("{label}: {message}"))
            .collect();
        Some(parts.join("; "))
    }
}

pub fn any_dirty(sessions: &[&mut dyn Session]) -> bool {
    sessions.iter().any(|session| session.is_dirty())
}

/// Save exactly the sessions that are currently dirty, concurrently. Clean
/// sessions are skipped so they never trigger an unnecessary write.
pub async fn save_all(sessions: &mut [&mut dyn Session]) -> SaveAllReport {
    let pending: Vec<_> = sessions
        .iter_mut()
        .filter(|session| session.is_dirty())
        .map(|session| async move {
            let label = session.label().to_string();
            let result = session.save().await;
            (label, result)
        })
        .collect();

    let mut report = SaveAllReport::default();
    for (label, result) in future::join_all(pending).await {
        match result {
            Ok(()) => report.saved.push(label),
            Err(err) => {
                tracing::warn!(label = %label, error = %err, "save failed");
                report.failed.push((label, err.to_string()));
            }
        }
    }
    report
}

pub fn revert_all(sessions: &mut [&mut dyn Session]) {
    for session in sessions.iter_mut() {
        session.revert();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CompanionError;
    use std::io;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    struct FakeStore<T> {
        value: Arc<Mutex<T>>,
        writes: Arc<AtomicUsize>,
        fail_writes: Arc<AtomicBool>,
    }

    impl<T: Clone> FakeStore<T> {
        fn new(value: T) -> Self {
            Self {
                value: Arc::new(Mutex::new(value)),
                writes: Arc::new(AtomicUsize::new(0)),
                fail_writes: Arc::new(AtomicBool::new(false)),
            }
        }

        fn write_count(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }

        fn stored(&self) -> T {
            self.value.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl<T> ResourceStore<T> for FakeStore<T>
    where
        T: Clone + Send + Sync,
    {
        async fn read(&self) -> Result<T> {
            Ok(self.value.lock().unwrap().clone())
        }

        async fn write(&self, value: &T) -> Result<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(CompanionError::Io(io::Error::new(
                    io::ErrorKind::Other,
                    "disk full",
                )));
            }
            self.writes.fetch_add(1, Ordering::SeqCst);
            *self.value.lock().unwrap() = value.clone();
            Ok(())
        }
    }

    /// Store whose reads fail with a chosen error category.
    struct BrokenStore {
        error: fn() -> CompanionError,
    }

    #[async_trait]
    impl ResourceStore<Vec<i32>> for BrokenStore {
        async fn read(&self) -> Result<Vec<i32>> {
            Err((self.error)())
        }

        async fn write(&self, _value: &Vec<i32>) -> Result<()> {
            Err((self.error)())
        }
    }

    fn session_with(values: Vec<i32>) -> (EditableResource<Vec<i32>>, FakeStore<Vec<i32>>) {
        let store = FakeStore::new(values);
        let session = EditableResource::new("test", Box::new(store.clone()));
        (session, store)
    }

    #[tokio::test]
    async fn dirty_tracks_structural_difference() {
        let (mut session, _) = session_with(vec![1, 2]);
        session.load().await.unwrap();
        assert!(!session.is_dirty());

        session.edit(|list| list.push(3));
        assert!(session.is_dirty());

        // Undoing the edit by hand makes it clean again.
        session.edit(|list| {
            list.pop();
        });
        assert!(!session.is_dirty());
    }

    #[tokio::test]
    async fn list_order_matters_for_dirty() {
        let (mut session, _) = session_with(vec![1, 2]);
        session.load().await.unwrap();
        session.edit(|list| list.reverse());
        assert!(session.is_dirty());
    }

    #[tokio::test]
    async fn clean_save_does_not_touch_the_store() {
        let (mut session, store) = session_with(vec![1]);
        session.load().await.unwrap();
        session.save().await.unwrap();
        assert_eq!(store.write_count(), 0);
        assert!(!session.is_dirty());
    }

    #[tokio::test]
    async fn save_advances_snapshot_only_on_success() {
        let (mut session, store) = session_with(vec![1]);
        session.load().await.unwrap();
        session.edit(|list| list.push(2));

        store.fail_writes.store(true, Ordering::SeqCst);
        let err = session.save().await.unwrap_err();
        assert!(matches!(err, CompanionError::Io(_)));
        // Edits survive the failure and the session is still dirty.
        assert_eq!(session.working(), Some(&vec![1, 2]));
        assert!(session.is_dirty());

        store.fail_writes.store(false, Ordering::SeqCst);
        session.save().await.unwrap();
        assert!(!session.is_dirty());
        assert_eq!(store.stored(), vec![1, 2]);
    }

    #[tokio::test]
    async fn revert_is_idempotent() {
        let (mut session, _) = session_with(vec![1]);
        session.load().await.unwrap();
        session.edit(|list| list.push(9));

        session.revert();
        let once = session.working().cloned();
        session.revert();
        assert_eq!(session.working().cloned(), once);
        assert!(!session.is_dirty());
    }

    #[tokio::test]
    async fn failed_load_leaves_previous_state() {
        let (mut session, store) = session_with(vec![1]);
        session.load().await.unwrap();
        session.edit(|list| list.push(2));

        // Swap in a store view that fails; simulate by failing writes and
        // reading through a broken store instead.
        let mut broken = EditableResource::new(
            "broken",
            Box::new(BrokenStore {
                error: || CompanionError::NotFound("team_mappings.txt".into()),
            }) as Box<dyn ResourceStore<Vec<i32>>>,
        );
        assert!(matches!(
            broken.load().await.unwrap_err(),
            CompanionError::NotFound(_)
        ));
        assert!(broken.working().is_none());

        // Parse and I/O failures surface the same way.
        for error in [
            || CompanionError::Parse("bad line".into()),
            || CompanionError::Io(io::Error::new(io::ErrorKind::PermissionDenied, "denied")),
        ] {
            let mut session = EditableResource::new(
                "broken",
                Box::new(BrokenStore { error }) as Box<dyn ResourceStore<Vec<i32>>>,
            );
            assert!(session.load().await.is_err());
        }

        drop(store);
        assert!(session.is_dirty());
        assert_eq!(session.working(), Some(&vec![1, 2]));
    }

    #[tokio::test]
    async fn save_all_commits_partial_success() {
        let (mut a, store_a) = session_with(vec![1]);
        let (mut b, store_b) = session_with(vec![2]);
        let (mut c, store_c) = session_with(vec![3]);
        a.load().await.unwrap();
        b.load().await.unwrap();
        c.load().await.unwrap();

        a.edit(|list| list.push(10));
        b.edit(|list| list.push(20));
        c.edit(|list| list.push(30));
        store_b.fail_writes.store(true, Ordering::SeqCst);

        let mut sessions: Vec<&mut dyn Session> = vec![&mut a, &mut b, &mut c];
        let report = save_all(&mut sessions).await;

        assert_eq!(report.saved.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert!(report.error().is_some());

        assert!(!a.is_dirty());
        assert!(b.is_dirty());
        assert!(!c.is_dirty());
        assert_eq!(store_a.stored(), vec![1, 10]);
        assert_eq!(store_c.stored(), vec![3, 30]);
    }

    #[tokio::test]
    async fn save_all_skips_clean_sessions() {
        let (mut a, store_a) = session_with(vec![1]);
        let (mut b, store_b) = session_with(vec![2]);
        a.load().await.unwrap();
        b.load().await.unwrap();
        b.edit(|list| list.push(5));

        let mut sessions: Vec<&mut dyn Session> = vec![&mut a, &mut b];
        let report = save_all(&mut sessions).await;

        assert!(report.all_saved());
        assert_eq!(store_a.write_count(), 0);
        assert_eq!(store_b.write_count(), 1);
    }

    #[tokio::test]
    async fn revert_all_touches_every_session() {
        let (mut a, _) = session_with(vec![1]);
        let (mut b, _) = session_with(vec![2]);
        a.load().await.unwrap();
        b.load().await.unwrap();
        a.edit(|list| list.push(1));
        b.edit(|list| list.push(2));

        {
            let mut sessions: Vec<&mut dyn Session> = vec![&mut a, &mut b];
            assert!(any_dirty(&sessions));
            revert_all(&mut sessions);
            assert!(!any_dirty(&sessions));
        }
        assert_eq!(a.working(), Some(&vec![1]));
        assert_eq!(b.working(), Some(&vec![2]));
    }
}
