use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Identity pushed by the auth provider.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CurrentUser {
    pub id: String,
    pub display_name: String,
    pub is_guest: bool,
}

impl CurrentUser {
    pub fn guest() -> Self {
        Self {
            id: String::new(),
            display_name: "Invitado".to_string(),
            is_guest: true,
        }
    }

    /// Owner id as persisted on festival documents; guests share one bucket.
    pub fn storage_id(&self) -> &str {
        if self.is_guest { "invitado" } else { &self.id }
    }
}

/// Auth snapshot handed to subscribers: `loading` is true until the provider
/// reports the initial state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthSnapshot {
    pub user: Option<CurrentUser>,
    pub loading: bool,
}

type Subscriber = Box<dyn Fn(&AuthSnapshot) + Send>;

struct AuthInner {
    snapshot: AuthSnapshot,
    subscribers: HashMap<u64, Subscriber>,
    next_id: u64,
}

/// Process-wide auth state as an explicit value: cloneable handle, observable
/// snapshot, and subscriptions that tear down when dropped.
#[derive(Clone)]
pub struct AuthState {
    inner: Arc<Mutex<AuthInner>>,
}

impl Default for AuthState {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthState {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(AuthInner {
                snapshot: AuthSnapshot {
                    user: None,
                    loading: true,
                },
                subscribers: HashMap::new(),
                next_id: 0,
            })),
        }
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        self.inner.lock().expect("auth state poisoned").snapshot.clone()
    }

    /// Record a pushed identity change and notify subscribers. The first call
    /// also clears `loading`.
    pub fn set_user(&self, user: Option<CurrentUser>) {
        let mut inner = self.inner.lock().expect("auth state poisoned");
        inner.snapshot = AuthSnapshot {
            user,
            loading: false,
        };
        let snapshot = inner.snapshot.clone();
        for subscriber in inner.subscribers.values() {
            subscriber(&snapshot);
        }
    }

    /// Subscribe to auth changes; the callback also fires once with the
    /// current snapshot. Dropping the returned handle unsubscribes.
    pub fn subscribe(&self, f: impl Fn(&AuthSnapshot) + Send + 'static) -> AuthSubscription {
        let mut inner = self.inner.lock().expect("auth state poisoned");
        f(&inner.snapshot);
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.insert(id, Box::new(f));
        AuthSubscription {
            id,
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Active subscription handle; unsubscribes on drop.
pub struct AuthSubscription {
    id: u64,
    inner: Arc<Mutex<AuthInner>>,
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.subscribers.remove(&self.id);
        }
    }
}
