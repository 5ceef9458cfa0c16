//! Session reconciler
//!
//! Keeps the application profile in step with the identity provider's
//! session. Every session event bumps an epoch and starts its own
//! reconciliation task; the superseded task is aborted, and a late result is
//! only committed while its epoch and principal are still the latest ones.
//!
//! State is published through a `watch` channel so readers always see a
//! complete [`AuthSnapshot`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use profilesync_domain::constants::SHUTDOWN_JOIN_TIMEOUT_SECS;
use profilesync_domain::{
    AuthSnapshot, IdentityError, Principal, Profile, ProfileSyncError, ReconcilePhase, Result,
    Role, Session, SessionEvent, SessionEventKind, StoreError,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::bootstrap::BootstrapSeeder;
use crate::identity::ports::{IdentityService, SessionSubscription};
use crate::user::ports::ProfileStore;
use crate::user::provisioner::{with_fallback_email, ProfileProvisioner};

/// Reconciliation task currently allowed to commit
struct InFlight {
    epoch: u64,
    handle: JoinHandle<()>,
}

/// State shared with spawned listener and reconciliation tasks
struct Shared {
    identity: Arc<dyn IdentityService>,
    store: Arc<dyn ProfileStore>,
    provisioner: ProfileProvisioner,
    state: watch::Sender<AuthSnapshot>,
    in_flight: Mutex<Option<InFlight>>,
}

#[derive(Default)]
struct Lifecycle {
    running: bool,
    cancel: CancellationToken,
    listener: Option<JoinHandle<()>>,
    seeder: Option<JoinHandle<()>>,
}

/// Drives profile lookup and creation from identity session events
pub struct SessionReconciler {
    shared: Arc<Shared>,
    seeder: Mutex<Option<BootstrapSeeder>>,
    seeded: AtomicBool,
    lifecycle: Mutex<Lifecycle>,
}

impl SessionReconciler {
    pub fn new(identity: Arc<dyn IdentityService>, store: Arc<dyn ProfileStore>) -> Self {
        let (state, _) = watch::channel(AuthSnapshot::default());
        let shared = Shared {
            identity,
            provisioner: ProfileProvisioner::new(Arc::clone(&store)),
            store,
            state,
            in_flight: Mutex::new(None),
        };

        Self {
            shared: Arc::new(shared),
            seeder: Mutex::new(None),
            seeded: AtomicBool::new(false),
            lifecycle: Mutex::new(Lifecycle::default()),
        }
    }

    /// Run `seeder` once, concurrently with the first session resolution.
    #[must_use]
    pub fn with_seeder(self, seeder: BootstrapSeeder) -> Self {
        *self.seeder.lock() = Some(seeder);
        self
    }

    /// Subscribe to session changes and resolve the current session.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    /// `ProfileSyncError::Lifecycle` if the reconciler is already running.
    pub fn start(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.running {
            return Err(ProfileSyncError::Lifecycle("session reconciler already running".into()));
        }

        // Subscribe before anything can emit, so the seeder's own sign-up
        // event is not missed.
        let subscription = self.shared.identity.on_session_change();
        let cancel = CancellationToken::new();

        if !self.seeded.swap(true, Ordering::SeqCst) {
            if let Some(seeder) = self.seeder.lock().take() {
                lifecycle.seeder = Some(tokio::spawn(async move {
                    seeder.run().await;
                }));
            }
        }

        let shared = Arc::clone(&self.shared);
        let listener_cancel = cancel.clone();
        lifecycle.listener = Some(tokio::spawn(async move {
            listen(shared, subscription, listener_cancel).await;
        }));
        lifecycle.cancel = cancel;
        lifecycle.running = true;

        info!("session reconciler started");
        Ok(())
    }

    /// Stop listening, abort in-flight work and release the subscription.
    ///
    /// # Errors
    /// `ProfileSyncError::Lifecycle` if the reconciler is not running or the
    /// listener does not stop in time.
    pub async fn shutdown(&self) -> Result<()> {
        let (listener, seeder) = {
            let mut lifecycle = self.lifecycle.lock();
            if !lifecycle.running {
                return Err(ProfileSyncError::Lifecycle("session reconciler is not running".into()));
            }
            lifecycle.running = false;
            lifecycle.cancel.cancel();
            (lifecycle.listener.take(), lifecycle.seeder.take())
        };

        if let Some(in_flight) = self.shared.in_flight.lock().take() {
            in_flight.handle.abort();
        }
        if let Some(seeder) = seeder {
            seeder.abort();
        }

        if let Some(listener) = listener {
            let join_timeout = Duration::from_secs(SHUTDOWN_JOIN_TIMEOUT_SECS);
            match tokio::time::timeout(join_timeout, listener).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) if err.is_cancelled() => {}
                Ok(Err(err)) => {
                    return Err(ProfileSyncError::Lifecycle(format!(
                        "session listener task failed: {err}"
                    )));
                }
                Err(_) => {
                    return Err(ProfileSyncError::Lifecycle(format!(
                        "session listener did not stop within {}s",
                        join_timeout.as_secs()
                    )));
                }
            }
        }

        info!("session reconciler stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle.lock().running
    }

    /// Feed one session event into the state machine.
    ///
    /// The listener calls this for every provider event; it is public so
    /// hosts with their own event plumbing can drive the reconciler directly.
    /// Must be called from within a Tokio runtime.
    pub fn observe(&self, event: SessionEvent) {
        self.shared.observe(event);
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Sign in with email and password; state follows via the session event.
    ///
    /// # Errors
    /// The identity service's error, verbatim.
    pub async fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> std::result::Result<Session, IdentityError> {
        self.shared.identity.sign_in_with_password(email, password).await
    }

    /// Register a new account and create its profile with `username`.
    ///
    /// A failed profile insert is logged and does not fail the sign-up.
    ///
    /// # Errors
    /// The identity service's sign-up error, verbatim.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> std::result::Result<Session, IdentityError> {
        let session = self.shared.identity.sign_up(email, password).await?;

        let owner = with_fallback_email(&session.principal, email);
        let ensured =
            self.shared.provisioner.ensure_profile(&owner, Some(username), Role::User).await;
        debug!(
            principal_id = %ensured.profile.id,
            inserted = ensured.inserted,
            "profile ensured after sign-up"
        );

        Ok(session)
    }

    /// Sign out and clear local state without waiting for the provider event.
    ///
    /// # Errors
    /// The identity service's error, verbatim; local state is left untouched.
    pub async fn sign_out(&self) -> std::result::Result<(), IdentityError> {
        self.shared.identity.sign_out().await?;
        self.shared.observe(SessionEvent::signed_out());
        Ok(())
    }

    // ------------------------------------------------------------------
    // Observable state
    // ------------------------------------------------------------------

    pub fn snapshot(&self) -> AuthSnapshot {
        self.shared.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.shared.state.subscribe()
    }

    /// Resolve once the latest reconciliation cycle has committed.
    pub async fn wait_until_ready(&self) -> AuthSnapshot {
        let mut receiver = self.shared.state.subscribe();
        let ready = receiver
            .wait_for(|snapshot| snapshot.ready)
            .await
            .map(|snapshot| (*snapshot).clone());
        // The sender lives as long as `self`, so the channel cannot close here.
        ready.unwrap_or_else(|_| self.snapshot())
    }

    pub fn current_principal(&self) -> Option<Principal> {
        self.shared.state.borrow().principal.clone()
    }

    pub fn current_profile(&self) -> Option<Profile> {
        self.shared.state.borrow().profile.clone()
    }

    pub fn is_ready(&self) -> bool {
        self.shared.state.borrow().ready
    }

    pub fn is_authenticated(&self) -> bool {
        self.shared.state.borrow().is_authenticated()
    }

    pub fn is_admin(&self) -> bool {
        self.shared.state.borrow().is_admin()
    }
}

impl Drop for SessionReconciler {
    fn drop(&mut self) {
        self.lifecycle.lock().cancel.cancel();
        if let Some(in_flight) = self.shared.in_flight.lock().take() {
            in_flight.handle.abort();
        }
    }
}

impl std::fmt::Debug for SessionReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionReconciler")
            .field("state", &*self.shared.state.borrow())
            .field("running", &self.is_running())
            .finish()
    }
}

impl Shared {
    fn observe(self: &Arc<Self>, event: SessionEvent) {
        let kind = event.kind;
        let principal = event.session.map(|session| session.principal);

        let mut in_flight = self.in_flight.lock();
        let mut epoch = 0;
        self.state.send_modify(|state| {
            state.epoch += 1;
            epoch = state.epoch;
            match &principal {
                Some(next) => {
                    let same_principal =
                        state.principal.as_ref().is_some_and(|current| current.id == next.id);
                    if !same_principal {
                        state.profile = None;
                    }
                    state.principal = Some(next.clone());
                    state.ready = false;
                    state.phase = ReconcilePhase::Resolving;
                }
                None => {
                    state.principal = None;
                    state.profile = None;
                    state.ready = true;
                    state.phase = ReconcilePhase::SignedOut;
                }
            }
        });

        if let Some(previous) = in_flight.take() {
            previous.handle.abort();
            debug!(superseded_epoch = previous.epoch, epoch, "aborted superseded reconciliation");
        }

        match principal {
            Some(principal) => {
                debug!(epoch, kind = %kind, principal_id = %principal.id, "resolving profile");
                let shared = Arc::clone(self);
                let handle = tokio::spawn(async move {
                    shared.reconcile(epoch, principal).await;
                });
                *in_flight = Some(InFlight { epoch, handle });
            }
            None => info!(epoch, kind = %kind, "session cleared"),
        }
    }

    async fn reconcile(&self, epoch: u64, principal: Principal) {
        let profile = match self.store.get_by_id(&principal.id).await {
            Ok(profile) => Some(profile),
            Err(StoreError::NotFound(_)) => {
                let owner = self.resolve_owner(&principal).await;
                let ensured = self.provisioner.ensure_profile(&owner, None, Role::User).await;
                Some(ensured.profile)
            }
            Err(err) => {
                error!(
                    epoch,
                    principal_id = %principal.id,
                    error = %err,
                    "profile lookup failed; resolving without a profile"
                );
                None
            }
        };

        self.commit(epoch, &principal.id, profile);
    }

    /// Principal to build a new profile for; the provider's view wins when it
    /// still names the same id.
    async fn resolve_owner(&self, observed: &Principal) -> Principal {
        match self.identity.get_current_principal().await {
            Ok(Some(current)) if current.id == observed.id => {
                match observed.email.as_deref() {
                    Some(email) => with_fallback_email(&current, email),
                    None => current,
                }
            }
            Ok(Some(current)) => {
                warn!(
                    principal_id = %observed.id,
                    current_id = %current.id,
                    "provider reports a different principal; using the session's"
                );
                observed.clone()
            }
            Ok(None) => {
                debug!(principal_id = %observed.id, "no current principal; using the session's");
                observed.clone()
            }
            Err(err) => {
                warn!(
                    principal_id = %observed.id,
                    error = %err,
                    "failed to fetch current principal; using the session's"
                );
                observed.clone()
            }
        }
    }

    fn commit(&self, epoch: u64, principal_id: &str, profile: Option<Profile>) {
        let committed = self.state.send_if_modified(|state| {
            let current =
                state.principal.as_ref().is_some_and(|principal| principal.id == principal_id);
            if state.epoch != epoch || !current {
                return false;
            }
            state.profile = profile;
            state.ready = true;
            state.phase = ReconcilePhase::Resolved;
            true
        });

        if committed {
            info!(epoch, principal_id, "profile resolved");
            let mut in_flight = self.in_flight.lock();
            if in_flight.as_ref().is_some_and(|task| task.epoch == epoch) {
                in_flight.take();
            }
        } else {
            debug!(epoch, principal_id, "discarded stale reconciliation result");
        }
    }
}

async fn listen(shared: Arc<Shared>, mut subscription: SessionSubscription, cancel: CancellationToken) {
    let initial = tokio::select! {
        () = cancel.cancelled() => return,
        session = shared.identity.get_session() => session,
    };
    let session = initial.unwrap_or_else(|err| {
        warn!(error = %err, "failed to read initial session; treating as signed out");
        None
    });
    shared.observe(SessionEvent::new(SessionEventKind::InitialSession, session));

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            event = subscription.next_event() => match event {
                Some(event) => shared.observe(event),
                None => {
                    warn!("identity service closed the session stream");
                    break;
                }
            },
        }
    }

    subscription.unsubscribe();
    debug!("session listener exited");
}
