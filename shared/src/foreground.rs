// Foreground watch.
//
// Other always-on-top windows can take the top slot whenever they are
// focused, so every foreground change re-asserts z-order on all live
// overlays. The hook is installed when the first surface registers and
// removed when the last one leaves. Membership is non-owning: the service
// owns the surfaces, the watch only holds copyable handles to them.
//
// The state lock is only held to mutate membership. Hook install/uninstall
// and the z-order calls run unlocked because the OS may re-enter the
// callback from inside them.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::error::Result;

pub trait HookBackend {
    type Hook: Send;

    fn install(&self) -> Result<Self::Hook>;
    fn uninstall(&self, hook: Self::Hook);
}

struct WatchState<H, T> {
    hook: Option<H>,
    installing: bool,
    live: Vec<T>,
}

pub struct ForegroundWatch<B: HookBackend, T> {
    backend: B,
    state: Mutex<WatchState<B::Hook, T>>,
    install_done: Condvar,
}

impl<B, T> ForegroundWatch<B, T>
where
    B: HookBackend,
    T: Copy + PartialEq,
{
    pub const fn new(backend: B) -> Self {
        Self {
            backend,
            state: Mutex::new(WatchState {
                hook: None,
                installing: false,
                live: Vec::new(),
            }),
            install_done: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, WatchState<B::Hook, T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a live surface, installing the hook if this is the first one.
    /// A caller arriving while another install is in flight waits for its
    /// outcome and retries the install itself if that one failed, so no
    /// member is ever left registered without a hook. On install failure
    /// the member is removed again and the error is returned to the
    /// surface constructor.
    pub fn register(&self, member: T) -> Result<()> {
        let mut state = self.lock();
        while state.installing {
            state = self
                .install_done
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.live.push(member);
        if state.hook.is_some() {
            return Ok(());
        }
        state.installing = true;
        drop(state);

        let installed = self.backend.install();
        let mut state = self.lock();
        state.installing = false;
        self.install_done.notify_all();
        match installed {
            Ok(hook) if state.live.is_empty() => {
                // Everything unregistered while we were installing.
                drop(state);
                self.backend.uninstall(hook);
                Ok(())
            }
            Ok(hook) => {
                debug!("foreground hook installed");
                state.hook = Some(hook);
                Ok(())
            }
            Err(e) => {
                warn!("foreground hook install failed: {e}");
                state.live.retain(|m| *m != member);
                Err(e)
            }
        }
    }

    /// Remove a surface; the hook goes away with the last one.
    pub fn unregister(&self, member: T) {
        let released = {
            let mut state = self.lock();
            state.live.retain(|m| *m != member);
            if state.live.is_empty() {
                state.hook.take()
            } else {
                None
            }
        };
        if let Some(hook) = released {
            self.backend.uninstall(hook);
            debug!("foreground hook removed");
        }
    }

    /// Copy of the current membership, taken under the lock and released
    /// before the caller touches any window.
    pub fn members(&self) -> Vec<T> {
        self.lock().live.clone()
    }

    /// Invoke `bring_to_front` on every live member.
    pub fn notify(&self, mut bring_to_front: impl FnMut(T)) {
        for member in self.members() {
            bring_to_front(member);
        }
    }

    pub fn is_hooked(&self) -> bool {
        self.lock().hook.is_some()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}
