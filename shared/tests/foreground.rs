use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

use blackout_shared::{BlackoutError, ForegroundWatch, HookBackend, Result};

#[derive(Default)]
struct CountingBackend {
    installs: AtomicUsize,
    uninstalls: AtomicUsize,
    fail: Mutex<bool>,
}

impl HookBackend for CountingBackend {
    type Hook = usize;

    fn install(&self) -> Result<usize> {
        if *self.fail.lock().unwrap() {
            return Err(BlackoutError::platform("SetWinEventHook", 5));
        }
        Ok(self.installs.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn uninstall(&self, _hook: usize) {
        self.uninstalls.fetch_add(1, Ordering::SeqCst);
    }
}

fn counts(watch: &ForegroundWatch<CountingBackend, u32>) -> (usize, usize) {
    let backend = watch.backend();
    (
        backend.installs.load(Ordering::SeqCst),
        backend.uninstalls.load(Ordering::SeqCst),
    )
}

#[test]
fn hook_lives_from_first_to_last_member() {
    let watch = ForegroundWatch::new(CountingBackend::default());

    watch.register(1).unwrap();
    watch.register(2).unwrap();
    assert!(watch.is_hooked());
    assert_eq!(counts(&watch), (1, 0));

    watch.unregister(1);
    assert!(watch.is_hooked());
    watch.unregister(2);
    assert!(!watch.is_hooked());
    assert_eq!(counts(&watch), (1, 1));

    watch.register(3).unwrap();
    assert_eq!(counts(&watch), (2, 1));
}

#[test]
fn notify_visits_every_live_member() {
    let watch = ForegroundWatch::new(CountingBackend::default());
    for member in [4, 5, 6] {
        watch.register(member).unwrap();
    }
    watch.unregister(5);

    let mut seen = Vec::new();
    watch.notify(|member| seen.push(member));
    assert_eq!(seen, vec![4, 6]);
}

#[test]
fn failed_install_rejects_the_member() {
    let watch = ForegroundWatch::new(CountingBackend::default());
    *watch.backend().fail.lock().unwrap() = true;

    assert!(watch.register(1).is_err());
    assert!(watch.members().is_empty());
    assert!(!watch.is_hooked());

    *watch.backend().fail.lock().unwrap() = false;
    watch.register(1).unwrap();
    assert_eq!(watch.members(), vec![1]);
}

#[test]
fn unregistering_unknown_member_is_harmless() {
    let watch = ForegroundWatch::new(CountingBackend::default());
    watch.unregister(42);
    watch.register(1).unwrap();
    watch.unregister(42);
    assert!(watch.is_hooked());
}

/// Fails its first install, holding it open until the test releases it.
struct GatedBackend {
    attempts: AtomicUsize,
    started: Barrier,
    release: Barrier,
}

impl HookBackend for GatedBackend {
    type Hook = usize;

    fn install(&self) -> Result<usize> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt == 1 {
            self.started.wait();
            self.release.wait();
            return Err(BlackoutError::platform("SetWinEventHook", 5));
        }
        Ok(attempt)
    }

    fn uninstall(&self, _hook: usize) {}
}

#[test]
fn member_registering_during_failed_install_gets_its_own_hook() {
    let watch = Arc::new(ForegroundWatch::new(GatedBackend {
        attempts: AtomicUsize::new(0),
        started: Barrier::new(2),
        release: Barrier::new(2),
    }));

    let first = {
        let watch = watch.clone();
        thread::spawn(move || watch.register(1))
    };
    watch.backend().started.wait();

    let second = {
        let watch = watch.clone();
        thread::spawn(move || watch.register(2))
    };
    // Let the second registration reach the in-flight install.
    thread::sleep(Duration::from_millis(50));
    watch.backend().release.wait();

    assert!(first.join().unwrap().is_err());
    assert!(second.join().unwrap().is_ok());
    assert_eq!(watch.members(), vec![2]);
    assert!(watch.is_hooked());
    assert_eq!(watch.backend().attempts.load(Ordering::SeqCst), 2);
}
