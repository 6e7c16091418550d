use std::sync::atomic::{AtomicBool, Ordering};

static QUIT_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Polled by the cartridge loop once per iteration.
pub fn should_quit() -> bool {
    QUIT_REQUESTED.load(Ordering::Relaxed)
}

pub fn request_quit() {
    QUIT_REQUESTED.store(true, Ordering::Relaxed);
}

/// Routes SIGINT/SIGTERM to `request_quit` so teardown (SRAM save,
/// transport close) runs after the loop returns.
#[cfg(unix)]
pub fn install() {
    use std::os::raw::c_int;
    const SIGINT: c_int = 2;
    const SIGTERM: c_int = 15;

    extern "C" fn handler(_sig: c_int) {
        request_quit();
    }

    extern "C" {
        fn signal(sig: c_int, handler: extern "C" fn(c_int)) -> usize;
    }

    unsafe {
        let _ = signal(SIGINT, handler);
        let _ = signal(SIGTERM, handler);
    }
}

#[cfg(not(unix))]
pub fn install() {
    log::warn!("No signal hook on this platform; stop the bridge by closing the process");
}
