// Foreground-change notifications via SetWinEventHook.
//
// Out-of-context WinEvent callbacks are delivered on the thread that installed
// the hook, and only while that thread pumps messages. The hook therefore gets
// its own thread; the guard posts WM_QUIT to it and joins. A periodic thread
// timer makes the loop re-check a quit flag, so the join also returns when the
// post is lost.

use std::cell::RefCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread::JoinHandle;

use keytype_engine::error::PlatformError;
use keytype_engine::traits::ForegroundCallback;
use windows::Win32::Foundation::{HWND, LPARAM, WPARAM};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::Accessibility::{HWINEVENTHOOK, SetWinEventHook, UnhookWinEvent};
use windows::Win32::UI::WindowsAndMessaging::{
    DispatchMessageW, EVENT_SYSTEM_FOREGROUND, GetMessageW, KillTimer, MSG, PM_NOREMOVE,
    PeekMessageW, PostThreadMessageW, SetTimer, TranslateMessage, WINEVENT_OUTOFCONTEXT, WM_QUIT,
};

const QUIT_CHECK_MS: u32 = 250;

use super::windows_foreground::describe;

thread_local! {
    static CALLBACK: RefCell<Option<ForegroundCallback>> = const { RefCell::new(None) };
}

unsafe extern "system" fn on_foreground(
    _hook: HWINEVENTHOOK,
    _event: u32,
    hwnd: HWND,
    id_object: i32,
    _id_child: i32,
    _thread: u32,
    _time: u32,
) {
    // OBJID_WINDOW only; other objects are carets, menus and the like.
    if id_object != 0 || hwnd.0.is_null() {
        return;
    }
    // Clone out so the callback runs without the RefCell borrowed.
    let cb = CALLBACK.with(|slot| slot.borrow().clone());
    if let Some(cb) = cb {
        cb(describe(hwnd));
    }
}

/// Uninstalls the hook and stops its thread when dropped.
pub struct WinEventHookGuard {
    thread_id: u32,
    quit: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl WinEventHookGuard {
    fn shutdown(&mut self, post_quit: bool) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        self.quit.store(true, Ordering::Release);
        if post_quit {
            if let Err(e) = unsafe { PostThreadMessageW(self.thread_id, WM_QUIT, WPARAM(0), LPARAM(0)) } {
                log::warn!("WM_QUIT to foreground hook thread failed, waiting for its timer: {e}");
            }
        }
        let _ = thread.join();
    }
}

impl Drop for WinEventHookGuard {
    fn drop(&mut self) {
        self.shutdown(true);
    }
}

pub fn install(on_change: ForegroundCallback) -> Result<WinEventHookGuard, PlatformError> {
    let (ready_tx, ready_rx) = mpsc::channel::<Result<u32, PlatformError>>();
    let quit = Arc::new(AtomicBool::new(false));
    let thread_quit = quit.clone();

    let thread = std::thread::Builder::new()
        .name("keytype-foreground-hook".into())
        .spawn(move || unsafe {
            let mut msg = MSG::default();
            // Forces the message queue to exist before anyone posts WM_QUIT to it.
            let _ = PeekMessageW(&mut msg, None, 0, 0, PM_NOREMOVE);

            CALLBACK.with(|slot| *slot.borrow_mut() = Some(on_change));

            let hook = SetWinEventHook(
                EVENT_SYSTEM_FOREGROUND,
                EVENT_SYSTEM_FOREGROUND,
                None,
                Some(on_foreground),
                0,
                0,
                WINEVENT_OUTOFCONTEXT,
            );
            if hook.0.is_null() {
                let _ = ready_tx.send(Err(PlatformError::HookInstall(
                    std::io::Error::last_os_error().to_string(),
                )));
                return;
            }
            let timer = SetTimer(None, 0, QUIT_CHECK_MS, None);
            let _ = ready_tx.send(Ok(GetCurrentThreadId()));

            while !thread_quit.load(Ordering::Acquire) && GetMessageW(&mut msg, None, 0, 0).0 > 0 {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }

            if timer != 0 {
                let _ = KillTimer(None, timer);
            }
            let _ = UnhookWinEvent(hook);
            CALLBACK.with(|slot| slot.borrow_mut().take());
        })
        .map_err(|e| PlatformError::HookInstall(e.to_string()))?;

    match ready_rx.recv() {
        Ok(Ok(thread_id)) => {
            log::debug!("foreground hook installed on thread {thread_id}");
            Ok(WinEventHookGuard {
                thread_id,
                quit,
                thread: Some(thread),
            })
        }
        Ok(Err(e)) => {
            let _ = thread.join();
            Err(e)
        }
        Err(_) => {
            let _ = thread.join();
            Err(PlatformError::HookInstall("hook thread exited early".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keytype_core::types::WindowDescriptor;
    use std::time::{Duration, Instant};

    #[test]
    fn hook_thread_stops_without_wm_quit() {
        let mut guard = install(Arc::new(|_: WindowDescriptor| {})).unwrap();

        let started = Instant::now();
        guard.shutdown(false);

        assert!(guard.thread.is_none());
        assert!(started.elapsed() < Duration::from_millis(u64::from(QUIT_CHECK_MS) * 8));
    }

    #[test]
    fn dropping_the_guard_joins_the_hook_thread() {
        let guard = install(Arc::new(|_: WindowDescriptor| {})).unwrap();
        let started = Instant::now();
        drop(guard);
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
