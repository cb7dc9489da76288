use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use keytype_core::filter::WindowFilter;
use keytype_core::keys::{KeyPlan, Modifier, ModifierMask};
use keytype_core::speed::SpeedConfig;
use keytype_core::types::{WindowDescriptor, WindowHandle};
use keytype_engine::controller::ControllerError;
use keytype_engine::engine::KeytypeEngine;
use keytype_engine::error::PlatformError;
use keytype_engine::session::{CancelReason, SessionStage, TypingStatus};
use keytype_engine::synth::AltGrStyle;
use keytype_engine::tracker::TrackingMode;
use keytype_platform::test::{KeyEvent, RecordingPlatform};
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};

fn console() -> WindowDescriptor {
    WindowDescriptor::new(WindowHandle::Hwnd(0x2A), "iDRAC Virtual Console", "javaw.exe")
}

fn browser() -> WindowDescriptor {
    WindowDescriptor::new(WindowHandle::Hwnd(0x77), "Inbox - Mail", "mail.exe")
}

fn engine(
    platform: RecordingPlatform,
) -> (
    KeytypeEngine<RecordingPlatform>,
    Arc<RecordingPlatform>,
    UnboundedReceiver<TypingStatus>,
) {
    let platform = Arc::new(platform.with_windows(vec![console(), browser()]));
    let (tx, rx) = unbounded_channel();
    let engine = KeytypeEngine::new(platform.clone(), WindowFilter::new("keytype.exe"), tx)
        .with_poll_interval(Duration::from_millis(20));
    (engine, platform, rx)
}

fn drain(rx: &mut UnboundedReceiver<TypingStatus>) -> Vec<TypingStatus> {
    let mut out = Vec::new();
    while let Ok(s) = rx.try_recv() {
        out.push(s);
    }
    out
}

// Statuses of a finished session, without the trailing `Ready` the controller
// emits once the slot is free again.
fn session_statuses(rx: &mut UnboundedReceiver<TypingStatus>) -> Vec<TypingStatus> {
    let mut out = drain(rx);
    assert_eq!(out.pop(), Some(TypingStatus::Ready), "controller did not report ready");
    out
}

#[tokio::test]
async fn printable_ascii_round_trips_through_the_us_table() {
    let (engine, platform, mut rx) = engine(RecordingPlatform::new());
    let text: String = (' '..='~').chain(['\n', 'x']).collect();

    let handle = engine
        .start_typing_session(&text, Some(console()), "English (US)", SpeedConfig::Auto, true)
        .unwrap();
    let result = handle.wait().await;

    assert_eq!(result.stage, SessionStage::Completed);
    assert_eq!(result.chars_sent, text.chars().count());
    assert_eq!(platform.typed_text(), text);
    assert_eq!(platform.activations(), vec![console().handle]);
    assert_eq!(platform.resolved_layouts(), vec!["English (US)".to_string()]);

    let (down, up) = platform.modifier_balance();
    assert_eq!(down, up);
    assert!(down > 0);

    assert_eq!(
        drain(&mut rx),
        vec![
            TypingStatus::Ready,
            TypingStatus::Typing,
            TypingStatus::TypedTo("iDRAC Virtual Console".into()),
            TypingStatus::Ready,
        ]
    );
}

#[tokio::test]
async fn crlf_becomes_one_enter_keystroke() {
    let (engine, platform, _rx) = engine(RecordingPlatform::new());
    let handle = engine
        .start_typing_session("a\r\nb", Some(console()), "auto", SpeedConfig::Auto, true)
        .unwrap();
    handle.wait().await;

    assert_eq!(platform.typed_text(), "a\nb");
    let enters = platform
        .events()
        .iter()
        .filter(|e| matches!(e, KeyEvent::Tap { key: 0x1C, .. }))
        .count();
    assert_eq!(enters, 1);
}

#[tokio::test]
async fn failed_tap_mid_character_leaves_no_modifier_held() {
    // Taps: H(0) e(1) L(2) <- fails while Shift is down.
    let (engine, platform, mut rx) = engine(RecordingPlatform::new().fail_tap_at(2));
    let handle = engine
        .start_typing_session("HeLLo", Some(console()), "auto", SpeedConfig::Auto, true)
        .unwrap();
    let result = handle.wait().await;

    assert_eq!(result.stage, SessionStage::Failed);
    assert_eq!(result.chars_sent, 2);
    assert!(result.error.as_deref().unwrap_or("").contains("SendInput"));

    assert_eq!(platform.typed_text(), "He");
    let (down, up) = platform.modifier_balance();
    assert_eq!(down, 2);
    assert_eq!(down, up);
    assert_eq!(
        platform.events().last(),
        Some(&KeyEvent::Modifier {
            modifier: Modifier::Shift,
            down: false
        })
    );

    let statuses = session_statuses(&mut rx);
    assert!(matches!(statuses.last(), Some(TypingStatus::Error(msg)) if msg.contains("Access is denied")));
    assert!(!engine.is_typing());
}

#[tokio::test]
async fn altgr_is_a_single_right_alt_pair() {
    let at_sign = KeyPlan::new(0x10, ModifierMask::from_shift_state(0x06));
    let (engine, platform, _rx) = engine(RecordingPlatform::new().with_key('@', at_sign));

    let handle = engine
        .start_typing_session("@", Some(console()), "German (DE)", SpeedConfig::Auto, true)
        .unwrap();
    assert_eq!(handle.wait().await.stage, SessionStage::Completed);

    assert_eq!(
        platform.events(),
        vec![
            KeyEvent::Modifier {
                modifier: Modifier::AltGr,
                down: true
            },
            KeyEvent::Tap {
                key: 0x10,
                extended: false
            },
            KeyEvent::Modifier {
                modifier: Modifier::AltGr,
                down: false
            },
        ]
    );
    assert_eq!(platform.typed_text(), "@");
}

#[tokio::test]
async fn ctrl_alt_style_presses_both_modifiers() {
    let at_sign = KeyPlan::new(0x10, ModifierMask::from_shift_state(0x06));
    let (engine, platform, _rx) = engine(RecordingPlatform::new().with_key('@', at_sign));
    let engine = engine.with_altgr_style(AltGrStyle::CtrlAlt);

    let handle = engine
        .start_typing_session("@", Some(console()), "German (DE)", SpeedConfig::Auto, true)
        .unwrap();
    handle.wait().await;

    let downs: Vec<Modifier> = platform
        .events()
        .into_iter()
        .filter_map(|e| match e {
            KeyEvent::Modifier { modifier, down: true } => Some(modifier),
            _ => None,
        })
        .collect();
    assert_eq!(downs, vec![Modifier::Control, Modifier::Alt]);
    assert_eq!(platform.typed_text(), "@");
}

#[tokio::test]
async fn unmappable_characters_fall_back_to_unicode() {
    let (engine, platform, _rx) = engine(RecordingPlatform::new());
    let handle = engine
        .start_typing_session("é😀a", Some(console()), "auto", SpeedConfig::Auto, true)
        .unwrap();
    let result = handle.wait().await;

    assert_eq!(result.chars_sent, 3);
    assert_eq!(platform.typed_text(), "é😀a");
    let units: Vec<u16> = platform
        .events()
        .into_iter()
        .filter_map(|e| match e {
            KeyEvent::Unicode(u) => Some(u),
            _ => None,
        })
        .collect();
    assert_eq!(units, vec![0x00E9, 0xD83D, 0xDE00]);
}

#[tokio::test]
async fn focus_change_cancels_before_the_next_character() {
    let (mut engine, platform, mut rx) = engine(RecordingPlatform::new());
    assert_eq!(
        engine.start_foreground_tracking(|_| {}).unwrap(),
        TrackingMode::EventHook
    );
    platform.switch_focus_after(3, browser());

    let handle = engine
        .start_typing_session("abcdefgh", Some(console()), "auto", SpeedConfig::Auto, true)
        .unwrap();
    let result = handle.wait().await;

    assert_eq!(result.stage, SessionStage::Cancelled);
    assert_eq!(result.cancel_reason, Some(CancelReason::FocusChanged));
    assert_eq!(result.chars_sent, 3);
    assert_eq!(platform.typed_text(), "abc");
    assert_eq!(
        session_statuses(&mut rx).last(),
        Some(&TypingStatus::Stopped { by_user: false })
    );
}

#[tokio::test]
async fn focus_change_during_activation_settle_sends_nothing() {
    let (mut engine, platform, mut rx) = engine(RecordingPlatform::new());
    engine.start_foreground_tracking(|_| {}).unwrap();

    let handle = engine
        .start_typing_session("secret", Some(console()), "auto", SpeedConfig::Auto, true)
        .unwrap();
    // Activation has happened; the 150 ms settle is still running.
    tokio::time::sleep(Duration::from_millis(60)).await;
    platform.emit_foreground(browser());
    let result = handle.wait().await;

    assert_eq!(result.stage, SessionStage::Cancelled);
    assert_eq!(result.cancel_reason, Some(CancelReason::FocusChanged));
    assert_eq!(result.chars_sent, 0);
    assert!(platform.events().is_empty());
    assert_eq!(platform.activations(), vec![console().handle]);
    assert_eq!(
        session_statuses(&mut rx).last(),
        Some(&TypingStatus::Stopped { by_user: false })
    );
}

#[tokio::test]
async fn controller_reports_ready_after_each_session() {
    let (engine, _platform, mut rx) = engine(RecordingPlatform::new());
    assert_eq!(drain(&mut rx), vec![TypingStatus::Ready]);

    for text in ["one", "two"] {
        let handle = engine
            .start_typing_session(text, Some(console()), "auto", SpeedConfig::Auto, true)
            .unwrap();
        handle.wait().await;
        assert_eq!(
            drain(&mut rx),
            vec![
                TypingStatus::Typing,
                TypingStatus::TypedTo("iDRAC Virtual Console".into()),
                TypingStatus::Ready,
            ]
        );
    }
}

#[tokio::test]
async fn focus_change_is_ignored_when_abort_is_off() {
    let (mut engine, platform, _rx) = engine(RecordingPlatform::new());
    engine.start_foreground_tracking(|_| {}).unwrap();
    platform.switch_focus_after(3, browser());

    let handle = engine
        .start_typing_session("abcdefgh", Some(console()), "auto", SpeedConfig::Auto, false)
        .unwrap();
    let result = handle.wait().await;

    assert_eq!(result.stage, SessionStage::Completed);
    assert_eq!(platform.typed_text(), "abcdefgh");
}

#[tokio::test]
async fn explicit_stop_sends_only_a_prefix() {
    let (engine, platform, mut rx) = engine(RecordingPlatform::new());
    let text = "the quick brown fox jumps over the lazy dog";

    let handle = engine
        .start_typing_session(text, Some(console()), "auto", SpeedConfig::FixedMs(30), true)
        .unwrap();
    // Settle is 150 ms; let a few characters out first.
    tokio::time::sleep(Duration::from_millis(260)).await;
    engine.request_stop(&handle);
    let result = handle.wait().await;

    assert_eq!(result.stage, SessionStage::Cancelled);
    assert_eq!(result.cancel_reason, Some(CancelReason::StopRequested));

    let typed = platform.typed_text();
    assert!(text.starts_with(&typed), "{typed:?} is not a prefix");
    assert!(typed.len() < text.len());
    assert_eq!(typed.chars().count(), result.chars_sent);

    let statuses = session_statuses(&mut rx);
    assert!(statuses.contains(&TypingStatus::Stopping));
    assert_eq!(statuses.last(), Some(&TypingStatus::Stopped { by_user: true }));
}

#[tokio::test]
async fn second_session_is_refused_while_one_runs() {
    let (engine, _platform, _rx) = engine(RecordingPlatform::new());
    let first = engine
        .start_typing_session("slow text", Some(console()), "auto", SpeedConfig::FixedMs(50), true)
        .unwrap();

    let second =
        engine.start_typing_session("other", Some(browser()), "auto", SpeedConfig::Auto, true);
    assert!(matches!(second, Err(ControllerError::Busy)));
    assert!(engine.is_typing());

    assert!(engine.stop_active_session());
    first.wait().await;
    assert!(!engine.is_typing());

    let third = engine
        .start_typing_session("ok", Some(browser()), "auto", SpeedConfig::Auto, true)
        .unwrap();
    assert_eq!(third.wait().await.stage, SessionStage::Completed);
}

#[tokio::test]
async fn missing_target_uses_the_last_active_window() {
    let (mut engine, platform, _rx) = engine(RecordingPlatform::new());

    let refused = engine.start_typing_session("x", None, "auto", SpeedConfig::Auto, true);
    assert!(matches!(refused, Err(ControllerError::NoTarget)));
    let empty = engine.start_typing_session("", Some(console()), "auto", SpeedConfig::Auto, true);
    assert!(matches!(empty, Err(ControllerError::EmptyText)));

    engine.start_foreground_tracking(|_| {}).unwrap();
    platform.emit_foreground(browser());
    assert_eq!(
        engine.last_active_window().map(|w| w.title),
        Some("Inbox - Mail".into())
    );

    let handle = engine
        .start_typing_session("x", None, "auto", SpeedConfig::Auto, true)
        .unwrap();
    assert_eq!(handle.wait().await.stage, SessionStage::Completed);
    assert_eq!(platform.activations(), vec![browser().handle]);
}

#[tokio::test]
async fn vanished_window_fails_without_sending_keys() {
    let (engine, platform, mut rx) =
        engine(RecordingPlatform::new().with_unavailable(console().handle));
    let handle = engine
        .start_typing_session("abc", Some(console()), "auto", SpeedConfig::Auto, true)
        .unwrap();
    let result = handle.wait().await;

    assert_eq!(result.stage, SessionStage::Failed);
    assert!(platform.events().is_empty());
    assert_eq!(
        session_statuses(&mut rx).last(),
        Some(&TypingStatus::Error(
            PlatformError::WindowUnavailable.to_string()
        ))
    );
}

#[test]
fn hook_failure_falls_back_to_polling() {
    const POLL: Duration = Duration::from_millis(100);
    let (engine, platform, _rx) = engine(
        RecordingPlatform::new().fail_hook_install(PlatformError::HookInstall("access denied".into())),
    );
    let mut engine = engine.with_poll_interval(POLL);
    let (seen_tx, seen_rx) = mpsc::channel();
    let mode = engine
        .start_foreground_tracking(move |w| {
            let _ = seen_tx.send(w.title.clone());
        })
        .unwrap();

    match mode {
        TrackingMode::Polling { fallback_reason } => {
            assert!(fallback_reason.unwrap_or_default().contains("access denied"));
        }
        other => panic!("expected polling, got {other:?}"),
    }
    assert!(!platform.hook_installed());

    // One interval plus the same again for thread scheduling.
    let deadline = POLL * 2;

    platform.emit_foreground(console());
    let title = seen_rx
        .recv_timeout(deadline)
        .expect("no change reported within the polling interval");
    assert_eq!(title, "iDRAC Virtual Console");

    // Edge-triggered: the same window is not reported again.
    assert!(seen_rx.recv_timeout(POLL * 3).is_err());

    platform.emit_foreground(browser());
    assert_eq!(seen_rx.recv_timeout(deadline).unwrap(), "Inbox - Mail");

    engine.stop_foreground_tracking();
    assert_eq!(engine.tracking_mode(), &TrackingMode::Stopped);
}

#[test]
fn tracker_skips_own_and_untitled_windows() {
    let (mut engine, platform, _rx) = engine(RecordingPlatform::new());
    let (seen_tx, seen_rx) = mpsc::channel();
    engine
        .start_foreground_tracking(move |w| {
            let _ = seen_tx.send(w.title.clone());
        })
        .unwrap();

    platform.emit_foreground(WindowDescriptor::new(WindowHandle::Hwnd(5), "KeyType", "keytype.exe"));
    platform.emit_foreground(WindowDescriptor::new(WindowHandle::Hwnd(6), "", "explorer.exe"));
    platform.emit_foreground(console());

    assert_eq!(seen_rx.try_recv().unwrap(), "iDRAC Virtual Console");
    assert!(seen_rx.try_recv().is_err());
    assert_eq!(engine.last_active_window().map(|w| w.handle), Some(console().handle));
}

#[test]
fn enumeration_hides_self_and_sorts() {
    let platform = RecordingPlatform::new().with_windows(vec![
        WindowDescriptor::new(WindowHandle::Hwnd(3), "zsh", "wezterm.exe"),
        WindowDescriptor::new(WindowHandle::Hwnd(4), "KeyType", "keytype.exe"),
        WindowDescriptor::new(WindowHandle::Hwnd(5), "Alpha", "a.exe"),
    ]);
    let (tx, _rx) = unbounded_channel();
    let engine = KeytypeEngine::new(Arc::new(platform), WindowFilter::new("keytype.exe"), tx);

    let titles: Vec<String> = engine
        .enumerate_windows()
        .into_iter()
        .map(|w| w.title)
        .collect();
    assert_eq!(titles, vec!["Alpha", "zsh"]);
}
