mod common;

use common::{MemoryContacts, MockDriver, account, rule};
use replyflow_application::{Collaborators, Session, SessionState, ShutdownToken, Supervisor};
use replyflow_core::rule::{Rule, RuleConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn session_with(driver: &Arc<MockDriver>, targets: &[&str], rules: Vec<Rule>) -> Session {
    Session::new(
        account("acct", targets, rules),
        Collaborators::from_driver(Arc::clone(driver)),
        &ShutdownToken::new(),
    )
}

#[tokio::test(start_paused = true)]
async fn replies_to_matching_message_with_contact_remark() {
    let driver = Arc::new(MockDriver::new());
    driver.deliver("bob", "Hello, anyone there?");
    let contacts = Arc::new(MemoryContacts::with("bob", "Bob", Some("Bobby")));

    let mut session = Session::new(
        account("acct", &["bob"], vec![rule(&["hello"], "Hi {sender_name} from {account}")]),
        Collaborators::from_driver(Arc::clone(&driver)).with_contacts(contacts),
        &ShutdownToken::new(),
    );
    let handle = session.handle();
    let runner = tokio::spawn(async move { session.run().await });

    handle.wait_until(|s| s.replies_sent == 1).await;
    handle.stop();
    let status = runner.await.unwrap();

    assert_eq!(status.state, SessionState::Stopped);
    assert_eq!(status.replies_sent, 1);

    let read = driver.position("mark_read:bob").unwrap();
    let sent = driver.position("send:bob:Hi Bobby from acct").unwrap();
    assert!(read < sent, "mark_read must precede send: {:?}", driver.calls());
}

#[tokio::test(start_paused = true)]
async fn sender_name_falls_back_to_target_id() {
    let driver = Arc::new(MockDriver::new());
    driver.deliver("carol", "hello");

    let mut session = session_with(&driver, &["carol"], vec![rule(&["hello"], "Hi {sender_name}")]);
    let handle = session.handle();
    let runner = tokio::spawn(async move { session.run().await });

    handle.wait_until(|s| s.replies_sent == 1).await;
    handle.stop();
    runner.await.unwrap();

    assert!(driver.position("send:carol:Hi carol").is_some());
}

#[tokio::test(start_paused = true)]
async fn unmatched_text_is_marked_read_without_reply() {
    let driver = Arc::new(MockDriver::new());
    driver.deliver("bob", "just chatting");

    let mut session = session_with(&driver, &["bob"], vec![rule(&["price"], "See the list")]);
    let handle = session.handle();
    let runner = tokio::spawn(async move { session.run().await });

    while driver.count("mark_read:bob") == 0 {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    handle.stop();
    let status = runner.await.unwrap();

    assert_eq!(status.replies_sent, 0);
    assert_eq!(driver.count("send:"), 0);
}

#[tokio::test(start_paused = true)]
async fn targets_are_processed_in_configured_order() {
    let driver = Arc::new(MockDriver::new());
    driver.deliver("zed", "hello");
    driver.deliver("amy", "hello");

    let mut session = session_with(&driver, &["zed", "amy"], vec![rule(&["hello"], "hi")]);
    let handle = session.handle();
    let runner = tokio::spawn(async move { session.run().await });

    handle.wait_until(|s| s.replies_sent == 2).await;
    handle.stop();
    runner.await.unwrap();

    let first = driver.position("send:zed:hi").unwrap();
    let second = driver.position("send:amy:hi").unwrap();
    assert!(first < second);
    assert!(driver.position("has_new_text:zed") < driver.position("has_new_text:amy"));
}

#[tokio::test(start_paused = true)]
async fn degrades_after_threshold_and_recovers() {
    let driver = Arc::new(MockDriver::new());
    driver.set_monitor_failing(true);

    let mut session = session_with(&driver, &["bob"], vec![rule(&["hello"], "hi")]);
    let handle = session.handle();
    let runner = tokio::spawn(async move { session.run().await });

    let degraded = handle.wait_for_state(SessionState::Degraded).await;
    assert_eq!(degraded.consecutive_errors, 3);
    // Three ticks, each exhausting three attempts.
    assert_eq!(driver.count("has_new_text:bob"), 9);

    driver.set_monitor_failing(false);
    let recovered = handle.wait_for_state(SessionState::Running).await;
    assert_eq!(recovered.consecutive_errors, 0);
    assert_eq!(driver.count("initialize"), 2);
    assert_eq!(driver.count("release"), 1);

    driver.deliver("bob", "hello again");
    handle.wait_until(|s| s.replies_sent == 1).await;
    handle.stop();
    runner.await.unwrap();
    assert_eq!(driver.count("release"), 2);
}

#[tokio::test(start_paused = true)]
async fn clean_tick_resets_errors_below_threshold() {
    let driver = Arc::new(MockDriver::new());
    driver.set_monitor_failing(true);

    let mut session = session_with(&driver, &["bob"], vec![rule(&["hello"], "hi")]);
    let handle = session.handle();
    let runner = tokio::spawn(async move { session.run().await });

    let failing = handle.wait_until(|s| s.consecutive_errors == 2).await;
    assert_eq!(failing.state, SessionState::Running);

    driver.set_monitor_failing(false);
    let cleared = handle.wait_until(|s| s.consecutive_errors == 0).await;
    assert_eq!(cleared.state, SessionState::Running);

    driver.deliver("bob", "hello");
    let replied = handle.wait_until(|s| s.replies_sent == 1).await;
    assert_eq!(replied.consecutive_errors, 0);
    handle.stop();
    runner.await.unwrap();

    assert_eq!(driver.count("initialize"), 1);
    assert_eq!(driver.count("release"), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_recovery_stays_degraded() {
    let driver = Arc::new(MockDriver::new());
    driver.set_monitor_failing(true);
    driver.script_init(&[true]);
    driver.set_init_failing(true);

    let mut session = session_with(&driver, &["bob"], vec![rule(&["hello"], "hi")]);
    let handle = session.handle();
    let runner = tokio::spawn(async move { session.run().await });

    handle.wait_for_state(SessionState::Degraded).await;
    while driver.count("initialize") < 3 {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    let status = handle.status();
    assert_eq!(status.state, SessionState::Degraded);
    assert!(status.last_error.unwrap().contains("recovery failed"));

    handle.stop();
    let final_status = runner.await.unwrap();
    assert_eq!(final_status.state, SessionState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn stop_interrupts_reply_delay() {
    let driver = Arc::new(MockDriver::new());
    driver.deliver("bob", "hello");
    let slow = Rule::new(RuleConfig::new(&["hello"], "late").with_delay(3600.0, 0.0)).unwrap();

    let mut session = session_with(&driver, &["bob"], vec![slow]);
    let handle = session.handle();
    let started = Instant::now();
    let runner = tokio::spawn(async move { session.run().await });

    while driver.count("latest_text:bob") == 0 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    handle.stop();
    let status = runner.await.unwrap();

    assert_eq!(status.state, SessionState::Stopped);
    assert!(started.elapsed() < Duration::from_secs(60));
    assert_eq!(driver.count("send:"), 0);
    assert_eq!(driver.count("mark_read:"), 0);
}

#[tokio::test(start_paused = true)]
async fn huge_reply_delay_waits_until_stopped() {
    let driver = Arc::new(MockDriver::new());
    driver.deliver("bob", "hello");
    let slow = Rule::new(RuleConfig::new(&["hello"], "late").with_delay(1e18, 0.0)).unwrap();

    let mut session = session_with(&driver, &["bob"], vec![slow]);
    let handle = session.handle();
    let runner = tokio::spawn(async move { session.run().await });

    while driver.count("latest_text:bob") == 0 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    tokio::time::sleep(Duration::from_secs(5)).await;
    handle.stop();
    let status = runner.await.unwrap();

    assert_eq!(status.state, SessionState::Stopped);
    assert_eq!(driver.count("send:"), 0);
    assert_eq!(driver.count("release"), 1);
}

#[tokio::test(start_paused = true)]
async fn cleanup_releases_exactly_once() {
    let driver = Arc::new(MockDriver::new());
    let mut session = session_with(&driver, &["bob"], vec![rule(&["hello"], "hi")]);
    let handle = session.handle();

    let (status, _) = tokio::join!(session.run(), async {
        handle.wait_for_state(SessionState::Running).await;
        handle.stop();
    });
    assert_eq!(status.state, SessionState::Stopped);

    session.cleanup().await;
    session.cleanup().await;
    assert_eq!(driver.count("release"), 1);
}

#[tokio::test(start_paused = true)]
async fn stop_before_start_never_initializes() {
    let driver = Arc::new(MockDriver::new());
    let mut session = session_with(&driver, &["bob"], vec![rule(&["hello"], "hi")]);
    session.handle().stop();

    let status = session.run().await;

    assert_eq!(status.state, SessionState::Stopped);
    assert_eq!(driver.count("initialize"), 0);
    assert_eq!(driver.count("release"), 0);
}

#[tokio::test(start_paused = true)]
async fn rejected_send_is_retried() {
    let driver = Arc::new(MockDriver::new());
    driver.deliver("bob", "hello");
    driver.reject_sends(2);

    let mut session = session_with(&driver, &["bob"], vec![rule(&["hello"], "hi")]);
    let handle = session.handle();
    let runner = tokio::spawn(async move { session.run().await });

    let status = handle.wait_until(|s| s.replies_sent == 1).await;
    handle.stop();
    runner.await.unwrap();

    assert_eq!(status.consecutive_errors, 0);
    assert_eq!(driver.count("send:bob:hi"), 3);
}

#[tokio::test(start_paused = true)]
async fn hot_swapped_rules_apply_to_next_message() {
    let driver = Arc::new(MockDriver::new());
    let mut session = session_with(&driver, &["bob"], vec![rule(&["hello"], "old")]);
    let handle = session.handle();
    let runner = tokio::spawn(async move { session.run().await });

    handle.wait_for_state(SessionState::Running).await;
    handle.update_rules(vec![rule(&["hello"], "new")]);
    driver.deliver("bob", "hello");

    handle.wait_until(|s| s.replies_sent == 1).await;
    handle.stop();
    runner.await.unwrap();

    assert!(driver.position("send:bob:new").is_some());
    assert!(driver.position("send:bob:old").is_none());
}

#[tokio::test(start_paused = true)]
async fn init_failure_does_not_affect_other_sessions() {
    let shutdown = ShutdownToken::new();
    let mut supervisor = Supervisor::new(shutdown.clone());

    let broken = Arc::new(MockDriver::new());
    broken.set_init_failing(true);
    let healthy = Arc::new(MockDriver::new());
    healthy.deliver("bob", "hello");

    let broken_handle = supervisor.spawn_account(
        account("broken", &["bob"], vec![rule(&["hello"], "hi")]),
        Collaborators::from_driver(Arc::clone(&broken)),
    );
    let healthy_handle = supervisor.spawn_account(
        account("healthy", &["bob"], vec![rule(&["hello"], "hi")]),
        Collaborators::from_driver(Arc::clone(&healthy)),
    );

    let failed = broken_handle.wait_for_state(SessionState::Stopped).await;
    assert!(failed.last_error.unwrap().contains("failed to initialize account 'broken'"));
    assert_eq!(broken.count("release"), 1);

    healthy_handle.wait_until(|s| s.replies_sent == 1).await;
    assert_eq!(healthy_handle.status().state, SessionState::Running);

    shutdown.request();
    let statuses = supervisor.wait().await;
    assert!(statuses.iter().all(|s| s.state == SessionState::Stopped));
    assert_eq!(healthy.count("release"), 1);
}

#[tokio::test(start_paused = true)]
async fn stopping_one_session_leaves_others_running() {
    let mut supervisor = Supervisor::new(ShutdownToken::new());
    let first = Arc::new(MockDriver::new());
    let second = Arc::new(MockDriver::new());

    let first_handle = supervisor.spawn_account(
        account("first", &["a"], vec![rule(&["x"], "y")]),
        Collaborators::from_driver(Arc::clone(&first)),
    );
    let second_handle = supervisor.spawn_account(
        account("second", &["b"], vec![rule(&["x"], "y")]),
        Collaborators::from_driver(Arc::clone(&second)),
    );
    second_handle.wait_for_state(SessionState::Running).await;

    first_handle.stop();
    first_handle.wait_for_state(SessionState::Stopped).await;
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(second_handle.status().state, SessionState::Running);

    supervisor.stop_all();
    supervisor.wait().await;
    assert_eq!(second_handle.status().state, SessionState::Stopped);
}
