// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::mutation::{RetryPolicy, WriteExecutor};
use std::sync::atomic::{AtomicUsize, Ordering};

const WINDOW: Duration = Duration::from_millis(1000);

fn recording<T: Clone + Send + Sync + 'static>(
    name: &str,
) -> (RetryableMutation<T>, Arc<Mutex<Vec<T>>>) {
    let written = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&written);
    let executor: WriteExecutor<T> = RetryableMutation::executor(move |value: T| {
        let sink = Arc::clone(&sink);
        async move {
            sink.lock().unwrap().push(value);
            Ok(())
        }
    });
    let mutation = RetryableMutation::builder(name, executor).policy(RetryPolicy::disabled()).build();
    (mutation, written)
}

async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn edits_within_window_write_once_with_latest() {
    let title = Observable::new(String::new());
    let (mutation, written) = recording::<String>("title");
    let binding =
        ThrottledReactiveBinding::scalar("title", title.clone(), mutation, BindingOptions::new(WINDOW));
    binding.enable();

    for text in ["a", "ab", "abc", "abcd", "abcde"] {
        title.set(text.to_string());
        advance(100).await;
    }
    advance(2000).await;

    assert_eq!(*written.lock().unwrap(), vec!["abcde".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn edits_in_separate_windows_write_separately() {
    let count = Observable::new(0u32);
    let (mutation, written) = recording::<u32>("count");
    let binding =
        ThrottledReactiveBinding::scalar("count", count.clone(), mutation, BindingOptions::new(WINDOW));
    binding.enable();

    count.set(1);
    advance(1500).await;
    count.set(2);
    advance(1500).await;

    assert_eq!(*written.lock().unwrap(), vec![1, 2]);
}

#[tokio::test(start_paused = true)]
async fn writes_are_spaced_by_window() {
    let count = Observable::new(0u32);
    let stamps = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&stamps);
    let start = tokio::time::Instant::now();
    let executor: WriteExecutor<u32> = RetryableMutation::executor(move |_value: u32| {
        let sink = Arc::clone(&sink);
        async move {
            sink.lock().unwrap().push(start.elapsed());
            Ok(())
        }
    });
    let mutation = RetryableMutation::builder("count", executor).build();
    let binding =
        ThrottledReactiveBinding::scalar("count", count.clone(), mutation, BindingOptions::new(WINDOW));
    binding.enable();

    for i in 1..=30 {
        count.set(i);
        advance(100).await;
    }
    advance(2000).await;

    let stamps = stamps.lock().unwrap();
    assert!(stamps.len() >= 2);
    for pair in stamps.windows(2) {
        assert!(pair[1] - pair[0] >= WINDOW);
    }
}

#[tokio::test(start_paused = true)]
async fn no_write_without_change() {
    let title = Observable::new("same".to_string());
    let (mutation, written) = recording::<String>("title");
    let binding =
        ThrottledReactiveBinding::scalar("title", title.clone(), mutation, BindingOptions::new(WINDOW));
    binding.enable();

    title.set("same".to_string());
    advance(3000).await;

    assert!(written.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn should_mutate_filters_writes() {
    let title = Observable::new(String::new());
    let (mutation, written) = recording::<String>("title");
    let options = BindingOptions::new(WINDOW).should_mutate(|t: &String| !t.is_empty());
    let binding = ThrottledReactiveBinding::scalar("title", title.clone(), mutation, options);
    binding.enable();

    title.set("draft".into());
    advance(1500).await;
    title.set(String::new());
    advance(1500).await;

    assert_eq!(*written.lock().unwrap(), vec!["draft".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn additional_mutation_receives_same_value() {
    let title = Observable::new(String::new());
    let (mutation, written) = recording::<String>("title");
    let (mirror, mirrored) = recording::<String>("index");
    let options = BindingOptions::new(WINDOW).additional_mutation(mirror);
    let binding = ThrottledReactiveBinding::scalar("title", title.clone(), mutation, options);
    binding.enable();

    title.set("Unit 1".into());
    advance(1500).await;

    assert_eq!(*written.lock().unwrap(), vec!["Unit 1".to_string()]);
    assert_eq!(*mirrored.lock().unwrap(), vec!["Unit 1".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn disable_stops_pending_and_future_writes() {
    let title = Observable::new(String::new());
    let (mutation, written) = recording::<String>("title");
    let binding =
        ThrottledReactiveBinding::scalar("title", title.clone(), mutation, BindingOptions::new(WINDOW));
    binding.enable();
    assert!(binding.is_enabled());

    title.set("lost".into());
    advance(200).await;
    binding.set_enabled(false);
    binding.set_enabled(false);
    title.set("also lost".into());
    advance(3000).await;

    assert!(!binding.is_enabled());
    assert!(written.lock().unwrap().is_empty());
    assert_eq!(title.observer_count(), 0);

    binding.set_enabled(true);
    title.set("kept".into());
    advance(1500).await;
    assert_eq!(*written.lock().unwrap(), vec!["kept".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn enable_is_idempotent() {
    let title = Observable::new(String::new());
    let (mutation, written) = recording::<String>("title");
    let binding =
        ThrottledReactiveBinding::scalar("title", title.clone(), mutation, BindingOptions::new(WINDOW));
    binding.enable();
    binding.enable();

    title.set("once".into());
    advance(1500).await;

    assert_eq!(title.observer_count(), 1);
    assert_eq!(written.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn subtree_transform_runs_once_per_write() {
    let content = Observable::new(serde_json::json!({}));
    let transforms = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&transforms);
    let (mutation, written) = recording::<(usize, String)>("content");
    let binding = ThrottledReactiveBinding::subtree(
        "content",
        content.clone(),
        move |value: &serde_json::Value| {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            (n, value.to_string())
        },
        mutation,
        BindingOptions::new(WINDOW),
    );
    binding.enable();

    for i in 0..4 {
        content.set(serde_json::json!({"tiles": i}));
        advance(50).await;
    }
    advance(1500).await;

    assert_eq!(transforms.load(Ordering::SeqCst), 1);
    assert_eq!(*written.lock().unwrap(), vec![(1, r#"{"tiles":3}"#.to_string())]);
}
