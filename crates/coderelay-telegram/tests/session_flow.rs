//! End-to-end flows through the session store, command builder, marker
//! parser, and chunker, with canned backend output standing in for the
//! process runner.

use std::sync::Arc;

use teloxide::types::ChatId;

use coderelay_backends::CliBackend;
use coderelay_core::{chunk_text, Workspace};
use coderelay_telegram::{RelayError, WorkspaceState};

fn workspace() -> Workspace {
    Workspace {
        name: "test".to_string(),
        working_dir: std::env::temp_dir(),
        bot_token: "123:abc".to_string(),
        default_backend: CliBackend::Claude,
        allowed_backends: CliBackend::ALL.to_vec(),
        command_timeout: None,
    }
}

#[tokio::test]
async fn test_new_chat_defaults_then_threads_session_id() {
    let state = WorkspaceState::new(workspace());
    let chat = ChatId(1);

    // /new on a fresh chat: default backend, no continuity.
    state.new_session(chat).await;
    let (backend, session_id) = state.get(chat).await;
    assert_eq!(backend, CliBackend::Claude);
    assert_eq!(session_id, None);

    // First turn omits the continuation argument.
    let invocation = state.build_command(chat, "hello", None).await.unwrap();
    assert_eq!(invocation.program, "claude");
    assert!(!invocation.args.contains(&"--resume".to_string()));

    // The backend run emits a session marker; the store picks it up.
    state
        .update_session_from_output(chat, invocation.backend, "done!\nSESSION:abc123\n")
        .await;
    let (_, session_id) = state.get(chat).await;
    assert_eq!(session_id, Some("abc123".to_string()));

    // The next turn resumes it.
    let invocation = state.build_command(chat, "continue", None).await.unwrap();
    assert!(invocation
        .args
        .windows(2)
        .any(|pair| pair == ["--resume".to_string(), "abc123".to_string()]));
}

#[tokio::test]
async fn test_backend_switch_clears_continuity() {
    let state = WorkspaceState::new(workspace());
    let chat = ChatId(2);

    state.get(chat).await;
    state
        .update_session_from_output(chat, CliBackend::Claude, "SESSION:abc123\n")
        .await;

    let switched = state.set_cli(chat, "opencode").await.unwrap();
    assert_eq!(switched, CliBackend::Opencode);

    let (backend, session_id) = state.get(chat).await;
    assert_eq!(backend, CliBackend::Opencode);
    assert_eq!(session_id, None);

    // The next built invocation has no continuation argument.
    let invocation = state.build_command(chat, "hello again", None).await.unwrap();
    assert_eq!(invocation.program, "opencode");
    assert!(!invocation.args.contains(&"--session".to_string()));
}

#[tokio::test]
async fn test_unsupported_backend_rejected_and_state_kept() {
    let state = WorkspaceState::new(workspace());
    let chat = ChatId(3);

    state.get(chat).await;
    state
        .update_session_from_output(chat, CliBackend::Claude, "SESSION:keep-me\n")
        .await;

    let err = state.set_cli(chat, "not-a-real-cli").await.unwrap_err();
    assert!(matches!(err, RelayError::UnsupportedBackend(_)));

    let (backend, session_id) = state.get(chat).await;
    assert_eq!(backend, CliBackend::Claude);
    assert_eq!(session_id, Some("keep-me".to_string()));
}

#[tokio::test]
async fn test_allow_list_restricts_switching() {
    let mut restricted = workspace();
    restricted.allowed_backends = vec![CliBackend::Claude];
    let state = WorkspaceState::new(restricted);
    let chat = ChatId(4);

    let err = state.set_cli(chat, "opencode").await.unwrap_err();
    assert!(matches!(err, RelayError::UnsupportedBackend(_)));

    // The allowed backend keeps working.
    assert!(state.build_command(chat, "hi", None).await.is_some());
}

#[tokio::test]
async fn test_chats_do_not_interfere() {
    let state = WorkspaceState::new(workspace());
    let alice = ChatId(10);
    let bob = ChatId(11);

    state.get(alice).await;
    state.get(bob).await;
    state
        .update_session_from_output(alice, CliBackend::Claude, "SESSION:alice-1\n")
        .await;
    state
        .update_session_from_output(bob, CliBackend::Claude, "SESSION:bob-1\n")
        .await;

    // Switching one chat's backend leaves the other untouched.
    state.set_cli(bob, "opencode").await.unwrap();

    let (backend, session_id) = state.get(alice).await;
    assert_eq!(backend, CliBackend::Claude);
    assert_eq!(session_id, Some("alice-1".to_string()));

    let (backend, session_id) = state.get(bob).await;
    assert_eq!(backend, CliBackend::Opencode);
    assert_eq!(session_id, None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_chats_stay_isolated() {
    let state = Arc::new(WorkspaceState::new(workspace()));

    let mut handles = Vec::new();
    for n in 0..8i64 {
        let state = Arc::clone(&state);
        handles.push(tokio::spawn(async move {
            let chat = ChatId(100 + n);
            for turn in 0..50 {
                state.build_command(chat, "prompt", None).await.unwrap();
                state
                    .update_session_from_output(
                        chat,
                        CliBackend::Claude,
                        &format!("SESSION:chat{n}-turn{turn}\n"),
                    )
                    .await;
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    for n in 0..8i64 {
        let (_, session_id) = state.get(ChatId(100 + n)).await;
        assert_eq!(session_id, Some(format!("chat{n}-turn49")));
        let block = state.stats(ChatId(100 + n)).await.unwrap();
        assert!(block.contains("Messages:       50"));
    }
}

#[tokio::test]
async fn test_stale_output_after_switch_is_discarded() {
    let state = WorkspaceState::new(workspace());
    let chat = ChatId(5);

    // A claude run is in flight when the user switches to opencode.
    let invocation = state.build_command(chat, "long task", None).await.unwrap();
    state.set_cli(chat, "opencode").await.unwrap();

    // The old run's output arrives late; its id must not attach to the
    // new backend.
    state
        .update_session_from_output(chat, invocation.backend, "SESSION:stale\n")
        .await;

    let (backend, session_id) = state.get(chat).await;
    assert_eq!(backend, CliBackend::Opencode);
    assert_eq!(session_id, None);
}

#[test]
fn test_long_response_chunks_in_order() {
    // A 9000-character response with limit 4000 yields exactly 3 ordered
    // chunks whose concatenation equals the original trimmed text.
    let response: String = "0123456789 ".repeat(819).chars().take(9000).collect();
    let trimmed = response.trim();

    let chunks = chunk_text(trimmed, 4000);
    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks.concat(), trimmed);
    for chunk in &chunks {
        assert!(chunk.chars().count() <= 4000);
        assert!(!chunk.trim().is_empty());
    }
}
