//! Integration tests for the turn protocol.
//! The live test at the bottom requires GROQ_API_KEY in the environment to run.

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use chatrelay::{
        Completion, CompletionClient, Conversation, ConversationConfig, Error, MemoryStore,
        Message, Result, SessionStore,
    };

    const SYSTEM: &str = "You are a test assistant.";

    /// Replies with a fixed outcome and records every message list it was given.
    struct Scripted {
        outcome: Result<String>,
        configured: bool,
        seen: Mutex<Vec<Vec<Message>>>,
    }

    impl Scripted {
        fn replying(text: &str) -> Self {
            Self {
                outcome: Ok(text.to_string()),
                configured: true,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing(err: Error) -> Self {
            Self {
                outcome: Err(err),
                configured: true,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn unconfigured() -> Self {
            Self {
                configured: false,
                ..Self::replying("unused")
            }
        }
    }

    #[async_trait::async_trait]
    impl Completion for Scripted {
        fn is_configured(&self) -> bool {
            self.configured
        }

        async fn complete(&self, messages: &[Message]) -> Result<String> {
            self.seen.lock().unwrap().push(messages.to_vec());
            self.outcome.clone()
        }
    }

    /// Echoes the latest message back, optionally after a delay.
    struct Echo {
        delay: Option<Duration>,
    }

    #[async_trait::async_trait]
    impl Completion for Echo {
        async fn complete(&self, messages: &[Message]) -> Result<String> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let last = messages.last().map(|m| m.content.as_str()).unwrap_or("");
            Ok(format!("echo: {last} ({} seen)", messages.len()))
        }
    }

    fn store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::new(Some(SYSTEM.to_string())))
    }

    fn conversation(
        store: &Arc<MemoryStore>,
        completion: Arc<dyn Completion>,
        config: ConversationConfig,
    ) -> Conversation {
        Conversation::with_config(Arc::clone(store) as Arc<dyn SessionStore>, completion, config)
    }

    #[tokio::test]
    async fn test_hi_hello_turn() {
        let store = store();
        let completion = Arc::new(Scripted::replying("Hello!"));
        let conv = conversation(&store, completion.clone(), ConversationConfig::new());

        let reply = conv.run_turn("s1", "Hi").await.unwrap();
        assert_eq!(reply, "Hello!");
        assert_eq!(
            conv.history("s1").await.unwrap(),
            vec![
                Message::system(SYSTEM),
                Message::user("Hi"),
                Message::assistant("Hello!"),
            ]
        );
        assert_eq!(
            completion.seen.lock().unwrap().as_slice(),
            &[vec![Message::system(SYSTEM), Message::user("Hi")]]
        );
    }

    #[tokio::test]
    async fn test_failed_turn_keeps_user_message() {
        let store = store();
        let completion = Arc::new(Scripted::failing(Error::upstream(
            Some(503),
            None,
            "Service unavailable",
        )));
        let conv = conversation(&store, completion, ConversationConfig::new());

        let err = conv.run_turn("s1", "Hi").await.unwrap_err();
        assert!(err.is_upstream());
        assert_eq!(err.message(), "Service unavailable");
        assert_eq!(
            conv.history("s1").await.unwrap(),
            vec![Message::system(SYSTEM), Message::user("Hi")]
        );
    }

    #[tokio::test]
    async fn test_retry_after_failure_sees_unanswered_message() {
        let store = store();
        let failing = conversation(
            &store,
            Arc::new(Scripted::failing(Error::upstream(None, None, "boom"))),
            ConversationConfig::new(),
        );
        failing.run_turn("s1", "first").await.unwrap_err();

        let ok = Arc::new(Scripted::replying("answer"));
        let conv = conversation(&store, ok.clone(), ConversationConfig::new());
        conv.run_turn("s1", "second").await.unwrap();
        assert_eq!(
            ok.seen.lock().unwrap()[0],
            vec![
                Message::system(SYSTEM),
                Message::user("first"),
                Message::user("second"),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_input_mutates_nothing() {
        let store = store();
        let completion = Arc::new(Scripted::replying("x"));
        let conv = conversation(&store, completion.clone(), ConversationConfig::new());

        for input in ["", "   ", "\n\t"] {
            let err = conv.run_turn("s1", input).await.unwrap_err();
            assert!(err.is_invalid_input());
        }
        assert!(store.is_empty().await);
        assert!(completion.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unconfigured_mutates_nothing() {
        let store = store();
        let conv = conversation(
            &store,
            Arc::new(Scripted::unconfigured()),
            ConversationConfig::new(),
        );
        let err = conv.run_turn("s1", "Hi").await.unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(err.message(), "GROQ_API_KEY not configured on server");
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_history_bound_unpinned_keeps_most_recent() {
        let store = store();
        let conv = conversation(
            &store,
            Arc::new(Echo { delay: None }),
            ConversationConfig::new().with_pinned_system_message(false),
        );

        let mut expected = vec![Message::system(SYSTEM)];
        for i in 0..15 {
            let text = format!("message {i}");
            let reply = conv.run_turn("s1", &text).await.unwrap();
            expected.push(Message::user(text));
            expected.push(Message::assistant(reply));

            let history = conv.history("s1").await.unwrap();
            assert!(history.len() <= 20);
            let start = expected.len().saturating_sub(20);
            assert_eq!(history, expected[start..].to_vec());
        }
        assert!(!conv.history("s1").await.unwrap()[0].is_system());
    }

    #[tokio::test]
    async fn test_history_bound_pinned_keeps_system_message() {
        let store = store();
        let conv = conversation(
            &store,
            Arc::new(Echo { delay: None }),
            ConversationConfig::new(),
        );

        let mut turns = Vec::new();
        for i in 0..15 {
            let text = format!("message {i}");
            let reply = conv.run_turn("s1", &text).await.unwrap();
            turns.push(Message::user(text));
            turns.push(Message::assistant(reply));

            let history = conv.history("s1").await.unwrap();
            assert!(history.len() <= 20);
            assert_eq!(history[0], Message::system(SYSTEM));
            let start = turns.len().saturating_sub(19);
            assert_eq!(&history[1..], &turns[start..]);
        }
    }

    #[tokio::test]
    async fn test_failed_turns_stay_bounded() {
        let store = store();
        let completion = Arc::new(Scripted::failing(Error::upstream(
            Some(503),
            None,
            "Service unavailable",
        )));
        let conv = conversation(&store, completion.clone(), ConversationConfig::new());

        for i in 0..30 {
            conv.run_turn("s1", &format!("retry {i}")).await.unwrap_err();
            let history = conv.history("s1").await.unwrap();
            assert!(history.len() <= 20, "history grew to {}", history.len());
            assert_eq!(history[0], Message::system(SYSTEM));
            assert_eq!(
                history.last(),
                Some(&Message::user(format!("retry {i}")))
            );
        }
        let seen = completion.seen.lock().unwrap();
        assert_eq!(seen.len(), 30);
        assert!(seen.iter().all(|sent| sent.len() <= 20));
    }

    #[tokio::test]
    async fn test_clear_unknown_session_is_noop() {
        let store = store();
        let conv = conversation(
            &store,
            Arc::new(Scripted::replying("ok")),
            ConversationConfig::new(),
        );
        conv.run_turn("kept", "Hi").await.unwrap();
        let before = conv.history("kept").await;

        conv.clear_session("unknown").await;
        conv.clear_session("unknown").await;
        assert_eq!(store.len().await, 1);
        assert_eq!(conv.history("kept").await, before);

        conv.clear_session("kept").await;
        assert!(store.is_empty().await);
        assert_eq!(conv.history("kept").await, None);
    }

    #[tokio::test]
    async fn test_distinct_sessions_do_not_interfere() {
        let store = store();
        let conv = Arc::new(conversation(
            &store,
            Arc::new(Echo {
                delay: Some(Duration::from_millis(20)),
            }),
            ConversationConfig::new(),
        ));

        let turns = (0..10).map(|i| {
            let conv = Arc::clone(&conv);
            async move {
                let id = format!("session-{i}");
                let text = format!("hello from {i}");
                let reply = conv.run_turn(&id, &text).await.unwrap();
                (id, text, reply)
            }
        });
        let results = futures::future::join_all(turns).await;

        assert_eq!(store.len().await, 10);
        for (id, text, reply) in results {
            assert_eq!(reply, format!("echo: {text} (2 seen)"));
            assert_eq!(
                conv.history(&id).await.unwrap(),
                vec![
                    Message::system(SYSTEM),
                    Message::user(text),
                    Message::assistant(reply),
                ]
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_session_turns_are_serialized() {
        let store = store();
        let conv = Arc::new(conversation(
            &store,
            Arc::new(Echo {
                delay: Some(Duration::from_secs(1)),
            }),
            ConversationConfig::new(),
        ));

        let a = {
            let conv = Arc::clone(&conv);
            tokio::spawn(async move { conv.run_turn("shared", "one").await })
        };
        let b = {
            let conv = Arc::clone(&conv);
            tokio::spawn(async move { conv.run_turn("shared", "two").await })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let history = conv.history("shared").await.unwrap();
        assert_eq!(history.len(), 5);
        let users = history
            .iter()
            .filter(|m| m.role == chatrelay::MessageRole::User)
            .count();
        assert_eq!(users, 2);
        // The second turn saw the first turn's reply.
        assert!(history[4].content.ends_with("(4 seen)"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_turn_timeout_is_upstream_error() {
        let store = store();
        let conv = conversation(
            &store,
            Arc::new(Echo {
                delay: Some(Duration::from_secs(600)),
            }),
            ConversationConfig::new().with_turn_timeout(Some(Duration::from_secs(60))),
        );

        let err = conv.run_turn("slow", "Hi").await.unwrap_err();
        assert!(err.is_timeout());
        assert!(err.is_upstream());
        assert_eq!(
            conv.history("slow").await.unwrap(),
            vec![Message::system(SYSTEM), Message::user("Hi")]
        );
    }

    #[tokio::test]
    async fn test_live_completion() {
        // This test requires GROQ_API_KEY to be set
        let api_key = std::env::var("GROQ_API_KEY").ok();
        if api_key.is_none() {
            eprintln!("Skipping test: GROQ_API_KEY not set");
            return;
        }

        let client = CompletionClient::new(api_key)
            .expect("Failed to create client")
            .with_max_tokens(Some(50));
        let reply = client
            .complete(&[Message::user("Say 'test passed'")])
            .await;
        assert!(reply.is_ok(), "Request should succeed with valid API key");
    }
}
