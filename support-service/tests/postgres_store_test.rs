//! PostgreSQL store tests. Skipped unless `TEST_DATABASE_URL` points at a
//! scratch database.

use support_service::models::{HistoryOrder, NewFaq, NewSession, NewTurn, SessionStatus};
use support_service::services::{PgSupportStore, SupportStore};
use uuid::Uuid;

async fn store() -> Option<PgSupportStore> {
    let url = match std::env::var("TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("TEST_DATABASE_URL not set; skipping PostgreSQL test");
            return None;
        }
    };

    let store = PgSupportStore::connect(&url, 5, 1)
        .await
        .expect("Failed to connect to test database");
    store.run_migrations().await.expect("Failed to run migrations");
    Some(store)
}

fn turn(session_id: Uuid, n: usize) -> NewTurn {
    NewTurn {
        session_id,
        user_message: format!("question {}", n),
        bot_response: format!("answer {}", n),
        matched_faq_id: None,
        escalated: false,
    }
}

#[tokio::test]
async fn turns_round_trip_with_bounds_and_order() {
    let Some(store) = store().await else { return };
    let session = store
        .create_session(&NewSession {
            customer_name: Some("Ana".into()),
            customer_email: None,
        })
        .await
        .unwrap();

    for n in 0..5 {
        store.append_turn(&turn(session.session_id, n)).await.unwrap();
    }

    let recent = store
        .list_turns(session.session_id, Some(2), HistoryOrder::Chronological)
        .await
        .unwrap();
    let messages: Vec<_> = recent.iter().map(|t| t.user_message.as_str()).collect();
    assert_eq!(messages, vec!["question 3", "question 4"]);

    let all = store
        .list_turns(session.session_id, None, HistoryOrder::ReverseChronological)
        .await
        .unwrap();
    assert_eq!(all.len(), 5);
    assert_eq!(all[0].user_message, "question 4");
}

#[tokio::test]
async fn appending_to_unknown_session_is_not_found() {
    let Some(store) = store().await else { return };

    let err = store.append_turn(&turn(Uuid::new_v4(), 0)).await.unwrap_err();

    assert!(err.is_not_found());
}

#[tokio::test]
async fn escalation_and_end_follow_the_lifecycle() {
    let Some(store) = store().await else { return };
    let session = store.create_session(&NewSession::default()).await.unwrap();
    let id = session.session_id;

    let first = store.escalate(id, "Customer asked for a human").await.unwrap();
    assert!(first.status_changed);
    assert_eq!(first.session.status(), SessionStatus::Escalated);

    let second = store.escalate(id, "Asked again").await.unwrap();
    assert!(!second.status_changed);
    assert_eq!(store.escalation_logs(id).await.unwrap().len(), 2);

    let ended = store.end_session(id, "Short chat").await.unwrap();
    assert_eq!(ended.status(), SessionStatus::Ended);
    assert_eq!(ended.summary.as_deref(), Some("Short chat"));
    assert!(ended.ended_utc.is_some());

    let err = store.append_turn(&turn(id, 0)).await.unwrap_err();
    assert!(!err.is_not_found());
    assert!(store
        .list_turns(id, None, HistoryOrder::Chronological)
        .await
        .unwrap()
        .is_empty());

    let again = store.end_session(id, "Different summary").await.unwrap();
    assert_eq!(again.summary.as_deref(), Some("Short chat"));

    let after_end = store.escalate(id, "Late request").await.unwrap();
    assert_eq!(after_end.session.status(), SessionStatus::Ended);

    let escalated = store.escalated_sessions().await.unwrap();
    assert!(escalated.iter().all(|s| s.session.session_id != id));
}

#[tokio::test]
async fn inserted_faq_is_listed_with_normalized_keywords() {
    let Some(store) = store().await else { return };
    let question = format!("Test question {}?", Uuid::new_v4());

    let faq = store
        .insert_faq(&NewFaq {
            question: question.clone(),
            answer: "Test answer".into(),
            category: "testing".into(),
            keywords: vec![" Alpha ".into(), "alpha".into(), "Beta".into()],
            priority: 9,
        })
        .await
        .unwrap();

    assert_eq!(faq.keywords, vec!["alpha", "beta"]);
    assert_eq!(faq.priority, 5);
    assert!(store
        .list_faqs()
        .await
        .unwrap()
        .iter()
        .any(|f| f.question == question));

    let seeded = store
        .seed_faqs(&[NewFaq {
            question: "Never stored".into(),
            answer: "a".into(),
            category: "testing".into(),
            keywords: vec![],
            priority: 1,
        }])
        .await
        .unwrap();
    assert_eq!(seeded, 0);
}
