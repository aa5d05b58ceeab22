use std::{sync::Arc, time::Duration};

use futures::StreamExt;
use planning_poker_back::{
    config::AppConfig,
    dao::session_store::memory::MemorySessionStore,
    dto::board::BoardSnapshot,
    services::{board_service, join_link::join_link, session_service},
    state::{AppState, board::BoardView, session::ClientIdentity},
};

async fn next_board<S>(feed: &mut S) -> BoardView
where
    S: futures::Stream<Item = BoardView> + Unpin,
{
    tokio::time::timeout(Duration::from_secs(1), feed.next())
        .await
        .expect("board update in time")
        .expect("feed still open")
}

#[tokio::test]
async fn full_planning_round() {
    let state =
        AppState::with_store(AppConfig::default(), Arc::new(MemorySessionStore::new())).await;

    let created = session_service::create_session(&state, "Alice").await.unwrap();
    let alice = ClientIdentity::participant(created.participant_id.clone());
    let session_id = created.session_id.clone();

    let link = join_link(&format!("https://poker.example/session/{session_id}"));
    assert_eq!(link, format!("https://poker.example/join/{session_id}"));

    let bob_id = session_service::join_session(&state, &session_id, "Bob", &ClientIdentity::anonymous())
        .await
        .unwrap();
    let bob = ClientIdentity::participant(bob_id.clone());

    let mut alice_feed = Box::pin(
        board_service::watch_board(&state, &session_id, alice.clone())
            .await
            .unwrap(),
    );
    let initial = next_board(&mut alice_feed).await;
    assert_eq!(initial.participants.len(), 2);
    assert_eq!(initial.participants[0].name, "Alice");
    assert!(initial.is_owner);

    session_service::vote(&state, &session_id, &bob, "8").await.unwrap();
    let after_bob = next_board(&mut alice_feed).await;
    let hidden = BoardSnapshot::project(after_bob, &alice);
    let bob_row = hidden.participants.iter().find(|p| p.id == bob_id).unwrap();
    assert!(bob_row.has_voted);
    assert_eq!(bob_row.vote, None);
    assert_eq!(hidden.highest_vote, None);

    session_service::vote(&state, &session_id, &alice, "5").await.unwrap();
    next_board(&mut alice_feed).await;

    session_service::reveal(&state, &session_id).await.unwrap();
    let revealed = next_board(&mut alice_feed).await;
    assert!(revealed.is_revealed);
    assert_eq!(revealed.highest_vote, Some(8.0));
    assert_eq!(revealed.lowest_vote, Some(5.0));
    let shown = BoardSnapshot::project(revealed, &alice);
    assert!(shown.participants.iter().all(|p| p.vote.is_some()));

    let bob_board = board_service::get_board(&state, &session_id, &bob).await.unwrap();
    assert!(!bob_board.is_owner);
    assert_eq!(bob_board.current_participant.map(|p| p.name), Some("Bob".into()));

    session_service::new_round(&state, &session_id).await.unwrap();
    let reset = next_board(&mut alice_feed).await;
    assert!(!reset.is_revealed);
    assert!(reset.participants.iter().all(|p| !p.has_voted && p.vote.is_none()));
    assert_eq!(reset.highest_vote, None);
    assert_eq!(reset.lowest_vote, None);
}
