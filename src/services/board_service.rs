//! Planning board feeds: read the session and participants nodes and derive [`BoardView`]s.

use futures::Stream;
use tracing::debug;

use crate::{
    dao::models::{PARTICIPANTS_KEY, participants_path, session_path},
    error::ServiceError,
    state::{
        SharedState,
        board::{BoardView, derive_board, participants_from_snapshot, session_from_snapshot},
        session::ClientIdentity,
    },
};

/// Derive the board once from the current store content.
pub async fn get_board(
    state: &SharedState,
    session_id: &str,
    identity: &ClientIdentity,
) -> Result<BoardView, ServiceError> {
    let store = state.require_session_store().await?;
    let session = store
        .read(session_path(session_id)?)
        .await?
        .ok_or_else(|| session_not_found(session_id))?;

    Ok(derive_board(
        &session_from_snapshot(Some(&session)),
        participants_from_snapshot(session.get(PARTICIPANTS_KEY)),
        state.config().presets(),
        identity,
    ))
}

/// Subscribe to the session and participants nodes and yield a fresh board on every change.
///
/// The first item is the current board. Consecutive identical boards are collapsed. Dropping
/// the stream drops both store subscriptions.
pub async fn watch_board(
    state: &SharedState,
    session_id: &str,
    identity: ClientIdentity,
) -> Result<impl Stream<Item = BoardView> + Send + 'static, ServiceError> {
    let store = state.require_session_store().await?;
    let mut session_feed = store.subscribe(session_path(session_id)?).await?;
    if session_feed.current().is_none() {
        return Err(session_not_found(session_id));
    }
    let mut participants_feed = store.subscribe(participants_path(session_id)?).await?;

    let presets = state.config().presets().clone();
    let session_id = session_id.to_string();

    Ok(async_stream::stream! {
        let mut session = session_from_snapshot(session_feed.current().as_ref());
        let mut participants = participants_feed.current();
        let mut last: Option<BoardView> = None;

        loop {
            let view = derive_board(
                &session,
                participants_from_snapshot(participants.as_ref()),
                &presets,
                &identity,
            );
            if last.as_ref() != Some(&view) {
                last = Some(view.clone());
                yield view;
            }

            tokio::select! {
                next = session_feed.changed() => match next {
                    Some(snapshot) => session = session_from_snapshot(snapshot.as_ref()),
                    None => break,
                },
                next = participants_feed.changed() => match next {
                    Some(snapshot) => participants = snapshot,
                    None => break,
                },
            }

            // A multi-path write wakes both feeds; fold both sides in before rendering.
            if let Some(snapshot) = session_feed.take_pending() {
                session = session_from_snapshot(snapshot.as_ref());
            }
            if let Some(snapshot) = participants_feed.take_pending() {
                participants = snapshot;
            }
        }

        debug!(%session_id, path = %session_feed.path(), "board feed closed by the store");
    })
}

fn session_not_found(session_id: &str) -> ServiceError {
    ServiceError::NotFound(format!("session `{session_id}` not found"))
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use futures::StreamExt;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::session_store::memory::MemorySessionStore,
        services::session_service,
        state::{AppState, session::VoteType},
    };

    async fn memory_state() -> (SharedState, MemorySessionStore) {
        let store = MemorySessionStore::new();
        let state = AppState::with_store(AppConfig::default(), Arc::new(store.clone())).await;
        (state, store)
    }

    async fn next_board(feed: &mut (impl Stream<Item = BoardView> + Unpin)) -> BoardView {
        tokio::time::timeout(Duration::from_secs(1), feed.next())
            .await
            .expect("board update in time")
            .expect("feed still open")
    }

    #[tokio::test]
    async fn get_board_of_unknown_session_is_not_found() {
        let (state, _store) = memory_state().await;
        let err = get_board(&state, "nope", &ClientIdentity::anonymous())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn get_board_reflects_votes_after_refresh() {
        let (state, _store) = memory_state().await;
        let created = session_service::create_session(&state, "Alice").await.unwrap();
        let bob = session_service::join_session(
            &state,
            &created.session_id,
            "Bob",
            &ClientIdentity::anonymous(),
        )
        .await
        .unwrap();
        let viewer = ClientIdentity::participant(bob.clone());

        session_service::vote(&state, &created.session_id, &viewer, "5")
            .await
            .unwrap();

        let board = get_board(&state, &created.session_id, &viewer).await.unwrap();
        let bob_record = board
            .participants
            .iter()
            .find(|participant| participant.id == bob)
            .unwrap();
        assert!(bob_record.has_voted);
        assert_eq!(bob_record.vote.as_deref(), Some("5"));

        let alice = board
            .participants
            .iter()
            .find(|participant| participant.id == created.participant_id)
            .unwrap();
        assert!(!alice.has_voted);
        assert_eq!(alice.vote, None);
        assert_eq!(board.current_participant.map(|p| p.id), Some(bob));
    }

    #[tokio::test]
    async fn watch_board_streams_changes() {
        let (state, _store) = memory_state().await;
        let created = session_service::create_session(&state, "Alice").await.unwrap();
        let owner = ClientIdentity::participant(created.participant_id.clone());

        let feed = watch_board(&state, &created.session_id, owner.clone())
            .await
            .unwrap();
        let mut feed = Box::pin(feed);

        let initial = next_board(&mut feed).await;
        assert_eq!(initial.owner_name, "Alice");
        assert!(initial.is_owner);
        assert_eq!(initial.vote_type, VoteType::OneToTen);

        session_service::update_vote_type(&state, &created.session_id, VoteType::Double)
            .await
            .unwrap();
        let switched = next_board(&mut feed).await;
        assert_eq!(switched.vote_type, VoteType::Double);
        assert_eq!(switched.vote_options.first().map(String::as_str), Some("2"));

        session_service::vote(&state, &created.session_id, &owner, "64")
            .await
            .unwrap();
        let voted = next_board(&mut feed).await;
        assert_eq!(voted.highest_vote, Some(64.0));
        assert_eq!(
            voted.current_participant.and_then(|p| p.vote).as_deref(),
            Some("64")
        );
    }

    #[tokio::test]
    async fn new_round_is_observed_in_one_update() {
        let (state, _store) = memory_state().await;
        let created = session_service::create_session(&state, "Alice").await.unwrap();
        let owner = ClientIdentity::participant(created.participant_id.clone());
        session_service::vote(&state, &created.session_id, &owner, "3")
            .await
            .unwrap();
        session_service::reveal(&state, &created.session_id)
            .await
            .unwrap();

        let mut feed = Box::pin(
            watch_board(&state, &created.session_id, owner)
                .await
                .unwrap(),
        );
        let revealed = next_board(&mut feed).await;
        assert!(revealed.is_revealed);
        assert_eq!(revealed.numeric_votes, vec![3.0]);

        session_service::new_round(&state, &created.session_id)
            .await
            .unwrap();
        let reset = next_board(&mut feed).await;
        assert!(!reset.is_revealed);
        assert!(reset.numeric_votes.is_empty());
        assert!(reset.participants.iter().all(|p| !p.has_voted));
    }

    #[tokio::test]
    async fn dropping_the_feed_releases_store_subscriptions() {
        let (state, store) = memory_state().await;
        let created = session_service::create_session(&state, "Alice").await.unwrap();

        let feed = watch_board(&state, &created.session_id, ClientIdentity::anonymous())
            .await
            .unwrap();
        assert_eq!(store.subscriber_count(), 2);

        drop(feed);
        assert_eq!(store.subscriber_count(), 0);
    }
}
