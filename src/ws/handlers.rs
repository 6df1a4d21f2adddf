//! WebSocket message dispatch
//!
//! Chat lines go through [`AppState::handle_chat_line`] so the trigger phrase is
//! seen; reactions go straight to the hub.

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::transport::TransportError;
use std::sync::Arc;

use super::Connection;

/// Greeting for a connection that (re)entered a channel
pub async fn welcome(state: &AppState, connection: &Connection) -> ServerMessage {
    ServerMessage::Welcome {
        user: connection.member.clone(),
        channel_id: connection.channel.clone(),
        emojis: state.hub.custom_emojis().await,
        server_now: chrono::Utc::now().to_rfc3339(),
    }
}

fn error_response(e: &TransportError) -> ServerMessage {
    let code = match e {
        TransportError::MessageNotFound(_) => "MESSAGE_NOT_FOUND",
        TransportError::UnknownUser(_) => "UNKNOWN_USER",
        TransportError::Unavailable(_) => "UNAVAILABLE",
    };
    ServerMessage::Error {
        code: code.to_string(),
        msg: e.to_string(),
    }
}

/// Handle client messages and return optional response
pub async fn handle_message(
    msg: ClientMessage,
    connection: &mut Connection,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    match msg {
        ClientMessage::Join { channel_id } => {
            let channel_id = channel_id.trim().to_lowercase();
            if channel_id.is_empty() {
                return Some(ServerMessage::Error {
                    code: "INVALID_CHANNEL".to_string(),
                    msg: "Channel name must not be empty".to_string(),
                });
            }
            tracing::info!(
                "{} switched from {} to {}",
                connection.member.display_name,
                connection.channel,
                channel_id
            );
            connection.channel = channel_id;
            Some(welcome(state, connection).await)
        }

        ClientMessage::Say { text } => {
            let text = text.trim();
            if text.is_empty() {
                return Some(ServerMessage::Error {
                    code: "EMPTY_MESSAGE".to_string(),
                    msg: "Message must not be empty".to_string(),
                });
            }
            match state
                .handle_chat_line(&connection.member.id, &connection.channel, text)
                .await
            {
                Ok(_) => None,
                Err(e) => Some(error_response(&e)),
            }
        }

        ClientMessage::React { message_id, emoji } => state
            .hub
            .add_reaction(&connection.member.id, &message_id, &emoji)
            .await
            .err()
            .map(|e| error_response(&e)),

        ClientMessage::Unreact { message_id, emoji } => state
            .hub
            .remove_user_reaction(&connection.member.id, &message_id, &emoji)
            .await
            .err()
            .map(|e| error_response(&e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::hub::ChatHub;
    use crate::questions::StaticQuestions;
    use crate::types::Emoji;

    async fn setup() -> (Arc<AppState>, Connection) {
        let state = Arc::new(AppState::new(
            ChatHub::new("Who'd Rather"),
            Arc::new(StaticQuestions::default()),
            GameConfig::default(),
        ));
        let member = state.hub.join(Some("Alice".to_string())).await;
        let connection = Connection {
            member,
            channel: "general".to_string(),
        };
        (state, connection)
    }

    #[tokio::test]
    async fn test_join_switches_channel() {
        let (state, mut connection) = setup().await;

        let response = handle_message(
            ClientMessage::Join {
                channel_id: " Games ".to_string(),
            },
            &mut connection,
            &state,
        )
        .await;

        assert_eq!(connection.channel, "games");
        match response {
            Some(ServerMessage::Welcome { channel_id, .. }) => assert_eq!(channel_id, "games"),
            other => panic!("Expected Welcome, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_say_is_rejected() {
        let (state, mut connection) = setup().await;

        let response = handle_message(
            ClientMessage::Say {
                text: "   ".to_string(),
            },
            &mut connection,
            &state,
        )
        .await;

        if let Some(ServerMessage::Error { code, .. }) = response {
            assert_eq!(code, "EMPTY_MESSAGE");
        } else {
            panic!("Expected error response");
        }
        assert!(state.hub.messages_in("general").await.is_empty());
    }

    #[tokio::test]
    async fn test_say_and_react() {
        let (state, mut connection) = setup().await;

        let response = handle_message(
            ClientMessage::Say {
                text: "hi all".to_string(),
            },
            &mut connection,
            &state,
        )
        .await;
        assert!(response.is_none());

        let message = state.hub.messages_in("general").await[0].id.clone();
        let emoji = Emoji::standard("🍕");

        let response = handle_message(
            ClientMessage::React {
                message_id: message.clone(),
                emoji: emoji.clone(),
            },
            &mut connection,
            &state,
        )
        .await;
        assert!(response.is_none());
        assert_eq!(
            state.hub.reactions(&message).await,
            vec![(emoji.clone(), vec![connection.member.id.clone()])]
        );

        handle_message(
            ClientMessage::Unreact {
                message_id: message.clone(),
                emoji,
            },
            &mut connection,
            &state,
        )
        .await;
        assert!(state.hub.reactions(&message).await.is_empty());
    }

    #[tokio::test]
    async fn test_react_to_missing_message() {
        let (state, mut connection) = setup().await;

        let response = handle_message(
            ClientMessage::React {
                message_id: "missing".to_string(),
                emoji: Emoji::standard("🍕"),
            },
            &mut connection,
            &state,
        )
        .await;

        if let Some(ServerMessage::Error { code, .. }) = response {
            assert_eq!(code, "MESSAGE_NOT_FOUND");
        } else {
            panic!("Expected error response");
        }
    }
}
