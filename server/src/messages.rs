use serde::{Deserialize, Serialize};

use crate::player::PlayerEvent;
use crate::quiz::Answer;

/// Messages sent from a player's browser over the play WebSocket.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "messageType", content = "payload")]
pub enum ClientToServerMessage {
    EnterRoom { code: String },
    /// A plain option id for MCQ, or the chosen match for each item in order.
    SubmitAnswer { answer: Answer },
    /// Ends the session and closes the connection.
    LeaveQuiz,
}

#[derive(Serialize, Debug, Clone)]
#[serde(tag = "messageType", content = "payload")]
pub enum ServerToClientMessage {
    QuizEvent(PlayerEvent),
    /// Connection-level problem, not tied to the quiz flow.
    SystemError { message: String },
}

impl ServerToClientMessage {
    pub fn to_ws_text(&self) -> Result<axum::extract::ws::Message, serde_json::Error> {
        serde_json::to_string(self)
            .map(|json_string| axum::extract::ws::Message::Text(json_string.into()))
    }
}

impl From<PlayerEvent> for ServerToClientMessage {
    fn from(event: PlayerEvent) -> Self {
        ServerToClientMessage::QuizEvent(event)
    }
}

pub fn client_message_from_ws_text(text: &str) -> Result<ClientToServerMessage, serde_json::Error> {
    serde_json::from_str(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_client_messages() {
        assert_eq!(
            client_message_from_ws_text(r#"{"messageType":"EnterRoom","payload":{"code":"123a"}}"#)
                .unwrap(),
            ClientToServerMessage::EnterRoom {
                code: "123a".to_string()
            }
        );
        assert_eq!(
            client_message_from_ws_text(
                r#"{"messageType":"SubmitAnswer","payload":{"answer":["Au","Fe"]}}"#
            )
            .unwrap(),
            ClientToServerMessage::SubmitAnswer {
                answer: Answer::Matches(vec!["Au".into(), "Fe".into()])
            }
        );
        assert_eq!(
            client_message_from_ws_text(r#"{"messageType":"LeaveQuiz"}"#).unwrap(),
            ClientToServerMessage::LeaveQuiz
        );
        assert!(client_message_from_ws_text(r#"{"messageType":"Cheat"}"#).is_err());
    }

    #[test]
    fn test_server_message_envelope() {
        let message: ServerToClientMessage = PlayerEvent::TimeUp { index: 3 }.into();
        let json: serde_json::Value = serde_json::to_value(&message).unwrap();
        assert_eq!(json["messageType"], "QuizEvent");
        assert_eq!(json["payload"]["eventType"], "TimeUp");
        assert_eq!(json["payload"]["data"]["index"], 3);

        let ws_message = ServerToClientMessage::SystemError {
            message: "boom".to_string(),
        }
        .to_ws_text()
        .unwrap();
        assert!(matches!(ws_message, axum::extract::ws::Message::Text(_)));
    }
}
