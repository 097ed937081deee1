//! Message definitions for the legacy `graphql-ws` protocol of [subscriptions-transport-ws][1].
//!
//! [1]: https://github.com/apollographql/subscriptions-transport-ws/blob/master/PROTOCOL.md

use error::GraphqlError;
use futures::{stream::BoxStream, StreamExt};

use crate::{Request, Response, Schema};

/// Subprotocol to negotiate during the websocket handshake.
pub const PROTOCOL: &str = "graphql-ws";

#[derive(serde::Deserialize, serde::Serialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    ConnectionInit {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<serde_json::Value>,
    },
    Start {
        id: String,
        payload: Request,
    },
    Stop {
        id: String,
    },
    ConnectionTerminate,
}

#[derive(serde::Serialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    ConnectionAck,
    ConnectionError {
        payload: serde_json::Value,
    },
    Data {
        id: String,
        payload: Response,
    },
    Error {
        id: String,
        payload: Vec<GraphqlError>,
    },
    Complete {
        id: String,
    },
    #[serde(rename = "ka")]
    KeepAlive,
}

impl ServerMessage {
    pub fn connection_error(message: impl Into<String>) -> Self {
        ServerMessage::ConnectionError {
            payload: serde_json::json!({ "message": message.into() }),
        }
    }
}

/// Server messages answering one client message.
///
/// A `start` message yields a `data` message per result of the operation, or a single `error`
/// message when the operation could not be executed, and always ends with `complete`. Dropping the
/// stream stops the subscription, which is what a transport does on `stop`.
pub fn handle_message(schema: &Schema, message: ClientMessage) -> BoxStream<'static, ServerMessage> {
    match message {
        ClientMessage::ConnectionInit { .. } => futures::stream::iter([ServerMessage::ConnectionAck]).boxed(),
        ClientMessage::Start { id, payload } => {
            let mut responses = schema.execute_stream(payload);
            async_stream::stream! {
                while let Some(response) = responses.next().await {
                    if response.is_request_error() {
                        yield ServerMessage::Error {
                            id: id.clone(),
                            payload: response.errors,
                        };
                        break;
                    }
                    yield ServerMessage::Data {
                        id: id.clone(),
                        payload: response,
                    };
                }
                yield ServerMessage::Complete { id };
            }
            .boxed()
        }
        ClientMessage::Stop { id } => futures::stream::iter([ServerMessage::Complete { id }]).boxed(),
        ClientMessage::ConnectionTerminate => futures::stream::empty().boxed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages() {
        let message: ClientMessage = serde_json::from_value(serde_json::json!({
            "type": "start",
            "id": "1",
            "payload": {"query": "subscription { counter }", "variables": {"step": 2}}
        }))
        .unwrap();
        let ClientMessage::Start { id, payload } = message else {
            unreachable!("expected a start message");
        };
        assert_eq!(id, "1");
        assert_eq!(payload.query, "subscription { counter }");

        let message: ClientMessage = serde_json::from_str(r#"{"type": "connection_terminate"}"#).unwrap();
        assert!(matches!(message, ClientMessage::ConnectionTerminate));
    }

    #[test]
    fn server_messages() {
        insta::assert_json_snapshot!(ServerMessage::KeepAlive, @r#"
        {
          "type": "ka"
        }
        "#);
        insta::assert_json_snapshot!(ServerMessage::connection_error("Unauthorized"), @r#"
        {
          "type": "connection_error",
          "payload": {
            "message": "Unauthorized"
          }
        }
        "#);
    }
}
