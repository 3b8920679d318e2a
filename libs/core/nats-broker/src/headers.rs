use async_nats::HeaderMap;
use messaging::{Message, CORRELATION_ID_HEADER, REPLY_TO_HEADER};

pub(crate) fn to_headers(message: &Message) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Some(id) = &message.correlation_id {
        headers.insert(CORRELATION_ID_HEADER, id.as_str());
    }
    if let Some(reply_to) = &message.reply_to {
        headers.insert(REPLY_TO_HEADER, reply_to.as_str());
    }
    headers
}

pub(crate) fn from_nats(payload: &[u8], headers: Option<&HeaderMap>) -> Message {
    let header = |name: &str| {
        headers
            .and_then(|h| h.get(name))
            .map(|value| value.as_str().to_string())
    };

    Message {
        payload: payload.to_vec(),
        correlation_id: header(CORRELATION_ID_HEADER),
        reply_to: header(REPLY_TO_HEADER),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_survives_headers() {
        let message = Message::new("text")
            .with_correlation_id("c-1")
            .with_reply_to("_INBOX.abc");

        let headers = to_headers(&message);
        assert_eq!(from_nats(b"text", Some(&headers)), message);
    }

    #[test]
    fn test_missing_headers_leave_metadata_empty() {
        let message = from_nats(b"{}", None);
        assert_eq!(message, Message::new("{}"));
    }
}
