/// An application-level websocket frame
///
/// Control frames (ping, pong, close) are handled by the transport and never
/// show up here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

impl Frame {
    /// Get the frame as text, if it is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Frame::Text(s) => Some(s),
            Frame::Binary(_) => None,
        }
    }

    /// Get the frame as binary, if it is binary
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Frame::Text(_) => None,
            Frame::Binary(b) => Some(b),
        }
    }

    /// Raw payload bytes regardless of frame kind
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Frame::Text(s) => s.as_bytes(),
            Frame::Binary(b) => b,
        }
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if frame is text
    pub fn is_text(&self) -> bool {
        matches!(self, Frame::Text(_))
    }

    /// Check if frame is binary
    pub fn is_binary(&self) -> bool {
        matches!(self, Frame::Binary(_))
    }

    /// Consume the frame and return its payload
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Frame::Text(s) => s.into_bytes(),
            Frame::Binary(b) => b,
        }
    }
}

impl From<String> for Frame {
    fn from(text: String) -> Self {
        Frame::Text(text)
    }
}

impl From<&str> for Frame {
    fn from(text: &str) -> Self {
        Frame::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Frame {
    fn from(data: Vec<u8>) -> Self {
        Frame::Binary(data)
    }
}
